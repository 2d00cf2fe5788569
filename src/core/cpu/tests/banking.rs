// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::*;
use crate::core::cpu::psr::Mode;

#[test]
fn test_irq_bank_switch() {
    let mut cpu = CPU::new();
    cpu.set_reg(13, 0x100);
    cpu.set_reg(14, 0x200);
    cpu.set_reg(12, 0x300);

    cpu.switch_mode(Mode::Irq);
    assert_eq!(cpu.reg(13), 0);
    assert_eq!(cpu.reg(14), 0);
    // R8-R12 are shared outside FIQ
    assert_eq!(cpu.reg(12), 0x300);
    cpu.set_reg(13, 0x0300_7FA0);

    cpu.switch_mode(Mode::System);
    assert_eq!(cpu.reg(13), 0x100);
    assert_eq!(cpu.reg(14), 0x200);

    cpu.switch_mode(Mode::Irq);
    assert_eq!(cpu.reg(13), 0x0300_7FA0);
}

#[test]
fn test_fiq_banks_high_registers() {
    let mut cpu = CPU::new();
    for r in 8..15 {
        cpu.set_reg(r, r as u32);
    }

    cpu.switch_mode(Mode::Fiq);
    for r in 8..15 {
        assert_eq!(cpu.reg(r), 0, "r{} should be banked in FIQ", r);
        cpu.set_reg(r, 0x80 + r as u32);
    }

    cpu.switch_mode(Mode::Supervisor);
    // High registers come back, SP/LR are Supervisor's own
    for r in 8..13 {
        assert_eq!(cpu.reg(r), r as u32);
    }
    assert_eq!(cpu.reg(13), 0);

    cpu.switch_mode(Mode::Fiq);
    for r in 8..15 {
        assert_eq!(cpu.reg(r), 0x80 + r as u32);
    }
}

#[test]
fn test_user_and_system_share_bank() {
    let mut cpu = CPU::new();
    cpu.set_reg(13, 0x0300_7F00);
    cpu.switch_mode(Mode::User);
    assert_eq!(cpu.reg(13), 0x0300_7F00);
}

#[test]
fn test_reset_stacks() {
    let mut cpu = CPU::new();
    cpu.reset_stacks();
    assert_eq!(cpu.reg(13), super::super::SYSTEM_STACK);

    cpu.switch_mode(Mode::Supervisor);
    assert_eq!(cpu.reg(13), super::super::SVC_STACK);
    cpu.switch_mode(Mode::Irq);
    assert_eq!(cpu.reg(13), super::super::IRQ_STACK);
}

#[test]
fn test_msr_switches_mode() {
    // msr cpsr_c, #0x12
    let (mut cpu, mut bus) = setup_arm(&[0xE321_F012]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.mode(), Mode::Irq);
}

#[test]
fn test_msr_control_ignored_in_user_mode() {
    // msr cpsr_fc, #0xF0000012 is not encodable; write flags and mode from r0
    // msr cpsr_fc, r0
    let (mut cpu, mut bus) = setup_arm(&[0xE129_F000]);
    cpu.switch_mode(Mode::User);
    cpu.set_reg(0, 0xF000_0012);
    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.mode(), Mode::User);
    assert_eq!(cpu.cpsr() >> 28, 0xF);
}

#[test]
fn test_mrs_reads_cpsr() {
    // mrs r0, cpsr
    let (mut cpu, mut bus) = setup_arm(&[0xE10F_0000]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.reg(0), 0x1F);
}
