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
use crate::core::cpu::psr::{Mode, PsrFlags};

#[test]
fn test_cpu_initialization() {
    let cpu = CPU::new();
    assert_eq!(cpu.mode(), Mode::System);
    assert_eq!(cpu.exec_mode(), ExecMode::Arm);
    assert_eq!(cpu.pc(), 0);
    assert_eq!(cpu.reg(0), 0);
    assert!(!cpu.is_halted());
}

#[test]
fn test_reset_sets_entry_point() {
    let mut cpu = CPU::new();
    cpu.set_reg(3, 0xDEAD_BEEF);
    cpu.set_cpsr(0x8000_0013);

    cpu.reset(0x0800_0000);

    assert_eq!(cpu.reg(3), 0);
    assert_eq!(cpu.mode(), Mode::System);
    assert_eq!(cpu.pc(), 0x0800_0000);
    // R15 runs one instruction ahead of the next fetch
    assert_eq!(cpu.reg(15), 0x0800_0004);
}

#[test]
fn test_register_read_write() {
    let mut cpu = CPU::new();
    for i in 0..15 {
        cpu.set_reg(i, i as u32 * 100);
    }
    for i in 0..15 {
        assert_eq!(cpu.reg(i), i as u32 * 100);
    }
}

#[test]
fn test_cpsr_pack_unpack() {
    let mut cpu = CPU::new();
    cpu.set_cpsr(0x8000_0093);

    assert_eq!(cpu.mode(), Mode::Supervisor);
    assert!(cpu.flags().contains(PsrFlags::N));
    assert!(cpu.flags().contains(PsrFlags::I));
    assert_eq!(cpu.cpsr(), 0x8000_0093);
}

#[test]
fn test_cpsr_t_bit_selects_thumb() {
    let mut cpu = CPU::new();
    cpu.set_cpsr(0x0000_003F);
    assert_eq!(cpu.exec_mode(), ExecMode::Thumb);
    assert_eq!(cpu.cpsr() & 0x20, 0x20);
}

#[test]
fn test_invalid_mode_keeps_current_mode() {
    let mut cpu = CPU::new();
    cpu.set_cpsr(0x0000_0005);
    assert_eq!(cpu.mode(), Mode::System);
}

#[test]
fn test_spsr_absent_in_system_mode() {
    let mut cpu = CPU::new();
    assert_eq!(cpu.spsr(), None);
    cpu.set_spsr(0x1234);
    assert_eq!(cpu.spsr(), None);

    cpu.switch_mode(Mode::Irq);
    cpu.set_spsr(0x6000_001F);
    assert_eq!(cpu.spsr(), Some(0x6000_001F));
}

#[test]
fn test_division_program() {
    // mov r0, #10; mov r1, #3; swi 6
    let (mut cpu, mut bus) = setup_arm(&[0xE3A0_000A, 0xE3A0_1003, 0xEF06_0000]);
    run(&mut cpu, &mut bus, 3);

    assert_eq!(cpu.reg(0), 3);
    assert_eq!(cpu.reg(1), 1);
    assert_eq!(cpu.reg(3), 3);
    assert_eq!(cpu.pc(), BASE + 12);
}

#[test]
fn test_step_advances_cycles() {
    let (mut cpu, mut bus) = setup_arm(&[0xE3A0_000A]);
    cpu.step(&mut bus).unwrap();
    // One IWRAM prefetch
    assert_eq!(bus.cycles(), 1);
}

#[test]
fn test_snapshot_restore() {
    let (mut cpu, mut bus) = setup_arm(&[0xE3A0_000A, 0xE3A0_1003]);
    run(&mut cpu, &mut bus, 2);
    cpu.switch_mode(Mode::Irq);
    cpu.set_reg(13, 0x0300_7FA0);
    cpu.set_spsr(0x2000_001F);

    let state = cpu.snapshot();
    let mut restored = CPU::new();
    restored.restore(&state).unwrap();

    assert_eq!(restored.snapshot(), state);
    assert_eq!(restored.mode(), Mode::Irq);
    assert_eq!(restored.reg(0), 10);
    assert_eq!(restored.spsr(), Some(0x2000_001F));
    assert_eq!(restored.pc(), cpu.pc());
}

#[test]
fn test_restore_rejects_invalid_mode() {
    let mut state = CPU::new().snapshot();
    state.cpsr = 0x0000_0001;
    assert!(CPU::new().restore(&state).is_err());
}
