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
use crate::core::error::EmulatorError;
use crate::core::interrupt::interrupts;

const IE: u32 = 0x0400_0200;
const IF: u32 = 0x0400_0202;
const IME: u32 = 0x0400_0208;
const DISPSTAT: u32 = 0x0400_0004;

/// `b .`
const LOOP: u32 = 0xEAFF_FFFE;

#[test]
fn test_irq_entry() {
    let (mut cpu, mut bus) = setup_arm(&[LOOP]);
    bus.store16(IE, interrupts::VBLANK);
    bus.store16(IME, 1);
    bus.raise_irq(interrupts::VBLANK);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.mode(), Mode::Irq);
    assert_eq!(cpu.exec_mode(), ExecMode::Arm);
    assert_eq!(cpu.pc(), 0x18);
    // subs pc, lr, #4 resumes at the loop
    assert_eq!(cpu.reg(14).wrapping_sub(4), BASE);
    assert_eq!(cpu.spsr(), Some(0x1F));
    assert!(cpu.flags().contains(PsrFlags::I));
}

#[test]
fn test_irq_from_thumb_returns_to_next_instruction() {
    // mov r0, #1
    let (mut cpu, mut bus) = setup_thumb(&[0x2001, 0x2002]);
    bus.store16(IE, interrupts::TIMER0);
    bus.store16(IME, 1);
    bus.raise_irq(interrupts::TIMER0);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.reg(0), 1);
    assert_eq!(cpu.exec_mode(), ExecMode::Arm);
    assert_eq!(cpu.spsr().map(|spsr| spsr & 0x20), Some(0x20));
    assert_eq!(cpu.reg(14).wrapping_sub(4), BASE + 2);
}

#[test]
fn test_irq_masked_by_cpsr() {
    let (mut cpu, mut bus) = setup_arm(&[LOOP]);
    cpu.set_cpsr(0x9F);
    bus.store16(IE, interrupts::VBLANK);
    bus.store16(IME, 1);
    bus.raise_irq(interrupts::VBLANK);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.mode(), Mode::System);
    assert_eq!(cpu.pc(), BASE);
}

#[test]
fn test_irq_masked_by_ime() {
    let (mut cpu, mut bus) = setup_arm(&[LOOP]);
    bus.store16(IE, interrupts::VBLANK);
    bus.raise_irq(interrupts::VBLANK);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.mode(), Mode::System);
}

#[test]
fn test_acknowledge_clears_flag() {
    let (_cpu, mut bus) = setup_arm(&[LOOP]);
    bus.raise_irq(interrupts::VBLANK | interrupts::HBLANK);
    bus.store16(IF, interrupts::VBLANK);
    assert_eq!(bus.load_u16(IF), interrupts::HBLANK);
}

#[test]
fn test_swi_with_bios_image_traps() {
    let (mut cpu, mut bus) = setup_arm(&[0xEF06_0000]);
    bus.load_bios(&vec![0u8; 0x4000]).unwrap();
    cpu.set_reg(0, 10);
    cpu.set_reg(1, 3);

    cpu.step(&mut bus).unwrap();

    assert_eq!(cpu.mode(), Mode::Supervisor);
    assert_eq!(cpu.pc(), 0x08);
    assert_eq!(cpu.reg(14), BASE + 4);
    // The BIOS has not run
    assert_eq!(cpu.reg(0), 10);
}

#[test]
fn test_swi_trap_charges_vector_refill() {
    let (mut cpu, mut bus) = setup_arm(&[0xEF06_0000]);
    bus.load_bios(&vec![0u8; 0x4000]).unwrap();
    let before = bus.cycles();

    cpu.step(&mut bus).unwrap();

    let mut expected = Bus::new();
    expected.wait_prefetch32(BASE);
    expected.wait32(0x08);
    expected.wait_prefetch32(0x08);
    assert_eq!(bus.cycles() - before, expected.cycles());
}

#[test]
fn test_undefined_instruction_is_fatal() {
    let (mut cpu, mut bus) = setup_arm(&[0xEC00_0000]);
    let result = cpu.step(&mut bus);
    assert!(matches!(
        result,
        Err(EmulatorError::IllegalInstruction {
            address: BASE,
            opcode: 0xEC00_0000,
            thumb: false,
        })
    ));
}

#[test]
fn test_undefined_with_failed_condition_is_skipped() {
    // Coprocessor opcode under EQ with Z clear
    let (mut cpu, mut bus) = setup_arm(&[0x0C00_0000]);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), BASE + 4);
}

#[test]
fn test_halt_without_enabled_interrupts_deadlocks() {
    let (mut cpu, mut bus) = setup_arm(&[LOOP]);
    cpu.halt();
    assert!(matches!(
        cpu.step(&mut bus),
        Err(EmulatorError::HaltDeadlock { pc: BASE })
    ));
}

#[test]
fn test_halt_fast_forwards_to_vblank() {
    let (mut cpu, mut bus) = setup_arm(&[LOOP]);
    bus.store16(DISPSTAT, 0x0008);
    bus.store16(IE, interrupts::VBLANK);
    cpu.halt();

    let mut steps = 0;
    while cpu.is_halted() {
        cpu.step(&mut bus).unwrap();
        steps += 1;
        assert!(steps < 2000, "halt never woke");
    }

    // Woken by the request even with IME clear; no exception taken
    assert_eq!(cpu.mode(), Mode::System);
    assert_ne!(bus.interrupts().read_flags() & interrupts::VBLANK, 0);
    assert!(bus.cycles() >= 159 * 1232);
    assert!(bus.video().in_vblank());
}

#[test]
fn test_haltcnt_write_halts() {
    // strb r0, [r1]
    let (mut cpu, mut bus) = setup_arm(&[0xE5C1_0000]);
    cpu.set_reg(1, 0x0400_0301);
    cpu.step(&mut bus).unwrap();
    assert!(cpu.is_halted());
}
