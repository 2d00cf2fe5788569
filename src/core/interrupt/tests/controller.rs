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

//! IE/IF/IME register behavior

use super::*;

#[test]
fn test_new_controller_is_quiet() {
    let ic = InterruptController::new();
    assert_eq!(ic.read_enable(), 0);
    assert_eq!(ic.read_flags(), 0);
    assert_eq!(ic.read_master_enable(), 0);
    assert!(!ic.is_pending());
    assert!(!ic.wake_pending());
}

#[test]
fn test_raise_latches_even_when_masked() {
    let mut ic = InterruptController::new();
    ic.raise(interrupts::TIMER2);
    assert_eq!(ic.read_flags(), interrupts::TIMER2);
    assert!(!ic.wake_pending());

    ic.write_enable(interrupts::TIMER2);
    assert!(ic.wake_pending());
    assert!(!ic.is_pending());

    ic.write_master_enable(1);
    assert!(ic.is_pending());
}

#[test]
fn test_unused_bits_ignored() {
    let mut ic = InterruptController::new();
    ic.raise(0xC000);
    ic.write_enable(0xFFFF);
    assert_eq!(ic.read_flags(), 0);
    assert_eq!(ic.read_enable(), interrupts::ALL);

    ic.write_master_enable(0xFFFE);
    assert_eq!(ic.read_master_enable(), 0);
}

#[test]
fn test_source_helpers() {
    assert_eq!(interrupts::timer(0), interrupts::TIMER0);
    assert_eq!(interrupts::timer(3), interrupts::TIMER3);
    assert_eq!(interrupts::dma(0), interrupts::DMA0);
    assert_eq!(interrupts::dma(3), interrupts::DMA3);
}

#[test]
fn test_registers_through_bus() {
    let mut bus = Bus::new();
    bus.store16(IE_ADDR, interrupts::VBLANK | interrupts::KEYPAD);
    bus.store16(IME_ADDR, 1);
    assert_eq!(bus.load_u16(IE_ADDR), interrupts::VBLANK | interrupts::KEYPAD);
    assert_eq!(bus.load_u16(IME_ADDR), 1);
    assert!(!bus.irq_pending());

    bus.raise_irq(interrupts::KEYPAD | interrupts::SERIAL);
    assert_eq!(bus.load_u16(IF_ADDR), interrupts::KEYPAD | interrupts::SERIAL);
    assert!(bus.irq_pending());
}

#[test]
fn test_if_write_one_to_clear() {
    let mut bus = Bus::new();
    bus.raise_irq(interrupts::VBLANK | interrupts::HBLANK | interrupts::DMA1);

    bus.store16(IF_ADDR, interrupts::HBLANK);
    assert_eq!(bus.load_u16(IF_ADDR), interrupts::VBLANK | interrupts::DMA1);

    // Writing zero clears nothing
    bus.store16(IF_ADDR, 0);
    assert_eq!(bus.load_u16(IF_ADDR), interrupts::VBLANK | interrupts::DMA1);
}

#[test]
fn test_word_write_covers_ie_and_if() {
    let mut bus = Bus::new();
    bus.raise_irq(interrupts::TIMER0);

    // IE = TIMER0 and acknowledge TIMER0 in one store
    bus.store32(IE_ADDR, (interrupts::TIMER0 as u32) << 16 | interrupts::TIMER0 as u32);

    assert_eq!(bus.interrupts().read_enable(), interrupts::TIMER0);
    assert_eq!(bus.interrupts().read_flags(), 0);
}

#[test]
fn test_ime_gates_delivery_to_cpu() {
    let (mut cpu, mut bus) = setup();
    // mov r0, r0 twice
    bus.store32(IWRAM, 0xE1A0_0000);
    bus.store32(IWRAM + 4, 0xE1A0_0000);

    bus.store16(IE_ADDR, interrupts::SERIAL);
    bus.raise_irq(interrupts::SERIAL);

    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), IWRAM + 4);

    bus.store16(IME_ADDR, 1);
    cpu.step(&mut bus).unwrap();
    assert_eq!(cpu.pc(), 0x18);
}
