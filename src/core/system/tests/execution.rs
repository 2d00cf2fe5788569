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

//! Execution, frame loop and snapshot tests

use super::super::*;
use super::{cartridge, code_address};
use crate::core::video::{HORIZONTAL_LENGTH, VERTICAL_PIXELS};

/// `b .`
const SPIN: u32 = 0xEAFF_FFFE;

fn running(program: &[u32]) -> System {
    let mut system = System::new();
    system.load_rom(cartridge("EXEC", program)).unwrap();
    system.reset();
    system
}

#[test]
fn test_step_follows_entry_branch() {
    // mov r0, #42
    let mut system = running(&[0xE3A0_002A, SPIN]);

    system.step().unwrap();
    assert_eq!(system.pc(), code_address(0));

    system.step().unwrap();
    assert_eq!(system.cpu().reg(0), 42);
    assert_eq!(system.pc(), code_address(1));
    assert!(system.cycles() > 0);
}

#[test]
fn test_step_n() {
    // mov r0, #1; add r0, r0, #1 x3
    let mut system = running(&[0xE3A0_0001, 0xE280_0001, 0xE280_0001, 0xE280_0001, SPIN]);
    system.step_n(5).unwrap();
    assert_eq!(system.cpu().reg(0), 4);
}

#[test]
fn test_run_frame_stops_at_vblank() {
    let mut system = running(&[SPIN]);

    system.run_frame().unwrap();

    assert_eq!(system.frame_count(), 1);
    assert!(system.bus().video().in_vblank());
    assert!(system.cycles() >= (VERTICAL_PIXELS as u64 + 1) * HORIZONTAL_LENGTH);

    system.run_frame().unwrap();
    assert_eq!(system.frame_count(), 2);
}

#[test]
fn test_run_until_halt() {
    // mov r0, #1; swi 0x02 (Halt)
    let mut system = running(&[0xE3A0_0001, 0xEF02_0000, SPIN]);

    let steps = system.run_until_halt(100).unwrap();

    assert_eq!(steps, 3);
    assert!(system.cpu().is_halted());
}

#[test]
fn test_run_until_halt_gives_up() {
    let mut system = running(&[SPIN]);
    let steps = system.run_until_halt(10).unwrap();
    assert_eq!(steps, 10);
    assert!(!system.cpu().is_halted());
}

#[test]
fn test_halt_without_enabled_irq_deadlocks() {
    let mut system = running(&[0xEF02_0000, SPIN]);
    system.run_until_halt(10).unwrap();

    let result = system.step();
    assert!(matches!(result, Err(EmulatorError::HaltDeadlock { .. })));
}

#[test]
fn test_illegal_instruction_stops_run() {
    let mut system = running(&[0xEC00_0000]);
    system.step().unwrap();
    let result = system.run_frame();
    assert!(matches!(
        result,
        Err(EmulatorError::IllegalInstruction { address, .. }) if address == code_address(0)
    ));
}

#[test]
fn test_reset_discards_progress() {
    let mut system = running(&[0xE3A0_002A, SPIN]);
    system.step_n(10).unwrap();

    system.reset();

    assert_eq!(system.cycles(), 0);
    assert_eq!(system.pc(), ROM_ENTRY);
    assert_eq!(system.cpu().reg(0), 0);
    assert!(system.bus().icache.is_empty());
}

#[test]
fn test_save_and_load_state() {
    // add r0, r0, #1; b -1 instruction
    let mut system = running(&[0xE280_0001, 0xEAFF_FFFD]);
    system.step_n(20).unwrap();

    let state = system.save_state();
    assert_eq!(state.metadata.title, "EXEC");
    let r0 = system.cpu().reg(0);
    let pc = system.pc();
    let cycles = system.cycles();

    system.step_n(20).unwrap();
    assert_ne!(system.cpu().reg(0), r0);

    system.load_state(&state).unwrap();
    assert_eq!(system.cpu().reg(0), r0);
    assert_eq!(system.pc(), pc);
    assert_eq!(system.cycles(), cycles);

    // Execution resumes identically
    system.step_n(20).unwrap();
    let mut replay = running(&[0xE280_0001, 0xEAFF_FFFD]);
    replay.step_n(40).unwrap();
    assert_eq!(system.cpu().reg(0), replay.cpu().reg(0));
    assert_eq!(system.cycles(), replay.cycles());
}
