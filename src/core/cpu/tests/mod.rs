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

//! CPU test modules
//!
//! Tests are organized into the following categories:
//! - `basic`: initialization, reset, register and PSR access, snapshots
//! - `banking`: mode switches and shadow register banks
//! - `alu`: data processing results and flags, condition table
//! - `memory_ops`: loads, stores, swaps and block transfers
//! - `thumb`: Thumb state entry and Thumb-only instructions
//! - `exceptions`: IRQ entry, SWI traps, undefined opcodes, halt
//! - `icache`: op cache identity, chaining and invalidation on stores
//! - `decode`: decoder output for representative encodings

mod banking;
mod basic;
mod decode;
mod exceptions;

use super::psr::ExecMode;
use super::CPU;
use crate::core::memory::Bus;

/// Start of IWRAM, where test programs are placed
pub(super) const BASE: u32 = 0x0300_0000;

/// Bus with `program` (ARM opcodes) at `BASE` and a CPU about to run it
pub(super) fn setup_arm(program: &[u32]) -> (CPU, Bus) {
    let mut bus = Bus::new();
    for (i, &opcode) in program.iter().enumerate() {
        bus.store32(BASE + i as u32 * 4, opcode);
    }
    let mut cpu = CPU::new();
    cpu.reset(BASE);
    (cpu, bus)
}

/// Bus with `program` (Thumb opcodes) at `BASE` and a CPU in Thumb state
pub(super) fn setup_thumb(program: &[u16]) -> (CPU, Bus) {
    let mut bus = Bus::new();
    for (i, &opcode) in program.iter().enumerate() {
        bus.store16(BASE + i as u32 * 2, opcode);
    }
    let mut cpu = CPU::new();
    cpu.reset(BASE);
    cpu.switch_exec_mode(ExecMode::Thumb);
    cpu.set_pc(BASE);
    (cpu, bus)
}

/// Execute `steps` instructions, failing the test on any error
pub(super) fn run(cpu: &mut CPU, bus: &mut Bus, steps: usize) {
    for _ in 0..steps {
        cpu.step(bus).unwrap();
    }
}
