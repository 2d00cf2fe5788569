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

//! Test fixtures for common test scenarios

use gbacore::core::cpu::CPU;
use gbacore::core::memory::Bus;
use gbacore::core::system::System;

/// Start of IWRAM
#[allow(dead_code)]
pub const IWRAM: u32 = 0x0300_0000;

/// Cartridge offset of the first instruction after the header
#[allow(dead_code)]
pub const CODE_START: usize = 0xC0;

/// Build a cartridge image whose entry branch jumps to `program`
#[allow(dead_code)]
pub fn cartridge(title: &str, program: &[u32]) -> Vec<u8> {
    let mut rom = vec![0u8; CODE_START + program.len() * 4];
    // b 0x080000C0
    rom[..4].copy_from_slice(&0xEA00_002Eu32.to_le_bytes());
    rom[0xA0..0xA0 + title.len()].copy_from_slice(title.as_bytes());
    rom[0xAC..0xB0].copy_from_slice(b"AINT");
    rom[0xB0..0xB2].copy_from_slice(b"01");
    rom[0xB2] = 0x96;
    for (i, word) in program.iter().enumerate() {
        let at = CODE_START + i * 4;
        rom[at..at + 4].copy_from_slice(&word.to_le_bytes());
    }
    rom
}

/// Reset system running `program` from the cartridge
#[allow(dead_code)]
pub fn system_with_program(program: &[u32]) -> System {
    let mut system = System::new();
    system
        .load_rom(cartridge("INTEGRATION", program))
        .expect("valid cartridge");
    system.reset();
    system
}

/// Load a test program into memory at specified address
#[allow(dead_code)]
pub fn load_test_program(bus: &mut Bus, start_addr: u32, program: &[u32]) {
    for (i, &instruction) in program.iter().enumerate() {
        bus.store32(start_addr + i as u32 * 4, instruction);
    }
}

/// CPU about to execute `program` from IWRAM
#[allow(dead_code)]
pub fn cpu_with_program(program: &[u32]) -> (CPU, Bus) {
    let mut bus = Bus::new();
    load_test_program(&mut bus, IWRAM, program);
    let mut cpu = CPU::new();
    cpu.reset(IWRAM);
    (cpu, bus)
}

/// Execute N CPU steps, failing on any error
#[allow(dead_code)]
pub fn execute_n_instructions(cpu: &mut CPU, bus: &mut Bus, n: usize) {
    for _ in 0..n {
        cpu.step(bus).expect("step failed");
    }
}
