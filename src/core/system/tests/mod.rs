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

//! System module tests
//!
//! - `basic`: construction, reset, cartridge and BIOS insertion
//! - `execution`: stepping, frame loop, halt, snapshots

mod execution;

use super::ROM_ENTRY;

/// `b 0x080000C0`, skipping the header
const ENTRY_BRANCH: u32 = 0xEA00_002E;

/// Offset of the first instruction after the header
pub(super) const CODE_START: u32 = 0xC0;

/// A minimal valid cartridge with `program` (ARM opcodes) after the header
pub(super) fn cartridge(title: &str, program: &[u32]) -> Vec<u8> {
    let mut rom = vec![0u8; CODE_START as usize + program.len() * 4];
    rom[..4].copy_from_slice(&ENTRY_BRANCH.to_le_bytes());
    rom[0xA0..0xA0 + title.len()].copy_from_slice(title.as_bytes());
    rom[0xAC..0xB0].copy_from_slice(b"ATST");
    rom[0xB0..0xB2].copy_from_slice(b"01");
    rom[0xB2] = 0x96;
    for (i, opcode) in program.iter().enumerate() {
        let at = CODE_START as usize + i * 4;
        rom[at..at + 4].copy_from_slice(&opcode.to_le_bytes());
    }
    rom
}

/// Address of program instruction `index`
pub(super) fn code_address(index: u32) -> u32 {
    ROM_ENTRY + CODE_START + index * 4
}
