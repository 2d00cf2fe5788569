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

//! Bus tests
//!
//! - `basic`: widths, endianness, rotation, mirroring and reset
//! - `regions`: per-region quirks (VRAM mirror, byte lanes, ROM, SRAM, open bus)
//! - `io_registers`: the I/O block's side-effecting registers
//! - `wait_states`: cycle accounting

use super::*;

mod wait_states;

const WRAM: u32 = 0x0200_0000;
const IWRAM: u32 = 0x0300_0000;
const IO: u32 = 0x0400_0000;
const ROM: u32 = 0x0800_0000;

/// A cartridge image whose bytes are their own offsets
fn counting_rom(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}
