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

//! Bus wait-state tables
//!
//! Every access costs `1 + table[address >> 24]` cycles, with six tables
//! for the combinations of access width (16/32-bit), sequential versus
//! non-sequential access, and opcode prefetch.
//!
//! The cartridge and SRAM entries are reprogrammed through WAITCNT
//! (0x04000204):
//!
//! | Bits  | Field                          |
//! |-------|--------------------------------|
//! | 0-1   | SRAM wait                      |
//! | 2-3   | WS0 first access               |
//! | 4     | WS0 second access              |
//! | 5-6   | WS1 first access               |
//! | 7     | WS1 second access              |
//! | 8-9   | WS2 first access               |
//! | 10    | WS2 second access              |
//! | 14    | Game Pak prefetch buffer       |

/// First-access wait for each 2-bit WAITCNT field value
const ROM_WS: [u32; 4] = [4, 3, 2, 8];

/// Second-access wait for each wait-state pair and 1-bit field value
const ROM_WS_SEQ: [[u32; 2]; 3] = [[2, 1], [4, 1], [8, 1]];

const REGION_CART0: usize = 0x8;
const REGION_SRAM: usize = 0xE;

const fn table(head: [u32; 16]) -> [u32; 256] {
    let mut out = [0u32; 256];
    let mut i = 0;
    while i < 16 {
        out[i] = head[i];
        i += 1;
    }
    out
}

const DEFAULT_NONSEQ16: [u32; 16] = [0, 0, 2, 0, 0, 0, 0, 0, 4, 4, 4, 4, 4, 4, 4, 0];
const DEFAULT_NONSEQ32: [u32; 16] = [0, 0, 5, 0, 0, 1, 1, 0, 7, 7, 9, 9, 13, 13, 8, 0];
const DEFAULT_SEQ16: [u32; 16] = [0, 0, 2, 0, 0, 0, 0, 0, 2, 2, 4, 4, 8, 8, 4, 0];
const DEFAULT_SEQ32: [u32; 16] = [0, 0, 5, 0, 0, 1, 1, 0, 5, 5, 9, 9, 17, 17, 8, 0];

/// The six wait-state tables indexed by address bits 31:24
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStates {
    pub nonseq16: [u32; 256],
    pub seq16: [u32; 256],
    pub nonseq32: [u32; 256],
    pub seq32: [u32; 256],
    pub prefetch16: [u32; 256],
    pub prefetch32: [u32; 256],
}

impl WaitStates {
    /// Power-on tables
    pub fn new() -> Self {
        Self {
            nonseq16: table(DEFAULT_NONSEQ16),
            seq16: table(DEFAULT_SEQ16),
            nonseq32: table(DEFAULT_NONSEQ32),
            seq32: table(DEFAULT_SEQ32),
            prefetch16: table(DEFAULT_SEQ16),
            prefetch32: table(DEFAULT_SEQ32),
        }
    }

    /// Apply a WAITCNT value
    ///
    /// # Example
    ///
    /// ```
    /// use gbacore::core::memory::WaitStates;
    ///
    /// let mut waits = WaitStates::new();
    /// // WS0 = 3/1 with prefetch enabled
    /// waits.adjust(0x4014);
    /// assert_eq!(waits.nonseq16[0x8], 3);
    /// assert_eq!(waits.seq16[0x8], 1);
    /// assert_eq!(waits.nonseq32[0x8], 5);
    /// assert_eq!(waits.prefetch16[0x8], 0);
    /// ```
    pub fn adjust(&mut self, waitcnt: u16) {
        let word = waitcnt as u32;
        let sram = ROM_WS[(word & 0x3) as usize];
        self.nonseq16[REGION_SRAM] = sram;
        self.seq16[REGION_SRAM] = sram;
        self.nonseq32[REGION_SRAM] = sram;
        self.seq32[REGION_SRAM] = sram;

        let prefetch = word & 0x4000 != 0;
        let fields = [
            ((word >> 2) & 0x3, (word >> 4) & 0x1),
            ((word >> 5) & 0x3, (word >> 7) & 0x1),
            ((word >> 8) & 0x3, (word >> 10) & 0x1),
        ];

        for (pair, &(first, second)) in fields.iter().enumerate() {
            let ws = ROM_WS[first as usize];
            let seq = ROM_WS_SEQ[pair][second as usize];
            let ws32 = ws + 1 + seq;
            let seq32 = 2 * seq + 1;

            for region in [REGION_CART0 + pair * 2, REGION_CART0 + pair * 2 + 1] {
                self.nonseq16[region] = ws;
                self.seq16[region] = seq;
                self.nonseq32[region] = ws32;
                self.seq32[region] = seq32;
                if prefetch {
                    self.prefetch16[region] = 0;
                    self.prefetch32[region] = 0;
                } else {
                    self.prefetch16[region] = seq;
                    self.prefetch32[region] = seq32;
                }
            }
        }

        log::debug!(
            "WAITCNT = 0x{:04X} (prefetch {})",
            waitcnt,
            if prefetch { "on" } else { "off" }
        );
    }
}

impl Default for WaitStates {
    fn default() -> Self {
        Self::new()
    }
}
