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

//! Banked register file
//!
//! The visible registers R0-R15 always hold the values of the resident
//! mode. Every other bank lives in fixed-size shadow arrays:
//!
//! - `None` and `Fiq` shadow R8-R14 (7 slots: SP, LR, R8..R12)
//! - `Irq`, `Supervisor`, `Abort`, `Undefined` shadow R13-R14
//!
//! The only way banks move between shadow storage and the visible set is
//! [`RegisterFile::exchange_bank`].

use serde::{Deserialize, Serialize};

use super::psr::BankIndex;

/// Stack pointer register index
pub const SP: usize = 13;
/// Link register index
pub const LR: usize = 14;
/// Program counter register index
pub const PC: usize = 15;

/// Slot of SP inside a shadow bank
const SLOT_SP: usize = 0;
/// Slot of LR inside a shadow bank
const SLOT_LR: usize = 1;
/// First slot of R8..R12 inside the `None`/`Fiq` shadow banks
const SLOT_HIGH: usize = 2;

/// General purpose registers plus shadow banks and saved PSRs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    /// Visible registers (R15 holds fetch address + instruction width)
    pub gprs: [u32; 16],

    /// Shadow banks indexed by [`BankIndex`]
    pub banked: [[u32; 7]; BankIndex::COUNT],

    /// Saved PSR for each bank (entry 0 is unused)
    pub spsr: [u32; BankIndex::COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            gprs: [0; 16],
            banked: [[0; 7]; BankIndex::COUNT],
            spsr: [0; BankIndex::COUNT],
        }
    }

    /// Swap the resident bank `old` out and `new` in
    ///
    /// Precondition: the visible registers hold the values of `old`.
    /// Postcondition: the visible registers hold the values of `new`, the
    /// previous values of `old` are in `old`'s shadow slots, and no value
    /// exists in two places. R8-R12 move only when exactly one side is FIQ.
    pub fn exchange_bank(&mut self, old: BankIndex, new: BankIndex) {
        if old == new {
            return;
        }

        let old_high = old.high_bank().index();
        let new_high = new.high_bank().index();
        if old_high != new_high {
            for i in 0..5 {
                self.banked[old_high][SLOT_HIGH + i] = self.gprs[8 + i];
                self.gprs[8 + i] = self.banked[new_high][SLOT_HIGH + i];
            }
        }

        let (old, new) = (old.index(), new.index());
        self.banked[old][SLOT_SP] = self.gprs[SP];
        self.banked[old][SLOT_LR] = self.gprs[LR];
        self.gprs[SP] = self.banked[new][SLOT_SP];
        self.gprs[LR] = self.banked[new][SLOT_LR];
    }

    /// Read a register as seen by the User bank regardless of the resident bank
    ///
    /// Used by block transfers with the S bit set.
    pub fn user_reg(&self, resident: BankIndex, reg: usize) -> u32 {
        match reg {
            8..=12 if resident == BankIndex::Fiq => self.banked[BankIndex::None.index()][SLOT_HIGH + reg - 8],
            SP if resident != BankIndex::None => self.banked[BankIndex::None.index()][SLOT_SP],
            LR if resident != BankIndex::None => self.banked[BankIndex::None.index()][SLOT_LR],
            _ => self.gprs[reg],
        }
    }

    /// Write a register of the User bank regardless of the resident bank
    pub fn set_user_reg(&mut self, resident: BankIndex, reg: usize, value: u32) {
        match reg {
            8..=12 if resident == BankIndex::Fiq => {
                self.banked[BankIndex::None.index()][SLOT_HIGH + reg - 8] = value
            }
            SP if resident != BankIndex::None => self.banked[BankIndex::None.index()][SLOT_SP] = value,
            LR if resident != BankIndex::None => self.banked[BankIndex::None.index()][SLOT_LR] = value,
            _ => self.gprs[reg] = value,
        }
    }

    /// Read the shadowed SP of a bank that is not resident
    pub fn banked_sp(&self, bank: BankIndex) -> u32 {
        self.banked[bank.index()][SLOT_SP]
    }

    /// Set the shadowed SP of a bank that is not resident
    pub fn set_banked_sp(&mut self, bank: BankIndex, value: u32) {
        self.banked[bank.index()][SLOT_SP] = value;
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
