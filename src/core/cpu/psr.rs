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

//! Program status register and processor modes
//!
//! The CPSR layout used throughout the core:
//!
//! | Bits  | Meaning                          |
//! |-------|----------------------------------|
//! | 31    | N (negative)                     |
//! | 30    | Z (zero)                         |
//! | 29    | C (carry / not borrow)           |
//! | 28    | V (signed overflow)              |
//! | 7     | I (IRQ disabled)                 |
//! | 6     | F (FIQ disabled)                 |
//! | 5     | T (Thumb execution state)        |
//! | 4-0   | Mode                             |

use bitflags::bitflags;

bitflags! {
    /// Flag and control bits of a program status register (mode bits excluded)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PsrFlags: u32 {
        const N = 1 << 31;
        const Z = 1 << 30;
        const C = 1 << 29;
        const V = 1 << 28;
        const I = 1 << 7;
        const F = 1 << 6;
        const T = 1 << 5;
    }
}

impl PsrFlags {
    /// Condition flag bits (N, Z, C, V)
    pub const CONDITION: PsrFlags = PsrFlags::N
        .union(PsrFlags::Z)
        .union(PsrFlags::C)
        .union(PsrFlags::V);

    /// Control bits (I, F, T)
    pub const CONTROL: PsrFlags = PsrFlags::I.union(PsrFlags::F).union(PsrFlags::T);
}

/// Mask of the mode field in a PSR word
pub const MODE_MASK: u32 = 0x1F;

/// Processor operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Mode {
    User = 0x10,
    Fiq = 0x11,
    Irq = 0x12,
    Supervisor = 0x13,
    Abort = 0x17,
    Undefined = 0x1B,
    System = 0x1F,
}

impl Mode {
    /// Decode the mode field of a PSR word
    ///
    /// Returns `None` for the reserved encodings.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits & MODE_MASK {
            0x10 => Some(Mode::User),
            0x11 => Some(Mode::Fiq),
            0x12 => Some(Mode::Irq),
            0x13 => Some(Mode::Supervisor),
            0x17 => Some(Mode::Abort),
            0x1B => Some(Mode::Undefined),
            0x1F => Some(Mode::System),
            _ => None,
        }
    }

    /// Mode field encoding
    #[inline(always)]
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Shadow register bank used by this mode
    ///
    /// User and System share the unbanked registers.
    #[inline(always)]
    pub fn bank(self) -> BankIndex {
        match self {
            Mode::User | Mode::System => BankIndex::None,
            Mode::Fiq => BankIndex::Fiq,
            Mode::Irq => BankIndex::Irq,
            Mode::Supervisor => BankIndex::Supervisor,
            Mode::Abort => BankIndex::Abort,
            Mode::Undefined => BankIndex::Undefined,
        }
    }

    /// Whether this mode owns an SPSR
    #[inline(always)]
    pub fn has_spsr(self) -> bool {
        self.bank() != BankIndex::None
    }

    /// Whether this mode may write the control bits of the CPSR
    #[inline(always)]
    pub fn is_privileged(self) -> bool {
        self != Mode::User
    }
}

/// Index of a shadow register bank
///
/// `None` holds the User/System copies of the banked registers while a
/// privileged mode is resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BankIndex {
    None = 0,
    Fiq = 1,
    Irq = 2,
    Supervisor = 3,
    Abort = 4,
    Undefined = 5,
}

impl BankIndex {
    /// Number of banks
    pub const COUNT: usize = 6;

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bank holding R8-R12 for this bank (only FIQ shadows them)
    #[inline(always)]
    pub fn high_bank(self) -> BankIndex {
        if self == BankIndex::Fiq {
            BankIndex::Fiq
        } else {
            BankIndex::None
        }
    }
}

/// Instruction set currently being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecMode {
    Arm,
    Thumb,
}

impl ExecMode {
    /// Width in bytes of one instruction
    #[inline(always)]
    pub fn width(self) -> u32 {
        match self {
            ExecMode::Arm => 4,
            ExecMode::Thumb => 2,
        }
    }
}

/// Build a PSR word from a mode and flags
#[inline(always)]
pub fn pack_psr(mode: Mode, flags: PsrFlags) -> u32 {
    mode.bits() | flags.bits()
}
