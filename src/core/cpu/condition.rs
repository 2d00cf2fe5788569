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

//! Condition codes
//!
//! Every ARM instruction (and the Thumb conditional branch) carries a
//! 4-bit condition evaluated against the N/Z/C/V flags.

use super::psr::PsrFlags;

/// The 16 condition field encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    CS = 0x2,
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    AL = 0xE,
    /// Reserved encoding; never executes on ARMv4T
    NV = 0xF,
}

impl Condition {
    /// Decode the low 4 bits of `bits`
    pub fn from_bits(bits: u32) -> Self {
        use Condition::*;
        match bits & 0xF {
            0x0 => EQ,
            0x1 => NE,
            0x2 => CS,
            0x3 => CC,
            0x4 => MI,
            0x5 => PL,
            0x6 => VS,
            0x7 => VC,
            0x8 => HI,
            0x9 => LS,
            0xA => GE,
            0xB => LT,
            0xC => GT,
            0xD => LE,
            0xE => AL,
            _ => NV,
        }
    }

    /// Evaluate the condition against a set of flags
    #[inline]
    pub fn passes(self, flags: PsrFlags) -> bool {
        use Condition::*;
        let n = flags.contains(PsrFlags::N);
        let z = flags.contains(PsrFlags::Z);
        let c = flags.contains(PsrFlags::C);
        let v = flags.contains(PsrFlags::V);
        match self {
            EQ => z,
            NE => !z,
            CS => c,
            CC => !c,
            MI => n,
            PL => !n,
            VS => v,
            VC => !v,
            HI => c && !z,
            LS => !c || z,
            GE => n == v,
            LT => n != v,
            GT => !z && n == v,
            LE => z || n != v,
            AL => true,
            NV => false,
        }
    }
}
