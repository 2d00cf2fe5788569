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

//! Barrel shifter
//!
//! Every function returns the shifted value together with the shifter
//! carry-out. `carry_in` is the current C flag, returned unchanged when the
//! operation does not shift.

use super::decode::ShiftKind;

/// Shift by a 5-bit constant from the instruction word
///
/// Amount 0 has special meanings: `LSL #0` is no shift, `LSR #0` and
/// `ASR #0` encode a shift of 32, and `ROR #0` encodes RRX.
#[inline]
pub fn shift_by_immediate(kind: ShiftKind, value: u32, amount: u8, carry_in: bool) -> (u32, bool) {
    let amount = (amount & 0x1F) as u32;
    match kind {
        ShiftKind::Lsl => {
            if amount == 0 {
                (value, carry_in)
            } else {
                (value << amount, (value >> (32 - amount)) & 1 != 0)
            }
        }
        ShiftKind::Lsr => {
            if amount == 0 {
                (0, value >> 31 != 0)
            } else {
                (value >> amount, (value >> (amount - 1)) & 1 != 0)
            }
        }
        ShiftKind::Asr => {
            if amount == 0 {
                let carry = value >> 31 != 0;
                (if carry { 0xFFFF_FFFF } else { 0 }, carry)
            } else {
                (
                    ((value as i32) >> amount) as u32,
                    (value >> (amount - 1)) & 1 != 0,
                )
            }
        }
        ShiftKind::Ror => {
            if amount == 0 {
                (((carry_in as u32) << 31) | (value >> 1), value & 1 != 0)
            } else {
                (value.rotate_right(amount), (value >> (amount - 1)) & 1 != 0)
            }
        }
    }
}

/// Shift by the bottom byte of a register
///
/// An amount of 0 leaves both value and carry untouched; amounts of 32 and
/// above saturate as the hardware does.
#[inline]
pub fn shift_by_register(kind: ShiftKind, value: u32, amount: u32, carry_in: bool) -> (u32, bool) {
    let amount = amount & 0xFF;
    if amount == 0 {
        return (value, carry_in);
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (value << amount, (value >> (32 - amount)) & 1 != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (value >> amount, (value >> (amount - 1)) & 1 != 0),
            32 => (0, value >> 31 != 0),
            _ => (0, false),
        },
        ShiftKind::Asr => {
            if amount < 32 {
                (
                    ((value as i32) >> amount) as u32,
                    (value >> (amount - 1)) & 1 != 0,
                )
            } else {
                let carry = value >> 31 != 0;
                (if carry { 0xFFFF_FFFF } else { 0 }, carry)
            }
        }
        ShiftKind::Ror => {
            let rotate = amount & 0x1F;
            if rotate == 0 {
                (value, value >> 31 != 0)
            } else {
                (value.rotate_right(rotate), (value >> (rotate - 1)) & 1 != 0)
            }
        }
    }
}
