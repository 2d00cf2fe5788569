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

//! 32-bit (ARM) instruction decoder
//!
//! Groups are matched from the most to the least specific bit pattern, so
//! the multiply/swap/halfword encodings are carved out of the data
//! processing space before it is matched.

use super::{
    AluOp, Decoded, HalfwordKind, HalfwordOffset, Instruction, MsrSource, ShiftKind,
    ShifterOperand, TransferOffset,
};
use crate::core::cpu::condition::Condition;

#[inline(always)]
fn reg(opcode: u32, shift: u32) -> u8 {
    ((opcode >> shift) & 0xF) as u8
}

#[inline(always)]
fn bit(opcode: u32, n: u32) -> bool {
    opcode & (1 << n) != 0
}

/// Decode one ARM opcode
///
/// Never fails: encodings this core does not implement become
/// [`Instruction::Undefined`], which faults only if executed.
///
/// # Example
///
/// ```
/// use gbacore::core::cpu::decode::{decode_arm, Instruction};
///
/// // B +0
/// let decoded = decode_arm(0xEAFFFFFE);
/// assert!(decoded.writes_pc);
/// assert!(decoded.fixed_jump);
/// assert_eq!(decoded.instruction, Instruction::Branch { offset: -8, link: false });
/// ```
pub fn decode_arm(opcode: u32) -> Decoded {
    let condition = Condition::from_bits(opcode >> 28);
    Decoded::new(condition, decode_instruction(opcode))
}

fn decode_instruction(i: u32) -> Instruction {
    if i & 0x0FFF_FFF0 == 0x012F_FF10 {
        return Instruction::BranchExchange { rm: reg(i, 0) };
    }

    match (i >> 25) & 0x7 {
        0b000 | 0b001 => decode_data_space(i),
        0b010 | 0b011 => decode_single_transfer(i),
        0b100 => Instruction::BlockTransfer {
            load: bit(i, 20),
            rn: reg(i, 16),
            list: (i & 0xFFFF) as u16,
            pre_index: bit(i, 24),
            up: bit(i, 23),
            writeback: bit(i, 21),
            user_bank: bit(i, 22),
        },
        0b101 => Instruction::Branch {
            offset: ((i & 0x00FF_FFFF) << 8) as i32 >> 6,
            link: bit(i, 24),
        },
        0b110 => Instruction::Undefined,
        _ => {
            if bit(i, 24) {
                Instruction::SoftwareInterrupt {
                    comment: (i >> 16) & 0xFF,
                }
            } else {
                // Coprocessor data operations and register transfers
                Instruction::Undefined
            }
        }
    }
}

/// Data processing, PSR transfer, multiply, swap and halfword transfers
fn decode_data_space(i: u32) -> Instruction {
    let immediate = bit(i, 25);

    if !immediate && i & 0x90 == 0x90 {
        return decode_extension_space(i);
    }

    if i & 0x0FBF_0FFF == 0x010F_0000 {
        return Instruction::Mrs {
            rd: reg(i, 12),
            spsr: bit(i, 22),
        };
    }

    if i & 0x0DB0_F000 == 0x0120_F000 {
        let mut field_mask = 0;
        for n in 0..4 {
            if bit(i, 16 + n) {
                field_mask |= 0xFF << (8 * n);
            }
        }
        let source = if immediate {
            let (value, _) = rotated_immediate(i);
            MsrSource::Immediate(value)
        } else {
            MsrSource::Register(reg(i, 0))
        };
        return Instruction::Msr {
            spsr: bit(i, 22),
            field_mask,
            source,
        };
    }

    let op = AluOp::from_bits(i >> 21);
    let set_flags = bit(i, 20);
    if op.is_test() && !set_flags {
        // Remaining PSR-transfer space without a defined meaning
        return Instruction::Undefined;
    }

    let operand = if immediate {
        let (value, carry) = rotated_immediate(i);
        ShifterOperand::Immediate { value, carry }
    } else if bit(i, 4) {
        ShifterOperand::ShiftByRegister {
            rm: reg(i, 0),
            kind: ShiftKind::from_bits(i >> 5),
            rs: reg(i, 8),
        }
    } else {
        ShifterOperand::ShiftByImmediate {
            rm: reg(i, 0),
            kind: ShiftKind::from_bits(i >> 5),
            amount: ((i >> 7) & 0x1F) as u8,
        }
    };

    Instruction::DataProcessing {
        op,
        set_flags,
        rd: reg(i, 12),
        rn: reg(i, 16),
        operand,
    }
}

/// Rotated 8-bit immediate with its shifter carry-out
fn rotated_immediate(i: u32) -> (u32, Option<bool>) {
    let rotate = ((i >> 8) & 0xF) * 2;
    let value = (i & 0xFF).rotate_right(rotate);
    let carry = if rotate != 0 {
        Some(value >> 31 != 0)
    } else {
        None
    };
    (value, carry)
}

/// Multiplies, swaps and halfword transfers (bits 7 and 4 set)
fn decode_extension_space(i: u32) -> Instruction {
    let sh = (i >> 5) & 0x3;

    if sh == 0 {
        if i & 0x0FC0_00F0 == 0x0000_0090 {
            return Instruction::Multiply {
                accumulate: bit(i, 21),
                set_flags: bit(i, 20),
                rd: reg(i, 16),
                rn: reg(i, 12),
                rs: reg(i, 8),
                rm: reg(i, 0),
            };
        }
        if i & 0x0F80_00F0 == 0x0080_0090 {
            return Instruction::MultiplyLong {
                signed: bit(i, 22),
                accumulate: bit(i, 21),
                set_flags: bit(i, 20),
                rd_hi: reg(i, 16),
                rd_lo: reg(i, 12),
                rs: reg(i, 8),
                rm: reg(i, 0),
            };
        }
        if i & 0x0FB0_0FF0 == 0x0100_0090 {
            return Instruction::Swap {
                byte: bit(i, 22),
                rd: reg(i, 12),
                rn: reg(i, 16),
                rm: reg(i, 0),
            };
        }
        return Instruction::Undefined;
    }

    let load = bit(i, 20);
    let kind = match (sh, load) {
        (1, false) => HalfwordKind::StoreHalf,
        (1, true) => HalfwordKind::LoadHalf,
        (2, true) => HalfwordKind::LoadSignedByte,
        (3, true) => HalfwordKind::LoadSignedHalf,
        // LDRD/STRD do not exist on ARMv4T
        _ => return Instruction::Undefined,
    };

    let offset = if bit(i, 22) {
        HalfwordOffset::Immediate(((i >> 4) & 0xF0) | (i & 0xF))
    } else {
        HalfwordOffset::Register(reg(i, 0))
    };

    let pre_index = bit(i, 24);
    Instruction::HalfwordTransfer {
        kind,
        rd: reg(i, 12),
        rn: reg(i, 16),
        offset,
        pre_index,
        up: bit(i, 23),
        // Post-indexed transfers always write back
        writeback: bit(i, 21) || !pre_index,
    }
}

/// LDR/STR/LDRB/STRB
fn decode_single_transfer(i: u32) -> Instruction {
    let register_offset = bit(i, 25);
    if register_offset && bit(i, 4) {
        return Instruction::Undefined;
    }

    let offset = if register_offset {
        TransferOffset::Register {
            rm: reg(i, 0),
            kind: ShiftKind::from_bits(i >> 5),
            amount: ((i >> 7) & 0x1F) as u8,
        }
    } else {
        TransferOffset::Immediate(i & 0xFFF)
    };

    let pre_index = bit(i, 24);
    Instruction::SingleTransfer {
        load: bit(i, 20),
        byte: bit(i, 22),
        rd: reg(i, 12),
        rn: reg(i, 16),
        offset,
        pre_index,
        up: bit(i, 23),
        writeback: bit(i, 21) || !pre_index,
    }
}
