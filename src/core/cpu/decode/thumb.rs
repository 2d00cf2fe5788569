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

//! 16-bit (Thumb) instruction decoder
//!
//! | Format | Pattern            | Group                          |
//! |--------|--------------------|--------------------------------|
//! | 1      | `000x x...`        | move shifted register          |
//! | 2      | `0001 1...`        | add/subtract                   |
//! | 3      | `001x x...`        | move/compare/add/sub immediate |
//! | 4      | `0100 00..`        | ALU operations                 |
//! | 5      | `0100 01..`        | hi register operations / BX    |
//! | 6      | `0100 1...`        | PC-relative load               |
//! | 7, 8   | `0101 ....`        | load/store register offset     |
//! | 9      | `011. ....`        | load/store immediate offset    |
//! | 10     | `1000 ....`        | load/store halfword            |
//! | 11     | `1001 ....`        | SP-relative load/store         |
//! | 12     | `1010 ....`        | load address                   |
//! | 13     | `1011 0000`        | add offset to SP               |
//! | 14     | `1011 x10x`        | push/pop                       |
//! | 15     | `1100 ....`        | multiple load/store            |
//! | 16, 17 | `1101 ....`        | conditional branch / SWI       |
//! | 18     | `1110 0...`        | unconditional branch           |
//! | 19     | `1111 ....`        | long branch with link          |

use super::{
    AluOp, Decoded, HalfwordKind, HalfwordOffset, Instruction, ShiftKind, ShifterOperand,
    TransferOffset,
};
use crate::core::cpu::condition::Condition;

#[inline(always)]
fn low_reg(opcode: u16, shift: u16) -> u8 {
    ((opcode >> shift) & 0x7) as u8
}

/// Decode one Thumb opcode
///
/// # Example
///
/// ```
/// use gbacore::core::cpu::decode::{decode_thumb, Instruction};
///
/// // SWI 6
/// let decoded = decode_thumb(0xDF06);
/// assert_eq!(decoded.instruction, Instruction::SoftwareInterrupt { comment: 6 });
/// assert!(!decoded.writes_pc);
/// ```
pub fn decode_thumb(opcode: u16) -> Decoded {
    let (condition, instruction) = decode_instruction(opcode);
    Decoded::new(condition, instruction)
}

fn always(instruction: Instruction) -> (Condition, Instruction) {
    (Condition::AL, instruction)
}

fn decode_instruction(i: u16) -> (Condition, Instruction) {
    match i >> 13 {
        0b000 => always(decode_shift_or_add(i)),
        0b001 => always(decode_immediate(i)),
        0b010 => always(decode_register_group(i)),
        0b011 => always(decode_immediate_transfer(i)),
        0b100 => always(decode_halfword_or_sp(i)),
        0b101 => always(decode_misc(i)),
        0b110 => decode_multiple_or_branch(i),
        _ => always(decode_branch(i)),
    }
}

/// Formats 1 and 2
fn decode_shift_or_add(i: u16) -> Instruction {
    let rd = low_reg(i, 0);
    let rs = low_reg(i, 3);

    if (i >> 11) & 0x3 == 0x3 {
        let value = (i >> 6) & 0x7;
        let operand = if i & 0x0400 != 0 {
            ShifterOperand::immediate(value as u32)
        } else {
            ShifterOperand::register(value as u8)
        };
        let op = if i & 0x0200 != 0 { AluOp::Sub } else { AluOp::Add };
        return Instruction::DataProcessing {
            op,
            set_flags: true,
            rd,
            rn: rs,
            operand,
        };
    }

    Instruction::DataProcessing {
        op: AluOp::Mov,
        set_flags: true,
        rd,
        rn: 0,
        operand: ShifterOperand::ShiftByImmediate {
            rm: rs,
            kind: ShiftKind::from_bits((i >> 11) as u32),
            amount: ((i >> 6) & 0x1F) as u8,
        },
    }
}

/// Format 3
fn decode_immediate(i: u16) -> Instruction {
    let rd = low_reg(i, 8);
    let op = match (i >> 11) & 0x3 {
        0 => AluOp::Mov,
        1 => AluOp::Cmp,
        2 => AluOp::Add,
        _ => AluOp::Sub,
    };
    Instruction::DataProcessing {
        op,
        set_flags: true,
        rd,
        rn: rd,
        operand: ShifterOperand::immediate((i & 0xFF) as u32),
    }
}

/// Formats 4 through 8
fn decode_register_group(i: u16) -> Instruction {
    if i & 0x1000 != 0 {
        return decode_register_transfer(i);
    }
    if i & 0x0800 != 0 {
        return Instruction::ThumbLoadLiteral {
            rd: low_reg(i, 8),
            offset: ((i & 0xFF) as u32) << 2,
        };
    }
    if i & 0x0400 != 0 {
        return decode_hi_register(i);
    }
    decode_alu(i)
}

/// Format 4
fn decode_alu(i: u16) -> Instruction {
    let rd = low_reg(i, 0);
    let rs = low_reg(i, 3);
    let data = |op: AluOp, rn: u8, operand: ShifterOperand| Instruction::DataProcessing {
        op,
        set_flags: true,
        rd,
        rn,
        operand,
    };
    let shift = |kind: ShiftKind| Instruction::DataProcessing {
        op: AluOp::Mov,
        set_flags: true,
        rd,
        rn: 0,
        operand: ShifterOperand::ShiftByRegister { rm: rd, kind, rs },
    };

    match (i >> 6) & 0xF {
        0x0 => data(AluOp::And, rd, ShifterOperand::register(rs)),
        0x1 => data(AluOp::Eor, rd, ShifterOperand::register(rs)),
        0x2 => shift(ShiftKind::Lsl),
        0x3 => shift(ShiftKind::Lsr),
        0x4 => shift(ShiftKind::Asr),
        0x5 => data(AluOp::Adc, rd, ShifterOperand::register(rs)),
        0x6 => data(AluOp::Sbc, rd, ShifterOperand::register(rs)),
        0x7 => shift(ShiftKind::Ror),
        0x8 => data(AluOp::Tst, rd, ShifterOperand::register(rs)),
        0x9 => data(AluOp::Rsb, rs, ShifterOperand::immediate(0)),
        0xA => data(AluOp::Cmp, rd, ShifterOperand::register(rs)),
        0xB => data(AluOp::Cmn, rd, ShifterOperand::register(rs)),
        0xC => data(AluOp::Orr, rd, ShifterOperand::register(rs)),
        0xD => Instruction::Multiply {
            accumulate: false,
            set_flags: true,
            rd,
            rn: 0,
            rs: rd,
            rm: rs,
        },
        0xE => data(AluOp::Bic, rd, ShifterOperand::register(rs)),
        _ => data(AluOp::Mvn, rd, ShifterOperand::register(rs)),
    }
}

/// Format 5
fn decode_hi_register(i: u16) -> Instruction {
    let rd = low_reg(i, 0) | (((i >> 7) & 1) << 3) as u8;
    let rs = ((i >> 3) & 0xF) as u8;
    let operand = ShifterOperand::register(rs);

    match (i >> 8) & 0x3 {
        0 => Instruction::DataProcessing {
            op: AluOp::Add,
            set_flags: false,
            rd,
            rn: rd,
            operand,
        },
        1 => Instruction::DataProcessing {
            op: AluOp::Cmp,
            set_flags: true,
            rd,
            rn: rd,
            operand,
        },
        2 => Instruction::DataProcessing {
            op: AluOp::Mov,
            set_flags: false,
            rd,
            rn: 0,
            operand,
        },
        _ => Instruction::BranchExchange { rm: rs },
    }
}

/// Formats 7 and 8
fn decode_register_transfer(i: u16) -> Instruction {
    let rd = low_reg(i, 0);
    let rn = low_reg(i, 3);
    let ro = low_reg(i, 6);

    if i & 0x0200 == 0 {
        // LDR/STR/LDRB/STRB with register offset
        return Instruction::SingleTransfer {
            load: i & 0x0800 != 0,
            byte: i & 0x0400 != 0,
            rd,
            rn,
            offset: TransferOffset::Register {
                rm: ro,
                kind: ShiftKind::Lsl,
                amount: 0,
            },
            pre_index: true,
            up: true,
            writeback: false,
        };
    }

    let kind = match (i >> 10) & 0x3 {
        0 => HalfwordKind::StoreHalf,
        1 => HalfwordKind::LoadSignedByte,
        2 => HalfwordKind::LoadHalf,
        _ => HalfwordKind::LoadSignedHalf,
    };
    Instruction::HalfwordTransfer {
        kind,
        rd,
        rn,
        offset: HalfwordOffset::Register(ro),
        pre_index: true,
        up: true,
        writeback: false,
    }
}

/// Format 9
fn decode_immediate_transfer(i: u16) -> Instruction {
    let byte = i & 0x1000 != 0;
    let imm = ((i >> 6) & 0x1F) as u32;
    Instruction::SingleTransfer {
        load: i & 0x0800 != 0,
        byte,
        rd: low_reg(i, 0),
        rn: low_reg(i, 3),
        offset: TransferOffset::Immediate(if byte { imm } else { imm << 2 }),
        pre_index: true,
        up: true,
        writeback: false,
    }
}

/// Formats 10 and 11
fn decode_halfword_or_sp(i: u16) -> Instruction {
    let load = i & 0x0800 != 0;

    if i & 0x1000 == 0 {
        return Instruction::HalfwordTransfer {
            kind: if load {
                HalfwordKind::LoadHalf
            } else {
                HalfwordKind::StoreHalf
            },
            rd: low_reg(i, 0),
            rn: low_reg(i, 3),
            offset: HalfwordOffset::Immediate((((i >> 6) & 0x1F) as u32) << 1),
            pre_index: true,
            up: true,
            writeback: false,
        };
    }

    Instruction::SingleTransfer {
        load,
        byte: false,
        rd: low_reg(i, 8),
        rn: 13,
        offset: TransferOffset::Immediate(((i & 0xFF) as u32) << 2),
        pre_index: true,
        up: true,
        writeback: false,
    }
}

/// Formats 12, 13 and 14
fn decode_misc(i: u16) -> Instruction {
    if i & 0x1000 == 0 {
        return Instruction::ThumbAddress {
            rd: low_reg(i, 8),
            sp: i & 0x0800 != 0,
            offset: ((i & 0xFF) as u32) << 2,
        };
    }

    match (i >> 8) & 0xF {
        0x0 => {
            let offset = ((i & 0x7F) as u32) << 2;
            Instruction::DataProcessing {
                op: if i & 0x80 != 0 { AluOp::Sub } else { AluOp::Add },
                set_flags: false,
                rd: 13,
                rn: 13,
                operand: ShifterOperand::immediate(offset),
            }
        }
        0x4 | 0x5 => Instruction::BlockTransfer {
            load: false,
            rn: 13,
            list: (i & 0xFF) | ((i & 0x0100) << 6),
            pre_index: true,
            up: false,
            writeback: true,
            user_bank: false,
        },
        0xC | 0xD => Instruction::BlockTransfer {
            load: true,
            rn: 13,
            list: (i & 0xFF) | ((i & 0x0100) << 7),
            pre_index: false,
            up: true,
            writeback: true,
            user_bank: false,
        },
        _ => Instruction::Undefined,
    }
}

/// Formats 15, 16 and 17
fn decode_multiple_or_branch(i: u16) -> (Condition, Instruction) {
    if i & 0x1000 == 0 {
        return always(Instruction::BlockTransfer {
            load: i & 0x0800 != 0,
            rn: low_reg(i, 8),
            list: i & 0xFF,
            pre_index: false,
            up: true,
            writeback: true,
            user_bank: false,
        });
    }

    match (i >> 8) & 0xF {
        0xF => always(Instruction::SoftwareInterrupt {
            comment: (i & 0xFF) as u32,
        }),
        0xE => always(Instruction::Undefined),
        cond => (
            Condition::from_bits(cond as u32),
            Instruction::Branch {
                offset: ((i & 0xFF) as i8 as i32) << 1,
                link: false,
            },
        ),
    }
}

/// Formats 18 and 19
fn decode_branch(i: u16) -> Instruction {
    let offset = (i & 0x07FF) as u32;
    match (i >> 11) & 0x3 {
        0b00 => Instruction::Branch {
            offset: (((offset << 21) as i32) >> 20),
            link: false,
        },
        0b10 => Instruction::ThumbLongBranchHigh {
            offset: ((offset << 21) as i32) >> 21,
        },
        0b11 => Instruction::ThumbLongBranchLow { offset },
        // BLX suffix is ARMv5
        _ => Instruction::Undefined,
    }
}
