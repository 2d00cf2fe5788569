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

//! Instruction decoding
//!
//! Both instruction sets decode into the same [`Instruction`] descriptor.
//! A descriptor is plain data: the executor in `cpu::instructions`
//! dispatches on it. Thumb encodings that have an exact ARM equivalent
//! reuse the ARM variant; the few that don't get `Thumb*` variants.
//!
//! Alongside the descriptor the decoder reports two static properties the
//! step loop needs before executing anything:
//!
//! - `writes_pc`: the instruction may load R15
//! - `fixed_jump`: the new PC is known at decode time, so the successor
//!   can be chained

mod arm;
mod thumb;

pub use arm::decode_arm;
pub use thumb::decode_thumb;

use super::condition::Condition;
use super::icache::OpRef;
use super::psr::ExecMode;

/// Barrel shifter operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Lsl,
    Lsr,
    Asr,
    Ror,
}

impl ShiftKind {
    #[inline(always)]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => ShiftKind::Lsl,
            1 => ShiftKind::Lsr,
            2 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }
}

/// Second operand of a data processing instruction (addressing mode 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShifterOperand {
    /// Rotated immediate; `carry` is the shifter carry-out when the rotation is non-zero
    Immediate { value: u32, carry: Option<bool> },
    /// Register shifted by a 5-bit constant
    ShiftByImmediate { rm: u8, kind: ShiftKind, amount: u8 },
    /// Register shifted by the bottom byte of another register
    ShiftByRegister { rm: u8, kind: ShiftKind, rs: u8 },
}

impl ShifterOperand {
    /// Plain register operand
    pub fn register(rm: u8) -> Self {
        ShifterOperand::ShiftByImmediate {
            rm,
            kind: ShiftKind::Lsl,
            amount: 0,
        }
    }

    /// Unrotated immediate operand
    pub fn immediate(value: u32) -> Self {
        ShifterOperand::Immediate { value, carry: None }
    }
}

/// Data processing opcodes in encoding order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    And,
    Eor,
    Sub,
    Rsb,
    Add,
    Adc,
    Sbc,
    Rsc,
    Tst,
    Teq,
    Cmp,
    Cmn,
    Orr,
    Mov,
    Bic,
    Mvn,
}

impl AluOp {
    pub fn from_bits(bits: u32) -> Self {
        use AluOp::*;
        match bits & 0xF {
            0x0 => And,
            0x1 => Eor,
            0x2 => Sub,
            0x3 => Rsb,
            0x4 => Add,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Rsc,
            0x8 => Tst,
            0x9 => Teq,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mov,
            0xE => Bic,
            _ => Mvn,
        }
    }

    /// Compare/test opcodes never write a destination register
    #[inline(always)]
    pub fn is_test(self) -> bool {
        matches!(self, AluOp::Tst | AluOp::Teq | AluOp::Cmp | AluOp::Cmn)
    }

    /// Opcodes whose carry comes from the shifter rather than the adder
    #[inline(always)]
    pub fn is_logical(self) -> bool {
        matches!(
            self,
            AluOp::And
                | AluOp::Eor
                | AluOp::Tst
                | AluOp::Teq
                | AluOp::Orr
                | AluOp::Mov
                | AluOp::Bic
                | AluOp::Mvn
        )
    }
}

/// Offset of a word/byte transfer (addressing mode 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOffset {
    Immediate(u32),
    /// Register shifted by a constant, carry-out discarded
    Register { rm: u8, kind: ShiftKind, amount: u8 },
}

/// Offset of a halfword/signed transfer (addressing mode 3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfwordOffset {
    Immediate(u32),
    Register(u8),
}

/// Halfword and signed data transfer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalfwordKind {
    StoreHalf,
    LoadHalf,
    LoadSignedByte,
    LoadSignedHalf,
}

/// Source operand of an MSR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsrSource {
    Immediate(u32),
    Register(u8),
}

/// Decoded instruction descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    DataProcessing {
        op: AluOp,
        set_flags: bool,
        rd: u8,
        rn: u8,
        operand: ShifterOperand,
    },
    Mrs {
        rd: u8,
        spsr: bool,
    },
    Msr {
        spsr: bool,
        /// Byte mask built from the c/x/s/f field bits
        field_mask: u32,
        source: MsrSource,
    },
    Multiply {
        accumulate: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rs: u8,
        rm: u8,
    },
    MultiplyLong {
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: u8,
        rd_lo: u8,
        rs: u8,
        rm: u8,
    },
    Swap {
        byte: bool,
        rd: u8,
        rn: u8,
        rm: u8,
    },
    SingleTransfer {
        load: bool,
        byte: bool,
        rd: u8,
        rn: u8,
        offset: TransferOffset,
        pre_index: bool,
        up: bool,
        writeback: bool,
    },
    HalfwordTransfer {
        kind: HalfwordKind,
        rd: u8,
        rn: u8,
        offset: HalfwordOffset,
        pre_index: bool,
        up: bool,
        writeback: bool,
    },
    BlockTransfer {
        load: bool,
        rn: u8,
        list: u16,
        pre_index: bool,
        up: bool,
        writeback: bool,
        /// S bit: user bank transfer, or CPSR restore when R15 is loaded
        user_bank: bool,
    },
    Branch {
        offset: i32,
        link: bool,
    },
    BranchExchange {
        rm: u8,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    /// Undefined or coprocessor encoding; faults when executed
    Undefined,
    /// `LDR Rd, [PC, #imm]` with the PC word-aligned
    ThumbLoadLiteral {
        rd: u8,
        offset: u32,
    },
    /// `ADD Rd, PC/SP, #imm` (no flags, PC word-aligned)
    ThumbAddress {
        rd: u8,
        sp: bool,
        offset: u32,
    },
    /// First half of BL: `LR = PC + (offset << 12)`
    ThumbLongBranchHigh {
        offset: i32,
    },
    /// Second half of BL: `PC = LR + (offset << 1)`, `LR = return | 1`
    ThumbLongBranchLow {
        offset: u32,
    },
}

/// Output of the decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub condition: Condition,
    pub instruction: Instruction,
    pub writes_pc: bool,
    pub fixed_jump: bool,
}

impl Decoded {
    pub(super) fn new(condition: Condition, instruction: Instruction) -> Self {
        let writes_pc = instruction_writes_pc(&instruction);
        let fixed_jump = matches!(instruction, Instruction::Branch { .. });
        Self {
            condition,
            instruction,
            writes_pc,
            fixed_jump,
        }
    }
}

/// Whether executing `instruction` may change R15 other than by stepping
fn instruction_writes_pc(instruction: &Instruction) -> bool {
    use Instruction::*;
    match *instruction {
        DataProcessing { op, rd, .. } => rd == 15 && !op.is_test(),
        Mrs { rd, .. } => rd == 15,
        Swap { rd, .. } => rd == 15,
        SingleTransfer { load, rd, .. } => load && rd == 15,
        HalfwordTransfer { kind, rd, .. } => kind != HalfwordKind::StoreHalf && rd == 15,
        BlockTransfer { load, list, .. } => load && (list & 0x8000 != 0 || list == 0),
        Branch { .. } | BranchExchange { .. } | ThumbLongBranchLow { .. } | Undefined => true,
        ThumbLoadLiteral { rd, .. } => rd == 15,
        Msr { .. }
        | Multiply { .. }
        | MultiplyLong { .. }
        | SoftwareInterrupt { .. }
        | ThumbAddress { .. }
        | ThumbLongBranchHigh { .. } => false,
    }
}

/// A decoded instruction stored in the instruction cache ("micro-op")
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledOp {
    /// Address the opcode was fetched from
    pub address: u32,
    /// Raw opcode (Thumb opcodes in the low halfword)
    pub opcode: u32,
    pub condition: Condition,
    pub instruction: Instruction,
    pub writes_pc: bool,
    pub fixed_jump: bool,
    pub exec_mode: ExecMode,
    /// Cached successor for the threaded dispatch chain
    pub next: Option<OpRef>,
    /// Unique id assigned when the op enters the cache (0 = uncached)
    pub serial: u64,
}

impl CompiledOp {
    /// Decode `opcode` fetched from `address` in the given execution state
    pub fn compile(address: u32, opcode: u32, exec_mode: ExecMode) -> Self {
        let decoded = match exec_mode {
            ExecMode::Arm => decode_arm(opcode),
            ExecMode::Thumb => decode_thumb(opcode as u16),
        };
        Self {
            address,
            opcode,
            condition: decoded.condition,
            instruction: decoded.instruction,
            writes_pc: decoded.writes_pc,
            fixed_jump: decoded.fixed_jump,
            exec_mode,
            next: None,
            serial: 0,
        }
    }
}
