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

//! CPU instruction implementations
//!
//! Executes decoded [`Instruction`] descriptors, organized by instruction
//! group. Every handler charges its own cycles: the opcode prefetch for
//! ALU-style instructions, the data access plus an internal cycle for
//! loads, and the data access plus a code fetch for stores.
//!
//! Handlers read R15 as the executing instruction's address plus two
//! instruction widths; the step loop has already advanced it.

use super::decode::{CompiledOp, Instruction};
use super::psr::{ExecMode, PsrFlags};
use super::registers::PC;
use super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

// Instruction modules organized by group
mod alu;
mod block;
mod branch;
mod exception;
mod load;
mod multiply;
mod store;

impl CPU {
    /// Execute one compiled op
    ///
    /// A failed condition only charges the prefetch and marks the
    /// instruction as not taken, so a conditional branch falls through.
    pub(super) fn execute(&mut self, op: &CompiledOp, bus: &mut Bus) -> Result<()> {
        if !op.condition.passes(self.flags) {
            self.condition_passed = false;
            self.charge_prefetch(bus);
            return Ok(());
        }

        match op.instruction {
            Instruction::DataProcessing {
                op: alu_op,
                set_flags,
                rd,
                rn,
                operand,
            } => self.op_data_processing(bus, alu_op, set_flags, rd, rn, operand),
            Instruction::Mrs { rd, spsr } => self.op_mrs(bus, rd, spsr),
            Instruction::Msr {
                spsr,
                field_mask,
                source,
            } => self.op_msr(bus, spsr, field_mask, source),
            Instruction::Multiply {
                accumulate,
                set_flags,
                rd,
                rn,
                rs,
                rm,
            } => self.op_multiply(bus, accumulate, set_flags, rd, rn, rs, rm),
            Instruction::MultiplyLong {
                signed,
                accumulate,
                set_flags,
                rd_hi,
                rd_lo,
                rs,
                rm,
            } => self.op_multiply_long(bus, signed, accumulate, set_flags, rd_hi, rd_lo, rs, rm),
            Instruction::Swap { byte, rd, rn, rm } => self.op_swap(bus, byte, rd, rn, rm),
            Instruction::SingleTransfer {
                load: true,
                byte,
                rd,
                rn,
                offset,
                pre_index,
                up,
                writeback,
            } => self.op_ldr(bus, byte, rd, rn, offset, pre_index, up, writeback),
            Instruction::SingleTransfer {
                load: false,
                byte,
                rd,
                rn,
                offset,
                pre_index,
                up,
                writeback,
            } => self.op_str(bus, byte, rd, rn, offset, pre_index, up, writeback),
            Instruction::HalfwordTransfer {
                kind,
                rd,
                rn,
                offset,
                pre_index,
                up,
                writeback,
            } => self.op_halfword(bus, kind, rd, rn, offset, pre_index, up, writeback),
            Instruction::BlockTransfer {
                load: true,
                rn,
                list,
                pre_index,
                up,
                writeback,
                user_bank,
            } => self.op_ldm(bus, rn, list, pre_index, up, writeback, user_bank),
            Instruction::BlockTransfer {
                load: false,
                rn,
                list,
                pre_index,
                up,
                writeback,
                user_bank,
            } => self.op_stm(bus, rn, list, pre_index, up, writeback, user_bank),
            Instruction::Branch { offset, link } => self.op_branch(bus, offset, link),
            Instruction::BranchExchange { rm } => self.op_bx(bus, rm),
            Instruction::SoftwareInterrupt { comment } => self.op_swi(bus, comment),
            Instruction::Undefined => self.op_undefined(op),
            Instruction::ThumbLoadLiteral { rd, offset } => self.op_load_literal(bus, rd, offset),
            Instruction::ThumbAddress { rd, sp, offset } => self.op_address(bus, rd, sp, offset),
            Instruction::ThumbLongBranchHigh { offset } => self.op_long_branch_high(bus, offset),
            Instruction::ThumbLongBranchLow { offset } => self.op_long_branch_low(bus, offset),
        }
    }

    /// Charge the fetch of the following opcode
    #[inline(always)]
    pub(super) fn charge_prefetch(&self, bus: &mut Bus) {
        let pc = self.regs.gprs[PC];
        match self.exec_mode {
            ExecMode::Arm => bus.wait_prefetch32(pc),
            ExecMode::Thumb => bus.wait_prefetch(pc),
        }
    }

    /// Charge a non-sequential opcode fetch (after a store's data cycle)
    #[inline(always)]
    pub(super) fn charge_fetch(&self, bus: &mut Bus) {
        let pc = self.regs.gprs[PC];
        match self.exec_mode {
            ExecMode::Arm => bus.wait32(pc),
            ExecMode::Thumb => bus.wait(pc),
        }
    }

    #[inline(always)]
    pub(super) fn r(&self, index: u8) -> u32 {
        self.regs.gprs[index as usize]
    }

    #[inline(always)]
    pub(super) fn set_r(&mut self, index: u8, value: u32) {
        self.regs.gprs[index as usize] = value;
    }

    #[inline(always)]
    pub(super) fn carry(&self) -> bool {
        self.flags.contains(PsrFlags::C)
    }

    /// Set N and Z from a 32-bit result
    #[inline(always)]
    pub(super) fn set_nz(&mut self, value: u32) {
        self.flags.set(PsrFlags::N, value >> 31 != 0);
        self.flags.set(PsrFlags::Z, value == 0);
    }
}
