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

//! Load instructions

use super::super::decode::{HalfwordKind, HalfwordOffset, TransferOffset};
use super::super::shifter::shift_by_immediate;
use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    /// Effective address and written-back base of a word/byte transfer
    pub(super) fn transfer_address(
        &self,
        rn: u8,
        offset: TransferOffset,
        pre_index: bool,
        up: bool,
    ) -> (u32, u32) {
        let offset = match offset {
            TransferOffset::Immediate(value) => value,
            TransferOffset::Register { rm, kind, amount } => {
                shift_by_immediate(kind, self.r(rm), amount, self.carry()).0
            }
        };
        index_address(self.r(rn), offset, pre_index, up)
    }

    /// Effective address and written-back base of a halfword transfer
    pub(super) fn halfword_address(
        &self,
        rn: u8,
        offset: HalfwordOffset,
        pre_index: bool,
        up: bool,
    ) -> (u32, u32) {
        let offset = match offset {
            HalfwordOffset::Immediate(value) => value,
            HalfwordOffset::Register(rm) => self.r(rm),
        };
        index_address(self.r(rn), offset, pre_index, up)
    }

    /// Post-indexed forms always write back; R15 is never written back
    #[inline(always)]
    pub(super) fn write_back(&mut self, rn: u8, base: u32, pre_index: bool, writeback: bool) {
        if (writeback || !pre_index) && rn != 15 {
            self.set_r(rn, base);
        }
    }

    /// LDR/LDRB: Load word or unsigned byte
    ///
    /// Format: ldr{b} rd, [rn, offset]{!} / ldr{b} rd, [rn], offset
    ///
    /// A misaligned word load returns the aligned word rotated right by
    /// the misalignment. The base is written back before the load, so a
    /// load into the base register keeps the loaded value.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_ldr(
        &mut self,
        bus: &mut Bus,
        byte: bool,
        rd: u8,
        rn: u8,
        offset: TransferOffset,
        pre_index: bool,
        up: bool,
        writeback: bool,
    ) -> Result<()> {
        self.charge_prefetch(bus);
        let (address, base) = self.transfer_address(rn, offset, pre_index, up);
        self.write_back(rn, base, pre_index, writeback);

        let value = if byte {
            let value = bus.load_u8(address) as u32;
            bus.wait(address);
            value
        } else {
            let value = bus.load32(address);
            bus.wait32(address);
            value
        };
        bus.idle(1);
        self.set_r(rd, value);
        Ok(())
    }

    /// LDRH/LDRSB/LDRSH (and STRH, which shares the encoding)
    ///
    /// A halfword load from an odd address is rotated by 8; a signed
    /// halfword load from an odd address behaves as LDRSB.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_halfword(
        &mut self,
        bus: &mut Bus,
        kind: HalfwordKind,
        rd: u8,
        rn: u8,
        offset: HalfwordOffset,
        pre_index: bool,
        up: bool,
        writeback: bool,
    ) -> Result<()> {
        if kind == HalfwordKind::StoreHalf {
            return self.op_strh(bus, rd, rn, offset, pre_index, up, writeback);
        }

        self.charge_prefetch(bus);
        let (address, base) = self.halfword_address(rn, offset, pre_index, up);
        self.write_back(rn, base, pre_index, writeback);

        let value = match kind {
            HalfwordKind::LoadHalf => {
                let value = bus.load_u16(address) as u32;
                if address & 1 != 0 {
                    value.rotate_right(8)
                } else {
                    value
                }
            }
            HalfwordKind::LoadSignedByte => bus.load8(address) as i32 as u32,
            HalfwordKind::LoadSignedHalf if address & 1 != 0 => bus.load8(address) as i32 as u32,
            _ => bus.load16(address) as i32 as u32,
        };
        bus.wait(address);
        bus.idle(1);
        self.set_r(rd, value);
        Ok(())
    }

    /// LDR rd, [PC, #imm] (Thumb): the PC is word-aligned first
    pub(crate) fn op_load_literal(&mut self, bus: &mut Bus, rd: u8, offset: u32) -> Result<()> {
        self.charge_prefetch(bus);
        let address = (self.r(15) & !2).wrapping_add(offset);
        let value = bus.load32(address);
        bus.wait32(address);
        bus.idle(1);
        self.set_r(rd, value);
        Ok(())
    }

    /// SWP/SWPB: Atomic swap of a register with memory
    ///
    /// Format: swp{b} rd, rm, [rn]
    pub(crate) fn op_swap(&mut self, bus: &mut Bus, byte: bool, rd: u8, rn: u8, rm: u8) -> Result<()> {
        self.charge_prefetch(bus);
        let address = self.r(rn);
        let source = self.r(rm);
        let value = if byte {
            let value = bus.load_u8(address) as u32;
            bus.wait(address);
            bus.store8(address, source as u8);
            bus.wait(address);
            value
        } else {
            let value = bus.load32(address);
            bus.wait32(address);
            bus.store32(address & !3, source);
            bus.wait32(address);
            value
        };
        bus.idle(1);
        self.set_r(rd, value);
        Ok(())
    }
}

/// (address used for the access, base after indexing)
#[inline(always)]
fn index_address(base: u32, offset: u32, pre_index: bool, up: bool) -> (u32, u32) {
    let indexed = if up {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    if pre_index {
        (indexed, indexed)
    } else {
        (base, indexed)
    }
}
