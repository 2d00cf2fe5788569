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

//! Block data transfer instructions (LDM/STM, Thumb PUSH/POP)

use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

/// Registers moved and base adjustment of a block transfer
struct Block {
    list: u16,
    count: u32,
    /// Lowest address transferred
    start: u32,
    /// Base register value after the transfer
    end_base: u32,
}

impl Block {
    /// Resolve the addressing mode (IA/IB/DA/DB)
    ///
    /// An empty list transfers R15 alone and moves the base by 0x40.
    fn new(base: u32, list: u16, pre_index: bool, up: bool) -> Self {
        let (list, span) = if list == 0 {
            (0x8000, 0x40)
        } else {
            (list, list.count_ones() * 4)
        };
        let (start, end_base) = match (up, pre_index) {
            (true, false) => (base, base.wrapping_add(span)),
            (true, true) => (base.wrapping_add(4), base.wrapping_add(span)),
            (false, false) => (base.wrapping_sub(span).wrapping_add(4), base.wrapping_sub(span)),
            (false, true) => (base.wrapping_sub(span), base.wrapping_sub(span)),
        };
        Self {
            list,
            count: list.count_ones(),
            start,
            end_base,
        }
    }

    fn registers(&self) -> impl Iterator<Item = usize> + '_ {
        (0..16).filter(move |i| self.list & (1 << i) != 0)
    }
}

impl CPU {
    /// LDM: Load multiple registers
    ///
    /// Format: ldm{ia|ib|da|db} rn{!}, {list}{^}
    ///
    /// Registers load in ascending order from the lowest address. With the
    /// S bit the user bank is loaded, unless R15 is in the list, in which
    /// case the SPSR is copied into the CPSR afterwards. A base register in
    /// the list is not written back.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_ldm(
        &mut self,
        bus: &mut Bus,
        rn: u8,
        list: u16,
        pre_index: bool,
        up: bool,
        writeback: bool,
        user_bank: bool,
    ) -> Result<()> {
        self.charge_prefetch(bus);
        let block = Block::new(self.r(rn), list, pre_index, up);
        if writeback && block.list & (1 << rn) == 0 {
            self.set_r(rn, block.end_base);
        }

        let loads_pc = block.list & 0x8000 != 0;
        let resident = self.mode.bank();
        let mut address = block.start;
        for i in block.registers() {
            let value = bus.load32(address & !3);
            if user_bank && !loads_pc {
                self.regs.set_user_reg(resident, i, value);
            } else {
                self.regs.gprs[i] = value;
            }
            address = address.wrapping_add(4);
        }
        bus.wait_multi32(block.start, block.count);
        bus.idle(1);

        if user_bank && loads_pc {
            match self.spsr() {
                Some(spsr) => self.set_cpsr(spsr),
                None => log::warn!("LDM^ without SPSR in {:?} mode", self.mode),
            }
        }
        Ok(())
    }

    /// STM: Store multiple registers
    ///
    /// Format: stm{ia|ib|da|db} rn{!}, {list}{^}
    ///
    /// A base register that is not the lowest in the list is stored with
    /// its written-back value. R15 is stored one instruction further ahead.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_stm(
        &mut self,
        bus: &mut Bus,
        rn: u8,
        list: u16,
        pre_index: bool,
        up: bool,
        writeback: bool,
        user_bank: bool,
    ) -> Result<()> {
        self.charge_fetch(bus);
        let block = Block::new(self.r(rn), list, pre_index, up);
        let lowest = block.list.trailing_zeros() as usize;
        let resident = self.mode.bank();
        let width = self.exec_mode.width();

        let mut address = block.start;
        for i in block.registers() {
            let value = if i == rn as usize && writeback && i != lowest {
                block.end_base
            } else if i == 15 {
                self.regs.gprs[15].wrapping_add(width)
            } else if user_bank {
                self.regs.user_reg(resident, i)
            } else {
                self.regs.gprs[i]
            };
            bus.store32(address & !3, value);
            address = address.wrapping_add(4);
        }
        if writeback {
            self.set_r(rn, block.end_base);
        }
        bus.wait_multi32(block.start, block.count);
        Ok(())
    }
}
