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

//! Store instructions

use super::super::decode::{HalfwordOffset, TransferOffset};
use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    /// Value of `rd` as a store sees it: R15 reads one word further ahead
    #[inline(always)]
    fn store_value(&self, rd: u8) -> u32 {
        if rd == 15 {
            self.r(15).wrapping_add(4)
        } else {
            self.r(rd)
        }
    }

    /// STR/STRB: Store word or byte
    ///
    /// Format: str{b} rd, [rn, offset]{!} / str{b} rd, [rn], offset
    ///
    /// The stored value is read before the base is written back.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_str(
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
        let (address, base) = self.transfer_address(rn, offset, pre_index, up);
        let value = self.store_value(rd);
        self.write_back(rn, base, pre_index, writeback);

        if byte {
            bus.store8(address, value as u8);
            bus.wait(address);
        } else {
            bus.store32(address & !3, value);
            bus.wait32(address);
        }
        self.charge_fetch(bus);
        Ok(())
    }

    /// STRH: Store halfword
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_strh(
        &mut self,
        bus: &mut Bus,
        rd: u8,
        rn: u8,
        offset: HalfwordOffset,
        pre_index: bool,
        up: bool,
        writeback: bool,
    ) -> Result<()> {
        let (address, base) = self.halfword_address(rn, offset, pre_index, up);
        let value = self.store_value(rd);
        self.write_back(rn, base, pre_index, writeback);

        bus.store16(address & !1, value as u16);
        bus.wait(address);
        self.charge_fetch(bus);
        Ok(())
    }
}
