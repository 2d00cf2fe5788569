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

//! Branch instructions

use super::super::psr::ExecMode;
use super::super::registers::{LR, PC};
use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    /// B/BL: Branch (with link)
    ///
    /// Format: b{l} label
    /// Operation: (lr = next instruction;) pc += offset
    ///
    /// Also covers the Thumb conditional and unconditional branches.
    pub(crate) fn op_branch(&mut self, bus: &mut Bus, offset: i32, link: bool) -> Result<()> {
        self.charge_prefetch(bus);
        let pc = self.regs.gprs[PC];
        if link {
            self.regs.gprs[LR] = pc.wrapping_sub(self.exec_mode.width());
        }
        self.regs.gprs[PC] = pc.wrapping_add(offset as u32);
        Ok(())
    }

    /// BX: Branch and exchange instruction set
    ///
    /// Format: bx rm
    ///
    /// Bit 0 of the target selects Thumb state.
    pub(crate) fn op_bx(&mut self, bus: &mut Bus, rm: u8) -> Result<()> {
        self.charge_prefetch(bus);
        let target = self.r(rm);
        let exec_mode = if target & 1 != 0 {
            ExecMode::Thumb
        } else {
            ExecMode::Arm
        };
        self.switch_exec_mode(exec_mode);
        self.regs.gprs[PC] = target & !1;
        Ok(())
    }

    /// BL prefix (Thumb): lr = pc + (offset << 12)
    pub(crate) fn op_long_branch_high(&mut self, bus: &mut Bus, offset: i32) -> Result<()> {
        self.charge_prefetch(bus);
        self.regs.gprs[LR] = self.regs.gprs[PC].wrapping_add((offset << 12) as u32);
        Ok(())
    }

    /// BL suffix (Thumb): pc = lr + (offset << 1), lr = return address | 1
    pub(crate) fn op_long_branch_low(&mut self, bus: &mut Bus, offset: u32) -> Result<()> {
        self.charge_prefetch(bus);
        let pc = self.regs.gprs[PC];
        self.regs.gprs[PC] = self.regs.gprs[LR].wrapping_add(offset << 1);
        self.regs.gprs[LR] = pc.wrapping_sub(2) | 1;
        Ok(())
    }

    /// ADD rd, pc|sp, #imm (Thumb): the PC is word-aligned first
    pub(crate) fn op_address(&mut self, bus: &mut Bus, rd: u8, sp: bool, offset: u32) -> Result<()> {
        self.charge_prefetch(bus);
        let base = if sp { self.r(13) } else { self.r(15) & !2 };
        self.set_r(rd, base.wrapping_add(offset));
        Ok(())
    }
}
