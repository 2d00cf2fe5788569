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

//! Exception-triggering instructions

use super::super::decode::CompiledOp;
use super::super::psr::ExecMode;
use super::super::registers::PC;
use super::super::CPU;
use crate::core::error::{EmulatorError, Result};
use crate::core::interrupt::bios;
use crate::core::memory::Bus;

impl CPU {
    /// SWI: Software interrupt
    ///
    /// Format: swi #comment
    ///
    /// With a real BIOS image loaded this enters Supervisor mode at the
    /// SWI vector. Otherwise the call is serviced directly by the
    /// high-level BIOS, which may rewrite any register including R15, so
    /// the op chain is broken either way.
    pub(crate) fn op_swi(&mut self, bus: &mut Bus, comment: u32) -> Result<()> {
        self.charge_prefetch(bus);
        self.chain_live = false;
        if bus.has_real_bios() {
            self.raise_trap();
            // Refill from the vector
            let vector = self.regs.gprs[PC].wrapping_sub(4);
            bus.wait32(vector);
            bus.wait_prefetch32(vector);
            return Ok(());
        }
        bios::service(self, bus, comment as u8)
    }

    /// Undefined or coprocessor instruction
    ///
    /// There is no coprocessor on this system, so executing one is fatal.
    pub(crate) fn op_undefined(&mut self, op: &CompiledOp) -> Result<()> {
        log::error!(
            "Undefined instruction 0x{:08X} at 0x{:08X}",
            op.opcode,
            op.address
        );
        Err(EmulatorError::IllegalInstruction {
            address: op.address,
            opcode: op.opcode,
            thumb: op.exec_mode == ExecMode::Thumb,
        })
    }
}
