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

//! Multiply instructions

use super::super::psr::PsrFlags;
use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

impl CPU {
    /// MUL/MLA: 32-bit multiply (and accumulate)
    ///
    /// Format: mul{S} rd, rm, rs / mla{S} rd, rm, rs, rn
    /// Operation: rd = rm * rs (+ rn)
    ///
    /// Takes 1-4 extra cycles depending on the significant bytes of rs, plus
    /// one for the accumulate. With S only N and Z are updated.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_multiply(
        &mut self,
        bus: &mut Bus,
        accumulate: bool,
        set_flags: bool,
        rd: u8,
        rn: u8,
        rs: u8,
        rm: u8,
    ) -> Result<()> {
        self.charge_prefetch(bus);
        let multiplier = self.r(rs);
        bus.wait_mul(multiplier);

        let mut result = self.r(rm).wrapping_mul(multiplier);
        if accumulate {
            bus.idle(1);
            result = result.wrapping_add(self.r(rn));
        }
        self.set_r(rd, result);

        if set_flags {
            self.set_nz(result);
        }
        Ok(())
    }

    /// UMULL/UMLAL/SMULL/SMLAL: 64-bit multiply (and accumulate)
    ///
    /// Format: umull{S} rd_lo, rd_hi, rm, rs
    /// Operation: rd_hi:rd_lo = rm * rs (+ rd_hi:rd_lo)
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn op_multiply_long(
        &mut self,
        bus: &mut Bus,
        signed: bool,
        accumulate: bool,
        set_flags: bool,
        rd_hi: u8,
        rd_lo: u8,
        rs: u8,
        rm: u8,
    ) -> Result<()> {
        self.charge_prefetch(bus);
        let multiplier = self.r(rs);
        bus.wait_mul(multiplier);
        bus.idle(1);

        let mut result = if signed {
            (self.r(rm) as i32 as i64).wrapping_mul(multiplier as i32 as i64) as u64
        } else {
            (self.r(rm) as u64).wrapping_mul(multiplier as u64)
        };
        if accumulate {
            bus.idle(1);
            let previous = ((self.r(rd_hi) as u64) << 32) | self.r(rd_lo) as u64;
            result = result.wrapping_add(previous);
        }
        self.set_r(rd_lo, result as u32);
        self.set_r(rd_hi, (result >> 32) as u32);

        if set_flags {
            self.flags.set(PsrFlags::N, result >> 63 != 0);
            self.flags.set(PsrFlags::Z, result == 0);
        }
        Ok(())
    }
}
