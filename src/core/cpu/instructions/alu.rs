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

//! Data processing and PSR transfer instructions

use super::super::decode::{AluOp, MsrSource, ShifterOperand};
use super::super::psr::{Mode, PsrFlags};
use super::super::shifter::{shift_by_immediate, shift_by_register};
use super::super::CPU;
use crate::core::error::Result;
use crate::core::memory::Bus;

/// CPSR bits an SPSR write may touch (flags, I/F, T, mode)
const SPSR_WRITABLE: u32 = 0xF000_00FF;

/// `a + b + carry` with the adder's carry-out and signed overflow
#[inline(always)]
pub(crate) fn add_with_carry(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    let sum = a as u64 + b as u64 + carry as u64;
    let result = sum as u32;
    let overflow = (!(a ^ b) & (a ^ result)) >> 31 != 0;
    (result, sum >> 32 != 0, overflow)
}

/// `a - b - !carry`; carry-out is NOT borrow
#[inline(always)]
pub(crate) fn sub_with_carry(a: u32, b: u32, carry: bool) -> (u32, bool, bool) {
    add_with_carry(a, !b, carry)
}

impl CPU {
    /// Evaluate the shifter operand, returning the value and shifter carry-out
    ///
    /// A register-specified shift costs one internal cycle and sees R15 one
    /// word further ahead.
    fn shifter_operand(&self, bus: &mut Bus, operand: ShifterOperand) -> (u32, bool) {
        let carry = self.carry();
        match operand {
            ShifterOperand::Immediate { value, carry: rotated } => (value, rotated.unwrap_or(carry)),
            ShifterOperand::ShiftByImmediate { rm, kind, amount } => {
                shift_by_immediate(kind, self.r(rm), amount, carry)
            }
            ShifterOperand::ShiftByRegister { rm, kind, rs } => {
                bus.idle(1);
                let value = self.r(rm).wrapping_add(if rm == 15 { 4 } else { 0 });
                shift_by_register(kind, value, self.r(rs), carry)
            }
        }
    }

    /// AND/EOR/SUB/RSB/ADD/ADC/SBC/RSC/TST/TEQ/CMP/CMN/ORR/MOV/BIC/MVN
    ///
    /// Format: op{S} rd, rn, shifter_operand
    ///
    /// Logical opcodes take C from the shifter; arithmetic ones from the
    /// adder. With S and rd = R15 the SPSR of the current mode is copied
    /// into the CPSR (exception return).
    pub(crate) fn op_data_processing(
        &mut self,
        bus: &mut Bus,
        op: AluOp,
        set_flags: bool,
        rd: u8,
        rn: u8,
        operand: ShifterOperand,
    ) -> Result<()> {
        let (s, shifter_carry) = self.shifter_operand(bus, operand);
        let mut n = self.r(rn);
        if rn == 15 && matches!(operand, ShifterOperand::ShiftByRegister { .. }) {
            n = n.wrapping_add(4);
        }
        self.charge_prefetch(bus);

        let carry = self.carry();
        let (result, c, v) = match op {
            AluOp::And | AluOp::Tst => (n & s, shifter_carry, None),
            AluOp::Eor | AluOp::Teq => (n ^ s, shifter_carry, None),
            AluOp::Orr => (n | s, shifter_carry, None),
            AluOp::Bic => (n & !s, shifter_carry, None),
            AluOp::Mov => (s, shifter_carry, None),
            AluOp::Mvn => (!s, shifter_carry, None),
            AluOp::Sub | AluOp::Cmp => arithmetic(sub_with_carry(n, s, true)),
            AluOp::Rsb => arithmetic(sub_with_carry(s, n, true)),
            AluOp::Add | AluOp::Cmn => arithmetic(add_with_carry(n, s, false)),
            AluOp::Adc => arithmetic(add_with_carry(n, s, carry)),
            AluOp::Sbc => arithmetic(sub_with_carry(n, s, carry)),
            AluOp::Rsc => arithmetic(sub_with_carry(s, n, carry)),
        };

        if !op.is_test() {
            self.set_r(rd, result);
        }

        if set_flags {
            if rd == 15 && !op.is_test() {
                match self.spsr() {
                    Some(spsr) => self.set_cpsr(spsr),
                    None => log::warn!("Exception return without SPSR in {:?} mode", self.mode),
                }
            } else {
                self.set_nz(result);
                self.flags.set(PsrFlags::C, c);
                if let Some(v) = v {
                    self.flags.set(PsrFlags::V, v);
                }
            }
        }
        Ok(())
    }

    /// MRS: Move PSR to register
    ///
    /// Format: mrs rd, cpsr|spsr
    pub(crate) fn op_mrs(&mut self, bus: &mut Bus, rd: u8, spsr: bool) -> Result<()> {
        self.charge_prefetch(bus);
        let value = if spsr {
            self.spsr().unwrap_or_else(|| self.cpsr())
        } else {
            self.cpsr()
        };
        self.set_r(rd, value);
        Ok(())
    }

    /// MSR: Move to PSR fields
    ///
    /// Format: msr cpsr_fc|spsr_fc, rm|#imm
    ///
    /// The flag byte is always writable; the control byte only from a
    /// privileged mode, and never changes the T bit.
    pub(crate) fn op_msr(
        &mut self,
        bus: &mut Bus,
        spsr: bool,
        field_mask: u32,
        source: MsrSource,
    ) -> Result<()> {
        self.charge_prefetch(bus);
        let value = match source {
            MsrSource::Immediate(value) => value,
            MsrSource::Register(rm) => self.r(rm),
        };

        if spsr {
            if let Some(current) = self.spsr() {
                let mask = field_mask & SPSR_WRITABLE;
                self.set_spsr((current & !mask) | (value & mask));
            }
            return Ok(());
        }

        if field_mask & 0xFF00_0000 != 0 {
            let condition = PsrFlags::from_bits_truncate(value) & PsrFlags::CONDITION;
            self.flags = (self.flags - PsrFlags::CONDITION) | condition;
        }
        if field_mask & 0x0000_00FF != 0 && self.mode.is_privileged() {
            match Mode::from_bits(value) {
                Some(mode) => self.switch_mode(mode),
                None => log::warn!("MSR to invalid mode 0x{:02X} ignored", value & 0x1F),
            }
            self.flags.set(PsrFlags::I, value & PsrFlags::I.bits() != 0);
            self.flags.set(PsrFlags::F, value & PsrFlags::F.bits() != 0);
        }
        Ok(())
    }
}

#[inline(always)]
fn arithmetic((result, carry, overflow): (u32, bool, bool)) -> (u32, bool, Option<bool>) {
    (result, carry, Some(overflow))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_with_carry_flags() {
        assert_eq!(add_with_carry(0xFFFF_FFFF, 1, false), (0, true, false));
        assert_eq!(add_with_carry(0x7FFF_FFFF, 1, false), (0x8000_0000, false, true));
        assert_eq!(add_with_carry(1, 1, true), (3, false, false));
    }

    #[test]
    fn test_sub_carry_is_not_borrow() {
        assert_eq!(sub_with_carry(5, 3, true), (2, true, false));
        assert_eq!(sub_with_carry(3, 5, true), (0xFFFF_FFFE, false, false));
        assert_eq!(sub_with_carry(0x8000_0000, 1, true), (0x7FFF_FFFF, true, true));
        // SBC with C clear subtracts one more
        assert_eq!(sub_with_carry(5, 3, false), (1, true, false));
    }
}
