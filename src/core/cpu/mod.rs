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

use serde::{Deserialize, Serialize};

use crate::core::error::{EmulatorError, Result};
use crate::core::memory::Bus;

pub mod condition;
pub mod decode;
pub mod icache;
mod instructions;
pub mod psr;
pub mod registers;
mod shifter;
#[cfg(test)]
mod tests;

use decode::CompiledOp;
use icache::OpRef;
use psr::{pack_psr, BankIndex, ExecMode, Mode, PsrFlags};
use registers::{RegisterFile, LR, PC, SP};

/// IRQ exception vector
const BASE_IRQ: u32 = 0x18;
/// Software interrupt exception vector
const BASE_SWI: u32 = 0x08;

/// Stack pointers installed by the BIOS
pub const SVC_STACK: u32 = 0x0300_7FE0;
pub const IRQ_STACK: u32 = 0x0300_7FA0;
pub const SYSTEM_STACK: u32 = 0x0300_7F00;

/// CPU (ARM7TDMI) emulation
///
/// # Specifications
/// - Architecture: ARMv4T, 32-bit ARM and 16-bit Thumb instruction sets
/// - Clock frequency: 16.78 MHz
/// - Registers: 16 visible registers, 6 shadow banks, CPSR + 5 SPSRs
///
/// R15 always holds the address of the instruction being fetched plus
/// one instruction width; while an instruction executes it reads as that
/// instruction's address plus two widths.
///
/// # Example
/// ```
/// use gbacore::core::cpu::CPU;
/// use gbacore::core::memory::Bus;
///
/// let mut cpu = CPU::new();
/// let mut bus = Bus::new();
///
/// // mov r0, #10 in IWRAM
/// bus.store32(0x0300_0000, 0xE3A0_000A);
/// cpu.reset(0x0300_0000);
/// cpu.step(&mut bus).unwrap();
///
/// assert_eq!(cpu.reg(0), 10);
/// assert_eq!(cpu.pc(), 0x0300_0004);
/// ```
pub struct CPU {
    /// Visible registers, shadow banks and SPSRs
    regs: RegisterFile,

    /// Current processor mode (selects the resident bank)
    mode: Mode,

    /// N/Z/C/V/I/F; T lives in `exec_mode`
    flags: PsrFlags,

    exec_mode: ExecMode,

    /// Whether the current instruction's condition held
    condition_passed: bool,

    /// Op to execute next without a cache lookup
    chain: Option<OpRef>,

    /// Cleared when the current instruction leaves the sequential stream
    /// (exception entry, exec mode switch, PC rewritten by a service)
    chain_live: bool,

    /// Waiting for an interrupt
    halted: bool,

    /// Inside an IntrWait/VBlankIntrWait service
    pub(crate) intr_wait: bool,
}

/// Serializable CPU state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub registers: RegisterFile,
    pub cpsr: u32,
    pub halted: bool,
    pub intr_wait: bool,
}

impl CPU {
    /// Create a CPU in System mode, ARM state, with all registers zero
    pub fn new() -> Self {
        let mut cpu = Self {
            regs: RegisterFile::new(),
            mode: Mode::System,
            flags: PsrFlags::empty(),
            exec_mode: ExecMode::Arm,
            condition_passed: true,
            chain: None,
            chain_live: false,
            halted: false,
            intr_wait: false,
        };
        cpu.reset(0);
        cpu
    }

    /// Reset to System mode, ARM state, and start fetching at `entry`
    ///
    /// All registers (including every shadow bank) are cleared and any
    /// chained op is dropped.
    pub fn reset(&mut self, entry: u32) {
        self.regs = RegisterFile::new();
        self.mode = Mode::System;
        self.flags = PsrFlags::empty();
        self.exec_mode = ExecMode::Arm;
        self.condition_passed = true;
        self.chain = None;
        self.chain_live = false;
        self.halted = false;
        self.intr_wait = false;
        self.regs.gprs[PC] = entry.wrapping_add(ExecMode::Arm.width());
        log::debug!("CPU reset, entry 0x{:08X}", entry);
    }

    /// Install the stack pointers the BIOS sets up for SVC, IRQ and System mode
    pub fn reset_stacks(&mut self) {
        self.regs.set_banked_sp(BankIndex::Supervisor, SVC_STACK);
        self.regs.set_banked_sp(BankIndex::Irq, IRQ_STACK);
        match self.mode.bank() {
            BankIndex::None => self.regs.gprs[SP] = SYSTEM_STACK,
            bank => {
                self.regs.set_banked_sp(BankIndex::None, SYSTEM_STACK);
                match bank {
                    BankIndex::Supervisor => self.regs.gprs[SP] = SVC_STACK,
                    BankIndex::Irq => self.regs.gprs[SP] = IRQ_STACK,
                    _ => {}
                }
            }
        }
    }

    /// Read a visible register
    #[inline(always)]
    pub fn reg(&self, index: usize) -> u32 {
        self.regs.gprs[index]
    }

    /// Write a visible register
    ///
    /// Writing R15 from outside an instruction redirects the next fetch to
    /// the written address.
    #[inline(always)]
    pub fn set_reg(&mut self, index: usize, value: u32) {
        self.regs.gprs[index] = value;
    }

    /// Address of the next instruction to execute
    pub fn pc(&self) -> u32 {
        self.regs.gprs[PC].wrapping_sub(self.exec_mode.width())
    }

    /// Redirect execution to `address` in the current state
    pub fn set_pc(&mut self, address: u32) {
        self.regs.gprs[PC] = address.wrapping_add(self.exec_mode.width());
        self.chain = None;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }

    pub fn flags(&self) -> PsrFlags {
        self.flags
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stop issuing instructions until an enabled interrupt is requested
    pub fn halt(&mut self) {
        self.halted = true;
        log::trace!("CPU halted at 0x{:08X}", self.pc());
    }

    /// Current program status register
    pub fn cpsr(&self) -> u32 {
        let mut flags = self.flags;
        flags.set(PsrFlags::T, self.exec_mode == ExecMode::Thumb);
        pack_psr(self.mode, flags)
    }

    /// Load the CPSR, switching mode and execution state as encoded
    ///
    /// A reserved mode encoding leaves the mode unchanged.
    pub fn set_cpsr(&mut self, value: u32) {
        match Mode::from_bits(value) {
            Some(mode) => self.switch_mode(mode),
            None => log::warn!("Invalid mode in CPSR write: 0x{:02X}", value & psr::MODE_MASK),
        }
        self.flags = PsrFlags::from_bits_truncate(value) - PsrFlags::T;
        let exec_mode = if value & PsrFlags::T.bits() != 0 {
            ExecMode::Thumb
        } else {
            ExecMode::Arm
        };
        self.switch_exec_mode(exec_mode);
    }

    /// SPSR of the current mode, `None` in User/System mode
    pub fn spsr(&self) -> Option<u32> {
        if self.mode.has_spsr() {
            Some(self.regs.spsr[self.mode.bank().index()])
        } else {
            None
        }
    }

    pub fn set_spsr(&mut self, value: u32) {
        if self.mode.has_spsr() {
            self.regs.spsr[self.mode.bank().index()] = value;
        }
    }

    /// Change processor mode, exchanging the banked registers
    pub fn switch_mode(&mut self, new_mode: Mode) {
        if new_mode == self.mode {
            return;
        }
        self.regs.exchange_bank(self.mode.bank(), new_mode.bank());
        log::trace!("Mode switch {:?} -> {:?}", self.mode, new_mode);
        self.mode = new_mode;
    }

    /// Change instruction set; drops the chained op
    pub fn switch_exec_mode(&mut self, new_mode: ExecMode) {
        if new_mode != self.exec_mode {
            self.exec_mode = new_mode;
            self.chain = None;
            self.chain_live = false;
        }
    }

    /// Take the IRQ exception
    ///
    /// Saves CPSR into SPSR_irq, enters IRQ mode in ARM state with IRQs
    /// masked and sets LR so that `subs pc, lr, #4` resumes at the next
    /// instruction. Leaves the halted state.
    pub fn raise_irq(&mut self) {
        let cpsr = self.cpsr();
        let width = self.exec_mode.width();
        self.switch_mode(Mode::Irq);
        self.set_spsr(cpsr);
        self.regs.gprs[LR] = self.regs.gprs[PC].wrapping_sub(width).wrapping_add(4);
        self.regs.gprs[PC] = BASE_IRQ + ExecMode::Arm.width();
        self.switch_exec_mode(ExecMode::Arm);
        self.flags.insert(PsrFlags::I);
        self.chain = None;
        self.chain_live = false;
        self.halted = false;
        log::trace!("IRQ taken, return to 0x{:08X}", self.regs.gprs[LR].wrapping_sub(4));
    }

    /// Take the software interrupt exception (into a loaded BIOS)
    pub fn raise_trap(&mut self) {
        let cpsr = self.cpsr();
        let width = self.exec_mode.width();
        self.switch_mode(Mode::Supervisor);
        self.set_spsr(cpsr);
        self.regs.gprs[LR] = self.regs.gprs[PC].wrapping_sub(width);
        self.regs.gprs[PC] = BASE_SWI + ExecMode::Arm.width();
        self.switch_exec_mode(ExecMode::Arm);
        self.flags.insert(PsrFlags::I);
        self.chain = None;
        self.chain_live = false;
    }

    /// Execute one instruction (or one halted scheduler slice)
    ///
    /// After the instruction the scheduler runs and a pending enabled IRQ
    /// is taken, so interrupts are only ever delivered between
    /// instructions.
    ///
    /// # Errors
    ///
    /// - `IllegalInstruction` when an undefined opcode executes
    /// - `InternalConsistency` when the scheduler's deadline went stale
    /// - `HaltDeadlock` when halted with every interrupt disabled
    pub fn step(&mut self, bus: &mut Bus) -> Result<()> {
        if self.halted {
            return self.step_halted(bus);
        }

        let width = self.exec_mode.width();
        let address = self.regs.gprs[PC].wrapping_sub(width);
        let (op, op_ref) = self.resolve(bus, address);

        bus.set_open_bus(address, self.exec_mode == ExecMode::Thumb);
        self.regs.gprs[PC] = self.regs.gprs[PC].wrapping_add(width);
        self.condition_passed = true;
        self.chain_live = true;

        self.execute(&op, bus)?;

        if !op.writes_pc {
            self.chain = if self.chain_live {
                self.successor(bus, &op, op_ref)
            } else {
                None
            };
        } else if self.condition_passed {
            // Refill the pipeline at the new PC
            let width = self.exec_mode.width();
            let pc = self.regs.gprs[PC] & !(width - 1);
            match self.exec_mode {
                ExecMode::Arm => {
                    bus.wait32(pc);
                    bus.wait_prefetch32(pc);
                }
                ExecMode::Thumb => {
                    bus.wait(pc);
                    bus.wait_prefetch(pc);
                }
            }
            self.regs.gprs[PC] = pc.wrapping_add(width);
            self.chain = if op.fixed_jump && self.chain_live {
                self.successor(bus, &op, op_ref)
            } else {
                None
            };
        } else {
            self.chain = None;
        }

        bus.update_timers();
        if bus.irq_pending() && !self.flags.contains(PsrFlags::I) {
            self.raise_irq();
        }
        bus.take_fault()?;
        if bus.take_halt_request() {
            self.halt();
        }
        Ok(())
    }

    /// Fast-forward the clock to the next event while halted
    fn step_halted(&mut self, bus: &mut Bus) -> Result<()> {
        if bus.interrupts.read_enable() == 0 {
            return Err(EmulatorError::HaltDeadlock { pc: self.pc() });
        }

        if !bus.interrupts.wake_pending() {
            let next = bus.interrupts.next_event();
            if next > bus.cycles {
                bus.cycles = next;
            }
            bus.update_timers();
            bus.take_fault()?;
        }

        if bus.interrupts.wake_pending() {
            self.halted = false;
            log::trace!("CPU woke at cycle {}", bus.cycles());
            if bus.irq_pending() && !self.flags.contains(PsrFlags::I) {
                self.raise_irq();
            }
        }
        Ok(())
    }

    /// Find the op for `address`: the chained op, a cache hit, or a fresh decode
    fn resolve(&mut self, bus: &mut Bus, address: u32) -> (CompiledOp, Option<OpRef>) {
        if let Some(chained) = self.chain.take() {
            if let Some(op) = bus.icache.get(chained) {
                if op.address == address && op.exec_mode == self.exec_mode {
                    return (*op, Some(chained));
                }
            }
        }
        self.compile_at(bus, address)
    }

    /// Look up or decode the op at `address` in the current exec mode
    fn compile_at(&mut self, bus: &mut Bus, address: u32) -> (CompiledOp, Option<OpRef>) {
        let exec_mode = self.exec_mode;
        if let Some(op_ref) = bus.icache.lookup(address, exec_mode) {
            if let Some(op) = bus.icache.get(op_ref) {
                return (*op, Some(op_ref));
            }
        }
        let opcode = match exec_mode {
            ExecMode::Arm => bus.load32(address),
            ExecMode::Thumb => bus.load_u16(address) as u32,
        };
        let op = CompiledOp::compile(address, opcode, exec_mode);
        match bus.icache.insert(op) {
            Some(op_ref) => {
                let cached = bus.icache.get(op_ref).copied().unwrap_or(op);
                (cached, Some(op_ref))
            }
            None => (op, None),
        }
    }

    /// Op that follows `op`, through its cached link when still valid
    fn successor(&mut self, bus: &mut Bus, op: &CompiledOp, op_ref: Option<OpRef>) -> Option<OpRef> {
        let op_ref = op_ref?;
        let next_address = self.regs.gprs[PC].wrapping_sub(self.exec_mode.width());
        if let Some(next) = op.next {
            if bus
                .icache
                .get(next)
                .is_some_and(|n| n.address == next_address && n.exec_mode == self.exec_mode)
            {
                return Some(next);
            }
        }
        let (_, next) = self.compile_at(bus, next_address);
        bus.icache.set_next(op_ref, next);
        next
    }

    /// Capture the architectural state
    pub fn snapshot(&self) -> CpuState {
        CpuState {
            registers: self.regs.clone(),
            cpsr: self.cpsr(),
            halted: self.halted,
            intr_wait: self.intr_wait,
        }
    }

    /// Restore a captured state; the registers already hold the resident bank
    pub fn restore(&mut self, state: &CpuState) -> Result<()> {
        let mode = Mode::from_bits(state.cpsr).ok_or_else(|| {
            EmulatorError::SaveState(format!("invalid CPSR mode 0x{:02X}", state.cpsr & 0x1F))
        })?;
        self.regs = state.registers.clone();
        self.mode = mode;
        self.flags = PsrFlags::from_bits_truncate(state.cpsr) - PsrFlags::T;
        self.exec_mode = if state.cpsr & PsrFlags::T.bits() != 0 {
            ExecMode::Thumb
        } else {
            ExecMode::Arm
        };
        self.halted = state.halted;
        self.intr_wait = state.intr_wait;
        self.chain = None;
        self.chain_live = false;
        self.condition_passed = true;
        Ok(())
    }

    /// Dump all CPU registers for debugging
    ///
    /// # Example
    ///
    /// ```no_run
    /// use gbacore::core::cpu::CPU;
    ///
    /// let cpu = CPU::new();
    /// cpu.dump_registers();
    /// ```
    pub fn dump_registers(&self) {
        println!("CPU Registers ({:?}, {:?}):", self.mode, self.exec_mode);
        for i in 0..16 {
            if i % 4 == 0 && i > 0 {
                println!();
            }
            print!("r{:<2}: 0x{:08X}  ", i, self.regs.gprs[i]);
        }
        println!();
        println!("CPSR: 0x{:08X}  SPSR: {}", self.cpsr(), match self.spsr() {
            Some(spsr) => format!("0x{:08X}", spsr),
            None => "-".to_string(),
        });
        println!("Next PC: 0x{:08X}  Halted: {}", self.pc(), self.halted);
    }
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}
