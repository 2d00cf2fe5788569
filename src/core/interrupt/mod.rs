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

//! Interrupt controller and event scheduler
//!
//! The controller latches requests from the display, timers, DMA, serial
//! port, keypad and cartridge into IF and lets them through to the CPU when
//! the matching IE bit and IME are set. Delivery happens only at
//! instruction boundaries: the CPU polls [`Bus::irq_pending`] after every
//! step.
//!
//! ## Registers
//!
//! - **IE** (0x04000200): Interrupt enable mask (R/W)
//! - **IF** (0x04000202): Interrupt request flags (R, write 1 to acknowledge)
//! - **IME** (0x04000208): Master enable, bit 0 (R/W)
//!
//! ## Interrupt Sources (Bit Positions)
//!
//! ```text
//! Bit  | Source    | Description
//! -----|-----------|----------------------------------
//! 0    | VBLANK    | Vertical blank start
//! 1    | HBLANK    | Horizontal blank start
//! 2    | VCOUNTER  | Scanline matches DISPSTAT setting
//! 3-6  | TIMER0-3  | Timer overflow
//! 7    | SERIAL    | Serial communication
//! 8-11 | DMA0-3    | DMA transfer complete
//! 12   | KEYPAD    | Key combination
//! 13   | GAMEPAK   | Cartridge removed / external IRQ
//! ```
//!
//! ## Scheduler
//!
//! Every peripheral with a future deadline (display line clock, audio,
//! running timers, DMA completions) contributes to `next_event`, the
//! earliest cycle at which anything can happen. [`Bus::update_timers`]
//! runs once per CPU step and returns immediately until the cycle counter
//! reaches it.
//!
//! [`Bus::irq_pending`]: crate::core::memory::Bus::irq_pending
//! [`Bus::update_timers`]: crate::core::memory::Bus::update_timers

pub mod bios;
mod decompress;
mod scheduler;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

/// Interrupt source bit flags (IE/IF bit positions)
pub mod interrupts {
    /// Vertical blank (bit 0)
    pub const VBLANK: u16 = 1 << 0;

    /// Horizontal blank (bit 1)
    pub const HBLANK: u16 = 1 << 1;

    /// Vertical counter match (bit 2)
    pub const VCOUNTER: u16 = 1 << 2;

    /// Timer 0 overflow (bit 3)
    pub const TIMER0: u16 = 1 << 3;

    /// Timer 1 overflow (bit 4)
    pub const TIMER1: u16 = 1 << 4;

    /// Timer 2 overflow (bit 5)
    pub const TIMER2: u16 = 1 << 5;

    /// Timer 3 overflow (bit 6)
    pub const TIMER3: u16 = 1 << 6;

    /// Serial communication (bit 7)
    pub const SERIAL: u16 = 1 << 7;

    /// DMA 0 complete (bit 8)
    pub const DMA0: u16 = 1 << 8;

    /// DMA 1 complete (bit 9)
    pub const DMA1: u16 = 1 << 9;

    /// DMA 2 complete (bit 10)
    pub const DMA2: u16 = 1 << 10;

    /// DMA 3 complete (bit 11)
    pub const DMA3: u16 = 1 << 11;

    /// Keypad (bit 12)
    pub const KEYPAD: u16 = 1 << 12;

    /// Game pak (bit 13)
    pub const GAMEPAK: u16 = 1 << 13;

    /// Every defined source
    pub const ALL: u16 = 0x3FFF;

    /// Timer source for timer `n`
    #[inline(always)]
    pub const fn timer(n: usize) -> u16 {
        TIMER0 << n
    }

    /// DMA source for channel `n`
    #[inline(always)]
    pub const fn dma(n: usize) -> u16 {
        DMA0 << n
    }
}

/// Interrupt controller state
///
/// # Example
///
/// ```
/// use gbacore::core::interrupt::{InterruptController, interrupts};
///
/// let mut ic = InterruptController::new();
///
/// ic.raise(interrupts::VBLANK);
/// ic.write_enable(interrupts::VBLANK);
/// assert!(!ic.is_pending()); // IME still off
///
/// ic.write_master_enable(1);
/// assert!(ic.is_pending());
///
/// // Acknowledge (write 1 to clear)
/// ic.acknowledge(interrupts::VBLANK);
/// assert!(!ic.is_pending());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptController {
    /// IE - sources allowed through to the CPU
    enable: u16,

    /// IF - latched requests
    flags: u16,

    /// IME bit 0
    master_enable: bool,

    /// Earliest cycle at which any peripheral needs servicing
    pub(crate) next_event: u64,
}

impl InterruptController {
    /// Create a controller with everything masked and nothing pending
    pub fn new() -> Self {
        Self {
            enable: 0,
            flags: 0,
            master_enable: false,
            next_event: 0,
        }
    }

    /// Latch an interrupt request
    ///
    /// The CPU takes the exception at the next instruction boundary if the
    /// source is enabled and IME is set.
    pub fn raise(&mut self, source: u16) {
        self.flags |= source & interrupts::ALL;
        log::trace!(
            "IRQ raised: 0x{:04X}, IF=0x{:04X} IE=0x{:04X}",
            source,
            self.flags,
            self.enable
        );
    }

    /// Clear the IF bits set in `value`
    pub fn acknowledge(&mut self, value: u16) {
        self.flags &= !value;
        log::trace!("IRQ acknowledged, IF=0x{:04X}", self.flags);
    }

    /// An enabled request is latched and IME is set
    #[inline(always)]
    pub fn is_pending(&self) -> bool {
        self.master_enable && self.wake_pending()
    }

    /// An enabled request is latched (wakes a halted CPU regardless of IME)
    #[inline(always)]
    pub fn wake_pending(&self) -> bool {
        self.enable & self.flags != 0
    }

    #[inline(always)]
    pub fn read_enable(&self) -> u16 {
        self.enable
    }

    pub fn write_enable(&mut self, value: u16) {
        self.enable = value & interrupts::ALL;
        log::debug!("IE = 0x{:04X}", self.enable);
    }

    #[inline(always)]
    pub fn read_flags(&self) -> u16 {
        self.flags
    }

    #[inline(always)]
    pub fn read_master_enable(&self) -> u16 {
        self.master_enable as u16
    }

    pub fn write_master_enable(&mut self, value: u16) {
        self.master_enable = value & 1 != 0;
        log::debug!("IME = {}", self.master_enable);
    }

    /// Earliest pending deadline
    #[inline(always)]
    pub fn next_event(&self) -> u64 {
        self.next_event
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
