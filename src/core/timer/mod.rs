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

//! Timer bank
//!
//! Four 16-bit up-counters. A running timer is not ticked cycle by cycle:
//! it remembers when it last overflowed and when it will next overflow,
//! and its counter is derived from the cycle clock on read.
//!
//! ## Register Layout
//!
//! Each timer has 2 registers at 4-byte intervals:
//! - `0x04000100 + (n * 4)`: CNT_L, reload on write / counter on read
//! - `0x04000102 + (n * 4)`: CNT_H, control
//!
//! ## Control Register Format (16 bits)
//!
//! ```text
//! 15-8: Not used
//! 7:    Enable
//! 6:    IRQ on overflow
//! 5-3:  Not used
//! 2:    Count-up (cascade from timer n-1; ignored on timer 0)
//! 1-0:  Prescaler (0=1, 1=64, 2=256, 3=1024 cycles per tick)
//! ```

#[cfg(test)]
mod tests;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::audio::AudioSink;
use super::interrupt::{interrupts, InterruptController};

bitflags! {
    /// TMxCNT_H bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimerControl: u16 {
        const PRESCALE = 0x0003;
        const COUNT_UP = 0x0004;
        const IRQ = 0x0040;
        const ENABLE = 0x0080;
    }
}

/// Cycles-per-tick exponent for each prescaler setting
const PRESCALE_BITS: [u32; 4] = [0, 6, 8, 10];

/// One timer channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timer {
    index: usize,

    /// Value loaded on overflow and enable
    reload: u16,
    /// Counter value at `last_event`
    old_reload: u16,

    prescale_bits: u32,
    count_up: bool,
    do_irq: bool,
    enable: bool,

    /// Cycle of the last overflow (or of enabling)
    last_event: u64,
    /// Cycle of the next overflow; `None` when stopped or cascading
    next_event: Option<u64>,
    overflow_interval: u64,

    /// Counter while stopped or in count-up mode
    counter: u32,
}

impl Timer {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            reload: 0,
            old_reload: 0,
            prescale_bits: 0,
            count_up: false,
            do_irq: false,
            enable: false,
            last_event: 0,
            next_event: None,
            overflow_interval: 1,
            counter: 0,
        }
    }

    #[inline(always)]
    fn interval_from(value: u32, bits: u32) -> u64 {
        ((0x10000 - (value & 0xFFFF)) as u64) << bits
    }

    /// Counter as seen through TMxCNT_L
    pub fn read_counter(&self, now: u64) -> u16 {
        if self.enable && !self.count_up {
            let ticks = now.saturating_sub(self.last_event) >> self.prescale_bits;
            (self.old_reload as u64 + ticks) as u16
        } else {
            self.counter as u16
        }
    }

    /// Write TMxCNT_L; the value is used at the next overflow or enable
    pub fn write_reload(&mut self, value: u16) {
        self.reload = value;
        log::trace!("Timer {} reload = 0x{:04X}", self.index, value);
    }

    /// Write TMxCNT_H
    pub fn write_control(&mut self, value: u16, now: u64) {
        let control = TimerControl::from_bits_truncate(value);
        let was_enabled = self.enable;
        let was_counting_up = self.count_up;
        let current = self.read_counter(now);

        self.prescale_bits = PRESCALE_BITS[(control & TimerControl::PRESCALE).bits() as usize];
        self.count_up = self.index > 0 && control.contains(TimerControl::COUNT_UP);
        self.do_irq = control.contains(TimerControl::IRQ);
        self.enable = control.contains(TimerControl::ENABLE);

        if self.enable && !was_enabled {
            // Enable edge reloads the counter
            self.counter = self.reload as u32;
            self.old_reload = self.reload;
            self.last_event = now;
            self.overflow_interval = Self::interval_from(self.reload as u32, self.prescale_bits);
            self.next_event = if self.count_up {
                None
            } else {
                Some(now + self.overflow_interval)
            };
        } else if !self.enable && was_enabled {
            self.counter = current as u32;
            self.next_event = None;
        } else if self.enable {
            // Reconfigured while running: rebase on the current count so the
            // deadline never lands in the past
            if self.count_up {
                if !was_counting_up {
                    self.counter = current as u32;
                }
                self.next_event = None;
            } else {
                self.old_reload = current;
                self.last_event = now;
                self.overflow_interval = Self::interval_from(current as u32, self.prescale_bits);
                self.next_event = Some(now + self.overflow_interval);
            }
        }

        log::debug!(
            "Timer {} control = 0x{:04X} (enable={} count_up={} irq={} prescale={})",
            self.index,
            value,
            self.enable,
            self.count_up,
            self.do_irq,
            1u32 << self.prescale_bits
        );
    }

    /// Control register readback
    pub fn read_control(&self) -> u16 {
        let prescale = PRESCALE_BITS
            .iter()
            .position(|&bits| bits == self.prescale_bits)
            .unwrap_or(0) as u16;
        let mut control = TimerControl::from_bits_truncate(prescale);
        control.set(TimerControl::COUNT_UP, self.count_up);
        control.set(TimerControl::IRQ, self.do_irq);
        control.set(TimerControl::ENABLE, self.enable);
        control.bits()
    }

    #[inline(always)]
    pub fn next_event(&self) -> Option<u64> {
        self.next_event
    }

    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    pub fn is_count_up(&self) -> bool {
        self.count_up
    }

    pub fn reload(&self) -> u16 {
        self.reload
    }
}

/// The four timers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timers {
    channels: [Timer; 4],
}

impl Timers {
    /// Create the bank with every timer stopped
    ///
    /// # Example
    ///
    /// ```
    /// use gbacore::core::timer::Timers;
    ///
    /// let mut timers = Timers::new();
    /// timers.write_reload(0, 0xFF00);
    /// timers.write_control(0, 0x0080, 0);
    ///
    /// assert_eq!(timers.read_counter(0, 16), 0xFF10);
    /// assert_eq!(timers.next_event(), Some(0x100));
    /// ```
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(Timer::new),
        }
    }

    pub fn channel(&self, index: usize) -> &Timer {
        &self.channels[index]
    }

    pub fn read_counter(&self, index: usize, now: u64) -> u16 {
        self.channels[index].read_counter(now)
    }

    pub fn write_reload(&mut self, index: usize, value: u16) {
        self.channels[index].write_reload(value);
    }

    pub fn write_control(&mut self, index: usize, value: u16, now: u64) {
        self.channels[index].write_control(value, now);
    }

    pub fn read_control(&self, index: usize) -> u16 {
        self.channels[index].read_control()
    }

    /// Earliest overflow among the free-running timers
    pub fn next_event(&self) -> Option<u64> {
        self.channels.iter().filter_map(|t| t.next_event).min()
    }

    /// Process every overflow due at or before `now`, timer 0 first
    ///
    /// A timer that fell behind catches up one interval at a time so each
    /// missed overflow still cascades and notifies audio.
    pub fn update(
        &mut self,
        now: u64,
        irq: &mut InterruptController,
        audio: &mut dyn AudioSink,
    ) {
        for i in 0..4 {
            while let Some(next) = self.channels[i].next_event {
                if now < next {
                    break;
                }
                let timer = &mut self.channels[i];
                timer.last_event = next;
                timer.old_reload = timer.reload;
                timer.counter = timer.reload as u32;
                timer.overflow_interval =
                    Timer::interval_from(timer.reload as u32, timer.prescale_bits);
                timer.next_event = Some(next + timer.overflow_interval);
                self.overflow(i, next, irq, audio);
            }
        }
    }

    /// Side effects of timer `index` wrapping at cycle `at`
    fn overflow(
        &mut self,
        index: usize,
        at: u64,
        irq: &mut InterruptController,
        audio: &mut dyn AudioSink,
    ) {
        log::trace!("Timer {} overflow", index);
        if self.channels[index].do_irq {
            irq.raise(interrupts::timer(index));
        }
        if index < 2 {
            audio.fifo_timer_overflow(index, at);
        }
        if index < 3 {
            self.cascade(index + 1, at, irq, audio);
        }
    }

    /// Tick a count-up timer; a wrap overflows it on the spot
    fn cascade(
        &mut self,
        index: usize,
        at: u64,
        irq: &mut InterruptController,
        audio: &mut dyn AudioSink,
    ) {
        let timer = &mut self.channels[index];
        if !(timer.enable && timer.count_up) {
            return;
        }
        timer.counter += 1;
        if timer.counter >= 0x10000 {
            timer.counter = timer.reload as u32;
            timer.old_reload = timer.reload;
            timer.last_event = at;
            self.overflow(index, at, irq, audio);
        }
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}
