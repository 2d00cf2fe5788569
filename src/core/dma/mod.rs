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

//! DMA Controller
//!
//! Four channels copy halfwords or words between any two bus addresses
//! without CPU involvement. Channel 3 is the only one that can read the
//! cartridge; channels 1 and 2 feed the sound FIFOs.
//!
//! # Channel Registers
//!
//! | Channel | SAD        | DAD        | CNT_L      | CNT_H      |
//! |---------|------------|------------|------------|------------|
//! | 0       | 0x040000B0 | 0x040000B4 | 0x040000B8 | 0x040000BA |
//! | 1       | 0x040000BC | 0x040000C0 | 0x040000C4 | 0x040000C6 |
//! | 2       | 0x040000C8 | 0x040000CC | 0x040000D0 | 0x040000D2 |
//! | 3       | 0x040000D4 | 0x040000D8 | 0x040000DC | 0x040000DE |
//!
//! # Control Register (CNT_H)
//!
//! ```text
//! 15:    Enable
//! 14:    IRQ on completion
//! 13-12: Start timing (0=immediate, 1=VBlank, 2=HBlank, 3=special)
//! 11:    Game Pak DRQ (channel 3)
//! 10:    Width (0=16-bit, 1=32-bit)
//! 9:     Repeat
//! 8-7:   Source control (0=inc, 1=dec, 2=fixed)
//! 6-5:   Destination control (0=inc, 1=dec, 2=fixed, 3=inc+reload)
//! ```
//!
//! # Lifecycle
//!
//! Idle → armed by the enable edge → serviced when its timing condition
//! occurs → idle again, or re-armed with the original count when
//! repeating. Completion interrupts are not raised synchronously: the
//! channel records the cycle at which the transfer would have finished
//! and the scheduler raises the interrupt when the clock gets there.

#[cfg(test)]
mod tests;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::interrupt::interrupts;
use crate::core::memory::{registers, Bus, RegionId};

bitflags! {
    /// DMAxCNT_H bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaControl: u16 {
        const DEST = 0x0060;
        const SRC = 0x0180;
        const REPEAT = 0x0200;
        const WIDTH = 0x0400;
        const DRQ = 0x0800;
        const TIMING = 0x3000;
        const IRQ = 0x4000;
        const ENABLE = 0x8000;
    }
}

/// Per-endpoint address stepping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressControl {
    Increment,
    Decrement,
    Fixed,
    /// Increment, and restore the destination when a repeat re-arms
    IncrementReload,
}

impl AddressControl {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => AddressControl::Increment,
            1 => AddressControl::Decrement,
            2 => AddressControl::Fixed,
            _ => AddressControl::IncrementReload,
        }
    }

    /// Address step for one unit of `width` bytes
    #[inline(always)]
    fn step(self, width: u32) -> u32 {
        match self {
            AddressControl::Increment | AddressControl::IncrementReload => width,
            AddressControl::Decrement => width.wrapping_neg(),
            AddressControl::Fixed => 0,
        }
    }
}

/// When an armed channel runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmaTiming {
    Now,
    VBlank,
    HBlank,
    /// Sound FIFO (channels 1/2) or video capture (channel 3)
    Custom,
}

impl DmaTiming {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => DmaTiming::Now,
            1 => DmaTiming::VBlank,
            2 => DmaTiming::HBlank,
            _ => DmaTiming::Custom,
        }
    }
}

/// One DMA channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmaChannel {
    pub(crate) index: usize,

    /// Values written to SAD/DAD/CNT_L
    pub(crate) source: u32,
    pub(crate) dest: u32,
    pub(crate) count: u32,

    /// Working copies, latched on the enable edge
    pub(crate) next_source: u32,
    pub(crate) next_dest: u32,
    pub(crate) next_count: u32,

    pub(crate) src_control: AddressControl,
    pub(crate) dst_control: AddressControl,
    pub(crate) repeat: bool,
    pub(crate) width: u32,
    pub(crate) drq: bool,
    pub(crate) timing: DmaTiming,
    pub(crate) do_irq: bool,
    pub(crate) enable: bool,

    /// Cycle at which the completion interrupt fires
    pub(crate) next_irq: Option<u64>,
}

impl DmaChannel {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            source: 0,
            dest: 0,
            count: 0,
            next_source: 0,
            next_dest: 0,
            next_count: 0,
            src_control: AddressControl::Increment,
            dst_control: AddressControl::Increment,
            repeat: false,
            width: 2,
            drq: false,
            timing: DmaTiming::Now,
            do_irq: false,
            enable: false,
            next_irq: None,
        }
    }

    /// Write the low or high half of SAD
    pub fn write_source(&mut self, value: u16, high: bool) {
        self.source = merge_half(self.source, value, high) & 0x0FFF_FFFE;
    }

    /// Write the low or high half of DAD
    pub fn write_dest(&mut self, value: u16, high: bool) {
        self.dest = merge_half(self.dest, value, high) & 0x0FFF_FFFE;
    }

    /// Write CNT_L; zero means the maximum count
    pub fn write_count(&mut self, value: u16) {
        let (mask, max) = if self.index == 3 {
            (0xFFFF, 0x10000)
        } else {
            (0x3FFF, 0x4000)
        };
        let count = value as u32 & mask;
        self.count = if count == 0 { max } else { count };
    }

    pub fn is_enabled(&self) -> bool {
        self.enable
    }

    pub fn timing(&self) -> DmaTiming {
        self.timing
    }

    pub fn next_irq(&self) -> Option<u64> {
        self.next_irq
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

#[inline(always)]
fn merge_half(word: u32, value: u16, high: bool) -> u32 {
    if high {
        (word & 0x0000_FFFF) | (value as u32) << 16
    } else {
        (word & 0xFFFF_0000) | value as u32
    }
}

impl Bus {
    /// Write DMAxCNT_H
    ///
    /// The enable edge latches the address and count registers and arms
    /// the channel for its timing condition; immediate channels run before
    /// this returns.
    pub(crate) fn write_dma_control(&mut self, index: usize, value: u16) {
        let control = DmaControl::from_bits_truncate(value);
        let channel = &mut self.dma[index];
        let was_enabled = channel.enable;

        channel.dst_control = AddressControl::from_bits((control & DmaControl::DEST).bits() >> 5);
        channel.src_control = AddressControl::from_bits((control & DmaControl::SRC).bits() >> 7);
        channel.repeat = control.contains(DmaControl::REPEAT);
        channel.width = if control.contains(DmaControl::WIDTH) { 4 } else { 2 };
        channel.drq = control.contains(DmaControl::DRQ);
        channel.timing = DmaTiming::from_bits((control & DmaControl::TIMING).bits() >> 12);
        channel.do_irq = control.contains(DmaControl::IRQ);
        channel.enable = control.contains(DmaControl::ENABLE);
        channel.next_irq = None;

        log::debug!("DMA{} CNT_HI = 0x{:04X}", index, value);

        let arm = channel.enable && !was_enabled;
        if arm {
            channel.next_source = channel.source;
            channel.next_dest = channel.dest;
            channel.next_count = channel.count;
        }

        let drq = channel.drq;
        let reload_source = channel.src_control == AddressControl::IncrementReload;

        if drq {
            self.report_unsupported("Game Pak DRQ DMA");
        }
        if reload_source {
            log::warn!("DMA{}: prohibited source address control", index);
        }

        if arm {
            self.schedule_dma(index);
        }
        self.poll_next_event();
    }

    /// Arm a channel for its timing condition
    pub fn schedule_dma(&mut self, index: usize) {
        match self.dma[index].timing {
            DmaTiming::Now => self.service_dma(index),
            DmaTiming::VBlank | DmaTiming::HBlank => {}
            DmaTiming::Custom => match index {
                0 => log::warn!("DMA0: special start timing is not valid"),
                1 | 2 => self.audio.schedule_fifo_dma(index),
                _ => self.report_unsupported("video capture DMA"),
            },
        }
    }

    /// Run every enabled channel armed for `timing`, lowest channel first
    pub(crate) fn run_timed_dmas(&mut self, timing: DmaTiming) {
        for index in 0..4 {
            if self.dma[index].enable && self.dma[index].timing == timing {
                self.service_dma(index);
            }
        }
    }

    /// Perform one complete transfer on a channel
    pub(crate) fn service_dma(&mut self, index: usize) {
        let channel = &self.dma[index];
        if !channel.enable {
            return;
        }

        let width = channel.width;
        let count = channel.next_count;
        let src_step = channel.src_control.step(width);
        let dst_step = channel.dst_control.step(width);
        let start_source = channel.next_source & !(width - 1);
        let start_dest = channel.next_dest & !(width - 1);
        let mut source = start_source;
        let mut dest = start_dest;

        let source_region = RegionId::of(source);
        let dest_region = RegionId::of(dest);
        let direct = dest_region.is_work_ram()
            && (source_region.is_work_ram() || matches!(source_region, RegionId::Cart(_)));

        log::trace!(
            "DMA{}: {} x {} bytes 0x{:08X} -> 0x{:08X}",
            index,
            count,
            width,
            source,
            dest
        );

        for _ in 0..count {
            if direct {
                self.copy_word_direct(source, dest, width);
                self.icache.invalidate(dest);
            } else if width == 4 {
                let word = self.load32(source);
                self.store32(dest, word);
            } else {
                let half = self.load_u16(source);
                self.store16(dest, half);
            }
            source = source.wrapping_add(src_step);
            dest = dest.wrapping_add(dst_step);
        }

        let cycles = self.cycles;
        let (nonseq, seq) = if width == 4 {
            (&self.wait.nonseq32, &self.wait.seq32)
        } else {
            (&self.wait.nonseq16, &self.wait.seq16)
        };
        let src_index = (start_source >> 24) as usize;
        let dst_index = (start_dest >> 24) as usize;
        let cost = 2
            + (nonseq[src_index] + nonseq[dst_index]) as u64
            + count.saturating_sub(1) as u64 * (seq[src_index] + seq[dst_index]) as u64;

        let channel = &mut self.dma[index];
        channel.next_source = source;
        channel.next_dest = dest;
        channel.next_count = 0;
        if channel.do_irq {
            channel.next_irq = Some(cycles + cost);
        }

        let repeat = channel.repeat && channel.timing != DmaTiming::Now;
        if repeat {
            channel.next_count = channel.count;
            if channel.dst_control == AddressControl::IncrementReload {
                channel.next_dest = channel.dest;
            }
            self.schedule_dma(index);
        } else {
            channel.enable = false;
            let control = registers::dma_control(index);
            self.io[(control >> 1) as usize] &= 0x7FE0;
        }

        self.poll_next_event();
    }

    /// Raise the completion interrupt of every channel whose deadline has passed
    pub(crate) fn update_dma_irqs(&mut self) {
        let now = self.cycles;
        for index in 0..4 {
            let channel = &mut self.dma[index];
            match channel.next_irq {
                Some(at) if channel.do_irq && now >= at => {
                    channel.next_irq = None;
                    self.interrupts.raise(interrupts::dma(index));
                }
                _ => {}
            }
        }
    }
}

