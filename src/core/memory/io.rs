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

//! Memory-mapped I/O register dispatch
//!
//! Registers with behavior (display status, DMA, timers, interrupt
//! control, WAITCNT, HALTCNT) are routed to their owners. Everything else
//! is plain storage in a shadow array holding the last value written, so
//! peripherals outside the core can read back what software programmed.
//! 32-bit accesses are split into two 16-bit ones, low half first.

use super::{Bus, IO_SIZE};

/// I/O register offsets (relative to 0x04000000)
pub mod registers {
    pub const DISPCNT: u32 = 0x000;
    pub const DISPSTAT: u32 = 0x004;
    pub const VCOUNT: u32 = 0x006;

    pub const DMA0SAD: u32 = 0x0B0;
    /// Bytes between consecutive DMA channel register blocks
    pub const DMA_STRIDE: u32 = 12;
    pub const DMA_END: u32 = DMA0SAD + 4 * DMA_STRIDE;

    pub const TM0CNT_L: u32 = 0x100;
    pub const TM_END: u32 = TM0CNT_L + 16;

    pub const KEYINPUT: u32 = 0x130;

    pub const IE: u32 = 0x200;
    pub const IF: u32 = 0x202;
    pub const WAITCNT: u32 = 0x204;
    pub const IME: u32 = 0x208;
    pub const POSTFLG: u32 = 0x300;
    pub const HALTCNT: u32 = 0x301;

    /// Offset of DMAxCNT_H
    #[inline(always)]
    pub const fn dma_control(channel: usize) -> u32 {
        DMA0SAD + channel as u32 * DMA_STRIDE + 10
    }

    /// Offset of TMxCNT_L
    #[inline(always)]
    pub const fn timer_counter(timer: usize) -> u32 {
        TM0CNT_L + timer as u32 * 4
    }
}

use registers::*;

impl Bus {
    #[inline(always)]
    fn shadow(&self, offset: u32) -> u16 {
        self.io[(offset >> 1) as usize]
    }

    #[inline(always)]
    fn set_shadow(&mut self, offset: u32, value: u16) {
        self.io[(offset >> 1) as usize] = value;
    }

    /// Read a halfword register (offset already halfword-aligned)
    pub(super) fn read_io16(&self, offset: u32) -> u16 {
        if offset as usize >= IO_SIZE {
            return 0;
        }
        match offset {
            DISPSTAT => self.video.read_dispstat(),
            VCOUNT => self.video.read_vcount(),

            DMA0SAD..DMA_END => {
                if (offset - DMA0SAD) % DMA_STRIDE == 10 {
                    self.shadow(offset)
                } else {
                    // Address and count registers are write-only
                    0
                }
            }

            TM0CNT_L..TM_END => {
                let timer = ((offset - TM0CNT_L) >> 2) as usize;
                if offset & 2 == 0 {
                    self.timers.read_counter(timer, self.cycles)
                } else {
                    self.timers.read_control(timer)
                }
            }

            IE => self.interrupts.read_enable(),
            IF => self.interrupts.read_flags(),
            IME => self.interrupts.read_master_enable(),

            _ => self.shadow(offset),
        }
    }

    pub(super) fn read_io8(&self, offset: u32) -> u8 {
        (self.read_io16(offset & !1) >> ((offset & 1) * 8)) as u8
    }

    pub(super) fn read_io32(&self, offset: u32) -> u32 {
        self.read_io16(offset) as u32 | (self.read_io16(offset + 2) as u32) << 16
    }

    /// Write a halfword register (offset already halfword-aligned)
    pub(super) fn write_io16(&mut self, offset: u32, value: u16) {
        if offset as usize >= IO_SIZE {
            log::trace!("Write to unmapped I/O 0x{:03X} = 0x{:04X}", offset, value);
            return;
        }
        match offset {
            DISPSTAT => {
                self.video.write_dispstat(value);
                self.set_shadow(offset, value);
            }
            VCOUNT | KEYINPUT => {}

            DMA0SAD..DMA_END => {
                let channel = ((offset - DMA0SAD) / DMA_STRIDE) as usize;
                self.set_shadow(offset, value);
                match (offset - DMA0SAD) % DMA_STRIDE {
                    0 => self.dma[channel].write_source(value, false),
                    2 => self.dma[channel].write_source(value, true),
                    4 => self.dma[channel].write_dest(value, false),
                    6 => self.dma[channel].write_dest(value, true),
                    8 => self.dma[channel].write_count(value),
                    _ => self.write_dma_control(channel, value),
                }
            }

            TM0CNT_L..TM_END => {
                let timer = ((offset - TM0CNT_L) >> 2) as usize;
                self.set_shadow(offset, value);
                if offset & 2 == 0 {
                    self.timers.write_reload(timer, value);
                } else {
                    self.timers.write_control(timer, value, self.cycles);
                    self.poll_next_event();
                }
            }

            IE => {
                self.interrupts.write_enable(value);
                self.set_shadow(offset, value);
            }
            IF => self.interrupts.acknowledge(value),
            IME => {
                self.interrupts.write_master_enable(value);
                self.set_shadow(offset, value);
            }
            WAITCNT => {
                self.wait.adjust(value);
                self.set_shadow(offset, value);
                log::debug!("WAITCNT = 0x{:04X}", value);
            }
            POSTFLG => {
                self.set_shadow(offset, value);
                self.write_haltcnt((value >> 8) as u8);
            }

            _ => self.set_shadow(offset, value),
        }
    }

    pub(super) fn write_io8(&mut self, offset: u32, value: u8) {
        match offset {
            HALTCNT => self.write_haltcnt(value),
            IF | 0x203 => {
                // Acknowledge only the written byte's bits
                self.interrupts
                    .acknowledge((value as u16) << ((offset & 1) * 8));
            }
            POSTFLG => {
                let merged = (self.shadow(POSTFLG) & 0xFF00) | value as u16;
                self.set_shadow(POSTFLG, merged);
            }
            _ => {
                let aligned = offset & !1;
                if aligned as usize >= IO_SIZE {
                    return;
                }
                let shift = (offset & 1) * 8;
                let merged = (self.shadow(aligned) & !(0xFF << shift)) | (value as u16) << shift;
                self.write_io16(aligned, merged);
            }
        }
    }

    pub(super) fn write_io32(&mut self, offset: u32, value: u32) {
        self.write_io16(offset, value as u16);
        self.write_io16(offset + 2, (value >> 16) as u16);
    }

    fn write_haltcnt(&mut self, value: u8) {
        if value & 0x80 != 0 {
            self.report_unsupported("STOP mode (treated as halt)");
        }
        self.request_halt();
    }
}
