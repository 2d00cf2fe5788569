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

//! Display timing
//!
//! Only the line clock is emulated here, not pixels: it drives the
//! VBlank/HBlank/VCounter interrupts, the VBlank/HBlank DMA triggers and
//! the DISPSTAT/VCOUNT registers.
//!
//! ```text
//! |<------ HDRAW 1006 ------>|<- HBLANK 226 ->|   one line = 1232 cycles
//! lines 0-159: visible, lines 160-227: vertical blank (VBlank flag
//! clears at line 227), 228 lines = 280896 cycles per frame
//! ```

use serde::{Deserialize, Serialize};

use super::interrupt::{interrupts, InterruptController};

/// Cycles of the visible part of a line
pub const HDRAW_LENGTH: u64 = 1006;
/// Cycles of horizontal blank
pub const HBLANK_LENGTH: u64 = 226;
/// Cycles per line
pub const HORIZONTAL_LENGTH: u64 = HDRAW_LENGTH + HBLANK_LENGTH;
/// Visible lines
pub const VERTICAL_PIXELS: i32 = 160;
/// Lines per frame
pub const VERTICAL_TOTAL: i32 = 228;
/// Cycles per frame
pub const FRAME_LENGTH: u64 = HORIZONTAL_LENGTH * VERTICAL_TOTAL as u64;

/// DISPSTAT bits that software can write
const DISPSTAT_MASK: u16 = 0xFF38;

/// What a transition asks the bus to do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoEvents {
    /// Run channels armed for HBlank
    pub hblank_dma: bool,
    /// Run channels armed for VBlank
    pub vblank_dma: bool,
}

/// Line clock state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTiming {
    /// Current line; -1 until the first HBlank ends
    vcount: i32,

    in_hblank: bool,
    in_vblank: bool,
    vcounter: bool,

    vblank_irq: bool,
    hblank_irq: bool,
    vcounter_irq: bool,
    vcount_setting: u16,

    last_hblank: u64,
    next_hblank: u64,

    /// Next transition (HBlank start or end)
    pub(crate) next_event: u64,

    /// VBlank entries since reset
    frame_count: u64,
}

impl VideoTiming {
    pub fn new() -> Self {
        Self {
            vcount: -1,
            in_hblank: false,
            in_vblank: false,
            vcounter: false,
            vblank_irq: false,
            hblank_irq: false,
            vcounter_irq: false,
            vcount_setting: 0,
            last_hblank: 0,
            next_hblank: HDRAW_LENGTH,
            next_event: HDRAW_LENGTH,
            frame_count: 0,
        }
    }

    /// Perform the transition due at `next_event`
    ///
    /// Callers loop while `now >= next_event` so a long stall cannot leave
    /// the deadline in the past.
    pub fn advance(&mut self, irq: &mut InterruptController) -> VideoEvents {
        let mut events = VideoEvents::default();

        if self.in_hblank {
            // End of HBlank
            self.in_hblank = false;
            self.vcount += 1;
            match self.vcount {
                VERTICAL_PIXELS => {
                    self.in_vblank = true;
                    events.vblank_dma = true;
                    if self.vblank_irq {
                        irq.raise(interrupts::VBLANK);
                    }
                    self.frame_count += 1;
                    log::trace!("VBlank start, frame {}", self.frame_count);
                }
                227 => self.in_vblank = false,
                VERTICAL_TOTAL => self.vcount = 0,
                _ => {}
            }

            self.vcounter = self.vcount == self.vcount_setting as i32;
            if self.vcounter && self.vcounter_irq {
                irq.raise(interrupts::VCOUNTER);
            }
            self.next_event = self.next_hblank;
        } else {
            // Start of HBlank
            self.in_hblank = true;
            self.last_hblank = self.next_hblank;
            self.next_event = self.last_hblank + HBLANK_LENGTH;
            self.next_hblank = self.last_hblank + HORIZONTAL_LENGTH;

            if (0..VERTICAL_PIXELS).contains(&self.vcount) {
                events.hblank_dma = true;
            }
            if self.hblank_irq {
                irq.raise(interrupts::HBLANK);
            }
        }

        events
    }

    /// DISPSTAT readback
    pub fn read_dispstat(&self) -> u16 {
        (self.in_vblank as u16)
            | (self.in_hblank as u16) << 1
            | (self.vcounter as u16) << 2
            | (self.vblank_irq as u16) << 3
            | (self.hblank_irq as u16) << 4
            | (self.vcounter_irq as u16) << 5
            | self.vcount_setting << 8
    }

    pub fn write_dispstat(&mut self, value: u16) {
        let value = value & DISPSTAT_MASK;
        self.vblank_irq = value & 0x0008 != 0;
        self.hblank_irq = value & 0x0010 != 0;
        self.vcounter_irq = value & 0x0020 != 0;
        self.vcount_setting = value >> 8;
        self.vcounter = self.vcount == self.vcount_setting as i32;
        log::debug!("DISPSTAT = 0x{:04X}", value);
    }

    /// VCOUNT readback
    pub fn read_vcount(&self) -> u16 {
        self.vcount.max(0) as u16
    }

    pub fn in_vblank(&self) -> bool {
        self.in_vblank
    }

    pub fn in_hblank(&self) -> bool {
        self.in_hblank
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn next_event(&self) -> u64 {
        self.next_event
    }
}

impl Default for VideoTiming {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until(video: &mut VideoTiming, irq: &mut InterruptController, now: u64) -> usize {
        let mut hblank_dmas = 0;
        while video.next_event <= now {
            if video.advance(irq).hblank_dma {
                hblank_dmas += 1;
            }
        }
        hblank_dmas
    }

    #[test]
    fn test_first_line_timing() {
        let mut video = VideoTiming::new();
        let mut irq = InterruptController::new();

        assert_eq!(video.next_event(), HDRAW_LENGTH);
        video.advance(&mut irq);
        assert!(video.in_hblank());
        assert_eq!(video.next_event(), HDRAW_LENGTH + HBLANK_LENGTH);

        video.advance(&mut irq);
        assert!(!video.in_hblank());
        assert_eq!(video.read_vcount(), 0);
        assert_eq!(video.next_event(), HORIZONTAL_LENGTH + HDRAW_LENGTH);
    }

    #[test]
    fn test_vblank_interrupt_once_per_frame() {
        let mut video = VideoTiming::new();
        let mut irq = InterruptController::new();
        video.write_dispstat(0x0008);

        let hblank_dmas = run_until(&mut video, &mut irq, 200 * HORIZONTAL_LENGTH);

        assert_eq!(video.frame_count(), 1);
        assert_ne!(irq.read_flags() & interrupts::VBLANK, 0);
        assert!(video.in_vblank());
        // HBlank DMA only on the visible lines
        assert_eq!(hblank_dmas, VERTICAL_PIXELS as usize);
    }

    #[test]
    fn test_vcounter_match() {
        let mut video = VideoTiming::new();
        let mut irq = InterruptController::new();
        video.write_dispstat(0x0520); // setting 5, irq enabled

        // Line n begins when the HBlank that started on line n - 1 ends
        run_until(&mut video, &mut irq, 6 * HORIZONTAL_LENGTH);

        assert_eq!(video.read_vcount(), 5);
        assert_eq!(video.read_dispstat() & 0x4, 0x4);
        assert_ne!(irq.read_flags() & interrupts::VCOUNTER, 0);
    }

    #[test]
    fn test_dispstat_status_bits_read_only() {
        let mut video = VideoTiming::new();
        video.write_dispstat(0xFFFF);
        assert_eq!(video.read_dispstat() & 0x3, 0);
        assert_eq!(video.read_dispstat() & 0xFF38, 0xFF38);
    }
}
