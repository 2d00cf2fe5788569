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

//! DMA channel tests
//!
//! - `basic`: register latching, count limits and control readback
//! - `transfers`: address stepping, widths and completion interrupts
//! - `timing`: HBlank/VBlank triggers, repeat and arbitration

use super::*;
use crate::core::memory::Bus;

mod basic;

const IWRAM: u32 = 0x0300_0000;
const WRAM: u32 = 0x0200_0000;

/// Program SAD/DAD/CNT_L of a channel through its I/O registers, then
/// write CNT_H
fn start(bus: &mut Bus, channel: usize, source: u32, dest: u32, count: u16, control: u16) {
    let base = 0x0400_0000 + registers::DMA0SAD + channel as u32 * registers::DMA_STRIDE;
    bus.store32(base, source);
    bus.store32(base + 4, dest);
    bus.store16(base + 8, count);
    bus.store16(base + 10, control);
}

fn control_reg(bus: &Bus, channel: usize) -> u16 {
    bus.load_u16(0x0400_0000 + registers::dma_control(channel))
}

fn fill_words(bus: &mut Bus, at: u32, words: &[u32]) {
    for (i, &word) in words.iter().enumerate() {
        bus.store32(at + i as u32 * 4, word);
    }
}

/// Step the bus clock to `cycle` and run the scheduler
fn advance_to(bus: &mut Bus, cycle: u64) {
    let now = bus.cycles();
    if cycle > now {
        bus.idle(cycle - now);
    }
    bus.update_timers();
}
