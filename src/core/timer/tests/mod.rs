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

//! Timer bank tests
//!
//! - `basic`: reload, enable edge, counter readback and control readback
//! - `overflow`: overflow deadlines and IRQ delivery
//! - `cascade`: count-up chaining between timers

use super::*;
use crate::core::audio::{AudioSink, NullAudio};
use crate::core::interrupt::InterruptController;

mod cascade;
mod overflow;

/// Audio stub that records overflow notifications
#[derive(Default)]
struct OverflowLog {
    overflows: Vec<(usize, u64)>,
}

impl AudioSink for OverflowLog {
    fn enabled(&self) -> bool {
        false
    }

    fn next_event(&self) -> Option<u64> {
        None
    }

    fn update(&mut self, _now: u64) {}

    fn fifo_timer_overflow(&mut self, timer: usize, now: u64) {
        self.overflows.push((timer, now));
    }

    fn schedule_fifo_dma(&mut self, _channel: usize) {}
}

fn run(timers: &mut Timers, now: u64) -> InterruptController {
    let mut irq = InterruptController::new();
    timers.update(now, &mut irq, &mut NullAudio);
    irq
}
