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

//! Event scheduler
//!
//! `update_timers` is called once per CPU step. It does nothing until the
//! cycle counter reaches `next_event`; then it brings the display clock,
//! audio, timers and DMA completions up to date (in that order) and
//! recomputes the deadline.

use crate::core::dma::DmaTiming;
use crate::core::memory::Bus;
use crate::core::timing::{EventSource, NextEvent};

impl Bus {
    /// An enabled interrupt is pending and IME is set
    #[inline(always)]
    pub fn irq_pending(&self) -> bool {
        self.interrupts.is_pending()
    }

    /// Latch an interrupt request from any source
    pub fn raise_irq(&mut self, source: u16) {
        self.interrupts.raise(source);
    }

    /// Service every peripheral deadline that has been reached
    ///
    /// Timers are processed before DMA completions, so a timer overflow
    /// and a DMA completion due on the same cycle both land in IF before
    /// the CPU looks at it and produce a single IRQ entry.
    pub fn update_timers(&mut self) {
        if self.cycles < self.interrupts.next_event {
            return;
        }

        while self.cycles >= self.video.next_event {
            let events = self.video.advance(&mut self.interrupts);
            if events.hblank_dma {
                self.run_timed_dmas(DmaTiming::HBlank);
            }
            if events.vblank_dma {
                self.run_timed_dmas(DmaTiming::VBlank);
            }
        }

        let now = self.cycles;
        if self.audio.enabled() {
            if let Some(at) = self.audio.next_event() {
                if now >= at {
                    self.audio.update(now);
                }
            }
        }

        self.timers
            .update(now, &mut self.interrupts, self.audio.as_mut());
        self.update_dma_irqs();

        let next = self.poll_next_event();
        if next.at().is_some_and(|at| at < now) {
            let source = next
                .source()
                .map(|s| s.to_string())
                .unwrap_or_default();
            self.record_fault(format!(
                "next event ({}) at cycle {} precedes current cycle {}",
                source,
                next.at().unwrap_or_default(),
                now
            ));
        }
    }

    /// Recompute `next_event` from every component deadline
    ///
    /// Called after any register write that may have moved a deadline
    /// earlier. Deadlines may already be due when called mid-instruction;
    /// they are serviced by the `update_timers` that ends the step.
    pub fn poll_next_event(&mut self) -> NextEvent {
        let mut next = NextEvent::new();
        next.consider(EventSource::Video, Some(self.video.next_event));
        if self.audio.enabled() {
            next.consider(EventSource::Audio, self.audio.next_event());
        }
        for i in 0..4 {
            next.consider(EventSource::Timer(i as u8), self.timers.channel(i).next_event());
        }
        for (i, channel) in self.dma.iter().enumerate() {
            if channel.do_irq {
                next.consider(EventSource::Dma(i as u8), channel.next_irq);
            }
        }
        self.interrupts.next_event = next.at().unwrap_or(u64::MAX);
        next
    }
}
