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

//! Deadline bookkeeping
//!
//! Every peripheral that can fire on its own exposes its next deadline as
//! an absolute cycle count. The scheduler keeps only the earliest one;
//! with at most ten sources a linear scan beats any priority queue.
//!
//! # Example
//!
//! ```
//! use gbacore::core::timing::{EventSource, NextEvent};
//!
//! let mut next = NextEvent::new();
//! next.consider(EventSource::Video, Some(1006));
//! next.consider(EventSource::Timer(0), Some(300));
//! next.consider(EventSource::Dma(3), None);
//!
//! assert_eq!(next.at(), Some(300));
//! assert_eq!(next.source(), Some(EventSource::Timer(0)));
//! ```

use std::fmt;

/// Absolute time in CPU cycles since reset
pub type Cycles = u64;

/// A component that can own the next deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Video,
    Audio,
    Timer(u8),
    Dma(u8),
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Video => write!(f, "video"),
            EventSource::Audio => write!(f, "audio"),
            EventSource::Timer(n) => write!(f, "timer {}", n),
            EventSource::Dma(n) => write!(f, "DMA{}", n),
        }
    }
}

/// Running minimum over component deadlines
#[derive(Debug, Clone, Copy, Default)]
pub struct NextEvent {
    earliest: Option<(Cycles, EventSource)>,
}

impl NextEvent {
    pub fn new() -> Self {
        Self { earliest: None }
    }

    /// Offer a deadline; `None` means the source has nothing scheduled
    ///
    /// Ties keep the first source offered.
    #[inline]
    pub fn consider(&mut self, source: EventSource, deadline: Option<Cycles>) {
        let Some(at) = deadline else {
            return;
        };
        match self.earliest {
            Some((current, _)) if current <= at => {}
            _ => self.earliest = Some((at, source)),
        }
    }

    /// Earliest deadline seen
    #[inline]
    pub fn at(&self) -> Option<Cycles> {
        self.earliest.map(|(at, _)| at)
    }

    /// Source owning the earliest deadline
    pub fn source(&self) -> Option<EventSource> {
        self.earliest.map(|(_, source)| source)
    }
}
