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

//! Audio boundary
//!
//! Sound synthesis lives outside the core. The core only tells the audio
//! peripheral when timers 0/1 overflow (the FIFO sample clock) and which
//! DMA channels feed the FIFOs, and asks it for its next deadline. Output
//! goes through a [`SampleQueue`] shared with the host's playback thread.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[cfg(feature = "audio")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

/// Hooks the core calls on the audio peripheral
pub trait AudioSink: Send {
    /// Whether the peripheral wants scheduler time at all
    fn enabled(&self) -> bool;

    /// Cycle of the peripheral's next deadline
    fn next_event(&self) -> Option<u64>;

    /// Called once `now` reaches `next_event`
    fn update(&mut self, now: u64);

    /// Timer 0 or 1 overflowed
    fn fifo_timer_overflow(&mut self, timer: usize, now: u64);

    /// DMA channel 1 or 2 was armed with the FIFO timing
    fn schedule_fifo_dma(&mut self, channel: usize);

    /// Return to power-on state
    fn reset(&mut self) {}
}

/// Audio peripheral that never schedules and ignores notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn enabled(&self) -> bool {
        false
    }

    fn next_event(&self) -> Option<u64> {
        None
    }

    fn update(&mut self, _now: u64) {}

    fn fifo_timer_overflow(&mut self, _timer: usize, _now: u64) {}

    fn schedule_fifo_dma(&mut self, _channel: usize) {}
}

/// Bounded stereo sample queue shared with a host playback thread
///
/// When full, the oldest samples are dropped so the emulated side never
/// blocks on the host.
///
/// # Example
///
/// ```
/// use gbacore::core::audio::SampleQueue;
///
/// let queue = SampleQueue::new(2);
/// queue.push((1, 1));
/// queue.push((2, 2));
/// queue.push((3, 3));
///
/// assert_eq!(queue.len(), 2);
/// assert_eq!(queue.pop(), Some((2, 2)));
/// ```
#[derive(Debug, Clone)]
pub struct SampleQueue {
    samples: Arc<Mutex<VecDeque<(i16, i16)>>>,
    capacity: usize,
}

impl SampleQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Append one stereo frame, dropping the oldest when full
    pub fn push(&self, sample: (i16, i16)) {
        if let Ok(mut samples) = self.samples.lock() {
            if samples.len() >= self.capacity {
                samples.pop_front();
            }
            samples.push_back(sample);
        }
    }

    pub fn pop(&self) -> Option<(i16, i16)> {
        self.samples.lock().ok()?.pop_front()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
    }
}

/// FIFO pacing without synthesis
///
/// Emits one (silent) stereo frame per overflow of the timer clocking FIFO
/// A, which keeps a host consumer fed at the rate the game programmed.
#[derive(Debug)]
pub struct FifoPacer {
    queue: SampleQueue,
    /// Timer driving FIFO A
    sample_timer: usize,
    /// DMA channels armed for FIFO refills
    fifo_channels: [bool; 4],
    overflows: u64,
}

impl FifoPacer {
    pub fn new(queue: SampleQueue) -> Self {
        Self {
            queue,
            sample_timer: 0,
            fifo_channels: [false; 4],
            overflows: 0,
        }
    }

    /// Select which timer (0 or 1) clocks the FIFO
    pub fn set_sample_timer(&mut self, timer: usize) {
        self.sample_timer = timer & 1;
    }

    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    pub fn is_fifo_channel(&self, channel: usize) -> bool {
        self.fifo_channels.get(channel).copied().unwrap_or(false)
    }
}

impl AudioSink for FifoPacer {
    fn enabled(&self) -> bool {
        false
    }

    fn next_event(&self) -> Option<u64> {
        None
    }

    fn update(&mut self, _now: u64) {}

    fn fifo_timer_overflow(&mut self, timer: usize, _now: u64) {
        if timer == self.sample_timer {
            self.overflows += 1;
            self.queue.push((0, 0));
        }
    }

    fn schedule_fifo_dma(&mut self, channel: usize) {
        log::debug!("DMA{} feeds the sound FIFO", channel);
        if let Some(slot) = self.fifo_channels.get_mut(channel) {
            *slot = true;
        }
    }

    fn reset(&mut self) {
        self.overflows = 0;
        self.fifo_channels = [false; 4];
        self.queue.clear();
    }
}

/// Audio output backend
///
/// Drains a [`SampleQueue`] into the default cpal output device, outputting
/// silence on underrun.
#[cfg(feature = "audio")]
pub struct AudioBackend {
    #[allow(dead_code)]
    stream: cpal::Stream,
    sample_rate: u32,
}

#[cfg(feature = "audio")]
impl AudioBackend {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Fails if no output device exists, it is not stereo, or the stream
    /// cannot be built.
    pub fn new(queue: SampleQueue) -> Result<Self, Box<dyn std::error::Error>> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("No audio output device available")?;

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels();

        if channels != 2 {
            return Err(format!(
                "Audio backend requires stereo output (2 channels), device has {}",
                channels
            )
            .into());
        }

        log::info!(
            "Audio: Using device '{}' at {} Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate
        );

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(2) {
                    let (left, right) = queue.pop().unwrap_or((0, 0));
                    frame[0] = left as f32 / 32768.0;
                    if let Some(slot) = frame.get_mut(1) {
                        *slot = right as f32 / 32768.0;
                    }
                }
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )?;

        stream.play()?;

        Ok(Self {
            stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
