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

//! System integration module
//!
//! Ties the CPU to the bus, inserts cartridges and BIOS images, and
//! provides the frame loop used by the command-line front end.

#[cfg(feature = "audio")]
use super::audio::AudioBackend;
use super::audio::{FifoPacer, SampleQueue};
use super::config::Config;
use super::cpu::CPU;
use super::error::{EmulatorError, Result};
use super::loader::{Cartridge, CartridgeHeader};
use super::memory::Bus;
use super::save_state::SaveState;
use std::path::Path;

/// Cartridge ROM entry point used when no BIOS runs the boot sequence
pub const ROM_ENTRY: u32 = 0x0800_0000;

/// CPSR after a hardware reset: Supervisor mode, IRQ and FIQ masked
const RESET_CPSR: u32 = 0xD3;

/// Game Boy Advance system
///
/// Owns the CPU and the bus. Peripherals (DMA, timers, interrupt
/// controller, video timing) live on the bus; the system only drives
/// execution.
///
/// # Example
/// ```no_run
/// use gbacore::core::system::System;
///
/// let mut system = System::new();
/// system.load_rom_file("game.gba").unwrap();
/// system.reset();
/// system.run_frame().unwrap();
/// ```
pub struct System {
    /// CPU instance
    cpu: CPU,
    /// Memory bus with all peripherals
    bus: Bus,
    /// Header of the inserted cartridge
    header: Option<CartridgeHeader>,
    /// Active configuration
    config: Config,
    /// Frames produced for the host audio thread
    samples: SampleQueue,
    /// Audio output backend (optional, may not be available on all systems)
    #[cfg(feature = "audio")]
    audio: Option<AudioBackend>,
}

impl System {
    /// Create a system with the default configuration and no cartridge
    pub fn new() -> Self {
        let config = Config::default();
        let samples = SampleQueue::new(config.audio_queue_capacity);
        let mut bus = Bus::new();
        bus.set_audio(Box::new(FifoPacer::new(samples.clone())));

        let mut system = Self {
            cpu: CPU::new(),
            bus,
            header: None,
            config,
            samples,
            #[cfg(feature = "audio")]
            audio: None,
        };
        system.reset();
        system
    }

    /// Create a system and apply `config`
    ///
    /// A BIOS image named by the configuration is loaded immediately.
    ///
    /// # Errors
    ///
    /// Fails when the configured BIOS cannot be read or has a bad size.
    pub fn with_config(config: Config) -> Result<Self> {
        let mut system = Self::new();
        system.samples = SampleQueue::new(config.audio_queue_capacity);
        system
            .bus
            .set_audio(Box::new(FifoPacer::new(system.samples.clone())));
        if let Some(path) = config.bios() {
            system.load_bios_file(path)?;
        }
        system.config = config;
        system.reset();
        Ok(system)
    }

    /// Start host audio output
    ///
    /// Failure is not fatal: the core keeps running and samples are
    /// dropped once the queue fills.
    #[cfg(feature = "audio")]
    pub fn start_audio(&mut self) {
        if self.audio.is_some() {
            return;
        }
        self.audio = match AudioBackend::new(self.samples.clone()) {
            Ok(backend) => {
                log::info!("Audio backend initialized ({} Hz)", backend.sample_rate());
                Some(backend)
            }
            Err(e) => {
                log::warn!("Failed to initialize audio backend: {}", e);
                log::warn!("Audio output will be disabled");
                None
            }
        };
    }

    /// Validate and insert a cartridge image
    ///
    /// # Errors
    ///
    /// `InvalidRom` when the header check fails; the previous cartridge
    /// stays inserted.
    pub fn load_rom(&mut self, data: Vec<u8>) -> Result<&CartridgeHeader> {
        let cartridge = Cartridge::load(data)?;
        self.bus.load_rom(cartridge.data);
        Ok(self.header.insert(cartridge.header))
    }

    /// Read, validate and insert a cartridge image file
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<&CartridgeHeader> {
        let cartridge = Cartridge::load_file(path)?;
        self.bus.load_rom(cartridge.data);
        Ok(self.header.insert(cartridge.header))
    }

    /// Install a BIOS image
    ///
    /// Software interrupts trap into the image from now on. Call
    /// [`System::reset`] to boot through it.
    pub fn load_bios(&mut self, data: &[u8]) -> Result<()> {
        self.bus.load_bios(data)
    }

    /// Read and install a BIOS image file
    pub fn load_bios_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| EmulatorError::LoaderError(format!("{}: {}", path.display(), e)))?;
        self.load_bios(&data)
    }

    /// Reset the system to its power-on state
    ///
    /// With a real BIOS the CPU starts at the reset vector in Supervisor
    /// mode. Otherwise it starts at the cartridge entry point in System
    /// mode with the stacks the BIOS would have installed. Either way all
    /// compiled code and chain links are discarded.
    pub fn reset(&mut self) {
        self.bus.reset();
        if self.bus.has_real_bios() {
            self.cpu.reset(0);
            self.cpu.set_cpsr(RESET_CPSR);
        } else {
            self.cpu.reset(ROM_ENTRY);
            self.cpu.reset_stacks();
        }
        log::info!("System reset, PC = 0x{:08X}", self.cpu.pc());
    }

    /// Execute one CPU instruction (or one halted slice)
    ///
    /// # Errors
    ///
    /// Propagates the faults `CPU::step` reports.
    pub fn step(&mut self) -> Result<()> {
        self.cpu.step(&mut self.bus)
    }

    /// Execute `n` steps, stopping at the first error
    pub fn step_n(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Run until the next Vblank begins
    pub fn run_frame(&mut self) -> Result<()> {
        let frame = self.frame_count();
        while self.frame_count() == frame {
            self.step()?;
        }
        log::trace!("Frame {} done at cycle {}", self.frame_count(), self.cycles());
        Ok(())
    }

    /// Step until the CPU halts or `max_steps` steps have executed
    ///
    /// Returns the number of steps taken.
    pub fn run_until_halt(&mut self, max_steps: u64) -> Result<u64> {
        let mut steps = 0;
        while steps < max_steps && !self.cpu.is_halted() {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Address of the next instruction
    pub fn pc(&self) -> u32 {
        self.cpu.pc()
    }

    /// Total cycles since reset
    pub fn cycles(&self) -> u64 {
        self.bus.cycles()
    }

    /// Frames (Vblank entries) since reset
    pub fn frame_count(&self) -> u64 {
        self.bus.video().frame_count()
    }

    /// Header of the inserted cartridge
    pub fn header(&self) -> Option<&CartridgeHeader> {
        self.header.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Queue the FIFO pacer feeds
    pub fn samples(&self) -> &SampleQueue {
        &self.samples
    }

    pub fn cpu(&self) -> &CPU {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU {
        &mut self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Capture a snapshot of the whole machine
    pub fn save_state(&self) -> SaveState {
        let title = self.header.as_ref().map_or("", |h| h.title.as_str());
        SaveState::capture(&self.cpu, &self.bus, title)
    }

    /// Restore a snapshot captured by [`System::save_state`]
    ///
    /// The cartridge and BIOS are not part of the snapshot; the same
    /// images must already be inserted.
    pub fn load_state(&mut self, state: &SaveState) -> Result<()> {
        state.apply(&mut self.cpu, &mut self.bus)
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
