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

//! Save state serialization
//!
//! A save state captures everything needed to resume bit-for-bit: the
//! register file with every shadow bank, the cycle counter, all writable
//! memory, the I/O register file, DMA channels, timers, interrupt
//! registers and the display clock. Cartridge ROM and BIOS are not stored;
//! the same images must be loaded before restoring.
//!
//! # Save State Format
//!
//! States are encoded with bincode (serde compatibility) and carry a
//! version number plus metadata. Loading a state written with a different
//! version fails with [`EmulatorError::SaveState`].
//!
//! Restoring drops every compiled instruction, so no chain reference from
//! before the restore can be followed afterwards.
//!
//! # Example
//!
//! ```
//! use gbacore::core::cpu::CPU;
//! use gbacore::core::memory::Bus;
//! use gbacore::core::save_state::SaveState;
//!
//! let mut cpu = CPU::new();
//! let mut bus = Bus::new();
//! bus.store32(0x0300_0000, 0xCAFE_F00D);
//! cpu.set_reg(5, 55);
//!
//! let bytes = SaveState::capture(&cpu, &bus, "demo").to_bytes().unwrap();
//!
//! let mut cpu2 = CPU::new();
//! let mut bus2 = Bus::new();
//! SaveState::from_bytes(&bytes).unwrap().apply(&mut cpu2, &mut bus2).unwrap();
//! assert_eq!(cpu2.reg(5), 55);
//! assert_eq!(bus2.load32(0x0300_0000), 0xCAFE_F00D);
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use bincode::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cpu::{CpuState, CPU};
use crate::core::dma::DmaChannel;
use crate::core::error::{EmulatorError, Result};
use crate::core::interrupt::InterruptController;
use crate::core::memory::{Bus, RegionId, IO_SIZE};
use crate::core::timer::Timers;
use crate::core::video::VideoTiming;

/// Save state version for compatibility checking
///
/// Incremented whenever the layout changes incompatibly.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Regions stored in [`MemoryState`], in order
const RAM_REGIONS: [RegionId; 6] = [
    RegionId::Wram,
    RegionId::Iwram,
    RegionId::Palette,
    RegionId::Vram,
    RegionId::Oam,
    RegionId::Sram,
];

/// Complete emulator save state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    /// Version number for compatibility checking
    pub version: u32,

    pub metadata: SaveStateMetadata,

    pub cpu: CpuState,

    pub memory: MemoryState,

    pub dma: [DmaChannel; 4],

    pub timers: Timers,

    pub interrupts: InterruptController,

    pub video: VideoTiming,

    /// Cycle counter
    pub cycles: u64,
}

/// When and where the state was taken
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveStateMetadata {
    pub timestamp: DateTime<Utc>,

    /// Cartridge title from the header
    pub title: String,

    /// Frames completed at save time
    pub frame_count: u64,
}

/// Raw contents of every writable region
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryState {
    pub wram: Vec<u8>,
    pub iwram: Vec<u8>,
    pub palette: Vec<u8>,
    pub vram: Vec<u8>,
    pub oam: Vec<u8>,
    pub sram: Vec<u8>,
    /// I/O register file, one entry per halfword
    pub io: Vec<u16>,
}

impl MemoryState {
    fn region_mut(&mut self, region: RegionId) -> Option<&mut Vec<u8>> {
        match region {
            RegionId::Wram => Some(&mut self.wram),
            RegionId::Iwram => Some(&mut self.iwram),
            RegionId::Palette => Some(&mut self.palette),
            RegionId::Vram => Some(&mut self.vram),
            RegionId::Oam => Some(&mut self.oam),
            RegionId::Sram => Some(&mut self.sram),
            _ => None,
        }
    }

    fn region(&self, region: RegionId) -> &[u8] {
        match region {
            RegionId::Wram => &self.wram,
            RegionId::Iwram => &self.iwram,
            RegionId::Palette => &self.palette,
            RegionId::Vram => &self.vram,
            RegionId::Oam => &self.oam,
            RegionId::Sram => &self.sram,
            _ => &[],
        }
    }
}

impl SaveState {
    /// Capture the current CPU and bus state
    pub fn capture(cpu: &CPU, bus: &Bus, title: &str) -> Self {
        let mut memory = MemoryState {
            io: bus.io.to_vec(),
            ..MemoryState::default()
        };
        for region in RAM_REGIONS {
            if let (Some(bytes), Some(slot)) = (bus.ram_bytes(region), memory.region_mut(region)) {
                *slot = bytes.to_vec();
            }
        }

        Self {
            version: SAVE_STATE_VERSION,
            metadata: SaveStateMetadata {
                timestamp: Utc::now(),
                title: title.to_string(),
                frame_count: bus.video.frame_count(),
            },
            cpu: cpu.snapshot(),
            memory,
            dma: bus.dma.clone(),
            timers: bus.timers.clone(),
            interrupts: bus.interrupts.clone(),
            video: bus.video.clone(),
            cycles: bus.cycles,
        }
    }

    /// Restore this state into `cpu` and `bus`
    ///
    /// The instruction cache is emptied and the next event recomputed.
    ///
    /// # Errors
    ///
    /// `SaveState` when the version does not match, the I/O block has the
    /// wrong size, or the saved CPSR holds an invalid mode. Nothing is
    /// modified in that case.
    pub fn apply(&self, cpu: &mut CPU, bus: &mut Bus) -> Result<()> {
        check_version(self.version)?;
        if self.memory.io.len() != IO_SIZE / 2 {
            return Err(EmulatorError::SaveState(format!(
                "I/O block has {} halfwords (expected {})",
                self.memory.io.len(),
                IO_SIZE / 2
            )));
        }
        cpu.restore(&self.cpu)?;

        for region in RAM_REGIONS {
            bus.restore_ram(region, self.memory.region(region));
        }
        bus.io.copy_from_slice(&self.memory.io);
        bus.dma = self.dma.clone();
        bus.timers = self.timers.clone();
        bus.interrupts = self.interrupts.clone();
        bus.video = self.video.clone();
        bus.cycles = self.cycles;
        bus.icache.clear();
        bus.poll_next_event();

        log::info!(
            "Save state restored: \"{}\" from {}, cycle {}",
            self.metadata.title,
            self.metadata.timestamp,
            self.cycles
        );
        Ok(())
    }

    /// Encode to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, config::standard())
            .map_err(|e| EmulatorError::SaveState(format!("encode failed: {}", e)))
    }

    /// Decode from bytes and check the version
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (state, _): (SaveState, usize) =
            bincode::serde::decode_from_slice(bytes, config::standard())
                .map_err(|e| EmulatorError::SaveState(format!("decode failed: {}", e)))?;
        check_version(state.version)?;
        Ok(state)
    }

    /// Save state to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Load state from a file, verifying the version
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

fn check_version(version: u32) -> Result<()> {
    if version != SAVE_STATE_VERSION {
        return Err(EmulatorError::SaveState(format!(
            "Incompatible save state version: expected {}, got {}",
            SAVE_STATE_VERSION, version
        )));
    }
    Ok(())
}
