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

//! Memory bus
//!
//! The Bus owns every memory region, the I/O register file and the
//! peripherals that live behind it (interrupt controller, DMA, timers,
//! video timing, audio hook). It also owns the cycle counter: every
//! `wait*` call charges the access cost of one bus transaction to it.
//!
//! # Memory Map
//!
//! | Address range            | Region      | Size   | Access |
//! |--------------------------|-------------|--------|--------|
//! | 0x00000000-0x00003FFF    | BIOS        | 16KB   | R only |
//! | 0x02000000-0x0203FFFF    | WRAM        | 256KB  | R/W    |
//! | 0x03000000-0x03007FFF    | IWRAM       | 32KB   | R/W    |
//! | 0x04000000-0x040003FF    | I/O         | 1KB    | R/W    |
//! | 0x05000000-0x050003FF    | Palette     | 1KB    | R/W    |
//! | 0x06000000-0x06017FFF    | VRAM        | 96KB   | R/W    |
//! | 0x07000000-0x070003FF    | OAM         | 1KB    | R/W    |
//! | 0x08000000-0x0DFFFFFF    | Cartridge   | 3×32MB | R only |
//! | 0x0E000000-0x0E007FFF    | SRAM        | 32KB   | R/W    |
//!
//! Each region mirrors across its 16MB window. Anything else is open bus:
//! reads return the opcode currently being prefetched and never fail.
//!
//! # Example
//!
//! ```
//! use gbacore::core::memory::Bus;
//!
//! let mut bus = Bus::new();
//!
//! bus.store32(0x0300_0000, 0x1234_5678);
//! assert_eq!(bus.load32(0x0300_0000), 0x1234_5678);
//!
//! // IWRAM mirrors every 32KB
//! assert_eq!(bus.load32(0x0300_8000), 0x1234_5678);
//!
//! // Unaligned word loads rotate
//! assert_eq!(bus.load32(0x0300_0001), 0x7812_3456);
//! ```

mod io;
mod region;
mod wait_states;

#[cfg(test)]
mod tests;

pub use io::registers;
pub use region::{MemoryBlock, MemoryRegion, RegionId, RomView, SaveRam, OFFSET_MASK};
pub use wait_states::WaitStates;

use crate::core::audio::{AudioSink, NullAudio};
use crate::core::cpu::icache::InstructionCache;
use crate::core::dma::DmaChannel;
use crate::core::error::{EmulatorError, Result};
use crate::core::interrupt::InterruptController;
use crate::core::timer::Timers;
use crate::core::video::VideoTiming;

/// BIOS size (16KB)
pub const BIOS_SIZE: usize = 0x4000;
/// On-board work RAM size (256KB)
pub const WRAM_SIZE: usize = 0x40000;
/// In-chip work RAM size (32KB)
pub const IWRAM_SIZE: usize = 0x8000;
/// I/O register block size
pub const IO_SIZE: usize = 0x400;
/// Palette RAM size
pub const PALETTE_SIZE: usize = 0x400;
/// Video RAM size (96KB)
pub const VRAM_SIZE: usize = 0x18000;
/// Object attribute memory size
pub const OAM_SIZE: usize = 0x400;
/// Largest cartridge image (32MB)
pub const ROM_MAX_SIZE: usize = 0x0200_0000;

/// Built-in IRQ dispatcher placed at the IRQ vector when no BIOS image
/// is loaded
///
/// ```text
/// 0x18: stmfd sp!, {r0-r3, r12, lr}
/// 0x1C: mov   r0, #0x04000000
/// 0x20: add   lr, pc, #0
/// 0x24: ldr   pc, [r0, #-4]        ; user handler at 0x03007FFC
/// 0x28: ldmfd sp!, {r0-r3, r12, lr}
/// 0x2C: subs  pc, lr, #4
/// ```
const IRQ_DISPATCH_STUB: [u32; 6] = [
    0xE92D_500F,
    0xE3A0_0301,
    0xE28F_E000,
    0xE510_F004,
    0xE8BD_500F,
    0xE25E_F004,
];

/// IRQ vector address
const IRQ_VECTOR: usize = 0x18;

/// Memory bus managing all memory accesses and bus-side peripherals
pub struct Bus {
    bios: MemoryBlock,
    /// A real BIOS image is loaded (SWIs trap instead of being serviced in Rust)
    bios_real: bool,

    wram: MemoryBlock,
    iwram: MemoryBlock,

    /// Last value written to each 16-bit I/O register
    pub(crate) io: [u16; IO_SIZE / 2],

    palette: MemoryBlock,
    vram: MemoryBlock,
    oam: MemoryBlock,
    rom: RomView,
    sram: SaveRam,

    /// Decoded instruction pages; stores invalidate them
    pub(crate) icache: InstructionCache,

    pub(crate) wait: WaitStates,

    /// Master cycle counter
    pub(crate) cycles: u64,

    pub(crate) interrupts: InterruptController,
    pub(crate) dma: [DmaChannel; 4],
    pub(crate) timers: Timers,
    pub(crate) video: VideoTiming,
    pub(crate) audio: Box<dyn AudioSink>,

    /// Address of the instruction being executed, for open-bus reads
    open_bus_pc: u32,
    /// Whether that instruction is Thumb
    open_bus_thumb: bool,

    /// Set by a HALTCNT write; consumed by the CPU after the current step
    halt_requested: bool,

    /// Number of UnsupportedFeature reports
    unsupported_count: u64,

    /// Scheduler invariant violation waiting to be surfaced by `CPU::step`
    fault: Option<String>,
}

impl Bus {
    /// Create a new Bus instance
    ///
    /// All RAM is zeroed, no cartridge is inserted and the built-in IRQ
    /// dispatcher occupies the BIOS region.
    pub fn new() -> Self {
        let mut bus = Self {
            bios: MemoryBlock::read_only(BIOS_SIZE, Some(16)),
            bios_real: false,
            wram: MemoryBlock::new(WRAM_SIZE, Some(9)),
            iwram: MemoryBlock::new(IWRAM_SIZE, Some(7)),
            io: [0; IO_SIZE / 2],
            palette: MemoryBlock::new(PALETTE_SIZE, Some(8)),
            vram: MemoryBlock::new(VRAM_SIZE, Some(8)),
            oam: MemoryBlock::new(OAM_SIZE, Some(8)),
            rom: RomView::default(),
            sram: SaveRam::new(),
            icache: InstructionCache::new(),
            wait: WaitStates::new(),
            cycles: 0,
            interrupts: InterruptController::new(),
            dma: std::array::from_fn(DmaChannel::new),
            timers: Timers::new(),
            video: VideoTiming::new(),
            audio: Box::new(NullAudio),
            open_bus_pc: 0,
            open_bus_thumb: false,
            halt_requested: false,
            unsupported_count: 0,
            fault: None,
        };
        bus.install_bios_stub();
        bus.reset_io();
        bus
    }

    /// Reset the bus to its power-on state
    ///
    /// Volatile memory, I/O state, peripherals, the cycle counter and the
    /// instruction cache are cleared. BIOS, cartridge and SRAM contents are
    /// kept.
    pub fn reset(&mut self) {
        self.wram.clear_range(0, WRAM_SIZE);
        self.iwram.clear_range(0, IWRAM_SIZE);
        self.palette.clear_range(0, PALETTE_SIZE);
        self.vram.clear_range(0, VRAM_SIZE);
        self.oam.clear_range(0, OAM_SIZE);
        self.icache.clear();
        self.wait = WaitStates::new();
        self.cycles = 0;
        self.interrupts = InterruptController::new();
        self.dma = std::array::from_fn(DmaChannel::new);
        self.timers = Timers::new();
        self.video = VideoTiming::new();
        self.audio.reset();
        self.open_bus_pc = 0;
        self.open_bus_thumb = false;
        self.halt_requested = false;
        self.fault = None;
        self.reset_io();
    }

    fn reset_io(&mut self) {
        self.io = [0; IO_SIZE / 2];
        // No keys pressed
        self.io[(registers::KEYINPUT >> 1) as usize] = 0x03FF;
        self.interrupts.next_event = self.video.next_event;
    }

    fn install_bios_stub(&mut self) {
        let mut image = vec![0u8; BIOS_SIZE];
        for (i, word) in IRQ_DISPATCH_STUB.iter().enumerate() {
            let at = IRQ_VECTOR + i * 4;
            image[at..at + 4].copy_from_slice(&word.to_le_bytes());
        }
        self.bios.fill_from(&image);
    }

    /// Install a BIOS image
    ///
    /// Once a real image is present, software interrupts trap into it
    /// instead of being serviced by the built-in routines.
    ///
    /// # Errors
    ///
    /// `InvalidBiosSize` when the image is empty or larger than 16KB.
    pub fn load_bios(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() || data.len() > BIOS_SIZE {
            return Err(EmulatorError::InvalidBiosSize {
                expected: BIOS_SIZE,
                got: data.len(),
            });
        }
        let mut image = vec![0u8; BIOS_SIZE];
        image[..data.len()].copy_from_slice(data);
        self.bios.fill_from(&image);
        self.bios_real = true;
        self.icache.invalidate_range(0, BIOS_SIZE as u32);
        log::info!("BIOS loaded ({} bytes)", data.len());
        Ok(())
    }

    /// Whether a real BIOS image handles software interrupts
    pub fn has_real_bios(&self) -> bool {
        self.bios_real
    }

    /// Insert a cartridge image (already validated by the loader)
    pub fn load_rom(&mut self, data: Vec<u8>) {
        log::info!("Cartridge inserted ({} bytes)", data.len());
        self.rom = RomView::new(data);
        for region in 0x8u32..=0xD {
            self.icache.invalidate_range(region << 24, 0x0100_0000);
        }
    }

    /// Cartridge image bytes
    pub fn rom(&self) -> &[u8] {
        self.rom.as_slice()
    }

    /// Current cycle count
    #[inline(always)]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Tell the bus which instruction is executing (open-bus source)
    #[inline(always)]
    pub(crate) fn set_open_bus(&mut self, pc: u32, thumb: bool) {
        self.open_bus_pc = pc;
        self.open_bus_thumb = thumb;
    }

    // === Region dispatch ===

    /// Region and region-local offset of an address
    ///
    /// Cartridge offsets include the 16MB half selected by the odd region.
    #[inline(always)]
    fn locate(address: u32) -> (RegionId, u32) {
        let region = RegionId::of(address);
        let mut offset = address & OFFSET_MASK;
        if let RegionId::Cart(_) = region {
            offset |= address & 0x0100_0000;
        }
        (region, offset)
    }

    fn region(&self, region: RegionId) -> Option<&dyn MemoryRegion> {
        match region {
            RegionId::Bios => Some(&self.bios),
            RegionId::Wram => Some(&self.wram),
            RegionId::Iwram => Some(&self.iwram),
            RegionId::Palette => Some(&self.palette),
            RegionId::Vram => Some(&self.vram),
            RegionId::Oam => Some(&self.oam),
            RegionId::Cart(_) => Some(&self.rom),
            RegionId::Sram => Some(&self.sram),
            RegionId::Io | RegionId::OpenBus => None,
        }
    }

    fn region_mut(&mut self, region: RegionId) -> Option<&mut dyn MemoryRegion> {
        match region {
            RegionId::Bios => Some(&mut self.bios),
            RegionId::Wram => Some(&mut self.wram),
            RegionId::Iwram => Some(&mut self.iwram),
            RegionId::Palette => Some(&mut self.palette),
            RegionId::Vram => Some(&mut self.vram),
            RegionId::Oam => Some(&mut self.oam),
            RegionId::Cart(_) => Some(&mut self.rom),
            RegionId::Sram => Some(&mut self.sram),
            RegionId::Io | RegionId::OpenBus => None,
        }
    }

    /// Value floating on the bus: the opcode at the executing instruction
    fn open_bus(&self) -> u32 {
        let pc = self.open_bus_pc;
        let (region, offset) = Self::locate(pc);
        let Some(memory) = self.region(region) else {
            return 0;
        };
        if self.open_bus_thumb {
            memory.load16(offset) as u32 * 0x0001_0001
        } else {
            memory.load32(offset)
        }
    }

    // === Loads ===

    /// Read an unsigned byte
    pub fn load_u8(&self, address: u32) -> u8 {
        let (region, offset) = Self::locate(address);
        match region {
            RegionId::Io => self.read_io8(offset),
            _ => match self.region(region) {
                Some(memory) => memory.load8(offset),
                None => (self.open_bus() >> ((address & 3) * 8)) as u8,
            },
        }
    }

    /// Read a sign-extended byte
    pub fn load8(&self, address: u32) -> i8 {
        self.load_u8(address) as i8
    }

    /// Read an unsigned halfword (the address is forced to halfword alignment)
    pub fn load_u16(&self, address: u32) -> u16 {
        let (region, offset) = Self::locate(address);
        match region {
            RegionId::Io => self.read_io16(offset & !1),
            _ => match self.region(region) {
                Some(memory) => memory.load16(offset & !1),
                None => (self.open_bus() >> ((address & 2) * 8)) as u16,
            },
        }
    }

    /// Read a sign-extended halfword
    pub fn load16(&self, address: u32) -> i16 {
        self.load_u16(address) as i16
    }

    /// Read a word, rotated right by the misalignment of `address`
    pub fn load32(&self, address: u32) -> u32 {
        let (region, offset) = Self::locate(address);
        let word = match region {
            RegionId::Io => self.read_io32(offset & !3),
            _ => match self.region(region) {
                Some(memory) => memory.load32(offset & !3),
                None => self.open_bus(),
            },
        };
        word.rotate_right((address & 3) * 8)
    }

    // === Stores ===

    /// Write a byte
    ///
    /// Palette and VRAM latch the byte into both halves of the halfword;
    /// OAM ignores byte writes.
    pub fn store8(&mut self, address: u32, value: u8) {
        let (region, offset) = Self::locate(address);
        match region {
            RegionId::Io => self.write_io8(offset, value),
            RegionId::Palette | RegionId::Vram => {
                if let Some(memory) = self.region_mut(region) {
                    memory.store16(offset & !1, value as u16 * 0x0101);
                }
                self.icache.invalidate(address);
            }
            RegionId::Oam | RegionId::OpenBus => {}
            _ => {
                if let Some(memory) = self.region_mut(region) {
                    memory.store8(offset, value);
                }
                self.icache.invalidate(address);
            }
        }
    }

    /// Write a halfword
    pub fn store16(&mut self, address: u32, value: u16) {
        let (region, offset) = Self::locate(address);
        match region {
            RegionId::Io => self.write_io16(offset & !1, value),
            RegionId::OpenBus => {}
            _ => {
                if let Some(memory) = self.region_mut(region) {
                    memory.store16(offset, value);
                }
                self.icache.invalidate(address);
            }
        }
    }

    /// Write a word
    ///
    /// Invalidates the cache page of both halfwords so a word store that
    /// straddles a Thumb page boundary is seen by both pages.
    pub fn store32(&mut self, address: u32, value: u32) {
        let (region, offset) = Self::locate(address);
        match region {
            RegionId::Io => self.write_io32(offset & !3, value),
            RegionId::OpenBus => {}
            _ => {
                if let Some(memory) = self.region_mut(region) {
                    memory.store32(offset, value);
                }
                self.icache.invalidate(address);
                self.icache.invalidate(address.wrapping_add(2));
            }
        }
    }

    // === Cycle accounting ===

    /// Charge a non-sequential 16-bit access
    #[inline(always)]
    pub fn wait(&mut self, address: u32) {
        self.cycles += 1 + self.wait.nonseq16[(address >> 24) as usize] as u64;
    }

    /// Charge a non-sequential 32-bit access
    #[inline(always)]
    pub fn wait32(&mut self, address: u32) {
        self.cycles += 1 + self.wait.nonseq32[(address >> 24) as usize] as u64;
    }

    /// Charge a sequential 16-bit access
    #[inline(always)]
    pub fn wait_seq(&mut self, address: u32) {
        self.cycles += 1 + self.wait.seq16[(address >> 24) as usize] as u64;
    }

    /// Charge a sequential 32-bit access
    #[inline(always)]
    pub fn wait_seq32(&mut self, address: u32) {
        self.cycles += 1 + self.wait.seq32[(address >> 24) as usize] as u64;
    }

    /// Charge a 16-bit opcode prefetch
    #[inline(always)]
    pub fn wait_prefetch(&mut self, address: u32) {
        self.cycles += 1 + self.wait.prefetch16[(address >> 24) as usize] as u64;
    }

    /// Charge a 32-bit opcode prefetch
    #[inline(always)]
    pub fn wait_prefetch32(&mut self, address: u32) {
        self.cycles += 1 + self.wait.prefetch32[(address >> 24) as usize] as u64;
    }

    /// Charge a burst of `count` words: one non-sequential access plus
    /// `count - 1` sequential ones
    #[inline]
    pub fn wait_multi32(&mut self, address: u32, count: u32) {
        let region = (address >> 24) as usize;
        self.cycles += 1 + self.wait.nonseq32[region] as u64;
        self.cycles +=
            (1 + self.wait.seq32[region] as u64) * (count.saturating_sub(1) as u64);
    }

    /// Charge the multiplier's early-termination cycles for operand `rs`
    #[inline]
    pub fn wait_mul(&mut self, rs: u32) {
        let extra = if rs & 0xFFFF_FF00 == 0xFFFF_FF00 || rs & 0xFFFF_FF00 == 0 {
            1
        } else if rs & 0xFFFF_0000 == 0xFFFF_0000 || rs & 0xFFFF_0000 == 0 {
            2
        } else if rs & 0xFF00_0000 == 0xFF00_0000 || rs & 0xFF00_0000 == 0 {
            3
        } else {
            4
        };
        self.cycles += extra;
    }

    /// Charge internal cycles
    #[inline(always)]
    pub fn idle(&mut self, cycles: u64) {
        self.cycles += cycles;
    }

    // === Diagnostics ===

    /// Report a recognized but unimplemented feature and keep going
    pub fn report_unsupported(&mut self, what: &str) {
        self.unsupported_count += 1;
        let error = EmulatorError::UnsupportedFeature(what.to_string());
        log::warn!("{}", error);
    }

    /// Number of UnsupportedFeature reports since power-on
    pub fn unsupported_count(&self) -> u64 {
        self.unsupported_count
    }

    /// Record a scheduler invariant violation
    pub(crate) fn record_fault(&mut self, message: String) {
        log::error!("{}", message);
        if self.fault.is_none() {
            self.fault = Some(message);
        }
    }

    /// Take a pending invariant violation as an error
    pub(crate) fn take_fault(&mut self) -> Result<()> {
        match self.fault.take() {
            Some(message) => Err(EmulatorError::InternalConsistency(message)),
            None => Ok(()),
        }
    }

    /// Consume a HALTCNT write
    pub(crate) fn take_halt_request(&mut self) -> bool {
        std::mem::take(&mut self.halt_requested)
    }

    /// Request the CPU to halt after the current instruction
    pub(crate) fn request_halt(&mut self) {
        self.halt_requested = true;
    }

    // === Peripherals ===

    /// Replace the audio peripheral
    pub fn set_audio(&mut self, audio: Box<dyn AudioSink>) {
        self.audio = audio;
    }

    /// Interrupt controller
    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    /// DMA channels
    pub fn dma_channels(&self) -> &[DmaChannel; 4] {
        &self.dma
    }

    /// Timers
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Display timing state
    pub fn video(&self) -> &VideoTiming {
        &self.video
    }

    // === Raw memory access for services and snapshots ===

    /// Contents of a RAM region (`None` for I/O, open bus and cartridge)
    pub fn ram_bytes(&self, region: RegionId) -> Option<&[u8]> {
        match region {
            RegionId::Wram => Some(self.wram.as_slice()),
            RegionId::Iwram => Some(self.iwram.as_slice()),
            RegionId::Palette => Some(self.palette.as_slice()),
            RegionId::Vram => Some(self.vram.as_slice()),
            RegionId::Oam => Some(self.oam.as_slice()),
            RegionId::Sram => Some(self.sram.as_slice()),
            _ => None,
        }
    }

    /// Overwrite a RAM region and drop any code cached from it
    pub fn restore_ram(&mut self, region: RegionId, bytes: &[u8]) {
        let (block, base): (&mut MemoryBlock, u32) = match region {
            RegionId::Wram => (&mut self.wram, 0x0200_0000),
            RegionId::Iwram => (&mut self.iwram, 0x0300_0000),
            RegionId::Palette => (&mut self.palette, 0x0500_0000),
            RegionId::Vram => (&mut self.vram, 0x0600_0000),
            RegionId::Oam => (&mut self.oam, 0x0700_0000),
            RegionId::Sram => {
                self.sram.fill_from(bytes);
                return;
            }
            _ => return,
        };
        block.fill_from(bytes);
        let len = block.len() as u32;
        self.icache.invalidate_range(base, len);
    }

    /// Zero `[start, end)` of a RAM region
    pub(crate) fn clear_ram(&mut self, region: RegionId, start: usize, end: usize) {
        let (block, base): (&mut MemoryBlock, u32) = match region {
            RegionId::Wram => (&mut self.wram, 0x0200_0000),
            RegionId::Iwram => (&mut self.iwram, 0x0300_0000),
            RegionId::Palette => (&mut self.palette, 0x0500_0000),
            RegionId::Vram => (&mut self.vram, 0x0600_0000),
            RegionId::Oam => (&mut self.oam, 0x0700_0000),
            _ => return,
        };
        block.clear_range(start, end);
        if end > start {
            self.icache
                .invalidate_range(base + start as u32, (end - start) as u32);
        }
    }

    /// Copy a word between work-RAM/ROM views without I/O side effects
    ///
    /// Used by the DMA fast path; the caller invalidates the destination pages.
    #[inline]
    pub(crate) fn copy_word_direct(&mut self, source: u32, dest: u32, width: u32) {
        let (src_region, src_offset) = Self::locate(source);
        let (dst_region, dst_offset) = Self::locate(dest);
        let Some(src) = self.region(src_region) else {
            return;
        };
        if width == 4 {
            let word = src.load32(src_offset & !3);
            if let Some(dst) = self.region_mut(dst_region) {
                dst.store32(dst_offset & !3, word);
            }
        } else {
            let half = src.load16(src_offset & !1);
            if let Some(dst) = self.region_mut(dst_region) {
                dst.store16(dst_offset & !1, half);
            }
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}
