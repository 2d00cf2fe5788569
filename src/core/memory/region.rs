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

//! Memory regions and region identification
//!
//! The top byte of an address selects a region; the low 24 bits are the
//! offset handed to it. Regions implement [`MemoryRegion`] and do their own
//! mirroring, so callers never need to know a region's size.

/// Mask applied to an address to get the offset inside its region
pub const OFFSET_MASK: u32 = 0x00FF_FFFF;

/// Region selected by address bits 31:24
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    /// System ROM, 16KB
    Bios,
    /// On-board work RAM, 256KB
    Wram,
    /// In-chip work RAM, 32KB
    Iwram,
    /// Memory-mapped I/O registers
    Io,
    /// Palette RAM, 1KB
    Palette,
    /// Video RAM, 96KB
    Vram,
    /// Object attribute memory, 1KB
    Oam,
    /// Cartridge ROM through wait-state pair 0, 1 or 2
    Cart(u8),
    /// Cartridge save RAM
    Sram,
    /// Nothing mapped: reads return the prefetched opcode
    OpenBus,
}

impl RegionId {
    /// Identify the region of an address
    ///
    /// # Example
    ///
    /// ```
    /// use gbacore::core::memory::RegionId;
    ///
    /// assert_eq!(RegionId::of(0x0300_7FFC), RegionId::Iwram);
    /// assert_eq!(RegionId::of(0x0900_0000), RegionId::Cart(0));
    /// assert_eq!(RegionId::of(0x0D00_0000), RegionId::Cart(2));
    /// assert_eq!(RegionId::of(0x1000_0000), RegionId::OpenBus);
    /// ```
    pub fn of(address: u32) -> Self {
        match address >> 24 {
            0x0 => RegionId::Bios,
            0x2 => RegionId::Wram,
            0x3 => RegionId::Iwram,
            0x4 => RegionId::Io,
            0x5 => RegionId::Palette,
            0x6 => RegionId::Vram,
            0x7 => RegionId::Oam,
            0x8 | 0x9 => RegionId::Cart(0),
            0xA | 0xB => RegionId::Cart(1),
            0xC | 0xD => RegionId::Cart(2),
            0xE => RegionId::Sram,
            _ => RegionId::OpenBus,
        }
    }

    /// Whether the region is plain RAM that DMA may bulk-copy into
    pub fn is_work_ram(self) -> bool {
        matches!(self, RegionId::Wram | RegionId::Iwram)
    }
}

/// Byte/halfword/word access to one region at a masked offset
///
/// Offsets passed in are stripped of the region bits; each region aligns
/// wider accesses itself. Stores to read-only regions are ignored.
pub trait MemoryRegion {
    fn load8(&self, offset: u32) -> u8;
    fn load16(&self, offset: u32) -> u16;
    fn load32(&self, offset: u32) -> u32;
    fn store8(&mut self, offset: u32, value: u8);
    fn store16(&mut self, offset: u32, value: u16);
    fn store32(&mut self, offset: u32, value: u32);

    /// Page size exponent used for instruction cache invalidation, or
    /// `None` when stores here can never alias cached code
    fn page_bits(&self) -> Option<u32>;

    /// Backing bytes when the region is plain memory
    fn bytes(&self) -> Option<&[u8]> {
        None
    }
}

/// A little-endian block of memory with power-of-two style mirroring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    data: Vec<u8>,
    /// Mask covering the next power of two of the block size
    span_mask: u32,
    read_only: bool,
    page_bits: Option<u32>,
}

impl MemoryBlock {
    /// Create a zeroed writable block
    pub fn new(size: usize, page_bits: Option<u32>) -> Self {
        Self {
            data: vec![0; size],
            span_mask: (size as u32).next_power_of_two() - 1,
            read_only: false,
            page_bits,
        }
    }

    /// Create a block that ignores stores
    pub fn read_only(size: usize, page_bits: Option<u32>) -> Self {
        Self {
            read_only: true,
            ..Self::new(size, page_bits)
        }
    }

    /// Fold an offset into the block
    ///
    /// Offsets between the block size and the next power of two wrap back
    /// by the difference (VRAM's upper 32KB mirror).
    #[inline(always)]
    fn fold(&self, offset: u32) -> usize {
        let offset = offset & self.span_mask;
        let size = self.data.len() as u32;
        if offset >= size {
            (offset - (self.span_mask + 1 - size)) as usize
        } else {
            offset as usize
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw contents
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite the contents from `bytes`, ignoring the read-only flag
    ///
    /// Extra input is dropped; a short input leaves the tail untouched.
    pub fn fill_from(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.data.len());
        self.data[..len].copy_from_slice(&bytes[..len]);
    }

    /// Zero `[start, end)` (clamped to the block)
    pub fn clear_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.data.len());
        if start < end {
            self.data[start..end].fill(0);
        }
    }
}

impl MemoryRegion for MemoryBlock {
    #[inline(always)]
    fn load8(&self, offset: u32) -> u8 {
        self.data[self.fold(offset)]
    }

    #[inline(always)]
    fn load16(&self, offset: u32) -> u16 {
        let i = self.fold(offset & !1);
        u16::from_le_bytes([self.data[i], self.data[i + 1]])
    }

    #[inline(always)]
    fn load32(&self, offset: u32) -> u32 {
        let i = self.fold(offset & !3);
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    #[inline(always)]
    fn store8(&mut self, offset: u32, value: u8) {
        if !self.read_only {
            let i = self.fold(offset);
            self.data[i] = value;
        }
    }

    #[inline(always)]
    fn store16(&mut self, offset: u32, value: u16) {
        if !self.read_only {
            let i = self.fold(offset & !1);
            self.data[i..i + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    #[inline(always)]
    fn store32(&mut self, offset: u32, value: u32) {
        if !self.read_only {
            let i = self.fold(offset & !3);
            self.data[i..i + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    fn page_bits(&self) -> Option<u32> {
        self.page_bits
    }

    fn bytes(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

/// Cartridge ROM as seen through one wait-state pair
///
/// Offsets carry 25 bits: the odd region of a pair adds 16MB. Reads past
/// the end of the image return the cartridge bus pattern `(offset / 2)`.
#[derive(Debug, Clone, Default)]
pub struct RomView {
    data: Vec<u8>,
}

impl RomView {
    /// Page size exponent for cached cartridge code
    pub const PAGE_BITS: u32 = 10;

    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline(always)]
    fn open_value(offset: u32) -> u16 {
        ((offset >> 1) & 0xFFFF) as u16
    }
}

impl MemoryRegion for RomView {
    fn load8(&self, offset: u32) -> u8 {
        match self.data.get(offset as usize) {
            Some(&byte) => byte,
            None => (Self::open_value(offset) >> ((offset & 1) * 8)) as u8,
        }
    }

    fn load16(&self, offset: u32) -> u16 {
        let i = (offset & !1) as usize;
        match self.data.get(i..i + 2) {
            Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
            None => Self::open_value(offset),
        }
    }

    fn load32(&self, offset: u32) -> u32 {
        let offset = offset & !3;
        self.load16(offset) as u32 | (self.load16(offset + 2) as u32) << 16
    }

    fn store8(&mut self, _offset: u32, _value: u8) {}

    fn store16(&mut self, _offset: u32, _value: u16) {}

    fn store32(&mut self, _offset: u32, _value: u32) {}

    fn page_bits(&self) -> Option<u32> {
        Some(Self::PAGE_BITS)
    }

    fn bytes(&self) -> Option<&[u8]> {
        Some(&self.data)
    }
}

/// Battery-backed SRAM on an 8-bit bus
///
/// Wider reads replicate the byte; wider writes store the byte lane
/// selected by the address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRam {
    data: Vec<u8>,
}

impl SaveRam {
    pub const SIZE: usize = 0x8000;

    pub fn new() -> Self {
        Self {
            data: vec![0xFF; Self::SIZE],
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn fill_from(&mut self, bytes: &[u8]) {
        let len = bytes.len().min(self.data.len());
        self.data[..len].copy_from_slice(&bytes[..len]);
    }

    #[inline(always)]
    fn index(offset: u32) -> usize {
        (offset as usize) & (Self::SIZE - 1)
    }
}

impl Default for SaveRam {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegion for SaveRam {
    fn load8(&self, offset: u32) -> u8 {
        self.data[Self::index(offset)]
    }

    fn load16(&self, offset: u32) -> u16 {
        self.load8(offset) as u16 * 0x0101
    }

    fn load32(&self, offset: u32) -> u32 {
        self.load8(offset) as u32 * 0x0101_0101
    }

    fn store8(&mut self, offset: u32, value: u8) {
        self.data[Self::index(offset)] = value;
    }

    fn store16(&mut self, offset: u32, value: u16) {
        self.store8(offset, (value >> ((offset & 1) * 8)) as u8);
    }

    fn store32(&mut self, offset: u32, value: u32) {
        self.store8(offset, (value >> ((offset & 3) * 8)) as u8);
    }

    fn page_bits(&self) -> Option<u32> {
        None
    }
}
