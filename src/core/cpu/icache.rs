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

//! Decoded instruction cache
//!
//! Decoding an opcode is far more expensive than executing the resulting
//! descriptor, so every fetched opcode is decoded once and kept here as a
//! [`CompiledOp`]. The cache is an arena of pages, one page table per
//! memory region (address bits 31:24).
//!
//! # Page layout
//!
//! ```text
//! page size  = 2 << page_bits bytes (capped at the region size)
//! arm slots  = page size / 4
//! thumb slots = page size / 2
//! ```
//!
//! Each page carries an `invalid` flag and a generation counter. A store
//! anywhere inside a page only flips the flag; the next access to the page
//! recreates its slots and bumps the generation. [`OpRef`] values are plain
//! indices tagged with the generation they were issued under, so a stale
//! reference (for instance a cached `next` link) is detected instead of
//! dereferenced.
//!
//! # Example
//!
//! ```
//! use gbacore::core::cpu::decode::CompiledOp;
//! use gbacore::core::cpu::icache::InstructionCache;
//! use gbacore::core::cpu::psr::ExecMode;
//!
//! let mut cache = InstructionCache::new();
//! let op = CompiledOp::compile(0x0300_0000, 0xE3A0_000A, ExecMode::Arm); // mov r0, #10
//! let first = cache.insert(op).unwrap();
//! assert_eq!(cache.lookup(0x0300_0000, ExecMode::Arm), Some(first));
//!
//! cache.invalidate(0x0300_0000);
//! assert_eq!(cache.lookup(0x0300_0000, ExecMode::Arm), None);
//! assert!(cache.get(first).is_none());
//! ```

use super::decode::CompiledOp;
use super::psr::ExecMode;

/// Number of region indices (address bits 31:24 folded to 4 bits)
const REGION_COUNT: usize = 16;

/// Mask applied to an address to get the offset inside its region
const OFFSET_MASK: u32 = 0x00FF_FFFF;

/// Geometry of one cacheable region
#[derive(Debug, Clone, Copy)]
struct RegionGeometry {
    /// Bytes addressable in the region before mirroring
    size: u32,
    /// Page size is `2 << page_bits` bytes
    page_bits: u32,
}

/// Default region geometry: (region index, size, page bits)
const GEOMETRY: [(usize, u32, u32); 11] = [
    (0x0, 0x0000_4000, 16), // BIOS
    (0x2, 0x0004_0000, 9),  // WRAM
    (0x3, 0x0000_8000, 7),  // IWRAM
    (0x5, 0x0000_0400, 8),  // Palette
    (0x6, 0x0001_8000, 8),  // VRAM
    (0x7, 0x0000_0400, 8),  // OAM
    (0x8, 0x0100_0000, 10), // Cartridge WS0
    (0x9, 0x0100_0000, 10),
    (0xA, 0x0100_0000, 10), // Cartridge WS1
    (0xB, 0x0100_0000, 10),
    (0xC, 0x0100_0000, 10), // Cartridge WS2
];

/// Reference to a cached op
///
/// Only valid while the page it points into keeps the same generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpRef {
    region: u8,
    page: u32,
    slot: u32,
    exec_mode: ExecMode,
    generation: u32,
}

impl OpRef {
    /// Execution state the referenced op was decoded for
    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }
}

/// One page of decoded ops
struct Page {
    invalid: bool,
    generation: u32,
    arm: Vec<Option<CompiledOp>>,
    thumb: Vec<Option<CompiledOp>>,
}

impl Page {
    fn new(bytes: u32, generation: u32) -> Self {
        Self {
            invalid: false,
            generation,
            arm: vec![None; (bytes >> 2) as usize],
            thumb: vec![None; (bytes >> 1) as usize],
        }
    }

    fn slots(&self, mode: ExecMode) -> &Vec<Option<CompiledOp>> {
        match mode {
            ExecMode::Arm => &self.arm,
            ExecMode::Thumb => &self.thumb,
        }
    }

    fn slots_mut(&mut self, mode: ExecMode) -> &mut Vec<Option<CompiledOp>> {
        match mode {
            ExecMode::Arm => &mut self.arm,
            ExecMode::Thumb => &mut self.thumb,
        }
    }
}

/// Page table of one region
struct RegionCache {
    geometry: RegionGeometry,
    /// Pages are allocated on first use
    pages: Vec<Option<Page>>,
    /// Generation to use when a page slot is allocated for the first time
    generations: Vec<u32>,
}

impl RegionCache {
    fn new(geometry: RegionGeometry) -> Self {
        let count = geometry.size.div_ceil(2 << geometry.page_bits) as usize;
        Self {
            geometry,
            pages: (0..count).map(|_| None).collect(),
            generations: vec![0; count],
        }
    }

    fn page_bytes(&self) -> u32 {
        (2u32 << self.geometry.page_bits).min(self.geometry.size)
    }

    /// Fold an offset into the region, mirroring the way the bus does
    fn fold(&self, address: u32) -> u32 {
        let size = self.geometry.size;
        let span = size.next_power_of_two();
        let offset = address & OFFSET_MASK & (span - 1);
        if offset >= size {
            offset - (span - size)
        } else {
            offset
        }
    }

    /// (page, byte offset in page) for an address
    fn locate(&self, address: u32) -> (usize, u32) {
        let offset = self.fold(address);
        let page_bytes = 2u32 << self.geometry.page_bits;
        ((offset / page_bytes) as usize, offset % page_bytes)
    }

    /// Page for reading; recreates it if it was invalidated
    fn access_page(&mut self, page: usize) -> Option<&mut Page> {
        let bytes = self.page_bytes();
        let entry = self.pages.get_mut(page)?;
        if let Some(existing) = entry.as_mut() {
            if existing.invalid {
                let generation = existing.generation.wrapping_add(1);
                *existing = Page::new(bytes, generation);
            }
        }
        entry.as_mut()
    }

    /// Page for inserting; allocates it if needed
    fn page_for_insert(&mut self, page: usize) -> Option<&mut Page> {
        let bytes = self.page_bytes();
        if self.pages.get(page)?.is_none() {
            let generation = self.generations[page];
            self.pages[page] = Some(Page::new(bytes, generation));
        }
        self.access_page(page)
    }
}

/// Arena of decoded instruction pages, indexed by region
pub struct InstructionCache {
    regions: Vec<Option<RegionCache>>,
    /// Serial handed to the next inserted op
    next_serial: u64,
}

impl InstructionCache {
    /// Create an empty cache with the standard memory map geometry
    pub fn new() -> Self {
        let mut regions: Vec<Option<RegionCache>> = (0..REGION_COUNT).map(|_| None).collect();
        for &(index, size, page_bits) in GEOMETRY.iter() {
            regions[index] = Some(RegionCache::new(RegionGeometry { size, page_bits }));
        }
        // Region 0xD mirrors WS2 like 0xC
        regions[0xD] = Some(RegionCache::new(RegionGeometry {
            size: 0x0100_0000,
            page_bits: 10,
        }));
        Self {
            regions,
            next_serial: 1,
        }
    }

    #[inline(always)]
    fn region_index(address: u32) -> usize {
        (address >> 24) as usize
    }

    fn region(&self, address: u32) -> Option<&RegionCache> {
        self.regions.get(Self::region_index(address))?.as_ref()
    }

    fn region_mut(&mut self, address: u32) -> Option<&mut RegionCache> {
        self.regions.get_mut(Self::region_index(address))?.as_mut()
    }

    /// Whether code fetched from `address` can be cached at all
    pub fn is_cacheable(&self, address: u32) -> bool {
        self.region(address).is_some()
    }

    /// Find the cached op for `address` in the given execution state
    ///
    /// An invalidated page is recreated empty on access, so this returns
    /// `None` for every slot of a page that was written since the op was
    /// cached.
    pub fn lookup(&mut self, address: u32, exec_mode: ExecMode) -> Option<OpRef> {
        let region_index = Self::region_index(address) as u8;
        let region = self.region_mut(address)?;
        let (page_index, offset) = region.locate(address);
        let page = region.access_page(page_index)?;
        let slot = slot_index(offset, exec_mode);
        page.slots(exec_mode).get(slot)?.as_ref()?;
        Some(OpRef {
            region: region_index,
            page: page_index as u32,
            slot: slot as u32,
            exec_mode,
            generation: page.generation,
        })
    }

    /// Cache a freshly compiled op, returning its reference
    ///
    /// Returns `None` when the op's address is not in a cacheable region;
    /// such ops are executed straight from the decoder every time.
    pub fn insert(&mut self, mut op: CompiledOp) -> Option<OpRef> {
        let serial = self.next_serial;
        let exec_mode = op.exec_mode;
        let address = op.address;
        let region_index = Self::region_index(address) as u8;

        let region = self.region_mut(address)?;
        let (page_index, offset) = region.locate(address);
        let page = region.page_for_insert(page_index)?;
        let slot = slot_index(offset, exec_mode);
        let entry = page.slots_mut(exec_mode).get_mut(slot)?;

        op.serial = serial;
        op.next = None;
        *entry = Some(op);
        let generation = page.generation;
        self.next_serial += 1;

        Some(OpRef {
            region: region_index,
            page: page_index as u32,
            slot: slot as u32,
            exec_mode,
            generation,
        })
    }

    /// Dereference an op, or `None` if its page changed since it was issued
    pub fn get(&self, op_ref: OpRef) -> Option<&CompiledOp> {
        let region = self.regions.get(op_ref.region as usize)?.as_ref()?;
        let page = region.pages.get(op_ref.page as usize)?.as_ref()?;
        if page.invalid || page.generation != op_ref.generation {
            return None;
        }
        page.slots(op_ref.exec_mode)
            .get(op_ref.slot as usize)?
            .as_ref()
    }

    /// Record `next` as the chained successor of `op_ref`
    ///
    /// Ignored if `op_ref` went stale in the meantime.
    pub fn set_next(&mut self, op_ref: OpRef, next: Option<OpRef>) {
        let Some(Some(region)) = self.regions.get_mut(op_ref.region as usize) else {
            return;
        };
        let Some(Some(page)) = region.pages.get_mut(op_ref.page as usize) else {
            return;
        };
        if page.invalid || page.generation != op_ref.generation {
            return;
        }
        if let Some(Some(op)) = page.slots_mut(op_ref.exec_mode).get_mut(op_ref.slot as usize) {
            op.next = next;
        }
    }

    /// Mark the page containing `address` as overwritten
    #[inline]
    pub fn invalidate(&mut self, address: u32) {
        let Some(region) = self.region_mut(address) else {
            return;
        };
        let (page_index, _) = region.locate(address);
        if let Some(Some(page)) = region.pages.get_mut(page_index) {
            if !page.invalid {
                log::trace!("icache: invalidate page {} of region 0x{:X}", page_index, address >> 24);
                page.invalid = true;
            }
        }
    }

    /// Mark every page overlapping `[start, start + len)` as overwritten
    pub fn invalidate_range(&mut self, start: u32, len: u32) {
        if len == 0 {
            return;
        }
        let Some(region) = self.region(start) else {
            return;
        };
        let page_bytes = 2u32 << region.geometry.page_bits;
        let end = start.wrapping_add(len - 1);
        let mut address = start;
        loop {
            self.invalidate(address);
            let next = (address & !(page_bytes - 1)).wrapping_add(page_bytes);
            if next > end || next <= address || (next >> 24) != (start >> 24) {
                break;
            }
            address = next;
        }
        self.invalidate(end);
    }

    /// Drop every cached op
    ///
    /// Page generations keep counting so references issued before the
    /// clear are still recognized as stale.
    pub fn clear(&mut self) {
        for region in self.regions.iter_mut().flatten() {
            for (index, page) in region.pages.iter_mut().enumerate() {
                if let Some(existing) = page.take() {
                    region.generations[index] = existing.generation.wrapping_add(1);
                }
            }
        }
    }

    /// Number of live cached ops
    pub fn len(&self) -> usize {
        self.regions
            .iter()
            .flatten()
            .flat_map(|region| region.pages.iter().flatten())
            .filter(|page| !page.invalid)
            .map(|page| {
                page.arm.iter().flatten().count() + page.thumb.iter().flatten().count()
            })
            .sum()
    }

    /// Check if the cache holds no live ops
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InstructionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn slot_index(offset_in_page: u32, exec_mode: ExecMode) -> usize {
    match exec_mode {
        ExecMode::Arm => (offset_in_page >> 2) as usize,
        ExecMode::Thumb => (offset_in_page >> 1) as usize,
    }
}
