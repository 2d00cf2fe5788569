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

//! BIOS decompression services
//!
//! Each stream starts with a 32-bit header: bits 4-7 the compression type,
//! bits 8-31 the decompressed size in bytes. The decoders read the stream
//! through the bus and produce the whole output in memory; [`write_out`]
//! then stores it in the unit size the destination needs (VRAM cannot
//! take byte writes).

use crate::core::memory::Bus;

/// Largest decompressed size a header can encode
const MAX_OUTPUT: usize = 0x00FF_FFFF;

/// Destination access width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Byte,
    Half,
    Word,
}

/// Decompressed size from a stream header
#[inline]
fn output_size(header: u32) -> usize {
    ((header >> 8) as usize).min(MAX_OUTPUT)
}

/// LZ77 (type 1)
///
/// Flag bytes are read MSB first: a set bit introduces a two-byte back
/// reference (length = high nibble + 3, displacement = low 12 bits + 1),
/// a clear bit a literal byte.
pub(crate) fn lz77(bus: &Bus, source: u32) -> Vec<u8> {
    let size = output_size(bus.load32(source & !3));
    let mut out = Vec::with_capacity(size);
    let mut src = (source & !3).wrapping_add(4);

    while out.len() < size {
        let flags = bus.load_u8(src);
        src = src.wrapping_add(1);
        for bit in (0..8).rev() {
            if out.len() >= size {
                break;
            }
            if flags & (1 << bit) == 0 {
                out.push(bus.load_u8(src));
                src = src.wrapping_add(1);
                continue;
            }
            let b0 = bus.load_u8(src) as usize;
            let b1 = bus.load_u8(src.wrapping_add(1)) as usize;
            src = src.wrapping_add(2);
            let length = (b0 >> 4) + 3;
            let displacement = (((b0 & 0xF) << 8) | b1) + 1;
            for _ in 0..length {
                if out.len() >= size {
                    break;
                }
                // A reference before the start of the output reads zero
                let byte = out
                    .len()
                    .checked_sub(displacement)
                    .map_or(0, |index| out[index]);
                out.push(byte);
            }
        }
    }
    out
}

/// Run-length (type 3)
///
/// Flag bit 7 set: the next byte repeated `(flag & 0x7F) + 3` times;
/// clear: `(flag & 0x7F) + 1` literal bytes.
pub(crate) fn run_length(bus: &Bus, source: u32) -> Vec<u8> {
    let size = output_size(bus.load32(source & !3));
    let mut out = Vec::with_capacity(size);
    let mut src = (source & !3).wrapping_add(4);

    while out.len() < size {
        let flag = bus.load_u8(src);
        src = src.wrapping_add(1);
        if flag & 0x80 != 0 {
            let byte = bus.load_u8(src);
            src = src.wrapping_add(1);
            let run = ((flag & 0x7F) as usize + 3).min(size - out.len());
            out.extend(std::iter::repeat(byte).take(run));
        } else {
            for _ in 0..(flag & 0x7F) as usize + 1 {
                if out.len() >= size {
                    break;
                }
                out.push(bus.load_u8(src));
                src = src.wrapping_add(1);
            }
        }
    }
    out
}

/// Huffman (type 2)
///
/// Header bits 0-3 give the symbol width (4 or 8). The byte after the
/// header is the tree size `n`; the tree occupies `(n + 1) * 2` bytes
/// starting there and the root node follows the size byte. The bitstream
/// is a sequence of 32-bit words consumed MSB first.
///
/// Node byte: bits 0-5 offset to the child pair, bit 7 left child is a
/// leaf, bit 6 right child is a leaf. Children live at
/// `(node_address & !1) + offset * 2 + 2` (+1 for the right child).
///
/// Returns `None` for a stream that stops producing symbols.
pub(crate) fn huffman(bus: &Bus, source: u32) -> Option<Vec<u8>> {
    let source = source & !3;
    let header = bus.load32(source);
    let size = output_size(header);
    let bits = match header & 0xF {
        4 => 4,
        _ => 8,
    };
    let symbol_mask = (1u32 << bits) - 1;

    let tree_size = bus.load_u8(source.wrapping_add(4)) as u32;
    let root = source.wrapping_add(5);
    let mut data = source.wrapping_add(4).wrapping_add((tree_size + 1) * 2);

    let mut out = Vec::with_capacity(size);
    let mut node_address = root;
    let mut node = bus.load_u8(root);
    let mut acc = 0u32;
    let mut acc_bits = 0;
    // No symbol is deeper than 255 nodes, so 256 bits per output byte is
    // enough for any well-formed tree
    let mut words_left = size * 8 + 1;

    while out.len() < size {
        if words_left == 0 {
            return None;
        }
        words_left -= 1;
        let word = bus.load32(data);
        data = data.wrapping_add(4);

        for bit in (0..32).rev() {
            let direction = (word >> bit) & 1;
            let child = (node_address & !1)
                .wrapping_add((node as u32 & 0x3F) * 2 + 2)
                .wrapping_add(direction);
            let leaf = if direction == 0 {
                node & 0x80 != 0
            } else {
                node & 0x40 != 0
            };
            if !leaf {
                node_address = child;
                node = bus.load_u8(child);
                continue;
            }

            acc |= (bus.load_u8(child) as u32 & symbol_mask) << acc_bits;
            acc_bits += bits;
            node_address = root;
            node = bus.load_u8(root);
            if acc_bits == 32 {
                out.extend_from_slice(&acc.to_le_bytes());
                acc = 0;
                acc_bits = 0;
                if out.len() >= size {
                    break;
                }
            }
        }
    }
    out.truncate(size);
    Some(out)
}

/// Store decompressed bytes at `dest` in `unit`-sized writes
///
/// A trailing partial unit is zero-padded.
pub(crate) fn write_out(bus: &mut Bus, dest: u32, bytes: &[u8], unit: Unit) {
    match unit {
        Unit::Byte => {
            for (i, &byte) in bytes.iter().enumerate() {
                bus.store8(dest.wrapping_add(i as u32), byte);
            }
        }
        Unit::Half => {
            let dest = dest & !1;
            for (i, chunk) in bytes.chunks(2).enumerate() {
                let mut half = [0u8; 2];
                half[..chunk.len()].copy_from_slice(chunk);
                bus.store16(dest.wrapping_add(i as u32 * 2), u16::from_le_bytes(half));
            }
        }
        Unit::Word => {
            let dest = dest & !3;
            for (i, chunk) in bytes.chunks(4).enumerate() {
                let mut word = [0u8; 4];
                word[..chunk.len()].copy_from_slice(chunk);
                bus.store32(dest.wrapping_add(i as u32 * 4), u32::from_le_bytes(word));
            }
        }
    }
}
