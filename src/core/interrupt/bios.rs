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

//! High-level BIOS services
//!
//! When no BIOS image is loaded, `SWI` instructions are serviced here
//! instead of trapping to the vector at 0x08. Each service reads its
//! arguments from r0-r3 and writes results back the way the BIOS call
//! does.
//!
//! | SWI  | Service          | SWI  | Service          |
//! |------|------------------|------|------------------|
//! | 0x00 | SoftReset        | 0x0B | CpuSet           |
//! | 0x01 | RegisterRamReset | 0x0C | CpuFastSet       |
//! | 0x02 | Halt             | 0x0E | BgAffineSet      |
//! | 0x03 | Stop             | 0x0F | ObjAffineSet     |
//! | 0x04 | IntrWait         | 0x11 | LZ77UnCompWram   |
//! | 0x05 | VBlankIntrWait   | 0x12 | LZ77UnCompVram   |
//! | 0x06 | Div              | 0x13 | HuffUnComp       |
//! | 0x07 | DivArm           | 0x14 | RLUnCompWram     |
//! | 0x08 | Sqrt             | 0x15 | RLUnCompVram     |
//! | 0x09 | ArcTan           | 0x1F | MidiKey2Freq     |
//! | 0x0A | ArcTan2          |      |                  |
//!
//! Any other number is reported as unsupported and does nothing.
//!
//! # Example
//!
//! ```
//! use gbacore::core::cpu::CPU;
//! use gbacore::core::interrupt::bios;
//! use gbacore::core::memory::Bus;
//!
//! let mut cpu = CPU::new();
//! let mut bus = Bus::new();
//! cpu.set_reg(0, 10);
//! cpu.set_reg(1, 3);
//! bios::service(&mut cpu, &mut bus, 0x06).unwrap();
//! assert_eq!((cpu.reg(0), cpu.reg(1), cpu.reg(3)), (3, 1, 3));
//! ```

use std::f64::consts::PI;

use super::decompress::{self, Unit};
use crate::core::cpu::psr::{ExecMode, Mode};
use crate::core::cpu::registers::{LR, PC};
use crate::core::cpu::CPU;
use crate::core::error::Result;
use crate::core::memory::{Bus, RegionId};

/// Interrupt flags the user IRQ handler acknowledges into (mirror of IF)
pub const BIOS_IRQ_FLAGS: u32 = 0x0300_7FF8;

/// Byte selecting the SoftReset entry point (0 = cartridge, else WRAM)
const SOFT_RESET_FLAG: usize = 0x7FFA;

/// Entry points used by SoftReset
const ROM_ENTRY: u32 = 0x0800_0000;
const WRAM_ENTRY: u32 = 0x0200_0000;

/// Service number names, for logging
fn name(number: u8) -> &'static str {
    match number {
        0x00 => "SoftReset",
        0x01 => "RegisterRamReset",
        0x02 => "Halt",
        0x03 => "Stop",
        0x04 => "IntrWait",
        0x05 => "VBlankIntrWait",
        0x06 => "Div",
        0x07 => "DivArm",
        0x08 => "Sqrt",
        0x09 => "ArcTan",
        0x0A => "ArcTan2",
        0x0B => "CpuSet",
        0x0C => "CpuFastSet",
        0x0E => "BgAffineSet",
        0x0F => "ObjAffineSet",
        0x11 => "LZ77UnCompWram",
        0x12 => "LZ77UnCompVram",
        0x13 => "HuffUnComp",
        0x14 => "RLUnCompWram",
        0x15 => "RLUnCompVram",
        0x1F => "MidiKey2Freq",
        _ => "unknown",
    }
}

/// Run BIOS service `number` against the current register state
pub fn service(cpu: &mut CPU, bus: &mut Bus, number: u8) -> Result<()> {
    log::debug!("SWI 0x{:02X} ({})", number, name(number));

    match number {
        0x00 => soft_reset(cpu, bus),
        0x01 => register_ram_reset(bus, cpu.reg(0)),
        0x02 => cpu.halt(),
        0x03 => {
            bus.report_unsupported("SWI Stop (treated as Halt)");
            cpu.halt();
        }
        0x04 => {
            let (discard, mask) = (cpu.reg(0) != 0, cpu.reg(1) as u16);
            intr_wait(cpu, bus, discard, mask);
        }
        0x05 => {
            cpu.set_reg(0, 1);
            cpu.set_reg(1, 1);
            intr_wait(cpu, bus, true, 1);
        }
        0x06 => {
            let (numerator, denominator) = (cpu.reg(0), cpu.reg(1));
            divide(cpu, bus, numerator, denominator);
        }
        0x07 => {
            let (numerator, denominator) = (cpu.reg(1), cpu.reg(0));
            divide(cpu, bus, numerator, denominator);
        }
        0x08 => {
            let root = (cpu.reg(0) as f64).sqrt() as u32;
            cpu.set_reg(0, root);
        }
        0x09 => {
            let angle = arc_tan(cpu.reg(0) as i32);
            cpu.set_reg(0, angle as u32);
        }
        0x0A => {
            let x = cpu.reg(0) as i32 as f64 / 16384.0;
            let y = cpu.reg(1) as i32 as f64 / 16384.0;
            let angle = (y.atan2(x) / (2.0 * PI) * 65536.0) as i32;
            cpu.set_reg(0, angle as u32 & 0xFFFF);
        }
        0x0B => cpu_set(bus, cpu.reg(0), cpu.reg(1), cpu.reg(2)),
        0x0C => cpu_fast_set(bus, cpu.reg(0), cpu.reg(1), cpu.reg(2)),
        0x0E => bg_affine_set(bus, cpu.reg(0), cpu.reg(1), cpu.reg(2)),
        0x0F => obj_affine_set(bus, cpu.reg(0), cpu.reg(1), cpu.reg(2), cpu.reg(3)),
        0x11 | 0x12 => {
            let bytes = decompress::lz77(bus, cpu.reg(0));
            let unit = if number == 0x11 { Unit::Byte } else { Unit::Half };
            decompress::write_out(bus, cpu.reg(1), &bytes, unit);
        }
        0x13 => match decompress::huffman(bus, cpu.reg(0)) {
            Some(bytes) => decompress::write_out(bus, cpu.reg(1), &bytes, Unit::Word),
            None => bus.report_unsupported("HuffUnComp with a malformed tree"),
        },
        0x14 | 0x15 => {
            let bytes = decompress::run_length(bus, cpu.reg(0));
            let unit = if number == 0x14 { Unit::Byte } else { Unit::Half };
            decompress::write_out(bus, cpu.reg(1), &bytes, unit);
        }
        0x1F => {
            let key = bus.load32(cpu.reg(0).wrapping_add(4)) as f64;
            let exponent = (180.0 - cpu.reg(1) as f64 - cpu.reg(2) as f64 / 256.0) / 12.0;
            cpu.set_reg(0, (key / 2f64.powf(exponent)) as u32);
        }
        _ => bus.report_unsupported(&format!("SWI 0x{:02X}", number)),
    }
    Ok(())
}

/// Clear the top of IWRAM, reset the stacks and restart at the cartridge
/// or WRAM entry point
fn soft_reset(cpu: &mut CPU, bus: &mut Bus) {
    let to_wram = bus
        .ram_bytes(RegionId::Iwram)
        .is_some_and(|iwram| iwram[SOFT_RESET_FLAG] != 0);
    bus.clear_ram(RegionId::Iwram, 0x7E00, 0x8000);

    cpu.switch_mode(Mode::System);
    cpu.reset_stacks();
    for r in 0..13 {
        cpu.set_reg(r, 0);
    }
    let entry = if to_wram { WRAM_ENTRY } else { ROM_ENTRY };
    cpu.set_reg(LR, entry);
    cpu.switch_exec_mode(ExecMode::Arm);
    cpu.set_reg(PC, entry.wrapping_add(ExecMode::Arm.width()));
    log::info!("SoftReset to 0x{:08X}", entry);
}

/// Clear the memory regions selected by `flags`
fn register_ram_reset(bus: &mut Bus, flags: u32) {
    if flags & 0x01 != 0 {
        bus.clear_ram(RegionId::Wram, 0, 0x40000);
    }
    if flags & 0x02 != 0 {
        // The top 0x200 bytes hold the stacks and the BIOS work area
        bus.clear_ram(RegionId::Iwram, 0, 0x7E00);
    }
    if flags & 0x04 != 0 {
        bus.clear_ram(RegionId::Palette, 0, 0x400);
    }
    if flags & 0x08 != 0 {
        bus.clear_ram(RegionId::Vram, 0, 0x18000);
    }
    if flags & 0x10 != 0 {
        bus.clear_ram(RegionId::Oam, 0, 0x400);
    }
    if flags & 0xE0 != 0 {
        bus.report_unsupported("RegisterRamReset of I/O registers");
    }
}

/// IntrWait: halt until an interrupt in `mask` has been acknowledged into
/// the BIOS flag word
///
/// The call re-executes after every IRQ until the mask matches, so a
/// non-matching interrupt runs its handler and then waits again.
fn intr_wait(cpu: &mut CPU, bus: &mut Bus, discard: bool, mask: u16) {
    bus.interrupts.write_master_enable(1);

    let mut flags = bus.load_u16(BIOS_IRQ_FLAGS);
    if discard && !cpu.intr_wait {
        flags &= !mask;
        bus.store16(BIOS_IRQ_FLAGS, flags);
    }

    if flags & mask != 0 {
        bus.store16(BIOS_IRQ_FLAGS, flags & !mask);
        cpu.intr_wait = false;
        return;
    }

    cpu.intr_wait = true;
    cpu.halt();
    // Point back at the SWI so it runs again once the IRQ handler returns
    let width = cpu.exec_mode().width();
    cpu.set_reg(PC, cpu.reg(PC).wrapping_sub(width));
}

/// Signed division: r0 = quotient, r1 = remainder, r3 = |quotient|
fn divide(cpu: &mut CPU, bus: &mut Bus, numerator: u32, denominator: u32) {
    let (numerator, denominator) = (numerator as i32, denominator as i32);
    if denominator == 0 {
        bus.report_unsupported("BIOS division by zero");
        return;
    }
    let quotient = numerator.wrapping_div(denominator);
    let remainder = numerator.wrapping_rem(denominator);
    cpu.set_reg(0, quotient as u32);
    cpu.set_reg(1, remainder as u32);
    cpu.set_reg(3, quotient.unsigned_abs());
}

/// Polynomial arctangent of a 1.14 fixed-point tangent
fn arc_tan(tan: i32) -> i32 {
    let a = -((tan.wrapping_mul(tan)) >> 14);
    let mut b = ((0xA9 * a) >> 14) + 0x390;
    for constant in [0x91C, 0xFB6, 0x16AA, 0x2081, 0x3651, 0xA2F9] {
        b = (b.wrapping_mul(a) >> 14) + constant;
    }
    tan.wrapping_mul(b) >> 16
}

/// CpuSet: copy or fill `count` halfwords or words
///
/// r2 bits 0-20 count, bit 24 fill, bit 26 word units.
fn cpu_set(bus: &mut Bus, source: u32, dest: u32, control: u32) {
    let count = control & 0x001F_FFFF;
    let fill = control & (1 << 24) != 0;
    if control & (1 << 26) != 0 {
        let (source, dest) = (source & !3, dest & !3);
        let fill_word = bus.load32(source);
        for i in 0..count {
            let word = if fill { fill_word } else { bus.load32(source.wrapping_add(i << 2)) };
            bus.store32(dest.wrapping_add(i << 2), word);
        }
    } else {
        let (source, dest) = (source & !1, dest & !1);
        let fill_half = bus.load_u16(source);
        for i in 0..count {
            let half = if fill { fill_half } else { bus.load_u16(source.wrapping_add(i << 1)) };
            bus.store16(dest.wrapping_add(i << 1), half);
        }
    }
}

/// CpuFastSet: word copy or fill, count rounded up to 8 words
fn cpu_fast_set(bus: &mut Bus, source: u32, dest: u32, control: u32) {
    let (source, dest) = (source & !3, dest & !3);
    let count = ((control & 0x001F_FFFF) + 7) & !7;
    let fill = control & (1 << 24) != 0;
    let fill_word = bus.load32(source);
    for i in 0..count {
        let word = if fill {
            fill_word
        } else {
            bus.load32(source.wrapping_add(i << 2))
        };
        bus.store32(dest.wrapping_add(i << 2), word);
    }
}

/// Rotation angle of an affine parameter block (high byte of a halfword)
#[inline]
fn angle(bus: &Bus, address: u32) -> f64 {
    (bus.load_u16(address) >> 8) as f64 / 128.0 * PI
}

/// Fixed-point 8.8 scale factor
#[inline]
fn scale(bus: &Bus, address: u32) -> f64 {
    bus.load16(address) as f64 / 256.0
}

/// BgAffineSet: build `count` background rotation/scaling matrices
///
/// Source entries are 20 bytes (origin x/y 24.8, center x/y, scale x/y,
/// angle); destination entries are 16 bytes (pa pb pc pd, start x/y).
fn bg_affine_set(bus: &mut Bus, mut source: u32, mut dest: u32, count: u32) {
    for _ in 0..count {
        let ox = bus.load32(source) as i32 as f64 / 256.0;
        let oy = bus.load32(source.wrapping_add(4)) as i32 as f64 / 256.0;
        let cx = bus.load16(source.wrapping_add(8)) as f64;
        let cy = bus.load16(source.wrapping_add(10)) as f64;
        let sx = scale(bus, source.wrapping_add(12));
        let sy = scale(bus, source.wrapping_add(14));
        let theta = angle(bus, source.wrapping_add(16));
        source = source.wrapping_add(20);

        let (sin, cos) = theta.sin_cos();
        let (a, b, c, d) = (cos * sx, -sin * sx, sin * sy, cos * sy);
        let rx = ox - (a * cx + b * cy);
        let ry = oy - (c * cx + d * cy);

        bus.store16(dest, (a * 256.0) as i32 as u16);
        bus.store16(dest.wrapping_add(2), (b * 256.0) as i32 as u16);
        bus.store16(dest.wrapping_add(4), (c * 256.0) as i32 as u16);
        bus.store16(dest.wrapping_add(6), (d * 256.0) as i32 as u16);
        bus.store32(dest.wrapping_add(8), (rx * 256.0) as i32 as u32);
        bus.store32(dest.wrapping_add(12), (ry * 256.0) as i32 as u32);
        dest = dest.wrapping_add(16);
    }
}

/// ObjAffineSet: build `count` sprite matrices, `stride` bytes between
/// the four parameters
fn obj_affine_set(bus: &mut Bus, mut source: u32, mut dest: u32, count: u32, stride: u32) {
    for _ in 0..count {
        let sx = scale(bus, source);
        let sy = scale(bus, source.wrapping_add(2));
        let theta = angle(bus, source.wrapping_add(4));
        source = source.wrapping_add(8);

        let (sin, cos) = theta.sin_cos();
        let params = [cos * sx, -sin * sx, sin * sy, cos * sy];
        for (i, value) in params.iter().enumerate() {
            bus.store16(dest.wrapping_add(stride * i as u32), (value * 256.0) as i32 as u16);
        }
        dest = dest.wrapping_add(stride * 4);
    }
}
