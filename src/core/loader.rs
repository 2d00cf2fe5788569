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

//! Cartridge image loading
//!
//! A cartridge image starts with a 192-byte header. Only the fixed byte at
//! 0xB2 is checked; the text fields are informational and the core does
//! not depend on them.
//!
//! # Header Layout
//!
//! ```text
//! 0x00-0x03: ARM branch to the entry point
//! 0x04-0x9F: Nintendo logo
//! 0xA0-0xAB: Game title (NUL padded)
//! 0xAC-0xAF: Game code
//! 0xB0-0xB1: Maker code
//! 0xB2:      Fixed value 0x96
//! 0xB3-0xBF: Unit code, version, checksum, reserved
//! ```
//!
//! # Save Type
//!
//! The save media is not described by the header. Games built with the
//! official library embed a marker string (`SRAM_V`, `EEPROM_V`,
//! `FLASH_V`, `FLASH512_V`, `FLASH1M_V`) on a word boundary somewhere in
//! the image; the first marker found wins.
//!
//! # Example
//!
//! ```
//! use gbacore::core::loader::{Cartridge, SaveType};
//!
//! let mut image = vec![0u8; 0x200];
//! image[0xA0..0xA4].copy_from_slice(b"DEMO");
//! image[0xB2] = 0x96;
//! image[0x100..0x108].copy_from_slice(b"FLASH_V1");
//!
//! let cart = Cartridge::load(image).unwrap();
//! assert_eq!(cart.header.title, "DEMO");
//! assert_eq!(cart.header.save_type, SaveType::Flash512);
//! ```

use std::path::Path;

use super::error::{EmulatorError, Result};
use super::memory::ROM_MAX_SIZE;

/// Header size; smaller images are rejected
pub const HEADER_SIZE: usize = 0xC0;

/// Offset and expected value of the fixed header byte
const FIXED_OFFSET: usize = 0xB2;
const FIXED_VALUE: u8 = 0x96;

/// Save-type marker strings
const SAVE_MARKERS: [(&str, SaveType); 5] = [
    ("EEPROM_V", SaveType::Eeprom),
    ("SRAM_V", SaveType::Sram),
    ("FLASH_V", SaveType::Flash512),
    ("FLASH512_V", SaveType::Flash512),
    ("FLASH1M_V", SaveType::Flash1M),
];

/// Save media a cartridge expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveType {
    #[default]
    Sram,
    Eeprom,
    Flash512,
    Flash1M,
}

/// Informational header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub game_code: String,
    pub maker_code: String,
    pub save_type: SaveType,
}

/// A validated cartridge image
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub header: CartridgeHeader,
    pub data: Vec<u8>,
}

impl Cartridge {
    /// Validate an image and parse its header
    ///
    /// # Errors
    ///
    /// `InvalidRom` when the image is shorter than the header, larger
    /// than 32MB, or the fixed byte at 0xB2 is not 0x96.
    pub fn load(data: Vec<u8>) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(EmulatorError::InvalidRom(format!(
                "image too small ({} bytes, header needs {})",
                data.len(),
                HEADER_SIZE
            )));
        }
        if data.len() > ROM_MAX_SIZE {
            return Err(EmulatorError::InvalidRom(format!(
                "image too large ({} bytes, maximum {})",
                data.len(),
                ROM_MAX_SIZE
            )));
        }
        if data[FIXED_OFFSET] != FIXED_VALUE {
            return Err(EmulatorError::InvalidRom(format!(
                "header byte 0x{:02X} at 0x{:X} (expected 0x{:02X})",
                data[FIXED_OFFSET], FIXED_OFFSET, FIXED_VALUE
            )));
        }

        let header = CartridgeHeader {
            title: text_field(&data[0xA0..0xAC]),
            game_code: text_field(&data[0xAC..0xB0]),
            maker_code: text_field(&data[0xB0..0xB2]),
            save_type: scan_save_type(&data),
        };

        log::info!(
            "Cartridge: \"{}\" [{}] maker {} save {:?}, {} bytes",
            header.title,
            header.game_code,
            header.maker_code,
            header.save_type,
            data.len()
        );

        Ok(Self { header, data })
    }

    /// Read and validate an image file
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            EmulatorError::LoaderError(format!("{}: {}", path.display(), e))
        })?;
        Self::load(data)
    }
}

/// Header text up to the first NUL, non-ASCII bytes dropped
fn text_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .filter(|b| b.is_ascii_graphic() || **b == b' ')
        .map(|&b| b as char)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// First save marker on a word boundary past the header
fn scan_save_type(data: &[u8]) -> SaveType {
    for offset in (HEADER_SIZE..data.len()).step_by(4) {
        let tail = &data[offset..];
        if tail[0] != b'E' && tail[0] != b'S' && tail[0] != b'F' {
            continue;
        }
        for (marker, save_type) in SAVE_MARKERS {
            if tail.starts_with(marker.as_bytes()) {
                return save_type;
            }
        }
    }
    SaveType::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[FIXED_OFFSET] = FIXED_VALUE;
        data
    }

    #[test]
    fn test_header_fields() {
        let mut data = image(0x400);
        data[0xA0..0xAC].copy_from_slice(b"POKEMON EMER");
        data[0xAC..0xB0].copy_from_slice(b"BPEE");
        data[0xB0..0xB2].copy_from_slice(b"01");

        let cart = Cartridge::load(data).unwrap();
        assert_eq!(cart.header.title, "POKEMON EMER");
        assert_eq!(cart.header.game_code, "BPEE");
        assert_eq!(cart.header.maker_code, "01");
        assert_eq!(cart.header.save_type, SaveType::Sram);
        assert_eq!(cart.data.len(), 0x400);
    }

    #[test]
    fn test_title_stops_at_nul() {
        let mut data = image(HEADER_SIZE);
        data[0xA0..0xA5].copy_from_slice(b"AB\0CD");
        let cart = Cartridge::load(data).unwrap();
        assert_eq!(cart.header.title, "AB");
    }

    #[test]
    fn test_bad_fixed_byte() {
        let mut data = image(0x200);
        data[FIXED_OFFSET] = 0;
        assert!(matches!(Cartridge::load(data), Err(EmulatorError::InvalidRom(_))));
    }

    #[test]
    fn test_too_small() {
        let data = vec![0u8; HEADER_SIZE - 1];
        assert!(matches!(Cartridge::load(data), Err(EmulatorError::InvalidRom(_))));
    }

    #[test]
    fn test_too_large() {
        let data = image(ROM_MAX_SIZE + 4);
        assert!(matches!(Cartridge::load(data), Err(EmulatorError::InvalidRom(_))));
    }

    #[test]
    fn test_save_markers() {
        for (marker, expected) in [
            ("EEPROM_V124", SaveType::Eeprom),
            ("SRAM_V113", SaveType::Sram),
            ("FLASH_V126", SaveType::Flash512),
            ("FLASH512_V131", SaveType::Flash512),
            ("FLASH1M_V103", SaveType::Flash1M),
        ] {
            let mut data = image(0x400);
            data[0x200..0x200 + marker.len()].copy_from_slice(marker.as_bytes());
            let cart = Cartridge::load(data).unwrap();
            assert_eq!(cart.header.save_type, expected);
        }
    }

    #[test]
    fn test_unaligned_marker_ignored() {
        let mut data = image(0x400);
        data[0x201..0x20C].copy_from_slice(b"FLASH1M_V10");
        let cart = Cartridge::load(data).unwrap();
        assert_eq!(cart.header.save_type, SaveType::Sram);
    }

    #[test]
    fn test_load_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = Cartridge::load_file(dir.path().join("missing.gba"));
        assert!(matches!(result, Err(EmulatorError::LoaderError(_))));
    }
}
