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

//! Emulator configuration
//!
//! Settings come from a TOML file, then environment overrides, then
//! built-in defaults. A missing file is not an error.
//!
//! ```toml
//! # gbacore.toml
//! bios_path = "gba_bios.bin"
//! skip_bios = false
//! log_level = "info"
//! audio_queue_capacity = 4096
//! frames = 600
//! ```
//!
//! # Example
//!
//! ```
//! use gbacore::core::config::Config;
//!
//! let config: Config = toml::from_str("frames = 10").unwrap();
//! assert_eq!(config.frames, 10);
//! assert_eq!(config.log_level, "info");
//! assert!(config.skip_bios);
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{EmulatorError, Result};

/// Environment variable naming a BIOS image
pub const BIOS_ENV: &str = "GBACORE_BIOS";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "gbacore.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// BIOS image; without one, software interrupts are serviced in Rust
    pub bios_path: Option<PathBuf>,

    /// Service SWIs in Rust even when a BIOS image is configured
    pub skip_bios: bool,

    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_level: String,

    /// Stereo samples buffered between the core and the audio thread
    pub audio_queue_capacity: usize,

    /// Frames to run before exiting
    pub frames: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bios_path: None,
            skip_bios: true,
            log_level: "info".to_string(),
            audio_queue_capacity: 4096,
            frames: 60,
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist
    ///
    /// # Errors
    ///
    /// `Config` when the file exists but is not valid TOML for this
    /// structure; `Io` when it cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text)
                .map_err(|e| EmulatorError::Config(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.apply_env_overrides();
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Parse a TOML document
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string(self).map_err(|e| EmulatorError::Config(e.to_string()))?;
        fs::write(path, text)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(path) = std::env::var_os(BIOS_ENV) {
            self.bios_path = Some(PathBuf::from(path));
            self.skip_bios = false;
        }
    }

    /// BIOS image to load, if any
    pub fn bios(&self) -> Option<&Path> {
        if self.skip_bios {
            None
        } else {
            self.bios_path.as_deref()
        }
    }
}
