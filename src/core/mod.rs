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

//! Core emulation components
//!
//! This module contains all hardware emulation components:
//! - CPU (ARM7TDMI, ARM and Thumb)
//! - Memory bus with wait states and open bus
//! - DMA (4 channels)
//! - Timer (4 cascading timer/counter channels)
//! - Interrupt controller, event scheduler and BIOS services
//! - Video timing (Vblank/Hblank/Vcounter)
//! - System integration, cartridge loading and save states

pub mod audio;
pub mod config;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod interrupt;
pub mod loader;
pub mod memory;
pub mod save_state;
pub mod system;
pub mod timer;
pub mod timing;
pub mod video;

// Re-export commonly used types
pub use cpu::CPU;
pub use error::{EmulatorError, Result};
pub use memory::Bus;
pub use system::System;
pub use timer::Timers;
