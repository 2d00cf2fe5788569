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

/// Emulator error types
use thiserror::Error;

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;

/// Main error type for the emulator
///
/// `IllegalInstruction`, `InternalConsistency` and `HaltDeadlock` stop guest
/// execution and are returned from `CPU::step`. `UnsupportedFeature` is only
/// constructed for reporting; the core logs it and keeps running.
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Illegal instruction 0x{opcode:08X} at 0x{address:08X} (thumb: {thumb})")]
    IllegalInstruction { address: u32, opcode: u32, thumb: bool },

    #[error("Internal consistency violation: {0}")]
    InternalConsistency(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("CPU halted at 0x{pc:08X} with no interrupt able to wake it")]
    HaltDeadlock { pc: u32 },

    #[error("Invalid ROM: {0}")]
    InvalidRom(String),

    #[error("Invalid BIOS size: {got} bytes (expected at most {expected})")]
    InvalidBiosSize { expected: usize, got: usize },

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Save state error: {0}")]
    SaveState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}
