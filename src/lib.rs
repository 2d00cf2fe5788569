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

//! Game Boy Advance emulator core library
//!
//! This library provides the core emulation components for a Game Boy
//! Advance: the ARM7TDMI CPU with its compiled-op cache, the memory bus
//! with wait states, DMA, timers, the interrupt scheduler and the
//! high-level BIOS services.
//!
//! # Example
//!
//! ```
//! use gbacore::core::cpu::CPU;
//! use gbacore::core::memory::Bus;
//!
//! let mut cpu = CPU::new();
//! let mut bus = Bus::new();
//!
//! // mov r1, #3 in IWRAM
//! bus.store32(0x0300_0000, 0xE3A0_1003);
//! cpu.reset(0x0300_0000);
//! cpu.step(&mut bus).unwrap();
//! assert_eq!(cpu.reg(1), 3);
//! ```

pub mod core;
