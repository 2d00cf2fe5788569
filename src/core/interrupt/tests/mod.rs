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

//! Interrupt controller tests
//!
//! - `controller`: IE/IF/IME behavior through the I/O registers
//! - `scheduler`: `next_event` bookkeeping and deadline delivery
//! - `services`: high-level SWI services

use super::*;
use crate::core::cpu::CPU;
use crate::core::memory::Bus;

mod controller;

const IE_ADDR: u32 = 0x0400_0200;
const IF_ADDR: u32 = 0x0400_0202;
const IME_ADDR: u32 = 0x0400_0208;

const WRAM: u32 = 0x0200_0000;
const IWRAM: u32 = 0x0300_0000;

fn setup() -> (CPU, Bus) {
    let mut cpu = CPU::new();
    cpu.set_pc(IWRAM);
    (cpu, Bus::new())
}

/// Run a BIOS service, failing the test on error
fn swi(cpu: &mut CPU, bus: &mut Bus, number: u8) {
    if let Err(e) = bios::service(cpu, bus, number) {
        panic!("SWI 0x{:02X} failed: {}", number, e);
    }
}

fn write_bytes(bus: &mut Bus, at: u32, bytes: &[u8]) {
    for (i, &byte) in bytes.iter().enumerate() {
        bus.store8(at + i as u32, byte);
    }
}

fn read_bytes(bus: &Bus, at: u32, len: usize) -> Vec<u8> {
    (0..len as u32).map(|i| bus.load_u8(at + i)).collect()
}
