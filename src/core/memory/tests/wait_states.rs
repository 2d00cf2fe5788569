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

//! Cycle accounting

use super::*;

fn cost(bus: &mut Bus, access: impl FnOnce(&mut Bus)) -> u64 {
    let before = bus.cycles();
    access(bus);
    bus.cycles() - before
}

#[test]
fn test_power_on_costs() {
    let mut bus = Bus::new();
    assert_eq!(cost(&mut bus, |b| b.wait(IWRAM)), 1);
    assert_eq!(cost(&mut bus, |b| b.wait32(IWRAM)), 1);
    assert_eq!(cost(&mut bus, |b| b.wait(WRAM)), 3);
    assert_eq!(cost(&mut bus, |b| b.wait32(WRAM)), 6);
    assert_eq!(cost(&mut bus, |b| b.wait32(0x0600_0000)), 2);
    assert_eq!(cost(&mut bus, |b| b.wait(ROM)), 5);
    assert_eq!(cost(&mut bus, |b| b.wait32(ROM)), 8);
    assert_eq!(cost(&mut bus, |b| b.wait_seq32(ROM)), 6);
    assert_eq!(cost(&mut bus, |b| b.wait_prefetch32(ROM)), 6);
}

#[test]
fn test_burst_is_one_nonsequential_plus_sequential() {
    let mut bus = Bus::new();
    assert_eq!(cost(&mut bus, |b| b.wait_multi32(WRAM, 4)), 6 + 3 * 6);
    assert_eq!(cost(&mut bus, |b| b.wait_multi32(IWRAM, 8)), 8);
    assert_eq!(cost(&mut bus, |b| b.wait_multi32(ROM, 1)), 8);
}

#[test]
fn test_multiplier_early_termination() {
    let mut bus = Bus::new();
    assert_eq!(cost(&mut bus, |b| b.wait_mul(0x0000_00FF)), 1);
    assert_eq!(cost(&mut bus, |b| b.wait_mul(0xFFFF_FF80)), 1);
    assert_eq!(cost(&mut bus, |b| b.wait_mul(0x0000_1234)), 2);
    assert_eq!(cost(&mut bus, |b| b.wait_mul(0x0012_3456)), 3);
    assert_eq!(cost(&mut bus, |b| b.wait_mul(0x1234_5678)), 4);
}

#[test]
fn test_wait_tables_follow_waitcnt() {
    let mut waits = WaitStates::new();
    // WS2 first access 8, second 1; SRAM 8
    waits.adjust(0x0703);
    assert_eq!(waits.nonseq16[0xC], 8);
    assert_eq!(waits.seq16[0xD], 1);
    assert_eq!(waits.nonseq32[0xC], 10);
    assert_eq!(waits.seq32[0xC], 3);
    assert_eq!(waits.nonseq16[0xE], 8);
    assert_eq!(waits.prefetch16[0xC], 1);
    // Other regions untouched
    assert_eq!(waits.nonseq16[0x2], 2);
}
