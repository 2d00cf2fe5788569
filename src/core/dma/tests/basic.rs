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

//! Register latching and control readback

use super::*;

#[test]
fn test_new_channel_is_idle() {
    let channel = DmaChannel::new(2);
    assert!(!channel.is_enabled());
    assert_eq!(channel.timing(), DmaTiming::Now);
    assert_eq!(channel.width(), 2);
    assert_eq!(channel.next_irq(), None);
}

#[test]
fn test_address_halves_merge_and_mask() {
    let mut channel = DmaChannel::new(0);
    channel.write_source(0x5679, false);
    channel.write_source(0xF123, true);
    assert_eq!(channel.source, 0x0123_5678);

    channel.write_dest(0x0001, false);
    channel.write_dest(0x0300, true);
    assert_eq!(channel.dest, 0x0300_0000);
}

#[test]
fn test_zero_count_means_maximum() {
    let mut low = DmaChannel::new(0);
    low.write_count(0);
    assert_eq!(low.count, 0x4000);
    low.write_count(0xFFFF);
    assert_eq!(low.count, 0x3FFF);

    let mut three = DmaChannel::new(3);
    three.write_count(0);
    assert_eq!(three.count, 0x10000);
    three.write_count(0xFFFF);
    assert_eq!(three.count, 0xFFFF);
}

#[test]
fn test_address_registers_read_as_zero() {
    let mut bus = Bus::new();
    bus.store32(0x0400_00D4, 0x0300_0000);
    assert_eq!(bus.load32(0x0400_00D4), 0);
}

#[test]
fn test_armed_channel_latches_registers() {
    let mut bus = Bus::new();
    // VBlank timing, 32-bit, dest fixed
    start(&mut bus, 1, WRAM, IWRAM + 0x100, 8, 0x9440);

    let channel = &bus.dma_channels()[1];
    assert!(channel.is_enabled());
    assert_eq!(channel.timing(), DmaTiming::VBlank);
    assert_eq!(channel.width(), 4);
    assert_eq!(channel.dst_control, AddressControl::Fixed);
    assert_eq!(channel.src_control, AddressControl::Increment);
    assert_eq!(channel.next_source, WRAM);
    assert_eq!(channel.next_dest, IWRAM + 0x100);
    assert_eq!(channel.next_count, 8);
    assert_eq!(control_reg(&bus, 1), 0x9440);
}

#[test]
fn test_rewrite_while_enabled_keeps_working_copies() {
    let mut bus = Bus::new();
    start(&mut bus, 0, WRAM, IWRAM, 4, 0x9000);

    // New source without a fresh enable edge
    bus.store32(0x0400_00B0, WRAM + 0x40);
    bus.store16(0x0400_00BA, 0x9000);

    let channel = &bus.dma_channels()[0];
    assert_eq!(channel.source, WRAM + 0x40);
    assert_eq!(channel.next_source, WRAM);
}

#[test]
fn test_disable_stops_armed_channel() {
    let mut bus = Bus::new();
    start(&mut bus, 2, WRAM, IWRAM, 4, 0xA000);
    bus.store16(0x0400_00D2, 0x2000);
    assert!(!bus.dma_channels()[2].is_enabled());
}

#[test]
fn test_drq_control_is_reported_and_still_arms() {
    let mut bus = Bus::new();
    // Channel 3, VBlank timing, Game Pak DRQ, source increment+reload
    start(&mut bus, 3, WRAM, IWRAM, 4, 0x9980);

    assert_eq!(bus.unsupported_count(), 1);
    let channel = &bus.dma_channels()[3];
    assert!(channel.is_enabled());
    assert_eq!(channel.timing(), DmaTiming::VBlank);
    assert_eq!(channel.src_control, AddressControl::IncrementReload);
}
