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

//! Count-up chaining

use super::*;
use crate::core::interrupt::interrupts;

#[test]
fn test_count_up_ignores_own_prescaler() {
    let mut timers = Timers::new();
    timers.write_reload(0, 0xFFFC); // overflows every 4 cycles
    timers.write_control(0, 0x0080, 0);
    // Count-up with the largest prescaler selected
    timers.write_control(1, 0x0087, 0);

    run(&mut timers, 40);

    assert_eq!(timers.read_counter(1, 40), 10);
    assert_eq!(timers.channel(1).next_event(), None);
}

#[test]
fn test_count_up_does_not_tick_without_lower_overflow() {
    let mut timers = Timers::new();
    timers.write_control(1, 0x0084, 0);

    run(&mut timers, 1_000_000);
    assert_eq!(timers.read_counter(1, 1_000_000), 0);
}

#[test]
fn test_cascade_wrap_raises_upper_irq() {
    let mut timers = Timers::new();
    timers.write_reload(0, 0xFFFF);
    timers.write_control(0, 0x0080, 0);
    timers.write_reload(1, 0xFFFE);
    timers.write_control(1, 0x00C4, 0);

    let irq = run(&mut timers, 1);
    assert_eq!(irq.read_flags(), 0);
    assert_eq!(timers.read_counter(1, 1), 0xFFFF);

    let irq = run(&mut timers, 2);
    assert_eq!(irq.read_flags(), interrupts::TIMER1);
    assert_eq!(timers.read_counter(1, 2), 0xFFFE);
}

#[test]
fn test_cascade_chains_through_all_timers() {
    let mut timers = Timers::new();
    timers.write_reload(0, 0xFFFF);
    timers.write_control(0, 0x0080, 0);
    for i in 1..4 {
        timers.write_reload(i, 0xFFFF);
        timers.write_control(i, 0x00C4, 0);
    }

    let irq = run(&mut timers, 1);
    assert_eq!(
        irq.read_flags(),
        interrupts::TIMER1 | interrupts::TIMER2 | interrupts::TIMER3
    );
}
