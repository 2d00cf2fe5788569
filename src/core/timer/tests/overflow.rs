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

//! Overflow scheduling and interrupt delivery

use super::*;
use crate::core::interrupt::interrupts;

#[test]
fn test_overflow_raises_irq_at_deadline() {
    let mut timers = Timers::new();
    timers.write_reload(0, 0xFFF0);
    timers.write_control(0, 0x00C0, 0); // enable + irq

    let irq = run(&mut timers, 15);
    assert_eq!(irq.read_flags(), 0);

    let irq = run(&mut timers, 16);
    assert_eq!(irq.read_flags(), interrupts::TIMER0);
    assert_eq!(timers.next_event(), Some(32));
    assert_eq!(timers.read_counter(0, 16), 0xFFF0);
}

#[test]
fn test_overflow_without_irq_bit() {
    let mut timers = Timers::new();
    timers.write_reload(3, 0xFFFF);
    timers.write_control(3, 0x0080, 0);

    let irq = run(&mut timers, 1);
    assert_eq!(irq.read_flags(), 0);
    assert_eq!(timers.next_event(), Some(2));
}

#[test]
fn test_missed_overflows_catch_up() {
    let mut timers = Timers::new();
    timers.write_reload(0, 0xFF00);
    timers.write_control(0, 0x0080, 0);

    let mut audio = OverflowLog::default();
    let mut irq = InterruptController::new();
    timers.update(0x100 * 3 + 5, &mut irq, &mut audio);

    assert_eq!(audio.overflows, vec![(0, 0x100), (0, 0x200), (0, 0x300)]);
    assert_eq!(timers.next_event(), Some(0x400));
}

#[test]
fn test_new_reload_used_after_overflow() {
    let mut timers = Timers::new();
    timers.write_reload(1, 0xFFF0);
    timers.write_control(1, 0x0080, 0);
    timers.write_reload(1, 0xFF00);

    run(&mut timers, 16);
    assert_eq!(timers.read_counter(1, 16), 0xFF00);
    assert_eq!(timers.next_event(), Some(16 + 0x100));
}

#[test]
fn test_timer_one_notifies_audio_timer_two_does_not() {
    let mut timers = Timers::new();
    timers.write_reload(1, 0xFFFE);
    timers.write_control(1, 0x0080, 0);
    timers.write_reload(2, 0xFFFE);
    timers.write_control(2, 0x0080, 0);

    let mut audio = OverflowLog::default();
    let mut irq = InterruptController::new();
    timers.update(2, &mut irq, &mut audio);

    assert_eq!(audio.overflows, vec![(1, 2)]);
}
