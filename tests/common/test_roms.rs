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

//! Small hand-assembled test programs

/// Index of `handler` inside [`vblank_wait_program`]
#[allow(dead_code)]
pub const VBLANK_HANDLER_INDEX: u32 = 12;

/// VBlank-driven main loop with a user IRQ handler
///
/// The main loop counts completed VBlankIntrWait calls in r4. The handler
/// counts interrupts in r5, acknowledges IF and records the bits in the
/// BIOS flag word.
#[allow(dead_code)]
pub fn vblank_wait_program() -> Vec<u32> {
    vec![
        0xE3A0_0301, // mov r0, #0x04000000
        0xE28F_1024, // add r1, pc, #0x24      (handler)
        0xE500_1004, // str r1, [r0, #-4]      (0x03007FFC)
        0xE3A0_1001, // mov r1, #1
        0xE280_3C02, // add r3, r0, #0x200
        0xE1C3_10B0, // strh r1, [r3]          (IE = VBlank)
        0xE583_1008, // str r1, [r3, #8]       (IME = 1)
        0xE3A0_1008, // mov r1, #8
        0xE1C0_10B4, // strh r1, [r0, #4]      (DISPSTAT VBlank IRQ)
        0xEF05_0000, // swi 0x05               (VBlankIntrWait)
        0xE284_4001, // add r4, r4, #1
        0xEAFF_FFFC, // b swi
        // handler:
        0xE280_3C02, // add r3, r0, #0x200
        0xE1D3_10B2, // ldrh r1, [r3, #2]      (IF)
        0xE1C3_10B2, // strh r1, [r3, #2]      (acknowledge)
        0xE510_2008, // ldr r2, [r0, #-8]      (0x03007FF8)
        0xE182_2001, // orr r2, r2, r1
        0xE500_2008, // str r2, [r0, #-8]
        0xE285_5001, // add r5, r5, #1
        0xE12F_FF1E, // bx lr
    ]
}

/// ARM code that switches to Thumb and computes 5 + 3 in r1
#[allow(dead_code)]
pub fn thumb_interwork_program() -> Vec<u32> {
    vec![
        0xE28F_0001, // add r0, pc, #1
        0xE12F_FF10, // bx r0
        // Thumb: movs r1, #5; adds r1, #3
        0x3103_2105,
        // Thumb: b .
        0x0000_E7FE,
    ]
}
