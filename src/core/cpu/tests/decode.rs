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

use super::super::condition::Condition;
use super::super::decode::*;

#[test]
fn test_decode_data_processing_immediate() {
    // mov r0, #10
    let decoded = decode_arm(0xE3A0_000A);
    assert_eq!(decoded.condition, Condition::AL);
    assert_eq!(
        decoded.instruction,
        Instruction::DataProcessing {
            op: AluOp::Mov,
            set_flags: false,
            rd: 0,
            rn: 0,
            operand: ShifterOperand::Immediate { value: 10, carry: None },
        }
    );
    assert!(!decoded.writes_pc);
}

#[test]
fn test_decode_rotated_immediate_carry() {
    // mov r0, #0x80000000 (0x02 ror 2)
    let decoded = decode_arm(0xE3A0_0102);
    assert_eq!(
        decoded.instruction,
        Instruction::DataProcessing {
            op: AluOp::Mov,
            set_flags: false,
            rd: 0,
            rn: 0,
            operand: ShifterOperand::Immediate {
                value: 0x8000_0000,
                carry: Some(true),
            },
        }
    );
}

#[test]
fn test_decode_branch_is_fixed_jump() {
    // bne -8
    let decoded = decode_arm(0x1AFF_FFFE);
    assert_eq!(decoded.condition, Condition::NE);
    assert_eq!(decoded.instruction, Instruction::Branch { offset: -8, link: false });
    assert!(decoded.writes_pc);
    assert!(decoded.fixed_jump);
}

#[test]
fn test_decode_bx_is_not_fixed() {
    let decoded = decode_arm(0xE12F_FF10);
    assert_eq!(decoded.instruction, Instruction::BranchExchange { rm: 0 });
    assert!(decoded.writes_pc);
    assert!(!decoded.fixed_jump);
}

#[test]
fn test_decode_ldm_with_pc_writes_pc() {
    // ldmia sp!, {r0, pc}
    let decoded = decode_arm(0xE8BD_8001);
    assert!(matches!(
        decoded.instruction,
        Instruction::BlockTransfer { load: true, rn: 13, list: 0x8001, writeback: true, .. }
    ));
    assert!(decoded.writes_pc);
}

#[test]
fn test_decode_multiply_long() {
    let decoded = decode_arm(0xE0C3_2190);
    assert_eq!(
        decoded.instruction,
        Instruction::MultiplyLong {
            signed: true,
            accumulate: false,
            set_flags: false,
            rd_hi: 3,
            rd_lo: 2,
            rs: 1,
            rm: 0,
        }
    );
}

#[test]
fn test_decode_swi_comment() {
    let decoded = decode_arm(0xEF06_0000);
    assert_eq!(decoded.instruction, Instruction::SoftwareInterrupt { comment: 6 });
}

#[test]
fn test_decode_swi_number_ignores_low_bits() {
    // Halt is `swi 0x020000` in ARM state; the low byte is not the number
    let halt = decode_arm(0xEF02_0000);
    assert_eq!(halt.instruction, Instruction::SoftwareInterrupt { comment: 2 });
    let soft_reset = decode_arm(0xEF00_0002);
    assert_eq!(soft_reset.instruction, Instruction::SoftwareInterrupt { comment: 0 });
}

#[test]
fn test_decode_coprocessor_is_undefined() {
    assert_eq!(decode_arm(0xEC00_0000).instruction, Instruction::Undefined);
}

#[test]
fn test_decode_thumb_push_pop() {
    assert!(matches!(
        decode_thumb(0xB503).instruction,
        Instruction::BlockTransfer { load: false, rn: 13, list: 0x4003, writeback: true, .. }
    ));
    let pop_pc = decode_thumb(0xBD01);
    assert!(matches!(
        pop_pc.instruction,
        Instruction::BlockTransfer { load: true, rn: 13, list: 0x8001, .. }
    ));
    assert!(pop_pc.writes_pc);
}

#[test]
fn test_decode_thumb_conditional_branch() {
    let decoded = decode_thumb(0xD0FE);
    assert_eq!(decoded.condition, Condition::EQ);
    assert_eq!(decoded.instruction, Instruction::Branch { offset: -4, link: false });
}

#[test]
fn test_decode_thumb_long_branch_halves() {
    assert_eq!(
        decode_thumb(0xF7FF).instruction,
        Instruction::ThumbLongBranchHigh { offset: -1 }
    );
    assert_eq!(
        decode_thumb(0xF880).instruction,
        Instruction::ThumbLongBranchLow { offset: 0x80 }
    );
}

#[test]
fn test_compiled_op_records_origin() {
    let op = CompiledOp::compile(0x0800_0000, 0x2105, super::ExecMode::Thumb);
    assert_eq!(op.address, 0x0800_0000);
    assert_eq!(op.opcode, 0x2105);
    assert_eq!(op.exec_mode, super::ExecMode::Thumb);
    assert_eq!(op.serial, 0);
    assert!(op.next.is_none());
}
