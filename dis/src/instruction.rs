// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use super::{Opcode, Operand};

/// A single Dis instruction. The machine computes `dst = mid OP src` for three-operand
/// arithmetic; when `mid` is absent, `dst` doubles as the left-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,
    pub src: Operand,
    pub mid: Operand,
    pub dst: Operand,
}

impl Instruction {
    #[must_use]
    pub const fn new(opcode: Opcode, src: Operand, mid: Operand, dst: Operand) -> Self {
        Self { opcode, src, mid, dst }
    }

    #[must_use]
    pub const fn with_src_dst(opcode: Opcode, src: Operand, dst: Operand) -> Self {
        Self::new(opcode, src, Operand::None, dst)
    }

    #[must_use]
    pub const fn with_dst(opcode: Opcode, dst: Operand) -> Self {
        Self::new(opcode, Operand::None, Operand::None, dst)
    }

    #[must_use]
    pub const fn without_operands(opcode: Opcode) -> Self {
        Self::new(opcode, Operand::None, Operand::None, Operand::None)
    }

    /// The second byte of the encoded instruction: `src << 3 | mid | dst`.
    #[must_use]
    pub const fn address_byte(&self) -> u8 {
        (self.src.src_dst_mode() << 3) | self.mid.mid_mode() | self.dst.src_dst_mode()
    }

    /// The code address this instruction transfers control to, if it is a branch with
    /// an immediate target.
    #[must_use]
    pub const fn branch_target(&self) -> Option<i32> {
        if !self.opcode.is_branch() {
            return None;
        }

        self.dst.immediate()
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.opcode.fmt(f)?;

        let mut first = true;
        for operand in [&self.src, &self.mid, &self.dst] {
            if operand.is_none() {
                continue;
            }

            f.write_str(if first { " " } else { ", " })?;
            operand.fmt(f)?;
            first = false;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Instruction::with_src_dst(Opcode::Movw, Operand::Immediate(1), Operand::Frame(64)), "movw $1, 64(fp)")]
    #[case(Instruction::new(Opcode::Subw, Operand::Frame(72), Operand::Frame(64), Operand::Frame(80)), "subw 72(fp), 64(fp), 80(fp)")]
    #[case(Instruction::with_dst(Opcode::Jmp, Operand::Immediate(7)), "jmp $7")]
    #[case(Instruction::without_operands(Opcode::Ret), "ret")]
    #[case(Instruction::with_src_dst(Opcode::Lea, Operand::Frame(88), Operand::FrameIndirect { base: 80, offset: 32 }), "lea 88(fp), 32(80(fp))")]
    fn display(#[case] instruction: Instruction, #[case] expected: &str) {
        assert_eq!(instruction.to_string(), expected);
    }

    #[rstest]
    #[case(Instruction::without_operands(Opcode::Ret), 0x1B)]
    #[case(Instruction::with_src_dst(Opcode::Movw, Operand::Immediate(1), Operand::Frame(64)), 0x11)]
    #[case(Instruction::new(Opcode::Load, Operand::Module(8), Operand::Immediate(0), Operand::Module(0)), 0x40)]
    #[case(Instruction::new(Opcode::Mcall, Operand::Frame(64), Operand::Immediate(0), Operand::Module(0)), 0x48)]
    #[case(Instruction::new(Opcode::Addw, Operand::Frame(64), Operand::Frame(72), Operand::Frame(80)), 0x89)]
    #[case(Instruction::with_src_dst(Opcode::Movw, Operand::Frame(64), Operand::FrameIndirect { base: 72, offset: 64 }), 0x0D)]
    fn address_byte(#[case] instruction: Instruction, #[case] expected: u8) {
        assert_eq!(instruction.address_byte(), expected);
    }

    #[test]
    fn branch_target_requires_branch_opcode() {
        let jump = Instruction::with_dst(Opcode::Jmp, Operand::Immediate(3));
        let mov = Instruction::with_src_dst(Opcode::Movw, Operand::Immediate(1), Operand::Immediate(3));

        assert_eq!(jump.branch_target(), Some(3));
        assert_eq!(mov.branch_target(), None);
    }
}
