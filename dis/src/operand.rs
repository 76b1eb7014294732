// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

pub(crate) const AMP: u8 = 0x00;
pub(crate) const AFP: u8 = 0x01;
pub(crate) const AIMM: u8 = 0x02;
pub(crate) const AXXX: u8 = 0x03;
pub(crate) const AIND: u8 = 0x04;

pub(crate) const AXNON: u8 = 0x00;
pub(crate) const AXIMM: u8 = 0x40;
pub(crate) const AXINF: u8 = 0x80;
pub(crate) const AXINM: u8 = 0xC0;

/// One operand slot of an [`Instruction`](crate::Instruction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operand {
    #[default]
    None,

    /// `$value`
    Immediate(i32),

    /// `offset(fp)`
    Frame(i32),

    /// `offset(mp)`
    Module(i32),

    /// `offset(base(fp))`: the frame word at `base` holds a pointer, `offset` is added to it.
    FrameIndirect {
        base: i32,
        offset: i32,
    },

    /// `offset(base(mp))`
    ModuleIndirect {
        base: i32,
        offset: i32,
    },
}

impl Operand {
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub const fn is_indirect(&self) -> bool {
        matches!(self, Self::FrameIndirect { .. } | Self::ModuleIndirect { .. })
    }

    #[must_use]
    pub const fn immediate(&self) -> Option<i32> {
        match self {
            Self::Immediate(value) => Some(*value),
            _ => None,
        }
    }

    /// The addressing-mode bits of this operand in the source or destination position.
    #[must_use]
    pub const fn src_dst_mode(&self) -> u8 {
        match self {
            Self::None => AXXX,
            Self::Immediate(..) => AIMM,
            Self::Frame(..) => AFP,
            Self::Module(..) => AMP,
            Self::FrameIndirect { .. } => AFP | AIND,
            Self::ModuleIndirect { .. } => AMP | AIND,
        }
    }

    /// The addressing-mode bits of this operand in the middle position. The middle
    /// operand cannot be indirect; those forms encode as absent.
    #[must_use]
    pub const fn mid_mode(&self) -> u8 {
        match self {
            Self::Immediate(..) => AXIMM,
            Self::Frame(..) => AXINF,
            Self::Module(..) => AXINM,
            _ => AXNON,
        }
    }

    /// Returns the operand values in the order they are written to the instruction stream.
    #[must_use]
    pub(crate) fn encoded_values(&self) -> impl Iterator<Item = i32> {
        let (first, second) = match *self {
            Self::None => (None, None),
            Self::Immediate(value) | Self::Frame(value) | Self::Module(value) => (Some(value), None),
            Self::FrameIndirect { base, offset } | Self::ModuleIndirect { base, offset } => (Some(base), Some(offset)),
        };

        first.into_iter().chain(second)
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Immediate(value) => write!(f, "${value}"),
            Self::Frame(offset) => write!(f, "{offset}(fp)"),
            Self::Module(offset) => write!(f, "{offset}(mp)"),
            Self::FrameIndirect { base, offset } => write!(f, "{offset}({base}(fp))"),
            Self::ModuleIndirect { base, offset } => write!(f, "{offset}({base}(mp))"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Operand::None, "-")]
    #[case(Operand::Immediate(-3), "$-3")]
    #[case(Operand::Frame(64), "64(fp)")]
    #[case(Operand::Module(8), "8(mp)")]
    #[case(Operand::FrameIndirect { base: 72, offset: 32 }, "32(72(fp))")]
    #[case(Operand::ModuleIndirect { base: 0, offset: 16 }, "16(0(mp))")]
    fn display(#[case] operand: Operand, #[case] expected: &str) {
        assert_eq!(operand.to_string(), expected);
    }

    #[rstest]
    #[case(Operand::None, AXXX, AXNON)]
    #[case(Operand::Immediate(1), AIMM, AXIMM)]
    #[case(Operand::Frame(64), AFP, AXINF)]
    #[case(Operand::Module(0), AMP, AXINM)]
    #[case(Operand::FrameIndirect { base: 64, offset: 0 }, 0x05, AXNON)]
    #[case(Operand::ModuleIndirect { base: 64, offset: 0 }, 0x04, AXNON)]
    fn addressing_modes(#[case] operand: Operand, #[case] src_dst: u8, #[case] mid: u8) {
        assert_eq!(operand.src_dst_mode(), src_dst);
        assert_eq!(operand.mid_mode(), mid);
    }
}
