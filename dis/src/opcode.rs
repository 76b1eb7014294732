// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::{EnumCount, EnumIter, FromRepr, IntoStaticStr};

/// An instruction opcode of the Dis virtual machine. The discriminant is the byte that
/// ends up in the encoded instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Opcode {
    //
    // Control flow
    //

    Nop = 0,
    Alt = 1,
    Nbalt = 2,
    Goto = 3,
    Call = 4,
    Frame = 5,
    Spawn = 6,
    Runt = 7,
    Load = 8,
    Mcall = 9,
    Mspawn = 10,
    Mframe = 11,
    Ret = 12,
    Jmp = 13,
    Case = 14,
    Exit = 15,

    //
    // Allocation
    //

    New = 16,
    Newa = 17,
    Newcb = 18,
    Newcw = 19,
    Newcf = 20,
    Newcp = 21,
    Newcm = 22,
    Newcmp = 23,

    //
    // Channels and lists
    //

    Send = 24,
    Recv = 25,
    Consb = 26,
    Consw = 27,
    Consp = 28,
    Consf = 29,
    Consm = 30,
    Consmp = 31,
    Headb = 32,
    Headw = 33,
    Headp = 34,
    Headf = 35,
    Headm = 36,
    Headmp = 37,
    Tail = 38,

    //
    // Moves
    //

    Lea = 39,
    Indx = 40,
    Movp = 41,
    Movm = 42,
    Movmp = 43,
    Movb = 44,
    Movw = 45,
    Movf = 46,

    //
    // Conversions
    //

    Cvtbw = 47,
    Cvtwb = 48,
    Cvtfw = 49,
    Cvtwf = 50,
    Cvtca = 51,
    Cvtac = 52,
    Cvtwc = 53,
    Cvtcw = 54,
    Cvtfc = 55,
    Cvtcf = 56,

    //
    // Arithmetic
    //

    Addb = 57,
    Addw = 58,
    Addf = 59,
    Subb = 60,
    Subw = 61,
    Subf = 62,
    Mulb = 63,
    Mulw = 64,
    Mulf = 65,
    Divb = 66,
    Divw = 67,
    Divf = 68,
    Modw = 69,
    Modb = 70,
    Andb = 71,
    Andw = 72,
    Orb = 73,
    Orw = 74,
    Xorb = 75,
    Xorw = 76,
    Shlb = 77,
    Shlw = 78,
    Shrb = 79,
    Shrw = 80,

    //
    // Strings and arrays
    //

    Insc = 81,
    Indc = 82,
    Addc = 83,
    Lenc = 84,
    Lena = 85,
    Lenl = 86,

    //
    // Branches
    //

    Beqb = 87,
    Bneb = 88,
    Bltb = 89,
    Bleb = 90,
    Bgtb = 91,
    Bgeb = 92,
    Beqw = 93,
    Bnew = 94,
    Bltw = 95,
    Blew = 96,
    Bgtw = 97,
    Bgew = 98,
    Beqf = 99,
    Bnef = 100,
    Bltf = 101,
    Blef = 102,
    Bgtf = 103,
    Bgef = 104,
    Beqc = 105,
    Bnec = 106,
    Bltc = 107,
    Blec = 108,
    Bgtc = 109,
    Bgec = 110,

    //
    // Slices and indexing
    //

    Slicea = 111,
    Slicela = 112,
    Slicec = 113,
    Indw = 114,
    Indf = 115,
    Indb = 116,
    Negf = 117,

    //
    // Big (64-bit) integers
    //

    Movl = 118,
    Addl = 119,
    Subl = 120,
    Divl = 121,
    Modl = 122,
    Mull = 123,
    Andl = 124,
    Orl = 125,
    Xorl = 126,
    Shll = 127,
    Shrl = 128,
    Bnel = 129,
    Bltl = 130,
    Blel = 131,
    Bgtl = 132,
    Bgel = 133,
    Beql = 134,

    //
    // Miscellaneous
    //

    Cvtlf = 135,
    Cvtfl = 136,
    Cvtlw = 137,
    Cvtwl = 138,
    Cvtlc = 139,
    Cvtcl = 140,
    Headl = 141,
    Consl = 142,
    Newcl = 143,
    Casec = 144,
    Indl = 145,
    Movpc = 146,
    Tcmp = 147,
    Mnewz = 148,
    Cvtrf = 149,
    Cvtfr = 150,
    Cvtws = 151,
    Cvtsw = 152,
    Lsrw = 153,
    Lsrl = 154,
    Eclr = 155,
    Newz = 156,
    Newaz = 157,
    Raise = 158,
    Casel = 159,
    Mulx = 160,
    Divx = 161,
    Cvtxx = 162,
    Mulx0 = 163,
    Divx0 = 164,
    Cvtxx0 = 165,
    Mulx1 = 166,
    Divx1 = 167,
    Cvtxx1 = 168,
    Cvtfx = 169,
    Cvtxf = 170,
    Expw = 171,
    Expl = 172,
    Expf = 173,
    #[strum(serialize = "self")]
    SelfModule = 174,
}

impl Opcode {
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::from_repr(byte)
    }

    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Whether the destination operand of this instruction is a code address.
    #[must_use]
    pub const fn is_branch(&self) -> bool {
        match self {
            Self::Call | Self::Jmp | Self::Spawn => true,

            Self::Beqb | Self::Bneb | Self::Bltb | Self::Bleb | Self::Bgtb | Self::Bgeb => true,
            Self::Beqw | Self::Bnew | Self::Bltw | Self::Blew | Self::Bgtw | Self::Bgew => true,
            Self::Beqf | Self::Bnef | Self::Bltf | Self::Blef | Self::Bgtf | Self::Bgef => true,
            Self::Beqc | Self::Bnec | Self::Bltc | Self::Blec | Self::Bgtc | Self::Bgec => true,
            Self::Beql | Self::Bnel | Self::Bltl | Self::Blel | Self::Bgtl | Self::Bgel => true,

            _ => false,
        }
    }

    /// Whether the source operand names a call-site type descriptor by its id.
    #[must_use]
    pub const fn has_type_descriptor_source(&self) -> bool {
        matches!(self, Self::Frame | Self::New)
    }

    /// Whether the middle operand names a call-site type descriptor by its id.
    #[must_use]
    pub const fn has_type_descriptor_middle(&self) -> bool {
        matches!(self, Self::Newa)
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[test]
    fn every_opcode_is_numbered_by_position() {
        assert_eq!(Opcode::COUNT, 175);

        for (index, opcode) in Opcode::iter().enumerate() {
            assert_eq!(opcode.as_byte() as usize, index);
            assert_eq!(Opcode::from_byte(index as u8), Some(opcode));
        }

        assert_eq!(Opcode::from_byte(175), None);
    }

    #[rstest]
    #[case(Opcode::Nop, 0, "nop")]
    #[case(Opcode::Call, 4, "call")]
    #[case(Opcode::Frame, 5, "frame")]
    #[case(Opcode::Load, 8, "load")]
    #[case(Opcode::Mcall, 9, "mcall")]
    #[case(Opcode::Mframe, 11, "mframe")]
    #[case(Opcode::Ret, 12, "ret")]
    #[case(Opcode::Jmp, 13, "jmp")]
    #[case(Opcode::New, 16, "new")]
    #[case(Opcode::Lea, 39, "lea")]
    #[case(Opcode::Movw, 45, "movw")]
    #[case(Opcode::Bnew, 94, "bnew")]
    #[case(Opcode::Movl, 118, "movl")]
    #[case(Opcode::Beql, 134, "beql")]
    #[case(Opcode::Mulx0, 163, "mulx0")]
    #[case(Opcode::SelfModule, 174, "self")]
    fn opcode_numbers_and_names(#[case] opcode: Opcode, #[case] byte: u8, #[case] name: &str) {
        assert_eq!(opcode.as_byte(), byte);
        assert_eq!(opcode.to_string(), name);
    }

    #[rstest]
    #[case(Opcode::Call, true)]
    #[case(Opcode::Jmp, true)]
    #[case(Opcode::Spawn, true)]
    #[case(Opcode::Beqb, true)]
    #[case(Opcode::Bgew, true)]
    #[case(Opcode::Bltf, true)]
    #[case(Opcode::Bnec, true)]
    #[case(Opcode::Bgel, true)]
    #[case(Opcode::Frame, false)]
    #[case(Opcode::Mcall, false)]
    #[case(Opcode::Ret, false)]
    #[case(Opcode::Goto, false)]
    fn branch_classification(#[case] opcode: Opcode, #[case] expected: bool) {
        assert_eq!(opcode.is_branch(), expected);
    }
}
