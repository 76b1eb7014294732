// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::{AsRefStr, FromRepr};

/// The kind nibble in the header byte of a data item. A zero header byte ends the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, FromRepr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum DataKind {
    Bytes = 1,
    Words = 2,
    String = 3,
    Reals = 4,
    Array = 5,
    Index = 6,
    Pop = 7,
    Longs = 8,
}

/// An initializer for part of the module data segment.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Bytes {
        offset: i32,
        bytes: Vec<u8>,
    },

    /// 32-bit words, each loaded into a word-sized slot.
    Words {
        offset: i32,
        words: Vec<u32>,
    },

    String {
        offset: i32,
        value: String,
    },

    Reals {
        offset: i32,
        reals: Vec<f64>,
    },

    Longs {
        offset: i32,
        longs: Vec<i64>,
    },

    /// Creates an array with the element descriptor `type_id`.
    Array {
        offset: i32,
        type_id: i32,
        length: i32,
    },

    /// Directs the following items into element `index` of the array at `offset`.
    Index {
        offset: i32,
        index: i32,
    },

    /// Ends a run of items started by [`DataItem::Index`].
    Pop,
}

impl DataItem {
    #[must_use]
    pub fn string(offset: i32, value: impl Into<String>) -> Self {
        Self::String { offset, value: value.into() }
    }

    #[must_use]
    pub fn long(offset: i32, value: i64) -> Self {
        Self::Longs { offset, longs: vec![value] }
    }

    #[must_use]
    pub fn word(offset: i32, value: u32) -> Self {
        Self::Words { offset, words: vec![value] }
    }

    #[must_use]
    pub fn real(offset: i32, value: f64) -> Self {
        Self::Reals { offset, reals: vec![value] }
    }

    #[must_use]
    pub const fn kind(&self) -> DataKind {
        match self {
            Self::Bytes { .. } => DataKind::Bytes,
            Self::Words { .. } => DataKind::Words,
            Self::String { .. } => DataKind::String,
            Self::Reals { .. } => DataKind::Reals,
            Self::Longs { .. } => DataKind::Longs,
            Self::Array { .. } => DataKind::Array,
            Self::Index { .. } => DataKind::Index,
            Self::Pop => DataKind::Pop,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> i32 {
        match self {
            Self::Bytes { offset, .. } => *offset,
            Self::Words { offset, .. } => *offset,
            Self::String { offset, .. } => *offset,
            Self::Reals { offset, .. } => *offset,
            Self::Longs { offset, .. } => *offset,
            Self::Array { offset, .. } => *offset,
            Self::Index { offset, .. } => *offset,
            Self::Pop => 0,
        }
    }

    /// The element count written into the item header.
    #[must_use]
    pub fn count(&self) -> i32 {
        match self {
            Self::Bytes { bytes, .. } => bytes.len() as i32,
            Self::Words { words, .. } => words.len() as i32,
            Self::String { value, .. } => value.len() as i32,
            Self::Reals { reals, .. } => reals.len() as i32,
            Self::Longs { longs, .. } => longs.len() as i32,
            Self::Array { .. } | Self::Index { .. } | Self::Pop => 1,
        }
    }
}

impl Display for DataItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes { offset, bytes } => {
                write!(f, "byte @{offset}")?;
                for byte in bytes {
                    write!(f, " {byte}")?;
                }
                Ok(())
            }

            Self::Words { offset, words } => {
                write!(f, "word @{offset}")?;
                for word in words {
                    write!(f, " {}", *word as i32)?;
                }
                Ok(())
            }

            Self::String { offset, value } => write!(f, "string @{offset} {value:?}"),

            Self::Reals { offset, reals } => {
                write!(f, "real @{offset}")?;
                for real in reals {
                    write!(f, " {real}")?;
                }
                Ok(())
            }

            Self::Longs { offset, longs } => {
                write!(f, "long @{offset}")?;
                for long in longs {
                    write!(f, " {long}")?;
                }
                Ok(())
            }

            Self::Array { offset, type_id, length } => write!(f, "array @{offset} ${type_id},{length}"),

            Self::Index { offset, index } => write!(f, "indir @{offset},{index}"),

            Self::Pop => f.write_str("apop"),
        }
    }
}
