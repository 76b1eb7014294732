// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use super::IBY2WD;

/// Describes the layout of a frame, heap object or the module data segment for the
/// garbage collector: one bit per word, set when that word holds a traced pointer.
/// The most significant bit of each map byte covers the lowest word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub(crate) id: i32,
    pub(crate) size: i32,
    pub(crate) map: Vec<u8>,
}

impl TypeDescriptor {
    /// Creates a descriptor without pointers; the map is sized to cover `size` bytes.
    #[must_use]
    pub fn new(id: i32, size: i32) -> Self {
        let words = (size.max(0) + IBY2WD - 1) / IBY2WD;
        let bytes = (words + 7) / 8;

        Self {
            id,
            size,
            map: vec![0; bytes as usize],
        }
    }

    #[must_use]
    pub fn with_map(id: i32, size: i32, map: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            size,
            map: map.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    #[must_use]
    pub fn size(&self) -> i32 {
        self.size
    }

    #[must_use]
    pub fn map(&self) -> &[u8] {
        &self.map
    }

    /// Marks the word at `byte_offset` as a pointer. The map grows if needed.
    pub fn set_pointer(&mut self, byte_offset: i32) {
        debug_assert!(byte_offset >= 0 && byte_offset % IBY2WD == 0, "unaligned pointer offset {byte_offset}");

        let (byte, bit) = Self::locate(byte_offset);
        if byte >= self.map.len() {
            self.map.resize(byte + 1, 0);
        }

        self.map[byte] |= bit;
    }

    #[must_use]
    pub fn has_pointer(&self, byte_offset: i32) -> bool {
        let (byte, bit) = Self::locate(byte_offset);
        self.map.get(byte).is_some_and(|b| b & bit != 0)
    }

    /// Iterates over the byte offsets of all words marked as pointers.
    pub fn pointer_offsets(&self) -> impl Iterator<Item = i32> + '_ {
        self.map.iter()
            .enumerate()
            .flat_map(|(index, byte)| {
                (0..8).filter(move |bit| byte & (0x80 >> bit) != 0)
                    .map(move |bit| (index as i32 * 8 + bit) * IBY2WD)
            })
    }

    /// Removes trailing zero bytes from the map.
    pub fn trim(&mut self) {
        while self.map.last() == Some(&0) {
            self.map.pop();
        }
    }

    #[must_use]
    fn locate(byte_offset: i32) -> (usize, u8) {
        let word = (byte_offset / IBY2WD) as usize;
        (word / 8, 0x80 >> (word % 8))
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "desc ${},{},\"", self.id, self.size)?;

        for byte in &self.map {
            write!(f, "{byte:02x}")?;
        }

        f.write_str("\"")
    }
}
