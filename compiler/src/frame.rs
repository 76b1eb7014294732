// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use dis::{TypeDescriptor, IBY2WD, MAX_TEMP};

/// The activation record of one function. User slots start after the fixed header of
/// `MAX_TEMP` bytes; the header itself is never marked in the pointer map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    next_offset: i32,
    pointers: Vec<i32>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_offset: MAX_TEMP,
            pointers: Vec::new(),
        }
    }

    pub fn allocate_word(&mut self) -> i32 {
        let offset = self.next_offset;
        self.next_offset += IBY2WD;
        offset
    }

    pub fn allocate_pointer(&mut self) -> i32 {
        let offset = self.allocate_word();
        self.pointers.push(offset);
        offset
    }

    pub fn allocate(&mut self, is_pointer: bool) -> i32 {
        if is_pointer {
            self.allocate_pointer()
        } else {
            self.allocate_word()
        }
    }

    #[must_use]
    pub fn size(&self) -> i32 {
        self.next_offset
    }

    #[must_use]
    pub fn type_descriptor(&self, id: i32) -> TypeDescriptor {
        let mut descriptor = TypeDescriptor::new(id, self.size());
        for offset in &self.pointers {
            descriptor.set_pointer(*offset);
        }
        descriptor
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
