// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use dis::{TypeDescriptor, IBY2WD, OPERAND_MAX};
use log::trace;

/// Hands out storage in the module data segment (`mp`). Offsets grow one word at a time
/// and are never handed out twice; deduplicating by key is up to the caller.
#[derive(Debug, Default)]
pub struct ModuleData {
    next_offset: i32,
    pointers: Vec<i32>,
}

impl ModuleData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_word(&mut self, tag: &str) -> i32 {
        self.allocate(tag, false)
    }

    /// Allocates a word the garbage collector traces.
    pub fn allocate_pointer(&mut self, tag: &str) -> i32 {
        self.allocate(tag, true)
    }

    fn allocate(&mut self, tag: &str, is_pointer: bool) -> i32 {
        let offset = self.next_offset;
        assert!(
            offset <= OPERAND_MAX - IBY2WD,
            "module data is full: cannot place `{tag}` at offset {offset}"
        );

        self.next_offset += IBY2WD;
        if is_pointer {
            self.pointers.push(offset);
        }

        trace!("Module data @{offset} is `{tag}`{}", if is_pointer { " (pointer)" } else { "" });
        offset
    }

    /// Size of the segment in bytes. Never smaller than one word.
    #[must_use]
    pub fn size(&self) -> i32 {
        self.next_offset.max(IBY2WD)
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_segment_is_one_word() {
        let data = ModuleData::new();
        assert_eq!(data.size(), 8);
        assert_eq!(data.type_descriptor(0), TypeDescriptor::new(0, 8));
    }

    #[test]
    fn offsets_are_sequential_words() {
        let mut data = ModuleData::new();
        assert_eq!(data.allocate_pointer("sys"), 0);
        assert_eq!(data.allocate_word("counter"), 8);
        assert_eq!(data.allocate_pointer("\"hi\""), 16);
        assert_eq!(data.size(), 24);
    }

    #[test]
    fn descriptor_marks_pointer_words() {
        let mut data = ModuleData::new();
        data.allocate_pointer("sys");
        data.allocate_word("counter");
        data.allocate_pointer("name");

        let descriptor = data.type_descriptor(0);
        assert_eq!(descriptor.map(), &[0b1010_0000]);
        assert_eq!(descriptor.pointer_offsets().collect::<Vec<_>>(), vec![0, 16]);
    }
}
