// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

/// An exception handler covering the instructions `pc1..pc2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handler {
    /// Frame offset the raised exception is stored at.
    pub exception_offset: i32,
    pub pc1: i32,
    pub pc2: i32,

    /// Descriptor of the exception data, or `-1` when the handler only sees strings.
    pub type_id: i32,

    /// Nesting depth of the handler, stored in the upper half of the label count.
    pub scope: i32,

    pub exceptions: Vec<Exception>,

    /// Where exceptions not named in `exceptions` go, or `-1` when they propagate.
    pub wildcard_pc: i32,
}

/// A named exception and the code that handles it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Exception {
    pub name: String,
    pub pc: i32,
}

impl Handler {
    /// A handler for string exceptions that sends everything to `wildcard_pc`.
    #[must_use]
    pub fn new(exception_offset: i32, pc1: i32, pc2: i32, wildcard_pc: i32) -> Self {
        Self {
            exception_offset,
            pc1,
            pc2,
            type_id: -1,
            scope: 0,
            exceptions: Vec::new(),
            wildcard_pc,
        }
    }

    /// Moves every code address by `start`. A missing wildcard stays missing.
    pub fn relocate(&mut self, start: i32) {
        self.pc1 += start;
        self.pc2 += start;

        for exception in &mut self.exceptions {
            exception.pc += start;
        }

        if self.wildcard_pc >= 0 {
            self.wildcard_pc += start;
        }
    }

    /// The number of labels and the scope as they are written to the handler table.
    #[must_use]
    pub(crate) fn packed_labels(&self) -> i32 {
        self.exceptions.len() as i32 | self.scope << 16
    }
}

impl Display for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler {}..{}, exception {}(fp), desc {}", self.pc1, self.pc2, self.exception_offset, self.type_id)?;

        if self.scope != 0 {
            write!(f, ", scope {}", self.scope)?;
        }

        for exception in &self.exceptions {
            write!(f, "\n    \"{}\" -> {}", exception.name, exception.pc)?;
        }

        if self.wildcard_pc >= 0 {
            write!(f, "\n    * -> {}", self.wildcard_pc)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn relocation_moves_every_address() {
        let mut handler = Handler::new(72, 0, 4, 4);
        handler.exceptions.push(Exception { name: "fail".into(), pc: 6 });
        handler.relocate(10);

        assert_eq!(handler.pc1, 10);
        assert_eq!(handler.pc2, 14);
        assert_eq!(handler.exceptions[0].pc, 16);
        assert_eq!(handler.wildcard_pc, 14);
        assert_eq!(handler.exception_offset, 72);
    }

    #[test]
    fn missing_wildcard_is_kept() {
        let mut handler = Handler::new(72, 0, 4, -1);
        handler.relocate(10);
        assert_eq!(handler.wildcard_pc, -1);
    }

    #[test]
    fn labels_are_packed_with_scope() {
        let mut handler = Handler::new(64, 0, 1, -1);
        handler.scope = 2;
        handler.exceptions.push(Exception { name: "a".into(), pc: 0 });
        handler.exceptions.push(Exception { name: "b".into(), pc: 0 });

        assert_eq!(handler.packed_labels(), 0x0002_0002);
    }

    #[test]
    fn listing() {
        let mut handler = Handler::new(80, 3, 9, 9);
        handler.exceptions.push(Exception { name: "fail".into(), pc: 11 });

        assert_eq!(handler.to_string(), "handler 3..9, exception 80(fp), desc -1\n    \"fail\" -> 11\n    * -> 9");
    }
}
