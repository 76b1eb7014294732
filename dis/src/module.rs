// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt::Display, ops::BitOr};

use super::{DataItem, Handler, Instruction, TypeDescriptor, DEFAULT_STACK_SIZE, XMAGIC};

/// The runtime flag word in the module header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuntimeFlags(i32);

impl RuntimeFlags {
    pub const NONE: Self = Self(0);
    pub const MUST_COMPILE: Self = Self(1 << 0);
    pub const DONT_COMPILE: Self = Self(1 << 1);
    pub const SHARE_MP: Self = Self(1 << 2);
    pub const DYN_MOD: Self = Self(1 << 3);
    pub const HAS_LDT0: Self = Self(1 << 4);
    pub const HAS_EXCEPT: Self = Self(1 << 5);
    pub const HAS_LDT: Self = Self(1 << 6);

    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for RuntimeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// An exported function of the module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub pc: i32,
    pub type_id: i32,
    pub signature: u32,
    pub name: String,
}

/// A function the module expects another module (usually `$Sys`) to provide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Import {
    pub signature: u32,
    pub name: String,
}

/// A complete, loadable Dis module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub magic: i32,
    pub runtime_flags: RuntimeFlags,
    pub stack_size: i32,
    pub instructions: Vec<Instruction>,
    pub type_descriptors: Vec<TypeDescriptor>,
    pub data_size: i32,
    pub data: Vec<DataItem>,
    pub entry_pc: i32,
    pub entry_type: i32,
    pub links: Vec<Link>,

    /// One group per imported module, in the order the module loads them.
    pub imports: Vec<Vec<Import>>,

    /// Only written when [`RuntimeFlags::HAS_EXCEPT`] is set.
    pub handlers: Vec<Handler>,

    pub source_path: String,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            magic: XMAGIC,
            runtime_flags: RuntimeFlags::NONE,
            stack_size: DEFAULT_STACK_SIZE,
            instructions: Vec::new(),
            type_descriptors: Vec::new(),
            data_size: 0,
            data: Vec::new(),
            entry_pc: 0,
            entry_type: 0,
            links: Vec::new(),
            imports: Vec::new(),
            handlers: Vec::new(),
            source_path: String::new(),
        }
    }

    #[must_use]
    pub fn type_descriptor(&self, id: i32) -> Option<&TypeDescriptor> {
        self.type_descriptors.iter().find(|descriptor| descriptor.id() == id)
    }

    #[must_use]
    pub fn import_count(&self) -> usize {
        self.imports.iter().map(Vec::len).sum()
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "module {}", self.name)?;
        writeln!(f, "    magic {}, flags {:#x}, stack {}", self.magic, self.runtime_flags.bits(), self.stack_size)?;
        writeln!(f, "    entry pc {}, type {}", self.entry_pc, self.entry_type)?;

        if !self.source_path.is_empty() {
            writeln!(f, "    source {}", self.source_path)?;
        }

        writeln!(f)?;
        for descriptor in &self.type_descriptors {
            writeln!(f, "{descriptor}")?;
        }

        writeln!(f)?;
        for (pc, instruction) in self.instructions.iter().enumerate() {
            writeln!(f, "{pc:>6}  {instruction}")?;
        }

        writeln!(f)?;
        writeln!(f, "var @mp,{}", self.data_size)?;
        for item in &self.data {
            writeln!(f, "    {item}")?;
        }

        for link in &self.links {
            writeln!(f, "link {},{},{:#010x},\"{}\"", link.type_id, link.pc, link.signature, link.name)?;
        }

        for (index, group) in self.imports.iter().enumerate() {
            writeln!(f, "ldt {index}")?;
            for import in group {
                writeln!(f, "    {:#010x},\"{}\"", import.signature, import.name)?;
            }
        }

        for handler in &self.handlers {
            writeln!(f, "{handler}")?;
        }

        Ok(())
    }
}
