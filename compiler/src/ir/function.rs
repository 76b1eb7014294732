// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{BlockId, Constant, Instruction, Type, ValueId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|instruction| instruction.is_terminator())
    }
}

/// A function in SSA form. A function without blocks is a declaration: it can be called
/// by name, but has no code of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Function {
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<Type>,

    #[serde(default)]
    pub result: Option<Type>,

    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    #[must_use]
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    #[must_use]
    pub fn parameter_values(&self) -> impl Iterator<Item = (ValueId, Type)> + '_ {
        self.parameters.iter()
            .enumerate()
            .map(|(index, ty)| (ValueId::new(index), *ty))
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(|block| block.instructions.iter())
    }

    /// All string literals in the order they appear, duplicates included.
    pub fn string_literals(&self) -> impl Iterator<Item = &str> {
        self.instructions()
            .filter_map(|instruction| match instruction {
                Instruction::Const { value: Constant::String(value), .. } => Some(value.as_str()),
                _ => None,
            })
    }

    /// The names of all `Sys` functions called, in the order the calls appear.
    pub fn native_calls(&self) -> impl Iterator<Item = &str> {
        self.instructions()
            .filter_map(|instruction| match instruction {
                Instruction::CallNative { function, .. } => Some(function.as_str()),
                _ => None,
            })
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "function {}(", self.name)?;

        for (index, (value, ty)) in self.parameter_values().enumerate() {
            if index != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}: {ty}")?;
        }

        f.write_str(")")?;

        if let Some(result) = &self.result {
            write!(f, " -> {result}")?;
        }

        for (index, block) in self.blocks.iter().enumerate() {
            write!(f, "\n{}:", BlockId::new(index))?;

            for instruction in &block.instructions {
                write!(f, "\n    {instruction}")?;
            }
        }

        f.write_str("\n")
    }
}
