// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::{Function, Type};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Global {
    pub name: String,
    pub ty: Type,
}

/// A type-checked program: the unit that is compiled into one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Program {
    /// Path of the source file the program was produced from. The module name is derived
    /// from its file name.
    pub source_path: String,

    #[serde(default = "default_entry")]
    pub entry: String,

    #[serde(default)]
    pub globals: Vec<Global>,

    #[serde(default)]
    pub functions: Vec<Function>,
}

pub const DEFAULT_ENTRY: &str = "main";

fn default_entry() -> String {
    DEFAULT_ENTRY.to_string()
}

impl Program {
    #[must_use]
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            entry: default_entry(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Looks up a function by name. Definitions take precedence over declarations, and
    /// among several definitions the first one wins.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        let mut candidates = self.functions.iter().filter(|function| function.name == name);
        let first = candidates.next()?;

        if first.is_declaration() {
            candidates.find(|function| !function.is_declaration()).or(Some(first))
        } else {
            Some(first)
        }
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|global| global.name == name)
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "program {} with {} {}",
            self.source_path,
            self.functions.len(),
            if self.functions.len() == 1 { "function" } else { "functions" }
        )?;

        for global in &self.globals {
            write!(f, "\nglobal {}: {}", global.name, global.ty)?;
        }

        for function in &self.functions {
            f.write_str("\n")?;
            function.fmt(f)?;
        }

        Ok(())
    }
}
