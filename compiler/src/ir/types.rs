// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// The type of an IR value. Every type occupies exactly one 8-byte slot in a frame or in
/// module data; strings and objects are references the garbage collector traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Type {
    Int,
    Real,
    Bool,
    String,
    Object,
}

impl Type {
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::String | Self::Object)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
