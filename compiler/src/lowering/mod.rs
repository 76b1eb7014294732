// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod lowerer;

use std::fmt::Display;

use dis::{Handler, Instruction, Operand, TypeDescriptor};
use strum::AsRefStr;

use crate::{ir::Function, Frame, LowerError, LoweringContext};

pub use self::lowerer::DisLowerer;

/// Turns one IR function into a fragment of Dis code. Code addresses in the fragment
/// and its exception handlers are local to it, and call-site descriptors are referenced
/// by their position in [`LoweredFunction::call_sites`]; the assembler relocates them.
pub trait FunctionLowerer {
    fn lower(&mut self, function: &Function, context: &mut LoweringContext<'_>) -> Result<LoweredFunction, LowerError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunction {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub frame: Frame,
    pub call_sites: Vec<TypeDescriptor>,
    pub patches: Vec<Patch>,

    /// Exception handlers with fragment-local code addresses.
    pub handlers: Vec<Handler>,
}

impl LoweredFunction {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
            frame: Frame::new(),
            call_sites: Vec::new(),
            patches: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

/// An edit of one instruction that has to wait until every function has a frame id and
/// an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Position of the instruction in its own fragment.
    pub instruction: usize,
    pub kind: PatchKind,
    pub callee: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum PatchKind {
    /// Writes the callee frame descriptor id into the immediate `src` of `frame`.
    FrameId,

    /// Writes the callee start address into the immediate `dst` of `call`.
    CallAddress,
}

impl PatchKind {
    pub fn apply(&self, instruction: &mut Instruction, resolution: &Resolution) {
        match self {
            Self::FrameId => {
                debug_assert!(instruction.src.immediate().is_some(), "frame id patch on `{instruction}`");
                instruction.src = Operand::Immediate(resolution.frame_id);
            }

            Self::CallAddress => {
                debug_assert!(instruction.dst.immediate().is_some(), "call address patch on `{instruction}`");
                instruction.dst = Operand::Immediate(resolution.address);
            }
        }
    }
}

impl Display for PatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Where a function ended up in the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub frame_id: i32,
    pub address: i32,
}
