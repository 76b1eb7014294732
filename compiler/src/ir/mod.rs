// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod function;
mod function_builder;
mod instruction;
mod program;
mod program_builder;
mod types;
mod value;

pub use self::{
    function::{
        BasicBlock,
        Function,
    },
    function_builder::FunctionBuilder,
    instruction::{
        Comparison,
        Constant,
        Instruction,
        MathOperation,
        PhiEdge,
    },
    program::{
        DEFAULT_ENTRY,
        Global,
        Program,
    },
    program_builder::ProgramBuilder,
    types::Type,
    value::{
        BlockId,
        ValueId,
    },
};
