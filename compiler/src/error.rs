// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

use crate::ir::{BlockId, Type, ValueId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("entry function `{name}` is not defined")]
    MissingEntry {
        name: String,
    },

    #[error("cannot lower function `{function}`: {source}")]
    Lowering {
        function: String,

        #[source]
        source: LowerError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    #[error("function has no body")]
    EmptyBody,

    #[error("block {0} does not end in a terminator")]
    UnterminatedBlock(BlockId),

    #[error("block {0} continues after its terminator")]
    TerminatorNotLast(BlockId),

    #[error("block {0} does not exist")]
    UnknownBlock(BlockId),

    #[error("value {0} is used but never defined")]
    UndefinedValue(ValueId),

    #[error("value {0} is defined more than once")]
    Redefinition(ValueId),

    #[error("call to unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{0}` is only declared and cannot be called")]
    FunctionWithoutBody(String),

    #[error("`{0}` is not a function of the Sys module")]
    UnknownNative(String),

    #[error("unknown global `{0}`")]
    UnknownGlobal(String),

    #[error("`{0}` does not return a value")]
    NoResult(String),

    #[error("`{callee}` expects {expected} arguments, but {found} were given")]
    ArgumentCount {
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("{context} expects a value of type {expected}, but {found} was given")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("argument {index} of `{function}` must be {expected}")]
    NativeArgument {
        function: String,
        index: usize,
        expected: &'static str,
    },

    #[error("{operation} is not supported on values of type {ty}")]
    UnsupportedOperation {
        operation: String,
        ty: Type,
    },

    #[error("object {object} has no field {field}")]
    FieldOutOfRange {
        object: ValueId,
        field: usize,
    },

    #[error("phi {0} is not at the start of its block")]
    PhiNotAtBlockStart(ValueId),

    #[error("phi {phi} has no incoming value for {block}")]
    MissingPhiEdge {
        phi: ValueId,
        block: BlockId,
    },

    #[error("function must return a value of type {0}")]
    MissingReturnValue(Type),

    #[error("function does not return a value")]
    UnexpectedReturnValue,
}
