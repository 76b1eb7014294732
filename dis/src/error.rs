// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context} at byte {position}")]
    UnexpectedEnd {
        context: &'static str,
        position: usize,
    },

    #[error("bad magic number {0}")]
    BadMagic(i32),

    #[error("unknown opcode {opcode} at instruction {pc}")]
    UnknownOpcode {
        opcode: u8,
        pc: usize,
    },

    #[error("invalid addressing mode {mode:#04x} at instruction {pc}")]
    InvalidAddressMode {
        mode: u8,
        pc: usize,
    },

    #[error("unknown data item kind {0}")]
    UnknownDataKind(u8),

    #[error("negative {context} count {count}")]
    NegativeCount {
        context: &'static str,
        count: i32,
    },

    #[error("string at byte {0} is not terminated")]
    UnterminatedString(usize),

    #[error("string at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

/// An inconsistency between the parts of a module that would make the loader reject it
/// or make it misbehave at run time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("module has no instructions")]
    NoInstructions,

    #[error("type descriptor at index {index} has id {id}")]
    TypeDescriptorOutOfPlace {
        index: usize,
        id: i32,
    },

    #[error("data size {data_size} does not match module data descriptor size {descriptor_size}")]
    DataSizeMismatch {
        data_size: i32,
        descriptor_size: i32,
    },

    #[error("entry pc {0} is outside the code")]
    EntryOutOfRange(i32),

    #[error("entry type {0} does not name a type descriptor")]
    EntryTypeOutOfRange(i32),

    #[error("link `{name}` refers to pc {pc} or type {type_id} outside the module")]
    LinkOutOfRange {
        name: String,
        pc: i32,
        type_id: i32,
    },

    #[error("instruction {pc} (`{instruction}`) branches to {target}, outside the code")]
    BranchOutOfRange {
        pc: usize,
        instruction: String,
        target: i32,
    },

    #[error("instruction {pc} (`{instruction}`) refers to type descriptor {type_id}, which does not exist")]
    TypeDescriptorReference {
        pc: usize,
        instruction: String,
        type_id: i32,
    },

    #[error("instruction {pc} (`{instruction}`) has an indirect middle operand")]
    IndirectMiddleOperand {
        pc: usize,
        instruction: String,
    },

    #[error("instruction {pc} (`{instruction}`) has an operand that cannot be encoded")]
    OperandOutOfRange {
        pc: usize,
        instruction: String,
    },

    #[error("module has exception handlers but not the HASEXCEPT flag")]
    HandlersWithoutFlag,

    #[error("exception handler {index} (`{handler}`) refers to code or a type descriptor outside the module")]
    HandlerOutOfRange {
        index: usize,
        handler: String,
    },

    #[error("data item `{item}` lies outside the module data")]
    DataOutOfRange {
        item: String,
    },
}
