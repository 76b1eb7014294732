// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The Dis virtual machine module format: instructions, type descriptors, module data
//! initializers, and the binary encoding the Dis loader consumes.

mod constants;
mod data_item;
mod decode;
mod encode;
mod error;
mod handler;
mod instruction;
mod module;
mod opcode;
mod operand;
mod type_descriptor;
mod validate;

pub use self::{
    constants::*,
    data_item::{
        DataItem,
        DataKind,
    },
    decode::decode_operand,
    encode::encode_operand,
    error::{
        DecodeError,
        ValidationError,
    },
    handler::{
        Exception,
        Handler,
    },
    instruction::Instruction,
    module::{
        Import,
        Link,
        Module,
        RuntimeFlags,
    },
    opcode::Opcode,
    operand::Operand,
    type_descriptor::TypeDescriptor,
};
