// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::io::Write;

use super::{DataItem, Handler, Instruction, Module, RuntimeFlags, TypeDescriptor, DMAX, OPERAND_MAX, OPERAND_MIN};

impl Module {
    /// Encodes the module in the format the Dis loader reads.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = ModuleWriter::default();
        writer.module(self);

        log::debug!("Encoded module `{}` into {} bytes", self.name, writer.buffer.len());
        writer.buffer
    }

    pub fn write_to(&self, mut output: impl Write) -> std::io::Result<()> {
        output.write_all(&self.encode())
    }
}

/// Writes a signed value in the variable-length operand encoding: one byte for
/// `[-64, 63]`, two bytes for `[-8192, 8191]`, four bytes otherwise. The top two bits of
/// the first byte select the length.
pub fn encode_operand(buffer: &mut Vec<u8>, value: i32) {
    debug_assert!((OPERAND_MIN..=OPERAND_MAX).contains(&value), "operand {value} cannot be encoded");

    if (-64..=63).contains(&value) {
        buffer.push(value as u8 & !0x80);
        return;
    }

    if (-8192..=8191).contains(&value) {
        buffer.push((value >> 8) as u8 & !0xC0 | 0x80);
        buffer.push(value as u8);
        return;
    }

    buffer.push((value >> 24) as u8 | 0xC0);
    buffer.push((value >> 16) as u8);
    buffer.push((value >> 8) as u8);
    buffer.push(value as u8);
}

#[derive(Debug, Default)]
struct ModuleWriter {
    buffer: Vec<u8>,
}

impl ModuleWriter {
    fn module(&mut self, module: &Module) {
        self.operand(module.magic);
        self.operand(module.runtime_flags.bits());
        self.operand(module.stack_size);
        self.operand(module.instructions.len() as i32);
        self.operand(module.data_size);
        self.operand(module.type_descriptors.len() as i32);
        self.operand(module.links.len() as i32);
        self.operand(module.entry_pc);
        self.operand(module.entry_type);

        for instruction in &module.instructions {
            self.instruction(instruction);
        }

        for descriptor in &module.type_descriptors {
            self.type_descriptor(descriptor);
        }

        for item in &module.data {
            self.data_item(item);
        }
        self.buffer.push(0);

        self.string(&module.name);

        for link in &module.links {
            self.operand(link.pc);
            self.operand(link.type_id);
            self.word(link.signature);
            self.string(&link.name);
        }

        if module.runtime_flags.contains(RuntimeFlags::HAS_LDT) {
            self.operand(module.imports.len() as i32);

            for group in &module.imports {
                self.operand(group.len() as i32);

                for import in group {
                    self.word(import.signature);
                    self.string(&import.name);
                }
            }

            self.operand(0);
        }

        if module.runtime_flags.contains(RuntimeFlags::HAS_EXCEPT) {
            self.operand(module.handlers.len() as i32);

            for handler in &module.handlers {
                self.handler(handler);
            }

            self.operand(0);
        }

        if !module.source_path.is_empty() {
            self.string(&module.source_path);
        }
    }

    fn instruction(&mut self, instruction: &Instruction) {
        self.buffer.push(instruction.opcode.as_byte());
        self.buffer.push(instruction.address_byte());

        // The middle operand is never indirect, so it carries at most one value.
        if instruction.mid.mid_mode() != 0 {
            for value in instruction.mid.encoded_values() {
                self.operand(value);
            }
        }

        for value in instruction.src.encoded_values().chain(instruction.dst.encoded_values()) {
            self.operand(value);
        }
    }

    fn handler(&mut self, handler: &Handler) {
        self.operand(handler.exception_offset);
        self.operand(handler.pc1);
        self.operand(handler.pc2);
        self.operand(handler.type_id);
        self.operand(handler.packed_labels());

        for exception in &handler.exceptions {
            self.string(&exception.name);
            self.operand(exception.pc);
        }

        self.operand(handler.wildcard_pc);
    }

    fn type_descriptor(&mut self, descriptor: &TypeDescriptor) {
        self.operand(descriptor.id());
        self.operand(descriptor.size());
        self.operand(descriptor.map().len() as i32);
        self.buffer.extend_from_slice(descriptor.map());
    }

    fn data_item(&mut self, item: &DataItem) {
        let kind = item.kind() as u8;
        let count = item.count();

        if count > 0 && count < DMAX {
            self.buffer.push(kind << 4 | count as u8);
        } else {
            self.buffer.push(kind << 4);
            self.operand(count);
        }

        self.operand(item.offset());

        match item {
            DataItem::Bytes { bytes, .. } => self.buffer.extend_from_slice(bytes),

            DataItem::Words { words, .. } => {
                for word in words {
                    self.word(*word);
                }
            }

            DataItem::String { value, .. } => self.buffer.extend_from_slice(value.as_bytes()),

            DataItem::Reals { reals, .. } => {
                for real in reals {
                    self.buffer.extend_from_slice(&real.to_bits().to_be_bytes());
                }
            }

            DataItem::Longs { longs, .. } => {
                for long in longs {
                    self.buffer.extend_from_slice(&long.to_be_bytes());
                }
            }

            DataItem::Array { type_id, length, .. } => {
                self.word(*type_id as u32);
                self.word(*length as u32);
            }

            DataItem::Index { offset, index } => {
                self.word(*offset as u32);
                self.word(*index as u32);
            }

            DataItem::Pop => (),
        }
    }

    fn operand(&mut self, value: i32) {
        encode_operand(&mut self.buffer, value);
    }

    fn word(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn string(&mut self, value: &str) {
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(0);
    }
}
