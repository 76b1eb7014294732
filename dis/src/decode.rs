// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{
    operand::{AFP, AIMM, AIND, AMP, AXIMM, AXINF, AXINM, AXNON, AXXX},
    DataItem,
    DataKind,
    DecodeError,
    Exception,
    Handler,
    Import,
    Instruction,
    Link,
    Module,
    Opcode,
    Operand,
    RuntimeFlags,
    TypeDescriptor,
    SMAGIC,
    XMAGIC,
};

impl Module {
    /// Parses a module from its binary form. Signed modules are accepted and their
    /// signature is skipped.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = ModuleReader { bytes, position: 0 };
        let module = reader.module()?;

        log::debug!("Decoded module `{}` with {} instructions", module.name, module.instructions.len());
        Ok(module)
    }
}

/// Reads one value in the variable-length operand encoding, returning the value and the
/// number of bytes it occupied.
pub fn decode_operand(bytes: &[u8]) -> Option<(i32, usize)> {
    let first = *bytes.first()?;

    match first & 0xC0 {
        0x00 | 0x40 => Some(((first as i32) << 25 >> 25, 1)),

        0x80 => {
            let second = *bytes.get(1)?;
            let value = ((first as i32) << 8 | second as i32) << 18 >> 18;
            Some((value, 2))
        }

        _ => {
            let rest = bytes.get(1..4)?;
            let value = (first as i32) << 24 | (rest[0] as i32) << 16 | (rest[1] as i32) << 8 | rest[2] as i32;
            Some((value << 2 >> 2, 4))
        }
    }
}

struct ModuleReader<'bytes> {
    bytes: &'bytes [u8],
    position: usize,
}

impl<'bytes> ModuleReader<'bytes> {
    fn module(&mut self) -> Result<Module, DecodeError> {
        let magic = self.operand("magic")?;
        match magic {
            XMAGIC => (),
            SMAGIC => {
                let length = self.count("signature")?;
                self.take(length, "signature")?;
            }
            _ => return Err(DecodeError::BadMagic(magic)),
        }

        let mut module = Module::new(String::new());
        module.magic = magic;
        module.runtime_flags = RuntimeFlags::from_bits(self.operand("runtime flags")?);
        module.stack_size = self.operand("stack size")?;

        let instruction_count = self.count("instruction")?;
        module.data_size = self.operand("data size")?;
        let type_count = self.count("type descriptor")?;
        let link_count = self.count("link")?;
        module.entry_pc = self.operand("entry pc")?;
        module.entry_type = self.operand("entry type")?;

        module.instructions = (0..instruction_count)
            .map(|pc| self.instruction(pc))
            .collect::<Result<_, _>>()?;

        module.type_descriptors = (0..type_count)
            .map(|_| self.type_descriptor())
            .collect::<Result<_, _>>()?;

        while let Some(item) = self.data_item()? {
            module.data.push(item);
        }

        module.name = self.string()?;

        module.links = (0..link_count)
            .map(|_| self.link())
            .collect::<Result<_, _>>()?;

        if module.runtime_flags.contains(RuntimeFlags::HAS_LDT) {
            let groups = self.count("import group")?;
            for _ in 0..groups {
                let count = self.count("import")?;
                let group = (0..count)
                    .map(|_| self.import())
                    .collect::<Result<_, _>>()?;
                module.imports.push(group);
            }

            self.operand("import terminator")?;
        }

        if module.runtime_flags.contains(RuntimeFlags::HAS_EXCEPT) {
            let count = self.count("handler")?;
            module.handlers = (0..count)
                .map(|_| self.handler())
                .collect::<Result<_, _>>()?;

            self.operand("handler terminator")?;
        }

        if self.position < self.bytes.len() {
            module.source_path = self.string()?;
        }

        Ok(module)
    }

    fn instruction(&mut self, pc: usize) -> Result<Instruction, DecodeError> {
        let opcode = self.byte("opcode")?;
        let opcode = Opcode::from_byte(opcode)
            .ok_or(DecodeError::UnknownOpcode { opcode, pc })?;

        let address = self.byte("address mode")?;

        let mid = match address & 0xC0 {
            AXNON => Operand::None,
            AXIMM => Operand::Immediate(self.operand("middle operand")?),
            AXINF => Operand::Frame(self.operand("middle operand")?),
            AXINM => Operand::Module(self.operand("middle operand")?),
            _ => unreachable!(),
        };

        let src = self.src_dst_operand((address >> 3) & 0x07, pc)?;
        let dst = self.src_dst_operand(address & 0x07, pc)?;

        Ok(Instruction::new(opcode, src, mid, dst))
    }

    fn src_dst_operand(&mut self, mode: u8, pc: usize) -> Result<Operand, DecodeError> {
        Ok(match mode {
            AMP => Operand::Module(self.operand("operand")?),
            AFP => Operand::Frame(self.operand("operand")?),
            AIMM => Operand::Immediate(self.operand("operand")?),
            AXXX => Operand::None,

            mode if mode == AMP | AIND => {
                let base = self.operand("operand")?;
                let offset = self.operand("operand")?;
                Operand::ModuleIndirect { base, offset }
            }

            mode if mode == AFP | AIND => {
                let base = self.operand("operand")?;
                let offset = self.operand("operand")?;
                Operand::FrameIndirect { base, offset }
            }

            mode => return Err(DecodeError::InvalidAddressMode { mode, pc }),
        })
    }

    fn handler(&mut self) -> Result<Handler, DecodeError> {
        let exception_offset = self.operand("handler exception offset")?;
        let pc1 = self.operand("handler range")?;
        let pc2 = self.operand("handler range")?;
        let type_id = self.operand("handler type")?;
        let labels = self.operand("handler labels")?;

        let exceptions = (0..labels & 0xFFFF)
            .map(|_| -> Result<Exception, DecodeError> {
                let name = self.string()?;
                let pc = self.operand("exception pc")?;
                Ok(Exception { name, pc })
            })
            .collect::<Result<_, _>>()?;

        let wildcard_pc = self.operand("handler wildcard")?;

        Ok(Handler {
            exception_offset,
            pc1,
            pc2,
            type_id,
            scope: labels >> 16,
            exceptions,
            wildcard_pc,
        })
    }

    fn type_descriptor(&mut self) -> Result<TypeDescriptor, DecodeError> {
        let id = self.operand("type descriptor id")?;
        let size = self.operand("type descriptor size")?;
        let map_length = self.count("type descriptor map")?;
        let map = self.take(map_length, "type descriptor map")?;

        Ok(TypeDescriptor::with_map(id, size, map))
    }

    fn data_item(&mut self) -> Result<Option<DataItem>, DecodeError> {
        let header = self.byte("data item")?;
        if header == 0 {
            return Ok(None);
        }

        let kind = DataKind::from_repr(header >> 4)
            .ok_or(DecodeError::UnknownDataKind(header >> 4))?;

        let count = match header & 0x0F {
            0 => self.count("data item")?,
            count => count as usize,
        };

        let offset = self.operand("data offset")?;

        Ok(Some(match kind {
            DataKind::Bytes => DataItem::Bytes {
                offset,
                bytes: self.take(count, "byte data")?.to_vec(),
            },

            DataKind::Words => DataItem::Words {
                offset,
                words: (0..count).map(|_| self.word()).collect::<Result<_, _>>()?,
            },

            DataKind::String => {
                let start = self.position;
                let bytes = self.take(count, "string data")?;
                let value = std::str::from_utf8(bytes)
                    .map_err(|_| DecodeError::InvalidUtf8(start))?
                    .to_owned();
                DataItem::String { offset, value }
            }

            DataKind::Reals => DataItem::Reals {
                offset,
                reals: (0..count).map(|_| self.long().map(|bits| f64::from_bits(bits as u64))).collect::<Result<_, _>>()?,
            },

            DataKind::Longs => DataItem::Longs {
                offset,
                longs: (0..count).map(|_| self.long()).collect::<Result<_, _>>()?,
            },

            DataKind::Array => {
                let type_id = self.word()? as i32;
                let length = self.word()? as i32;
                DataItem::Array { offset, type_id, length }
            }

            DataKind::Index => {
                let offset = self.word()? as i32;
                let index = self.word()? as i32;
                DataItem::Index { offset, index }
            }

            DataKind::Pop => DataItem::Pop,
        }))
    }

    fn link(&mut self) -> Result<Link, DecodeError> {
        let pc = self.operand("link pc")?;
        let type_id = self.operand("link type")?;
        let signature = self.word()?;
        let name = self.string()?;

        Ok(Link { pc, type_id, signature, name })
    }

    fn import(&mut self) -> Result<Import, DecodeError> {
        let signature = self.word()?;
        let name = self.string()?;

        Ok(Import { signature, name })
    }

    fn operand(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        let (value, length) = decode_operand(&self.bytes[self.position..])
            .ok_or(DecodeError::UnexpectedEnd { context, position: self.position })?;

        self.position += length;
        Ok(value)
    }

    fn count(&mut self, context: &'static str) -> Result<usize, DecodeError> {
        let count = self.operand(context)?;
        usize::try_from(count).map_err(|_| DecodeError::NegativeCount { context, count })
    }

    fn byte(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, context)?[0])
    }

    fn word(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4, "word")?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn long(&mut self) -> Result<i64, DecodeError> {
        let high = self.word()? as i64;
        let low = self.word()? as i64;
        Ok(high << 32 | low)
    }

    fn take(&mut self, length: usize, context: &'static str) -> Result<&'bytes [u8], DecodeError> {
        let end = self.position.checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::UnexpectedEnd { context, position: self.position })?;

        let bytes: &'bytes [u8] = self.bytes;
        let bytes = &bytes[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let start = self.position;
        let length = self.bytes[start..].iter()
            .position(|byte| *byte == 0)
            .ok_or(DecodeError::UnterminatedString(start))?;

        let value = std::str::from_utf8(&self.bytes[start..start + length])
            .map_err(|_| DecodeError::InvalidUtf8(start))?
            .to_owned();

        self.position = start + length + 1;
        Ok(value)
    }
}
