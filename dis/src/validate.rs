// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{DataItem, Handler, Instruction, Module, RuntimeFlags, ValidationError, OPERAND_MAX, OPERAND_MIN};

impl Module {
    /// Checks that the parts of the module agree with each other: descriptor numbering,
    /// the module data size, the entry point, links, exception handlers, and every code
    /// address and descriptor id referenced from the instruction stream.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.instructions.is_empty() {
            return Err(ValidationError::NoInstructions);
        }

        for (index, descriptor) in self.type_descriptors.iter().enumerate() {
            if usize::try_from(descriptor.id()) != Ok(index) {
                return Err(ValidationError::TypeDescriptorOutOfPlace { index, id: descriptor.id() });
            }
        }

        let descriptor_size = self.type_descriptors.first().map_or(0, |descriptor| descriptor.size());
        if descriptor_size != self.data_size {
            return Err(ValidationError::DataSizeMismatch { data_size: self.data_size, descriptor_size });
        }

        if !self.is_code_address(self.entry_pc) {
            return Err(ValidationError::EntryOutOfRange(self.entry_pc));
        }

        if !self.is_type_id(self.entry_type) {
            return Err(ValidationError::EntryTypeOutOfRange(self.entry_type));
        }

        for link in &self.links {
            if !self.is_code_address(link.pc) || !self.is_type_id(link.type_id) {
                return Err(ValidationError::LinkOutOfRange {
                    name: link.name.clone(),
                    pc: link.pc,
                    type_id: link.type_id,
                });
            }
        }

        for (pc, instruction) in self.instructions.iter().enumerate() {
            self.validate_instruction(pc, instruction)?;
        }

        if !self.handlers.is_empty() && !self.runtime_flags.contains(RuntimeFlags::HAS_EXCEPT) {
            return Err(ValidationError::HandlersWithoutFlag);
        }

        for (index, handler) in self.handlers.iter().enumerate() {
            if !self.is_valid_handler(handler) {
                return Err(ValidationError::HandlerOutOfRange { index, handler: handler.to_string() });
            }
        }

        for item in &self.data {
            if matches!(item, DataItem::Pop) {
                continue;
            }

            if item.offset() < 0 || item.offset() >= self.data_size {
                return Err(ValidationError::DataOutOfRange { item: item.to_string() });
            }
        }

        Ok(())
    }

    fn validate_instruction(&self, pc: usize, instruction: &Instruction) -> Result<(), ValidationError> {
        if instruction.mid.is_indirect() {
            return Err(ValidationError::IndirectMiddleOperand { pc, instruction: instruction.to_string() });
        }

        let encodable = [instruction.src, instruction.mid, instruction.dst]
            .iter()
            .flat_map(|operand| operand.encoded_values())
            .all(|value| (OPERAND_MIN..=OPERAND_MAX).contains(&value));
        if !encodable {
            return Err(ValidationError::OperandOutOfRange { pc, instruction: instruction.to_string() });
        }

        if let Some(target) = instruction.branch_target() {
            if !self.is_code_address(target) {
                return Err(ValidationError::BranchOutOfRange { pc, instruction: instruction.to_string(), target });
            }
        }

        let type_id = if instruction.opcode.has_type_descriptor_source() {
            instruction.src.immediate()
        } else if instruction.opcode.has_type_descriptor_middle() {
            instruction.mid.immediate()
        } else {
            None
        };

        if let Some(type_id) = type_id {
            if !self.is_type_id(type_id) {
                return Err(ValidationError::TypeDescriptorReference { pc, instruction: instruction.to_string(), type_id });
            }
        }

        Ok(())
    }

    /// The covered range may end right after the last instruction.
    #[must_use]
    fn is_valid_handler(&self, handler: &Handler) -> bool {
        let end = self.instructions.len() as i32;

        (0..=handler.pc2).contains(&handler.pc1)
            && handler.pc2 <= end
            && (handler.type_id == -1 || self.is_type_id(handler.type_id))
            && (handler.wildcard_pc == -1 || self.is_code_address(handler.wildcard_pc))
            && handler.exceptions.iter().all(|exception| self.is_code_address(exception.pc))
    }

    #[must_use]
    fn is_code_address(&self, pc: i32) -> bool {
        pc >= 0 && (pc as usize) < self.instructions.len()
    }

    #[must_use]
    fn is_type_id(&self, id: i32) -> bool {
        id >= 0 && (id as usize) < self.type_descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Link, Opcode, Operand, TypeDescriptor};
    use pretty_assertions::assert_eq;

    fn valid_module() -> Module {
        let mut module = Module::new("Valid");
        module.instructions = vec![
            Instruction::with_src_dst(Opcode::Frame, Operand::Immediate(2), Operand::Frame(64)),
            Instruction::with_src_dst(Opcode::Call, Operand::Frame(64), Operand::Immediate(3)),
            Instruction::with_dst(Opcode::Jmp, Operand::Immediate(0)),
            Instruction::without_operands(Opcode::Ret),
        ];
        module.type_descriptors = vec![
            TypeDescriptor::new(0, 16),
            TypeDescriptor::new(1, 72),
            TypeDescriptor::new(2, 64),
        ];
        module.data_size = 16;
        module.data.push(DataItem::string(8, "x"));
        module.entry_type = 1;
        module.links.push(Link { pc: 0, type_id: 1, signature: 0x4244b354, name: "init".into() });
        module
    }

    #[test]
    fn valid_module_passes() {
        assert_eq!(valid_module().validate(), Ok(()));
    }

    #[test]
    fn empty_module_is_rejected() {
        assert_eq!(Module::new("Empty").validate(), Err(ValidationError::NoInstructions));
    }

    #[test]
    fn descriptor_ids_must_match_position() {
        let mut module = valid_module();
        module.type_descriptors[2].set_id(5);

        assert_eq!(module.validate(), Err(ValidationError::TypeDescriptorOutOfPlace { index: 2, id: 5 }));
    }

    #[test]
    fn data_size_must_match_descriptor_zero() {
        let mut module = valid_module();
        module.data_size = 24;

        assert_eq!(module.validate(), Err(ValidationError::DataSizeMismatch { data_size: 24, descriptor_size: 16 }));
    }

    #[test]
    fn branch_outside_code() {
        let mut module = valid_module();
        module.instructions[2].dst = Operand::Immediate(4);

        assert_eq!(module.validate(), Err(ValidationError::BranchOutOfRange {
            pc: 2,
            instruction: "jmp $4".into(),
            target: 4,
        }));
    }

    #[test]
    fn frame_refers_to_missing_descriptor() {
        let mut module = valid_module();
        module.instructions[0].src = Operand::Immediate(3);

        assert_eq!(module.validate(), Err(ValidationError::TypeDescriptorReference {
            pc: 0,
            instruction: "frame $3, 64(fp)".into(),
            type_id: 3,
        }));
    }

    #[test]
    fn indirect_middle_operand() {
        let mut module = valid_module();
        module.instructions[1].mid = Operand::FrameIndirect { base: 64, offset: 0 };

        assert!(matches!(module.validate(), Err(ValidationError::IndirectMiddleOperand { pc: 1, .. })));
    }

    #[test]
    fn entry_outside_code() {
        let mut module = valid_module();
        module.entry_pc = 4;

        assert_eq!(module.validate(), Err(ValidationError::EntryOutOfRange(4)));
    }

    #[test]
    fn handler_range_may_end_at_the_code_end() {
        let mut module = valid_module();
        module.runtime_flags = RuntimeFlags::HAS_EXCEPT;
        module.handlers.push(Handler::new(64, 0, 4, 3));

        assert_eq!(module.validate(), Ok(()));
    }

    #[test]
    fn handler_outside_code() {
        let mut module = valid_module();
        module.runtime_flags = RuntimeFlags::HAS_EXCEPT;
        module.handlers.push(Handler::new(64, 1, 2, 4));

        assert!(matches!(module.validate(), Err(ValidationError::HandlerOutOfRange { index: 0, .. })));
    }

    #[test]
    fn handlers_without_flag() {
        let mut module = valid_module();
        module.handlers.push(Handler::new(64, 0, 1, -1));

        assert_eq!(module.validate(), Err(ValidationError::HandlersWithoutFlag));
    }

    #[test]
    fn data_outside_segment() {
        let mut module = valid_module();
        module.data.push(DataItem::long(16, 1));

        assert!(matches!(module.validate(), Err(ValidationError::DataOutOfRange { .. })));
    }
}
