// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{BasicBlock, BlockId, Comparison, Constant, Function, Instruction, MathOperation, PhiEdge, Type, ValueId};

/// Appends instructions to the current block of a function under construction. The
/// first block exists from the start and is the one control enters.
#[derive(Debug)]
pub struct FunctionBuilder {
    pub(super) function: Function,
    pub(super) current_block: BlockId,
    pub(super) next_value: usize,
}

impl FunctionBuilder {
    #[must_use]
    pub fn parameter(&self, index: usize) -> ValueId {
        assert!(index < self.function.parameters.len(), "function `{}` has no parameter {index}", self.function.name);
        ValueId::new(index)
    }

    #[must_use]
    pub fn create_block(&mut self) -> BlockId {
        self.function.blocks.push(BasicBlock::default());
        BlockId::new(self.function.blocks.len() - 1)
    }

    pub fn switch_to_block(&mut self, block: BlockId) {
        assert!(block.index() < self.function.blocks.len(), "block {block} does not exist");
        self.current_block = block;
    }

    #[must_use]
    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    #[must_use]
    pub fn const_int(&mut self, value: i64) -> ValueId {
        self.constant(Constant::Int(value))
    }

    #[must_use]
    pub fn const_real(&mut self, value: f64) -> ValueId {
        self.constant(Constant::Real(value))
    }

    #[must_use]
    pub fn const_bool(&mut self, value: bool) -> ValueId {
        self.constant(Constant::Bool(value))
    }

    #[must_use]
    pub fn const_string(&mut self, value: impl Into<String>) -> ValueId {
        self.constant(Constant::String(value.into()))
    }

    #[must_use]
    fn constant(&mut self, value: Constant) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::Const { dst, value });
        dst
    }

    #[must_use]
    pub fn math(&mut self, operation: MathOperation, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::Math { dst, operation, lhs, rhs });
        dst
    }

    #[must_use]
    pub fn compare(&mut self, comparison: Comparison, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::Compare { dst, comparison, lhs, rhs });
        dst
    }

    /// Creates a phi without incoming values; add them with
    /// [`FunctionBuilder::add_phi_incoming`] once the predecessor values exist.
    #[must_use]
    pub fn phi(&mut self, ty: Type) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::Phi { dst, ty, incoming: Vec::new() });
        dst
    }

    pub fn add_phi_incoming(&mut self, phi: ValueId, block: BlockId, value: ValueId) {
        let incoming = self.function.blocks.iter_mut()
            .flat_map(|block| block.instructions.iter_mut())
            .find_map(|instruction| match instruction {
                Instruction::Phi { dst, incoming, .. } if *dst == phi => Some(incoming),
                _ => None,
            });

        match incoming {
            Some(incoming) => incoming.push(PhiEdge { block, value }),
            None => panic!("value {phi} is not a phi"),
        }
    }

    #[must_use]
    pub fn load_global(&mut self, global: impl Into<String>) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::LoadGlobal { dst, global: global.into() });
        dst
    }

    pub fn store_global(&mut self, global: impl Into<String>, value: ValueId) {
        self.push(Instruction::StoreGlobal { global: global.into(), value });
    }

    #[must_use]
    pub fn new_object(&mut self, fields: impl Into<Vec<Type>>) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::New { dst, fields: fields.into() });
        dst
    }

    #[must_use]
    pub fn load_field(&mut self, object: ValueId, field: usize, ty: Type) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::LoadField { dst, ty, object, field });
        dst
    }

    pub fn store_field(&mut self, object: ValueId, field: usize, value: ValueId) {
        self.push(Instruction::StoreField { object, field, value });
    }

    #[must_use]
    pub fn call(&mut self, callee: impl Into<String>, arguments: impl Into<Vec<ValueId>>) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::Call { dst: Some(dst), callee: callee.into(), arguments: arguments.into() });
        dst
    }

    pub fn call_void(&mut self, callee: impl Into<String>, arguments: impl Into<Vec<ValueId>>) {
        self.push(Instruction::Call { dst: None, callee: callee.into(), arguments: arguments.into() });
    }

    #[must_use]
    pub fn call_native(&mut self, function: impl Into<String>, arguments: impl Into<Vec<ValueId>>) -> ValueId {
        let dst = self.next_value();
        self.push(Instruction::CallNative { dst: Some(dst), function: function.into(), arguments: arguments.into() });
        dst
    }

    pub fn call_native_void(&mut self, function: impl Into<String>, arguments: impl Into<Vec<ValueId>>) {
        self.push(Instruction::CallNative { dst: None, function: function.into(), arguments: arguments.into() });
    }

    pub fn jump(&mut self, target: BlockId) {
        self.push(Instruction::Jump { target });
    }

    pub fn branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) {
        self.push(Instruction::Branch { condition, then_block, else_block });
    }

    pub fn ret(&mut self) {
        self.push(Instruction::Return { value: None });
    }

    pub fn ret_with(&mut self, value: ValueId) {
        self.push(Instruction::Return { value: Some(value) });
    }

    #[must_use]
    pub fn build(self) -> Function {
        self.function
    }

    fn push(&mut self, instruction: Instruction) {
        self.function.blocks[self.current_block.index()].instructions.push(instruction);
    }

    #[must_use]
    fn next_value(&mut self) -> ValueId {
        let value = ValueId::new(self.next_value);
        self.next_value += 1;
        value
    }
}
