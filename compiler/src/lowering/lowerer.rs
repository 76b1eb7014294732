// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use dis::{
    Instruction as DisInstruction,
    Opcode,
    Operand,
    TypeDescriptor,
    IBY2WD,
    MAX_TEMP,
    OPERAND_MAX,
    OPERAND_MIN,
    REGRET_OFFSET,
};
use log::trace;

use crate::{
    ir::{BlockId, Comparison, Constant, Function, Instruction, MathOperation, Type, ValueId},
    LowerError,
    LoweringContext,
    SysFunction,
};

use super::{FunctionLowerer, LoweredFunction, Patch, PatchKind};

/// Lowers functions without any optimization: every value gets a frame slot of its own
/// and every IR instruction becomes a short fixed sequence of Dis instructions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisLowerer;

impl DisLowerer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FunctionLowerer for DisLowerer {
    fn lower(&mut self, function: &Function, context: &mut LoweringContext<'_>) -> Result<LoweredFunction, LowerError> {
        let mut lowering = FunctionLowering::new(function, context)?;

        for index in 0..function.blocks.len() {
            lowering.lower_block(BlockId::new(index))?;
        }

        lowering.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    offset: i32,
    ty: Type,
}

impl Slot {
    #[must_use]
    const fn operand(&self) -> Operand {
        Operand::Frame(self.offset)
    }
}

#[derive(Debug, Clone, Copy)]
struct Move {
    ty: Type,
    src: i32,
    dst: i32,
}

struct FunctionLowering<'a, 'program> {
    function: &'a Function,
    context: &'a mut LoweringContext<'program>,
    output: LoweredFunction,
    slots: HashMap<ValueId, Slot>,

    /// Field layouts of the objects allocated by this function.
    objects: HashMap<ValueId, &'a [Type]>,

    block_addresses: Vec<Option<i32>>,
    block_jumps: Vec<(usize, BlockId)>,
    current_block: BlockId,
}

impl<'a, 'program> FunctionLowering<'a, 'program> {
    fn new(function: &'a Function, context: &'a mut LoweringContext<'program>) -> Result<Self, LowerError> {
        check_blocks(function)?;

        let mut output = LoweredFunction::new(function.name.clone());
        let slots = value_types(function, context)?
            .into_iter()
            .map(|(value, ty)| {
                let offset = output.frame.allocate(ty.is_pointer());
                (value, Slot { offset, ty })
            })
            .collect();

        Ok(Self {
            function,
            context,
            output,
            slots,
            objects: HashMap::new(),
            block_addresses: vec![None; function.blocks.len()],
            block_jumps: Vec::new(),
            current_block: BlockId::new(0),
        })
    }

    fn lower_block(&mut self, block: BlockId) -> Result<(), LowerError> {
        self.block_addresses[block.index()] = Some(self.position());
        self.current_block = block;

        let function = self.function;
        for instruction in &function.blocks[block.index()].instructions {
            self.lower_instruction(instruction)?;
        }

        Ok(())
    }

    fn finish(mut self) -> Result<LoweredFunction, LowerError> {
        for (index, block) in std::mem::take(&mut self.block_jumps) {
            let address = self.block_addresses
                .get(block.index())
                .copied()
                .flatten()
                .ok_or(LowerError::UnknownBlock(block))?;

            self.output.instructions[index].dst = Operand::Immediate(address);
        }

        trace!(
            "Lowered `{}` into {} instructions with a frame of {} bytes and {} call sites",
            self.output.name,
            self.output.instructions.len(),
            self.output.frame.size(),
            self.output.call_sites.len(),
        );

        Ok(self.output)
    }

    fn lower_instruction(&mut self, instruction: &'a Instruction) -> Result<(), LowerError> {
        match instruction {
            Instruction::Const { dst, value } => {
                let dst = self.slot(*dst)?;
                match value {
                    Constant::Int(value) => {
                        let src = self.int_operand(*value);
                        self.emit(DisInstruction::with_src_dst(Opcode::Movw, src, dst.operand()));
                    }

                    Constant::Real(value) => {
                        let offset = self.context.real_constant(*value);
                        self.move_value(Type::Real, Operand::Module(offset), dst.operand());
                    }

                    Constant::Bool(value) => {
                        self.emit(DisInstruction::with_src_dst(Opcode::Movw, Operand::Immediate(*value as i32), dst.operand()));
                    }

                    Constant::String(value) => {
                        let offset = self.context.string_literal(value);
                        self.move_value(Type::String, Operand::Module(offset), dst.operand());
                    }
                }
            }

            Instruction::Math { dst, operation, lhs, rhs } => {
                self.lower_math(*dst, *operation, *lhs, *rhs)?;
            }

            Instruction::Compare { dst, comparison, lhs, rhs } => {
                self.lower_compare(*dst, *comparison, *lhs, *rhs)?;
            }

            // Phis are materialized as moves on the incoming edges.
            Instruction::Phi { .. } => (),

            Instruction::LoadGlobal { dst, global } => {
                let global = self.context.global(global).ok_or_else(|| LowerError::UnknownGlobal(global.clone()))?;
                let dst = self.slot(*dst)?;
                self.move_value(global.ty, Operand::Module(global.offset), dst.operand());
            }

            Instruction::StoreGlobal { global: name, value } => {
                let global = self.context.global(name).ok_or_else(|| LowerError::UnknownGlobal(name.clone()))?;
                let value = self.slot(*value)?;
                expect_type(|| format!("global `{name}`"), global.ty, value.ty)?;
                self.move_value(global.ty, value.operand(), Operand::Module(global.offset));
            }

            Instruction::New { dst, fields } => {
                let size = (fields.len() as i32 * IBY2WD).max(IBY2WD);
                let mut descriptor = TypeDescriptor::new(self.output.call_sites.len() as i32, size);
                for (index, field) in fields.iter().enumerate() {
                    if field.is_pointer() {
                        descriptor.set_pointer(index as i32 * IBY2WD);
                    }
                }

                let id = self.add_call_site(descriptor);
                let slot = self.slot(*dst)?;
                self.emit(DisInstruction::with_src_dst(Opcode::New, Operand::Immediate(id), slot.operand()));
                self.objects.insert(*dst, fields.as_slice());
            }

            Instruction::LoadField { dst, ty, object, field } => {
                let field_operand = self.field(*object, *field, *ty)?;
                let dst = self.slot(*dst)?;
                self.move_value(*ty, field_operand, dst.operand());
            }

            Instruction::StoreField { object, field, value } => {
                let value = self.slot(*value)?;
                let field_operand = self.field(*object, *field, value.ty)?;
                self.move_value(value.ty, value.operand(), field_operand);
            }

            Instruction::Call { dst, callee, arguments } => {
                self.lower_call(*dst, callee, arguments)?;
            }

            Instruction::CallNative { dst, function, arguments } => {
                self.lower_native_call(*dst, function, arguments)?;
            }

            Instruction::Jump { target } => {
                let moves = self.phi_moves(*target)?;
                self.emit_moves(&moves);
                self.jump(*target);
            }

            Instruction::Branch { condition, then_block, else_block } => {
                self.lower_branch(*condition, *then_block, *else_block)?;
            }

            Instruction::Return { value } => {
                match (value, self.function.result) {
                    (Some(value), Some(ty)) => {
                        let value = self.slot(*value)?;
                        expect_type(|| "return value".to_string(), ty, value.ty)?;
                        self.move_value(ty, value.operand(), Operand::FrameIndirect { base: REGRET_OFFSET, offset: 0 });
                    }

                    (None, None) => (),

                    (None, Some(ty)) => return Err(LowerError::MissingReturnValue(ty)),

                    (Some(..), None) => return Err(LowerError::UnexpectedReturnValue),
                }

                self.emit(DisInstruction::without_operands(Opcode::Ret));
            }
        }

        Ok(())
    }

    fn lower_math(&mut self, dst: ValueId, operation: MathOperation, lhs: ValueId, rhs: ValueId) -> Result<(), LowerError> {
        let lhs = self.slot(lhs)?;
        let rhs = self.slot(rhs)?;
        let dst = self.slot(dst)?;
        expect_type(|| operation.as_ref().to_string(), lhs.ty, rhs.ty)?;

        let opcode = math_opcode(operation, lhs.ty).ok_or_else(|| LowerError::UnsupportedOperation {
            operation: operation.as_ref().to_string(),
            ty: lhs.ty,
        })?;

        // dst = mid op src
        let instruction = if operation.is_commutative() && opcode != Opcode::Addc {
            DisInstruction::new(opcode, lhs.operand(), rhs.operand(), dst.operand())
        } else {
            DisInstruction::new(opcode, rhs.operand(), lhs.operand(), dst.operand())
        };

        self.emit(instruction);
        Ok(())
    }

    fn lower_compare(&mut self, dst: ValueId, comparison: Comparison, lhs: ValueId, rhs: ValueId) -> Result<(), LowerError> {
        let lhs = self.slot(lhs)?;
        let rhs = self.slot(rhs)?;
        let dst = self.slot(dst)?;
        expect_type(|| format!("compare {}", comparison.as_ref()), lhs.ty, rhs.ty)?;

        let opcode = compare_opcode(comparison, lhs.ty).ok_or_else(|| LowerError::UnsupportedOperation {
            operation: format!("compare {}", comparison.as_ref()),
            ty: lhs.ty,
        })?;

        let skip = self.position() + 3;
        self.emit(DisInstruction::with_src_dst(Opcode::Movw, Operand::Immediate(1), dst.operand()));
        self.emit(DisInstruction::new(opcode, lhs.operand(), rhs.operand(), Operand::Immediate(skip)));
        self.emit(DisInstruction::with_src_dst(Opcode::Movw, Operand::Immediate(0), dst.operand()));
        Ok(())
    }

    fn lower_branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) -> Result<(), LowerError> {
        let condition = self.slot(condition)?;
        expect_type(|| "branch condition".to_string(), Type::Bool, condition.ty)?;

        let then_moves = self.phi_moves(then_block)?;
        let else_moves = self.phi_moves(else_block)?;

        let branch = self.emit(DisInstruction::new(Opcode::Bnew, condition.operand(), Operand::Immediate(0), Operand::Immediate(0)));

        if then_moves.is_empty() && else_moves.is_empty() {
            self.block_jumps.push((branch, then_block));
            self.jump(else_block);
            return Ok(());
        }

        self.emit_moves(&else_moves);
        self.jump(else_block);

        self.output.instructions[branch].dst = Operand::Immediate(self.position());
        self.emit_moves(&then_moves);
        self.jump(then_block);
        Ok(())
    }

    fn lower_call(&mut self, dst: Option<ValueId>, callee: &str, arguments: &[ValueId]) -> Result<(), LowerError> {
        let target = self.context.function(callee).ok_or_else(|| LowerError::UnknownFunction(callee.to_string()))?;
        if target.is_declaration() {
            return Err(LowerError::FunctionWithoutBody(callee.to_string()));
        }

        if target.parameters.len() != arguments.len() {
            return Err(LowerError::ArgumentCount {
                callee: callee.to_string(),
                expected: target.parameters.len(),
                found: arguments.len(),
            });
        }

        let arguments = self.slots(arguments)?;
        for (index, (argument, parameter)) in arguments.iter().zip(&target.parameters).enumerate() {
            expect_type(|| format!("argument {index} of `{callee}`"), *parameter, argument.ty)?;
        }

        let call_frame = self.output.frame.allocate_word();

        let frame = self.emit(DisInstruction::with_src_dst(Opcode::Frame, Operand::Immediate(0), Operand::Frame(call_frame)));
        self.patch(frame, PatchKind::FrameId, callee);

        self.move_arguments(call_frame, &arguments);

        match (target.result, dst) {
            (Some(result), dst) => {
                let ret = match dst {
                    Some(dst) => self.slot(dst)?.offset,
                    None => self.output.frame.allocate(result.is_pointer()),
                };
                self.emit(DisInstruction::with_src_dst(
                    Opcode::Lea,
                    Operand::Frame(ret),
                    Operand::FrameIndirect { base: call_frame, offset: REGRET_OFFSET },
                ));
            }

            (None, Some(..)) => return Err(LowerError::NoResult(callee.to_string())),

            (None, None) => (),
        }

        let call = self.emit(DisInstruction::with_src_dst(Opcode::Call, Operand::Frame(call_frame), Operand::Immediate(0)));
        self.patch(call, PatchKind::CallAddress, callee);
        Ok(())
    }

    fn lower_native_call(&mut self, dst: Option<ValueId>, name: &str, arguments: &[ValueId]) -> Result<(), LowerError> {
        let native = SysFunction::lookup(name).ok_or_else(|| LowerError::UnknownNative(name.to_string()))?;
        let arguments = self.slots(arguments)?;

        let import = self.context.native_import(native) as i32;
        let sys = Operand::Module(self.context.sys_offset());
        let call_frame = self.output.frame.allocate_word();

        match native.parameter_count() {
            None => {
                let size = MAX_TEMP + arguments.len() as i32 * IBY2WD;
                let mut descriptor = TypeDescriptor::new(self.output.call_sites.len() as i32, size);
                for (index, argument) in arguments.iter().enumerate() {
                    if argument.ty.is_pointer() {
                        descriptor.set_pointer(MAX_TEMP + index as i32 * IBY2WD);
                    }
                }

                let id = self.add_call_site(descriptor);
                self.emit(DisInstruction::with_src_dst(Opcode::Frame, Operand::Immediate(id), Operand::Frame(call_frame)));
            }

            Some(expected) => {
                if expected != arguments.len() {
                    return Err(LowerError::ArgumentCount {
                        callee: name.to_string(),
                        expected,
                        found: arguments.len(),
                    });
                }

                for (index, argument) in arguments.iter().enumerate() {
                    let pointer = native.parameter_is_pointer(index);
                    if pointer != argument.ty.is_pointer() {
                        return Err(LowerError::NativeArgument {
                            function: name.to_string(),
                            index,
                            expected: if pointer { "a string or an object" } else { "an int, a real or a bool" },
                        });
                    }
                }

                self.emit(DisInstruction::new(Opcode::Mframe, sys, Operand::Immediate(import), Operand::Frame(call_frame)));
            }
        }

        self.move_arguments(call_frame, &arguments);

        let ret = match dst {
            Some(dst) => {
                if native.result().is_none() {
                    return Err(LowerError::NoResult(name.to_string()));
                }
                self.slot(dst)?.offset
            }

            None => {
                let mut first = None;
                for ty in native.returns {
                    let offset = self.output.frame.allocate(ty.is_pointer());
                    first.get_or_insert(offset);
                }
                match first {
                    Some(offset) => offset,
                    None => self.output.frame.allocate_word(),
                }
            }
        };

        self.emit(DisInstruction::with_src_dst(
            Opcode::Lea,
            Operand::Frame(ret),
            Operand::FrameIndirect { base: call_frame, offset: REGRET_OFFSET },
        ));
        self.emit(DisInstruction::new(Opcode::Mcall, Operand::Frame(call_frame), Operand::Immediate(import), sys));
        Ok(())
    }

    /// The operand addressing `field` of `object`, checked against the layout when the
    /// object was allocated by this function.
    fn field(&self, object: ValueId, field: usize, ty: Type) -> Result<Operand, LowerError> {
        let slot = self.slot(object)?;
        expect_type(|| format!("field access on {object}"), Type::Object, slot.ty)?;

        if let Some(fields) = self.objects.get(&object) {
            let field_ty = fields.get(field).ok_or(LowerError::FieldOutOfRange { object, field })?;
            expect_type(|| format!("field {field} of {object}"), *field_ty, ty)?;
        }

        let offset = i32::try_from(field)
            .ok()
            .and_then(|field| field.checked_mul(IBY2WD))
            .filter(|offset| *offset <= OPERAND_MAX)
            .ok_or(LowerError::FieldOutOfRange { object, field })?;

        Ok(Operand::FrameIndirect { base: slot.offset, offset })
    }

    /// The moves that give the phis of `target` their values when control arrives from
    /// the current block.
    fn phi_moves(&self, target: BlockId) -> Result<Vec<Move>, LowerError> {
        let block = self.function.block(target).ok_or(LowerError::UnknownBlock(target))?;

        let mut moves = Vec::new();
        for instruction in &block.instructions {
            let Instruction::Phi { dst: phi, incoming, .. } = instruction else {
                break;
            };

            let edge = incoming.iter()
                .find(|edge| edge.block == self.current_block)
                .ok_or(LowerError::MissingPhiEdge { phi: *phi, block: self.current_block })?;

            let dst = self.slot(*phi)?;
            let src = self.slot(edge.value)?;
            expect_type(|| format!("phi {phi}"), dst.ty, src.ty)?;

            if src.offset != dst.offset {
                moves.push(Move { ty: dst.ty, src: src.offset, dst: dst.offset });
            }
        }

        Ok(moves)
    }

    /// Performs the moves as if they happened at the same time.
    fn emit_moves(&mut self, moves: &[Move]) {
        let overlapping = moves.iter().any(|read| moves.iter().any(|write| write.dst == read.src));

        if !overlapping {
            for mv in moves {
                self.move_value(mv.ty, Operand::Frame(mv.src), Operand::Frame(mv.dst));
            }
            return;
        }

        let temporaries: Vec<i32> = moves.iter()
            .map(|mv| self.output.frame.allocate(mv.ty.is_pointer()))
            .collect();

        for (mv, temporary) in moves.iter().zip(&temporaries) {
            self.move_value(mv.ty, Operand::Frame(mv.src), Operand::Frame(*temporary));
        }

        for (mv, temporary) in moves.iter().zip(&temporaries) {
            self.move_value(mv.ty, Operand::Frame(*temporary), Operand::Frame(mv.dst));
        }
    }

    fn move_arguments(&mut self, call_frame: i32, arguments: &[Slot]) {
        for (index, argument) in arguments.iter().enumerate() {
            let dst = Operand::FrameIndirect {
                base: call_frame,
                offset: MAX_TEMP + index as i32 * IBY2WD,
            };
            self.move_value(argument.ty, argument.operand(), dst);
        }
    }

    fn move_value(&mut self, ty: Type, src: Operand, dst: Operand) {
        let opcode = match ty {
            Type::Real => Opcode::Movf,
            ty if ty.is_pointer() => Opcode::Movp,
            _ => Opcode::Movw,
        };
        self.emit(DisInstruction::with_src_dst(opcode, src, dst));
    }

    /// Integers outside the immediate range are read from module data.
    fn int_operand(&mut self, value: i64) -> Operand {
        match i32::try_from(value) {
            Ok(value) if (OPERAND_MIN..=OPERAND_MAX).contains(&value) => Operand::Immediate(value),
            _ => Operand::Module(self.context.long_constant(value)),
        }
    }

    fn jump(&mut self, target: BlockId) {
        let index = self.emit(DisInstruction::with_dst(Opcode::Jmp, Operand::Immediate(0)));
        self.block_jumps.push((index, target));
    }

    fn emit(&mut self, instruction: DisInstruction) -> usize {
        self.output.instructions.push(instruction);
        self.output.instructions.len() - 1
    }

    fn patch(&mut self, instruction: usize, kind: PatchKind, callee: &str) {
        self.output.patches.push(Patch {
            instruction,
            kind,
            callee: callee.to_string(),
        });
    }

    fn add_call_site(&mut self, descriptor: TypeDescriptor) -> i32 {
        let id = self.output.call_sites.len() as i32;
        debug_assert_eq!(descriptor.id(), id);
        self.output.call_sites.push(descriptor);
        id
    }

    #[must_use]
    fn position(&self) -> i32 {
        self.output.instructions.len() as i32
    }

    fn slot(&self, value: ValueId) -> Result<Slot, LowerError> {
        self.slots.get(&value).copied().ok_or(LowerError::UndefinedValue(value))
    }

    fn slots(&self, values: &[ValueId]) -> Result<Vec<Slot>, LowerError> {
        values.iter().map(|value| self.slot(*value)).collect()
    }
}

fn expect_type(context: impl FnOnce() -> String, expected: Type, found: Type) -> Result<(), LowerError> {
    if expected == found {
        Ok(())
    } else {
        Err(LowerError::TypeMismatch { context: context(), expected, found })
    }
}

#[must_use]
fn math_opcode(operation: MathOperation, ty: Type) -> Option<Opcode> {
    let opcode = match (operation, ty) {
        (MathOperation::Add, Type::String) => Opcode::Addc,
        (_, Type::Int) => match operation {
            MathOperation::Add => Opcode::Addw,
            MathOperation::Subtract => Opcode::Subw,
            MathOperation::Multiply => Opcode::Mulw,
            MathOperation::Divide => Opcode::Divw,
            MathOperation::Modulo => Opcode::Modw,
            MathOperation::And => Opcode::Andw,
            MathOperation::Or => Opcode::Orw,
            MathOperation::Xor => Opcode::Xorw,
            MathOperation::LeftShift => Opcode::Shlw,
            MathOperation::RightShift => Opcode::Shrw,
        },
        (_, Type::Real) => match operation {
            MathOperation::Add => Opcode::Addf,
            MathOperation::Subtract => Opcode::Subf,
            MathOperation::Multiply => Opcode::Mulf,
            MathOperation::Divide => Opcode::Divf,
            _ => return None,
        },
        _ => return None,
    };

    Some(opcode)
}

#[must_use]
fn compare_opcode(comparison: Comparison, ty: Type) -> Option<Opcode> {
    let opcode = match ty {
        Type::Int | Type::Bool => match comparison {
            Comparison::Equal => Opcode::Beqw,
            Comparison::NotEqual => Opcode::Bnew,
            Comparison::Less => Opcode::Bltw,
            Comparison::LessOrEqual => Opcode::Blew,
            Comparison::Greater => Opcode::Bgtw,
            Comparison::GreaterOrEqual => Opcode::Bgew,
        },

        Type::Real => match comparison {
            Comparison::Equal => Opcode::Beqf,
            Comparison::NotEqual => Opcode::Bnef,
            Comparison::Less => Opcode::Bltf,
            Comparison::LessOrEqual => Opcode::Blef,
            Comparison::Greater => Opcode::Bgtf,
            Comparison::GreaterOrEqual => Opcode::Bgef,
        },

        Type::String => match comparison {
            Comparison::Equal => Opcode::Beqc,
            Comparison::NotEqual => Opcode::Bnec,
            Comparison::Less => Opcode::Bltc,
            Comparison::LessOrEqual => Opcode::Blec,
            Comparison::Greater => Opcode::Bgtc,
            Comparison::GreaterOrEqual => Opcode::Bgec,
        },

        Type::Object => return None,
    };

    Some(opcode)
}

/// Checks the shape of every block: phis first, exactly one terminator at the end, and
/// successors that exist.
fn check_blocks(function: &Function) -> Result<(), LowerError> {
    if function.is_declaration() {
        return Err(LowerError::EmptyBody);
    }

    for (index, block) in function.blocks.iter().enumerate() {
        let id = BlockId::new(index);

        let Some((last, rest)) = block.instructions.split_last() else {
            return Err(LowerError::UnterminatedBlock(id));
        };

        if !last.is_terminator() {
            return Err(LowerError::UnterminatedBlock(id));
        }

        if rest.iter().any(Instruction::is_terminator) {
            return Err(LowerError::TerminatorNotLast(id));
        }

        let mut in_head = true;
        for instruction in &block.instructions {
            match instruction {
                Instruction::Phi { dst, .. } if !in_head => return Err(LowerError::PhiNotAtBlockStart(*dst)),
                Instruction::Phi { .. } => (),
                _ => in_head = false,
            }
        }

        if let Some(successor) = last.successors().into_iter().find(|successor| successor.index() >= function.blocks.len()) {
            return Err(LowerError::UnknownBlock(successor));
        }
    }

    Ok(())
}

#[derive(Debug, Default)]
struct ValueTypes {
    types: HashMap<ValueId, Type>,
    order: Vec<(ValueId, Type)>,
}

impl ValueTypes {
    fn define(&mut self, value: ValueId, ty: Type) -> Result<(), LowerError> {
        if self.types.insert(value, ty).is_some() {
            return Err(LowerError::Redefinition(value));
        }

        self.order.push((value, ty));
        Ok(())
    }
}

/// The type of every value in the order the values are defined, parameters first.
fn value_types(function: &Function, context: &LoweringContext<'_>) -> Result<Vec<(ValueId, Type)>, LowerError> {
    let mut types = ValueTypes::default();

    for (value, ty) in function.parameter_values() {
        types.define(value, ty)?;
    }

    // A math result has the type of its operands, which may be defined later in block
    // order. Additions always wait, since they can also join strings.
    let mut pending = Vec::new();

    for instruction in function.instructions() {
        let ty = match instruction {
            Instruction::Const { value, .. } => value.ty(),

            Instruction::Math { dst, operation, lhs, .. } => {
                match types.types.get(lhs).copied() {
                    Some(ty) if *operation != MathOperation::Add => ty,
                    _ => {
                        pending.push((*dst, *lhs));
                        continue;
                    }
                }
            }

            Instruction::Compare { .. } => Type::Bool,

            Instruction::Phi { ty, .. } | Instruction::LoadField { ty, .. } => *ty,

            Instruction::LoadGlobal { global, .. } => {
                context.global(global).ok_or_else(|| LowerError::UnknownGlobal(global.clone()))?.ty
            }

            Instruction::New { .. } => Type::Object,

            Instruction::Call { dst: Some(..), callee, .. } => {
                let target = context.function(callee).ok_or_else(|| LowerError::UnknownFunction(callee.clone()))?;
                target.result.ok_or_else(|| LowerError::NoResult(callee.clone()))?
            }

            Instruction::CallNative { dst: Some(..), function, .. } => {
                let native = SysFunction::lookup(function).ok_or_else(|| LowerError::UnknownNative(function.clone()))?;
                native.result().ok_or_else(|| LowerError::NoResult(function.clone()))?
            }

            _ => continue,
        };

        if let Some(dst) = instruction.destination() {
            types.define(dst, ty)?;
        }
    }

    while !pending.is_empty() {
        let mut remaining = Vec::new();

        for (dst, lhs) in &pending {
            match types.types.get(lhs).copied() {
                Some(ty) => types.define(*dst, ty)?,
                None => remaining.push((*dst, *lhs)),
            }
        }

        if remaining.len() == pending.len() {
            return Err(LowerError::UndefinedValue(remaining[0].1));
        }

        pending = remaining;
    }

    Ok(types.order)
}
