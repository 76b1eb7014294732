// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

mod assembler;
mod compiler;
mod context;
mod error;
mod frame;
mod ir;
mod lowering;
mod module_data;
mod signature;

pub use self::{
    assembler::{
        Assembler,
        ENTRY_FRAME_ID,
        INIT_NAME,
        INIT_SIGNATURE,
        PROLOGUE_LENGTH,
    },
    compiler::{
        CompileOptions,
        CompiledModule,
        Compiler,
        FunctionSymbol,
        FALLBACK_MODULE_NAME,
        module_name,
    },
    context::{
        GlobalData,
        GlobalSlot,
        LoweringContext,
    },
    error::{
        CompileError,
        LowerError,
    },
    frame::Frame,
    ir::{
        BasicBlock,
        BlockId,
        Comparison,
        Constant,
        DEFAULT_ENTRY,
        Function,
        FunctionBuilder,
        Global,
        Instruction,
        MathOperation,
        PhiEdge,
        Program,
        ProgramBuilder,
        Type,
        ValueId,
    },
    lowering::{
        DisLowerer,
        FunctionLowerer,
        LoweredFunction,
        Patch,
        PatchKind,
        Resolution,
    },
    module_data::ModuleData,
    signature::SysFunction,
};
