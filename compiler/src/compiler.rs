// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The compiler takes a [`Program`] as input, lowers each of its functions, and links the
//! results into a single Dis [`Module`].

use std::{collections::HashSet, ffi::OsStr, path::Path};

use dis::{Module, DEFAULT_STACK_SIZE};
use log::{debug, warn};

use crate::{
    ir::{Function, Program},
    Assembler,
    CompileError,
    DisLowerer,
    FunctionLowerer,
    LoweringContext,
};

/// Module name used when none can be derived from the source path.
pub const FALLBACK_MODULE_NAME: &str = "Main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Overrides the name derived from the source path.
    pub module_name: Option<String>,
    pub stack_size: i32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

#[derive(Debug)]
pub struct Compiler<L = DisLowerer> {
    lowerer: L,
    options: CompileOptions,
}

impl Compiler {
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self::with_lowerer(DisLowerer::new(), options)
    }
}

impl<L: FunctionLowerer> Compiler<L> {
    #[must_use]
    pub fn with_lowerer(lowerer: L, options: CompileOptions) -> Self {
        Self {
            lowerer,
            options,
        }
    }

    #[must_use]
    pub fn lowerer(&self) -> &L {
        &self.lowerer
    }

    pub fn compile(&mut self, program: &Program) -> Result<CompiledModule, CompileError> {
        let functions = compile_order(program)?;
        let mut context = setup(program, &functions);

        let mut fragments = Vec::with_capacity(functions.len());
        for function in functions {
            debug!("Lowering `{}`", function.name);

            let fragment = self.lowerer.lower(function, &mut context)
                .map_err(|source| CompileError::Lowering {
                    function: function.name.clone(),
                    source,
                })?;

            fragments.push(fragment);
        }

        let name = self.options.module_name.clone()
            .unwrap_or_else(|| module_name(&program.source_path));

        let assembler = Assembler::new(name, self.options.stack_size, program.source_path.clone());
        Ok(assembler.assemble(fragments, context.finish()))
    }
}

/// The entry function first, then every other defined function sorted by name.
fn compile_order(program: &Program) -> Result<Vec<&Function>, CompileError> {
    let entry = program.function(&program.entry)
        .filter(|function| !function.is_declaration())
        .ok_or_else(|| CompileError::MissingEntry { name: program.entry.clone() })?;

    let mut seen = HashSet::new();
    seen.insert(entry.name.as_str());

    let mut others = Vec::new();
    for function in &program.functions {
        if function.is_declaration() || std::ptr::eq(function, entry) {
            continue;
        }

        if !seen.insert(function.name.as_str()) {
            warn!("Function `{}` is defined more than once, only the first definition is compiled", function.name);
            continue;
        }

        others.push(function);
    }

    others.sort_by(|a, b| a.name.cmp(&b.name));

    let mut functions = Vec::with_capacity(others.len() + 1);
    functions.push(entry);
    functions.extend(others);
    Ok(functions)
}

/// Reserves everything in module data that is known before lowering starts. Only the
/// functions that are compiled contribute imports and literals, in program order.
fn setup<'p>(program: &'p Program, functions: &[&'p Function]) -> LoweringContext<'p> {
    let mut context = LoweringContext::new(program);

    let compiled: Vec<&Function> = program.functions.iter()
        .filter(|function| functions.iter().any(|compiled| std::ptr::eq(*compiled, *function)))
        .collect();

    for name in compiled.iter().flat_map(|function| function.native_calls()) {
        context.register_native(name);
    }

    for literal in compiled.iter().flat_map(|function| function.string_literals()) {
        context.string_literal(literal);
    }

    for global in &program.globals {
        if context.global(&global.name).is_some() {
            warn!("Global `{}` is declared more than once", global.name);
        }
        context.add_global(&global.name, global.ty);
    }

    context
}

/// The file stem of the source path with its first letter in upper case.
#[must_use]
pub fn module_name(source_path: &str) -> String {
    let stem = Path::new(source_path)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    let mut chars = stem.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => FALLBACK_MODULE_NAME.to_string(),
    }
}

/// Where a function ended up in the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSymbol {
    pub name: String,
    pub frame_id: i32,
    pub address: i32,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModule {
    pub module: Module,

    /// In compile order: the entry function first.
    pub symbols: Vec<FunctionSymbol>,
}

impl CompiledModule {
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&FunctionSymbol> {
        self.symbols.iter().find(|symbol| symbol.name == name)
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.module.encode()
    }
}
