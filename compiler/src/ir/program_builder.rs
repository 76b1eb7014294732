// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use super::{BasicBlock, BlockId, Function, FunctionBuilder, Global, Program, Type};

#[derive(Debug)]
pub struct ProgramBuilder {
    pub(super) program: Program,
}

impl ProgramBuilder {
    #[must_use]
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            program: Program::new(source_path),
        }
    }

    pub fn set_entry(&mut self, name: impl Into<String>) {
        self.program.entry = name.into();
    }

    pub fn add_global(&mut self, name: impl Into<String>, ty: Type) {
        self.program.globals.push(Global {
            name: name.into(),
            ty,
        });
    }

    /// Adds a function without a body.
    pub fn declare_function(&mut self, name: impl Into<String>, parameters: impl Into<Vec<Type>>, result: Option<Type>) {
        self.program.functions.push(Function {
            name: name.into(),
            parameters: parameters.into(),
            result,
            blocks: Vec::new(),
        });
    }

    pub fn build_function<F>(&mut self, name: impl Into<String>, parameters: impl Into<Vec<Type>>, result: Option<Type>, f: F)
            where F: FnOnce(&mut FunctionBuilder) {
        let name = name.into();
        assert!(!name.is_empty(), "a function cannot have an empty name");

        let parameters = parameters.into();
        let mut builder = FunctionBuilder {
            next_value: parameters.len(),
            function: Function {
                name,
                parameters,
                result,
                blocks: vec![BasicBlock::default()],
            },
            current_block: BlockId::new(0),
        };

        f(&mut builder);

        self.program.functions.push(builder.build());
    }

    #[must_use]
    pub fn build(self) -> Program {
        self.program
    }
}
