// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use dis::{Instruction, Link, Module, Opcode, Operand, RuntimeFlags, TypeDescriptor};
use log::{debug, trace};

use crate::{
    lowering::{LoweredFunction, Patch, Resolution},
    CompiledModule,
    FunctionSymbol,
    GlobalData,
};

/// Number of instructions placed before the first function: the `load` of `$Sys`.
pub const PROLOGUE_LENGTH: i32 = 1;

/// Frame descriptor id of the entry function.
pub const ENTRY_FRAME_ID: i32 = 1;

/// Name of the exported entry point.
pub const INIT_NAME: &str = "init";

/// Type signature of `init()`.
pub const INIT_SIGNATURE: u32 = 0x4244b354;

/// Links lowered functions into one module: numbers the frame and call-site descriptors,
/// places the functions after the prologue, resolves the patches and relocates local
/// addresses and descriptor ids.
#[derive(Debug, Clone)]
pub struct Assembler {
    name: String,
    stack_size: i32,
    source_path: String,
}

impl Assembler {
    #[must_use]
    pub fn new(name: impl Into<String>, stack_size: i32, source_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size,
            source_path: source_path.into(),
        }
    }

    /// Assembles the fragments, entry function first, into a module.
    ///
    /// # Panics
    /// When the fragments are inconsistent: no entry fragment, a patch pointing outside
    /// its fragment, two patches on one instruction, or a call to a function that has no
    /// fragment.
    #[must_use]
    pub fn assemble(&self, mut fragments: Vec<LoweredFunction>, data: GlobalData) -> CompiledModule {
        assert!(!fragments.is_empty(), "a module needs an entry function");

        let symbols = place_functions(&fragments);
        let resolutions: HashMap<String, Resolution> = symbols.iter()
            .map(|symbol| (symbol.name.clone(), Resolution { frame_id: symbol.frame_id, address: symbol.address }))
            .collect();

        let mut call_site_base = fragments.len() as i32 + 1;
        let mut call_sites = Vec::new();
        let mut handlers = Vec::new();

        for (fragment, symbol) in fragments.iter_mut().zip(&symbols) {
            resolve_fragment(fragment, symbol.address, call_site_base, &resolutions);

            for (index, descriptor) in fragment.call_sites.iter().enumerate() {
                let mut descriptor = descriptor.clone();
                descriptor.set_id(call_site_base + index as i32);
                call_sites.push(descriptor);
            }

            call_site_base += fragment.call_sites.len() as i32;

            for handler in &fragment.handlers {
                let mut handler = handler.clone();
                handler.relocate(symbol.address);
                handlers.push(handler);
            }
        }

        let mut instructions = Vec::with_capacity(1 + fragments.iter().map(|fragment| fragment.instructions.len()).sum::<usize>());
        instructions.push(Instruction::new(
            Opcode::Load,
            Operand::Module(data.sys_path_offset),
            Operand::Immediate(0),
            Operand::Module(data.sys_offset),
        ));

        for fragment in &fragments {
            instructions.extend_from_slice(&fragment.instructions);
        }

        if instructions.last().map(|instruction| instruction.opcode) != Some(Opcode::Ret) {
            instructions.push(Instruction::without_operands(Opcode::Ret));
        }

        let mut type_descriptors: Vec<TypeDescriptor> = Vec::with_capacity(1 + fragments.len() + call_sites.len());
        type_descriptors.push(data.descriptor);
        type_descriptors.extend(fragments.iter().zip(&symbols).map(|(fragment, symbol)| fragment.frame.type_descriptor(symbol.frame_id)));
        type_descriptors.extend(call_sites);

        let mut module = Module::new(self.name.clone());
        module.runtime_flags = RuntimeFlags::HAS_LDT;
        module.stack_size = self.stack_size;
        module.instructions = instructions;
        module.type_descriptors = type_descriptors;
        module.data_size = data.size;
        module.data = data.data;
        module.entry_pc = 0;
        module.entry_type = ENTRY_FRAME_ID;
        module.links.push(Link {
            pc: module.entry_pc,
            type_id: ENTRY_FRAME_ID,
            signature: INIT_SIGNATURE,
            name: INIT_NAME.to_string(),
        });
        module.imports.push(data.imports);

        if !handlers.is_empty() {
            module.runtime_flags.insert(RuntimeFlags::HAS_EXCEPT);
            module.handlers = handlers;
        }

        module.source_path = self.source_path.clone();

        if let Err(error) = module.validate() {
            panic!("assembled module `{}` is inconsistent: {error}", module.name);
        }

        debug!(
            "Assembled `{}`: {} instructions, {} type descriptors, {} bytes of module data, {} imports, {} handlers",
            module.name,
            module.instructions.len(),
            module.type_descriptors.len(),
            module.data_size,
            module.import_count(),
            module.handlers.len(),
        );

        CompiledModule { module, symbols }
    }
}

/// Gives every fragment its frame id and start address.
#[must_use]
fn place_functions(fragments: &[LoweredFunction]) -> Vec<FunctionSymbol> {
    let mut address = PROLOGUE_LENGTH;

    fragments.iter()
        .enumerate()
        .map(|(index, fragment)| {
            let symbol = FunctionSymbol {
                name: fragment.name.clone(),
                frame_id: ENTRY_FRAME_ID + index as i32,
                address,
                length: fragment.instructions.len(),
            };

            trace!("Function `{}` has frame {} and starts at {}", symbol.name, symbol.frame_id, symbol.address);
            address += fragment.instructions.len() as i32;
            symbol
        })
        .collect()
}

fn resolve_fragment(fragment: &mut LoweredFunction, start: i32, call_site_base: i32, resolutions: &HashMap<String, Resolution>) {
    let mut patches: HashMap<usize, &Patch> = HashMap::new();

    for patch in &fragment.patches {
        assert!(
            patch.instruction < fragment.instructions.len(),
            "patch of instruction {} in `{}` points past its {} instructions",
            patch.instruction,
            fragment.name,
            fragment.instructions.len(),
        );

        let previous = patches.insert(patch.instruction, patch);
        assert!(previous.is_none(), "instruction {} of `{}` is patched twice", patch.instruction, fragment.name);
    }

    for (index, instruction) in fragment.instructions.iter_mut().enumerate() {
        let Some(patch) = patches.get(&index) else {
            relocate(instruction, start, call_site_base);
            continue;
        };

        let Some(resolution) = resolutions.get(&patch.callee) else {
            panic!("`{}` calls `{}`, which was not lowered", fragment.name, patch.callee);
        };

        trace!("Patching {} of `{instruction}` in `{}` for `{}`", patch.kind, fragment.name, patch.callee);
        patch.kind.apply(instruction, resolution);
    }
}

/// Turns fragment-local code addresses and call-site indices into module-wide ones.
fn relocate(instruction: &mut Instruction, start: i32, call_site_base: i32) {
    if instruction.opcode.has_type_descriptor_source() {
        if let Operand::Immediate(index) = instruction.src {
            instruction.src = Operand::Immediate(call_site_base + index);
        }
    }

    if instruction.opcode.has_type_descriptor_middle() {
        if let Operand::Immediate(index) = instruction.mid {
            instruction.mid = Operand::Immediate(call_site_base + index);
        }
    }

    if instruction.opcode.is_branch() {
        if let Operand::Immediate(target) = instruction.dst {
            instruction.dst = Operand::Immediate(start + target);
        }
    }
}
