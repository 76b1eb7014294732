// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::HashMap;

use dis::{DataItem, Import, TypeDescriptor};
use log::debug;

use crate::{ir::{Function, Program, Type}, ModuleData, SysFunction};

/// A global variable that lives in module data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalSlot {
    pub offset: i32,
    pub ty: Type,
}

/// The state shared by all lowering calls of one compilation: module data, the string
/// and constant tables and the native functions in import order.
#[derive(Debug)]
pub struct LoweringContext<'program> {
    program: &'program Program,
    module_data: ModuleData,
    sys_offset: i32,
    sys_path_offset: i32,
    globals: HashMap<String, GlobalSlot>,
    strings: HashMap<String, i32>,
    longs: HashMap<i64, i32>,

    /// Keyed by bit pattern, so `0.0` and `-0.0` get a slot each.
    reals: HashMap<u64, i32>,

    natives: Vec<&'static SysFunction>,
    data: Vec<DataItem>,
}

impl<'program> LoweringContext<'program> {
    /// Reserves the `$Sys` module handle and its path string, and registers `print`
    /// so that it always has import index 0.
    #[must_use]
    pub fn new(program: &'program Program) -> Self {
        let mut module_data = ModuleData::new();
        let sys_offset = module_data.allocate_pointer("$Sys handle");

        let mut this = Self {
            program,
            module_data,
            sys_offset,
            sys_path_offset: 0,
            globals: HashMap::new(),
            strings: HashMap::new(),
            longs: HashMap::new(),
            reals: HashMap::new(),
            natives: Vec::new(),
            data: Vec::new(),
        };

        this.register_native("print");
        this.sys_path_offset = this.string_literal(SysFunction::MODULE_PATH);
        this
    }

    #[must_use]
    pub fn function(&self, name: &str) -> Option<&'program Function> {
        self.program.function(name)
    }

    /// Offset of the pointer to the loaded `$Sys` module.
    #[must_use]
    pub fn sys_offset(&self) -> i32 {
        self.sys_offset
    }

    /// Registers a `$Sys` function and returns its import index. Unknown names are not
    /// registered.
    pub fn register_native(&mut self, name: &str) -> Option<usize> {
        SysFunction::lookup(name).map(|function| self.native_import(function))
    }

    pub fn native_import(&mut self, function: &'static SysFunction) -> usize {
        if let Some(index) = self.natives.iter().position(|native| native.name == function.name) {
            return index;
        }

        self.natives.push(function);
        self.natives.len() - 1
    }

    /// Returns the offset of the pointer to the string with this content, placing it in
    /// module data on first use.
    pub fn string_literal(&mut self, value: &str) -> i32 {
        if let Some(offset) = self.strings.get(value) {
            return *offset;
        }

        let offset = self.module_data.allocate_pointer(value);
        self.strings.insert(value.to_string(), offset);
        self.data.push(DataItem::string(offset, value));
        offset
    }

    /// Returns the offset of a module data word holding `value`.
    pub fn long_constant(&mut self, value: i64) -> i32 {
        if let Some(offset) = self.longs.get(&value) {
            return *offset;
        }

        let offset = self.module_data.allocate_word(&value.to_string());
        self.longs.insert(value, offset);
        self.data.push(DataItem::long(offset, value));
        offset
    }

    /// Returns the offset of a module data word holding the real `value`.
    pub fn real_constant(&mut self, value: f64) -> i32 {
        if let Some(offset) = self.reals.get(&value.to_bits()) {
            return *offset;
        }

        let offset = self.module_data.allocate_word(&value.to_string());
        self.reals.insert(value.to_bits(), offset);
        self.data.push(DataItem::real(offset, value));
        offset
    }

    pub fn add_global(&mut self, name: &str, ty: Type) -> GlobalSlot {
        if let Some(slot) = self.globals.get(name) {
            return *slot;
        }

        let offset = if ty.is_pointer() {
            self.module_data.allocate_pointer(name)
        } else {
            self.module_data.allocate_word(name)
        };

        let slot = GlobalSlot { offset, ty };
        self.globals.insert(name.to_string(), slot);
        slot
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<GlobalSlot> {
        self.globals.get(name).copied()
    }

    #[must_use]
    pub fn finish(mut self) -> GlobalData {
        self.data.sort_by_key(DataItem::offset);

        debug!(
            "Module data is {} bytes with {} items and {} imports",
            self.module_data.size(),
            self.data.len(),
            self.natives.len(),
        );

        GlobalData {
            descriptor: self.module_data.type_descriptor(0),
            size: self.module_data.size(),
            data: self.data,
            imports: self.natives.iter().map(|native| native.import()).collect(),
            sys_offset: self.sys_offset,
            sys_path_offset: self.sys_path_offset,
        }
    }
}

/// Everything the assembler needs to know about module data once lowering is done.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalData {
    pub descriptor: TypeDescriptor,
    pub size: i32,

    /// Initializers, ordered by offset.
    pub data: Vec<DataItem>,

    /// The `$Sys` functions, ordered by import index.
    pub imports: Vec<Import>,

    pub sys_offset: i32,
    pub sys_path_offset: i32,
}
