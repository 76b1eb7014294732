// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use dis::{Import, TypeDescriptor, IBY2WD, MAX_TEMP};

use crate::ir::Type;

/// The calling convention of a function exported by the built-in `$Sys` module. The
/// signature hashes and frame layouts must match the runtime bit for bit, otherwise the
/// loader refuses to link the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysFunction {
    pub name: &'static str,
    pub signature: u32,

    /// Size of the callee frame in bytes. Zero for variadic functions, whose frame is
    /// described per call site instead.
    pub frame_size: i32,
    pub map: &'static [u8],

    /// The words the function writes through the return pointer, in order.
    pub returns: &'static [Type],
}

impl SysFunction {
    /// The name of the module path string `load` expects.
    pub const MODULE_PATH: &'static str = "$Sys";

    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static SysFunction> {
        SYS_FUNCTIONS.iter().find(|function| function.name == name)
    }

    /// The type of the result when it fits in a single value.
    #[must_use]
    pub fn result(&self) -> Option<Type> {
        match self.returns {
            [ty] => Some(*ty),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.frame_size == 0
    }

    /// The number of arguments a fixed-frame function takes: one word per argument after
    /// the frame header.
    #[must_use]
    pub const fn parameter_count(&self) -> Option<usize> {
        if self.is_variadic() {
            None
        } else {
            Some(((self.frame_size - MAX_TEMP) / IBY2WD) as usize)
        }
    }

    /// Whether the runtime traces argument `index` as a pointer.
    #[must_use]
    pub fn parameter_is_pointer(&self, index: usize) -> bool {
        self.frame_descriptor(0).has_pointer(MAX_TEMP + index as i32 * IBY2WD)
    }

    #[must_use]
    pub fn import(&self) -> Import {
        Import {
            signature: self.signature,
            name: self.name.to_string(),
        }
    }

    /// The descriptor of the callee frame for fixed-frame functions.
    #[must_use]
    pub fn frame_descriptor(&self, id: i32) -> TypeDescriptor {
        TypeDescriptor::with_map(id, self.frame_size, self.map)
    }
}

const SYS_FUNCTIONS: &[SysFunction] = &[
    SysFunction { name: "print", signature: 0xac849033, frame_size: 0, map: &[], returns: &[Type::Int] },
    SysFunction { name: "fprint", signature: 0xf46486c8, frame_size: 0, map: &[], returns: &[Type::Int] },
    SysFunction { name: "sprint", signature: 0x4c0624b6, frame_size: 0, map: &[], returns: &[Type::String] },
    SysFunction { name: "fildes", signature: 0x1478f993, frame_size: 72, map: &[], returns: &[Type::Object] },
    SysFunction { name: "write", signature: 0x7cfef557, frame_size: 88, map: &[0x00, 0xc0], returns: &[Type::Int] },
    SysFunction { name: "read", signature: 0x7cfef557, frame_size: 88, map: &[0x00, 0xc0], returns: &[Type::Int] },
    SysFunction { name: "open", signature: 0x8f477f99, frame_size: 80, map: &[0x00, 0x80], returns: &[Type::Object] },
    SysFunction { name: "create", signature: 0x54db77d9, frame_size: 88, map: &[0x00, 0x80], returns: &[Type::Object] },
    SysFunction { name: "seek", signature: 0xaeccaddb, frame_size: 88, map: &[0x00, 0x80], returns: &[Type::Int] },
    SysFunction { name: "sleep", signature: 0xe67bf126, frame_size: 72, map: &[], returns: &[Type::Int] },
    SysFunction { name: "millisec", signature: 0x616977e8, frame_size: 64, map: &[], returns: &[Type::Int] },
    SysFunction { name: "bind", signature: 0x66326d91, frame_size: 88, map: &[0x00, 0xc0], returns: &[Type::Int] },
    SysFunction { name: "chdir", signature: 0xc6935858, frame_size: 72, map: &[0x00, 0x80], returns: &[Type::Int] },
    SysFunction { name: "remove", signature: 0xc6935858, frame_size: 72, map: &[0x00, 0x80], returns: &[Type::Int] },
    SysFunction { name: "pipe", signature: 0x1f2c52ea, frame_size: 72, map: &[0x00, 0x80], returns: &[Type::Int] },
    SysFunction { name: "dup", signature: 0x6584767b, frame_size: 80, map: &[], returns: &[Type::Int] },
    SysFunction { name: "pctl", signature: 0x05df27fb, frame_size: 80, map: &[0x00, 0x40], returns: &[Type::Int] },

    SysFunction { name: "tokenize", signature: 0x57338f20, frame_size: 80, map: &[0x00, 0xc0], returns: &[Type::Int, Type::Object] },
];

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("print", 0xac849033, 0)]
    #[case("millisec", 0x616977e8, 64)]
    #[case("write", 0x7cfef557, 88)]
    #[case("tokenize", 0x57338f20, 80)]
    fn lookup_known(#[case] name: &str, #[case] signature: u32, #[case] frame_size: i32) {
        let function = SysFunction::lookup(name).unwrap();
        assert_eq!(function.signature, signature);
        assert_eq!(function.frame_size, frame_size);
    }

    #[test]
    fn lookup_unknown() {
        assert_eq!(SysFunction::lookup("exec"), None);
    }

    #[test]
    fn only_formatting_functions_are_variadic() {
        let variadic: Vec<_> = SYS_FUNCTIONS.iter()
            .filter(|function| function.is_variadic())
            .map(|function| function.name)
            .collect();

        assert_eq!(variadic, vec!["print", "fprint", "sprint"]);
    }

    #[rstest]
    #[case("millisec", &[])]
    #[case("sleep", &[false])]
    #[case("write", &[true, true, false])]
    #[case("pctl", &[false, true])]
    fn fixed_frame_parameters(#[case] name: &str, #[case] pointers: &[bool]) {
        let function = SysFunction::lookup(name).unwrap();
        assert_eq!(function.parameter_count(), Some(pointers.len()));

        let actual: Vec<bool> = (0..pointers.len()).map(|index| function.parameter_is_pointer(index)).collect();
        assert_eq!(actual, pointers);
    }

    #[rstest]
    #[case("sprint", Some(Type::String))]
    #[case("open", Some(Type::Object))]
    #[case("tokenize", None)]
    fn single_value_results(#[case] name: &str, #[case] expected: Option<Type>) {
        assert_eq!(SysFunction::lookup(name).unwrap().result(), expected);
    }

    #[test]
    fn variadic_functions_have_no_parameter_count() {
        assert_eq!(SysFunction::lookup("sprint").unwrap().parameter_count(), None);
    }

    #[test]
    fn frame_descriptor_keeps_the_runtime_map() {
        let descriptor = SysFunction::lookup("open").unwrap().frame_descriptor(7);
        assert_eq!(descriptor.id(), 7);
        assert_eq!(descriptor.size(), 80);
        assert_eq!(descriptor.pointer_offsets().collect::<Vec<_>>(), vec![64]);
    }
}
