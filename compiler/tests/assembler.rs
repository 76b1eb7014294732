// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use dis::{Exception, Handler, Instruction, Module, Opcode, Operand, RuntimeFlags, TypeDescriptor};
use dis_compiler::{
    CompileError,
    CompileOptions,
    Compiler,
    Function,
    FunctionLowerer,
    LowerError,
    LoweredFunction,
    LoweringContext,
    Patch,
    PatchKind,
    Program,
    ProgramBuilder,
};
use pretty_assertions::assert_eq;

/// Returns hand-written fragments instead of lowering, so that the linking can be
/// checked in isolation.
#[derive(Default)]
struct CannedLowerer {
    lowered: Vec<String>,
}

impl FunctionLowerer for CannedLowerer {
    fn lower(&mut self, function: &Function, _: &mut LoweringContext<'_>) -> Result<LoweredFunction, LowerError> {
        self.lowered.push(function.name.clone());

        let mut fragment = LoweredFunction::new(function.name.clone());
        match function.name.as_str() {
            "main" => {
                let call_frame = fragment.frame.allocate_word();
                fragment.instructions = vec![
                    Instruction::with_src_dst(Opcode::Frame, Operand::Immediate(0), Operand::Frame(call_frame)),
                    Instruction::with_src_dst(Opcode::Call, Operand::Frame(call_frame), Operand::Immediate(0)),
                    Instruction::with_src_dst(Opcode::Frame, Operand::Immediate(0), Operand::Frame(call_frame)),
                    Instruction::with_dst(Opcode::Jmp, Operand::Immediate(0)),
                    Instruction::without_operands(Opcode::Ret),
                ];
                fragment.call_sites.push(TypeDescriptor::new(0, 64));
                fragment.patches = vec![
                    Patch { instruction: 0, kind: PatchKind::FrameId, callee: "helper".into() },
                    Patch { instruction: 1, kind: PatchKind::CallAddress, callee: "helper".into() },
                ];
            }

            "helper" => {
                let object = fragment.frame.allocate_pointer();
                fragment.instructions = vec![
                    Instruction::with_src_dst(Opcode::New, Operand::Immediate(0), Operand::Frame(object)),
                    Instruction::with_src_dst(Opcode::New, Operand::Immediate(1), Operand::Frame(object)),
                    Instruction::new(Opcode::Beqw, Operand::Frame(object), Operand::Immediate(0), Operand::Immediate(2)),
                    Instruction::without_operands(Opcode::Ret),
                ];
                fragment.call_sites.push(TypeDescriptor::new(0, 8));
                fragment.call_sites.push(TypeDescriptor::new(1, 16));
            }

            "guarded" => {
                fragment.instructions = vec![
                    Instruction::with_src_dst(Opcode::Movw, Operand::Immediate(1), Operand::Frame(72)),
                    Instruction::without_operands(Opcode::Ret),
                    Instruction::with_src_dst(Opcode::Movw, Operand::Immediate(0), Operand::Frame(72)),
                    Instruction::without_operands(Opcode::Ret),
                ];

                let mut handler = Handler::new(72, 0, 2, 2);
                handler.exceptions.push(Exception { name: "fail".into(), pc: 3 });
                fragment.handlers.push(handler);
            }

            "missing" => {
                return Err(LowerError::UnknownNative("exec".into()));
            }

            "dangling" => {
                fragment.instructions = vec![
                    Instruction::with_src_dst(Opcode::Call, Operand::Frame(64), Operand::Immediate(0)),
                    Instruction::without_operands(Opcode::Ret),
                ];
                fragment.patches.push(Patch { instruction: 0, kind: PatchKind::CallAddress, callee: "nowhere".into() });
            }

            "past" => {
                fragment.instructions = vec![Instruction::without_operands(Opcode::Ret)];
                fragment.patches.push(Patch { instruction: 5, kind: PatchKind::CallAddress, callee: "main".into() });
            }

            "twice" => {
                fragment.instructions = vec![Instruction::with_src_dst(Opcode::Call, Operand::Frame(64), Operand::Immediate(0))];
                fragment.patches.push(Patch { instruction: 0, kind: PatchKind::CallAddress, callee: "main".into() });
                fragment.patches.push(Patch { instruction: 0, kind: PatchKind::CallAddress, callee: "main".into() });
            }

            _ => {
                fragment.instructions = vec![Instruction::without_operands(Opcode::Ret)];
            }
        }

        Ok(fragment)
    }
}

fn program(functions: &[&str]) -> Program {
    let mut builder = ProgramBuilder::new("canned.go");
    for name in functions {
        builder.build_function(*name, [], None, |builder| builder.ret());
    }
    builder.build()
}

fn compiler() -> Compiler<CannedLowerer> {
    Compiler::with_lowerer(CannedLowerer::default(), CompileOptions::default())
}

#[test]
fn patches_and_relocations_are_applied() {
    let _ = env_logger::builder().is_test(true).try_init();

    let compiled = compiler().compile(&program(&["helper", "main"])).unwrap();
    let listing: Vec<_> = compiled.module.instructions.iter().map(ToString::to_string).collect();

    assert_eq!(listing, vec![
        "load 8(mp), $0, 0(mp)",

        // main
        "frame $2, 64(fp)",
        "call 64(fp), $6",
        "frame $3, 64(fp)",
        "jmp $1",
        "ret",

        // helper
        "new $4, 64(fp)",
        "new $5, 64(fp)",
        "beqw 64(fp), $0, $8",
        "ret",
    ]);
}

#[test]
fn descriptors_are_numbered_frames_first() {
    let compiled = compiler().compile(&program(&["helper", "main"])).unwrap();
    let module = &compiled.module;

    let ids: Vec<_> = module.type_descriptors.iter().map(TypeDescriptor::id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);

    let sizes: Vec<_> = module.type_descriptors.iter().map(TypeDescriptor::size).collect();
    assert_eq!(sizes, vec![module.data_size, 72, 72, 64, 8, 16]);

    assert_eq!(module.entry_pc, 0);
    assert_eq!(module.entry_type, 1);

    assert_eq!(module.runtime_flags, RuntimeFlags::HAS_LDT);
    assert!(module.handlers.is_empty());
}

#[test]
fn lowering_order_is_entry_then_by_name() {
    let mut compiler = compiler();
    let compiled = compiler.compile(&program(&["zulu", "bravo", "main", "helper", "alpha"])).unwrap();

    assert_eq!(compiler.lowerer().lowered, vec!["main", "alpha", "bravo", "helper", "zulu"]);

    let order: Vec<_> = compiled.symbols.iter().map(|symbol| symbol.name.as_str()).collect();
    assert_eq!(order, vec!["main", "alpha", "bravo", "helper", "zulu"]);

    let addresses: Vec<_> = compiled.symbols.iter().map(|symbol| symbol.address).collect();
    assert_eq!(addresses, vec![1, 6, 7, 8, 12]);
}

#[test]
fn lowering_errors_name_the_function() {
    let error = compiler().compile(&program(&["main", "missing"])).unwrap_err();

    assert_eq!(error, CompileError::Lowering {
        function: "missing".into(),
        source: LowerError::UnknownNative("exec".into()),
    });
}

#[test]
fn missing_entry() {
    let error = compiler().compile(&program(&["helper"])).unwrap_err();
    assert_eq!(error, CompileError::MissingEntry { name: "main".into() });
}

#[test]
#[should_panic(expected = "which was not lowered")]
fn call_to_function_without_fragment() {
    let _ = compiler().compile(&program(&["main", "helper", "dangling"]));
}

#[test]
#[should_panic(expected = "is patched twice")]
fn duplicate_patch() {
    let _ = compiler().compile(&program(&["main", "helper", "twice"]));
}

#[test]
fn handlers_move_with_their_function() {
    let compiled = compiler().compile(&program(&["main", "helper", "guarded"])).unwrap();
    let module = &compiled.module;

    assert_eq!(compiled.symbol("guarded").unwrap().address, 6);
    assert_eq!(module.runtime_flags, RuntimeFlags::HAS_LDT | RuntimeFlags::HAS_EXCEPT);

    let mut expected = Handler::new(72, 6, 8, 8);
    expected.exceptions.push(Exception { name: "fail".into(), pc: 9 });
    assert_eq!(module.handlers, vec![expected]);

    assert_eq!(Module::decode(&module.encode()).unwrap(), *module);
}

#[test]
#[should_panic(expected = "points past")]
fn patch_outside_fragment() {
    let _ = compiler().compile(&program(&["main", "helper", "past"]));
}
