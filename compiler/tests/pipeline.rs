// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use dis::{DataItem, Import, Module, Opcode, RuntimeFlags, TypeDescriptor};
use dis_compiler::{
    Comparison,
    CompileOptions,
    CompiledModule,
    Compiler,
    MathOperation,
    Program,
    ProgramBuilder,
    Type,
    INIT_SIGNATURE,
};
use pretty_assertions::assert_eq;

fn compile(program: &Program) -> CompiledModule {
    let _ = env_logger::builder().is_test(true).try_init();

    Compiler::new(CompileOptions::default())
        .compile(program)
        .unwrap()
}

/// `main` prints the same literal twice and calls `helper` twice.
fn greeting_program() -> Program {
    let mut builder = ProgramBuilder::new("greeting.go");

    builder.build_function("main", [], None, |builder| {
        let first = builder.const_string("hello");
        builder.call_native_void("print", [first]);
        builder.call_void("helper", []);
        builder.call_void("helper", []);
        let second = builder.const_string("hello");
        builder.call_native_void("print", [second]);
        builder.ret();
    });

    builder.build_function("helper", [], None, |builder| builder.ret());

    builder.build()
}

/// Sums `1..=n` in a loop.
fn sum_program() -> Program {
    let mut builder = ProgramBuilder::new("sum.go");
    builder.add_global("total", Type::Int);

    builder.build_function("main", [], None, |builder| {
        let limit = builder.const_int(10);
        let total = builder.call("sum", [limit]);
        builder.store_global("total", total);
        let text = builder.const_string("done\n");
        builder.call_native_void("print", [text]);
        builder.ret();
    });

    builder.build_function("sum", [Type::Int], Some(Type::Int), |builder| {
        let head = builder.create_block();
        let body = builder.create_block();
        let exit = builder.create_block();

        let limit = builder.parameter(0);
        let zero = builder.const_int(0);
        let one = builder.const_int(1);
        builder.jump(head);

        builder.switch_to_block(head);
        let counter = builder.phi(Type::Int);
        let total = builder.phi(Type::Int);
        let done = builder.compare(Comparison::Greater, counter, limit);
        builder.branch(done, exit, body);

        builder.switch_to_block(body);
        let next_total = builder.math(MathOperation::Add, total, counter);
        let next_counter = builder.math(MathOperation::Add, counter, one);
        builder.jump(head);

        builder.add_phi_incoming(counter, dis_compiler::BlockId::new(0), one);
        builder.add_phi_incoming(counter, body, next_counter);
        builder.add_phi_incoming(total, dis_compiler::BlockId::new(0), zero);
        builder.add_phi_incoming(total, body, next_total);

        builder.switch_to_block(exit);
        builder.ret_with(total);
    });

    builder.build()
}

#[test]
fn greeting_module_layout() {
    let compiled = compile(&greeting_program());
    let module = &compiled.module;

    let listing: Vec<_> = module.instructions.iter().map(ToString::to_string).collect();
    assert_eq!(listing, vec![
        "load 8(mp), $0, 0(mp)",
        "movp 16(mp), 64(fp)",
        "frame $3, 80(fp)",
        "movp 64(fp), 64(80(fp))",
        "lea 88(fp), 32(80(fp))",
        "mcall 80(fp), $0, 0(mp)",
        "frame $2, 96(fp)",
        "call 96(fp), $16",
        "frame $2, 104(fp)",
        "call 104(fp), $16",
        "movp 16(mp), 72(fp)",
        "frame $4, 112(fp)",
        "movp 72(fp), 64(112(fp))",
        "lea 120(fp), 32(112(fp))",
        "mcall 112(fp), $0, 0(mp)",
        "ret",
        "ret",
    ]);

    assert_eq!(compiled.symbol("main").map(|symbol| (symbol.frame_id, symbol.address)), Some((1, 1)));
    assert_eq!(compiled.symbol("helper").map(|symbol| (symbol.frame_id, symbol.address)), Some((2, 16)));

    let ids: Vec<_> = module.type_descriptors.iter().map(TypeDescriptor::id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert_eq!(module.type_descriptors[1].size(), 128);
    assert_eq!(module.type_descriptors[1].pointer_offsets().collect::<Vec<_>>(), vec![64, 72]);
    assert_eq!(module.type_descriptors[3].pointer_offsets().collect::<Vec<_>>(), vec![64]);

    assert_eq!(module.data, vec![
        DataItem::string(8, "$Sys"),
        DataItem::string(16, "hello"),
    ]);
    assert_eq!(module.data_size, 24);

    assert_eq!(module.imports, vec![vec![Import { signature: 0xac849033, name: "print".into() }]]);
    assert_eq!(module.runtime_flags, RuntimeFlags::HAS_LDT);
    assert_eq!(module.links.len(), 1);
    assert_eq!(module.links[0].name, "init");
    assert_eq!(module.links[0].signature, INIT_SIGNATURE);
    assert_eq!(module.links[0].type_id, 1);
    assert_eq!(module.name, "Greeting");
    assert_eq!(module.source_path, "greeting.go");
}

#[test]
fn compilation_is_deterministic() {
    assert_eq!(compile(&greeting_program()).encode(), compile(&greeting_program()).encode());
    assert_eq!(compile(&sum_program()).encode(), compile(&sum_program()).encode());
}

#[test]
fn encoded_module_decodes_to_the_same_module() {
    let compiled = compile(&sum_program());
    let decoded = Module::decode(&compiled.encode()).unwrap();
    assert_eq!(decoded, compiled.module);
}

#[test]
fn every_branch_stays_inside_the_code() {
    let module = compile(&sum_program()).module;
    let length = module.instructions.len() as i32;

    for instruction in &module.instructions {
        if let Some(target) = instruction.branch_target() {
            assert!((0..length).contains(&target), "`{instruction}` leaves the code");
        }
    }

    assert_eq!(module.instructions.last().map(|instruction| instruction.opcode), Some(Opcode::Ret));
}

#[test]
fn globals_and_literals_share_module_data() {
    let module = compile(&sum_program()).module;

    assert_eq!(module.data, vec![
        DataItem::string(8, "$Sys"),
        DataItem::string(16, "done\n"),
    ]);

    // $Sys handle, "$Sys", "done\n", total
    assert_eq!(module.data_size, 32);
    assert_eq!(module.type_descriptors[0].pointer_offsets().collect::<Vec<_>>(), vec![0, 8, 16]);
}

#[test]
fn options_override_the_module_header() {
    let options = CompileOptions {
        module_name: Some("Renamed".into()),
        stack_size: 4096,
    };

    let module = Compiler::new(options).compile(&greeting_program()).unwrap().module;
    assert_eq!(module.name, "Renamed");
    assert_eq!(module.stack_size, 4096);
}

#[test]
fn natives_are_imported_in_program_order() {
    let mut builder = ProgramBuilder::new("clock.go");
    builder.build_function("main", [], None, |builder| {
        let now = builder.call_native("millisec", []);
        builder.call_native_void("sleep", [now]);
        builder.ret();
    });

    let module = compile(&builder.build()).module;
    let names: Vec<_> = module.imports[0].iter().map(|import| import.name.as_str()).collect();
    assert_eq!(names, vec!["print", "millisec", "sleep"]);
}

#[test]
fn skipped_duplicates_reserve_nothing() {
    let mut builder = ProgramBuilder::new("twice.go");
    builder.build_function("main", [], None, |builder| {
        builder.call_void("helper", []);
        builder.ret();
    });
    builder.build_function("helper", [], None, |builder| {
        let text = builder.const_string("first");
        builder.call_native_void("print", [text]);
        builder.ret();
    });
    builder.build_function("helper", [], None, |builder| {
        let text = builder.const_string("second");
        builder.call_native_void("print", [text]);
        let now = builder.call_native("millisec", []);
        builder.call_native_void("sleep", [now]);
        builder.ret();
    });

    let module = compile(&builder.build()).module;
    assert_eq!(module.data, vec![
        DataItem::string(8, "$Sys"),
        DataItem::string(16, "first"),
    ]);
    assert_eq!(module.data_size, 24);

    let names: Vec<_> = module.imports[0].iter().map(|import| import.name.as_str()).collect();
    assert_eq!(names, vec!["print"]);
}

#[test]
fn large_constants_become_long_data() {
    let mut builder = ProgramBuilder::new("big.go");
    builder.build_function("main", [], None, |builder| {
        let _ = builder.const_int(1 << 40);
        let _ = builder.const_int(1 << 40);
        builder.ret();
    });

    let module = compile(&builder.build()).module;
    assert_eq!(module.data, vec![
        DataItem::string(8, "$Sys"),
        DataItem::long(16, 1 << 40),
    ]);
}

#[test]
fn program_from_json() {
    let json = r#"{
        "source-path": "json.go",
        "functions": [
            {
                "name": "main",
                "blocks": [
                    {
                        "instructions": [
                            { "op": "const", "dst": 0, "value": { "string": "from json\n" } },
                            { "op": "call-native", "function": "print", "arguments": [0] },
                            { "op": "return" }
                        ]
                    }
                ]
            }
        ]
    }"#;

    let program: Program = serde_json::from_str(json).unwrap();
    assert_eq!(program.entry, "main");

    let module = compile(&program).module;
    assert_eq!(module.name, "Json");
    assert!(module.data.contains(&DataItem::string(16, "from json\n")));
}
