// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{path::Path, process::{Command, Output}};

use dis::Module;
use pretty_assertions::assert_eq;
use temp_dir::TempDir;

const PROGRAM: &str = r#"{
    "source-path": "prog.go",
    "functions": [
        {
            "name": "main",
            "blocks": [
                {
                    "instructions": [
                        { "op": "const", "dst": 0, "value": { "string": "hi\n" } },
                        { "op": "call-native", "function": "print", "arguments": [0] },
                        { "op": "return" }
                    ]
                }
            ]
        }
    ]
}"#;

fn disc(arguments: &[&str], directory: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_disc"))
        .args(arguments)
        .current_dir(directory)
        .output()
        .unwrap()
}

fn write_program(dir: &TempDir, contents: &str) -> String {
    let path = dir.child("prog.json");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn build_writes_loadable_module() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, PROGRAM);

    let output = disc(&["build", &input], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let bytes = std::fs::read(dir.child("prog.dis")).unwrap();
    let module = Module::decode(&bytes).unwrap();

    assert_eq!(module.name, "Prog");
    assert_eq!(module.links.len(), 1);
    assert_eq!(module.links[0].name, "init");
    assert_eq!(module.validate(), Ok(()));
}

#[test]
fn build_honors_output_flag() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, PROGRAM);
    let target = dir.child("out.dis");

    let output = disc(&["build", &input, "-o", &target.to_string_lossy()], dir.path());

    assert!(output.status.success());
    assert!(target.exists());
    assert!(!dir.child("prog.dis").exists());
}

#[test]
fn dump_prints_disassembly() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, PROGRAM);
    assert!(disc(&["build", &input], dir.path()).status.success());

    let module = dir.child("prog.dis");
    let output = disc(&["dump", &module.to_string_lossy()], dir.path());
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("module Prog"), "{stdout}");
    assert!(stdout.contains("ldt 0"), "{stdout}");
}

#[test]
fn config_next_to_input_is_applied() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, PROGRAM);
    std::fs::write(dir.child("disc.toml"), "[module]\nname = \"Greeter\"\nstack-size = 4096\n").unwrap();

    assert!(disc(&["build", &input], dir.path()).status.success());

    let module = Module::decode(&std::fs::read(dir.child("prog.dis")).unwrap()).unwrap();
    assert_eq!(module.name, "Greeter");
    assert_eq!(module.stack_size, 4096);
}

#[test]
fn missing_entry_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, &PROGRAM.replace("\"main\"", "\"start\""));

    let output = disc(&["build", &input], dir.path());
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("entry function `main` is not defined"), "{stderr}");
    assert!(!dir.child("prog.dis").exists());
}

#[test]
fn invalid_json_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_program(&dir, "{ \"functions\": 3 }");

    let output = disc(&["build", &input], dir.path());

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("is not a valid program"));
}
