//! Integration tests for the class file format

use grove_bytecode::{verify_class, BytecodeWriter, ClassFile, ClassFileError, Method, Opcode};

fn script_class() -> ClassFile {
    let mut class = ClassFile::new("settings_7f3c", Some("groovy.lang.Script".to_string()));
    let greeting = class.constants.add_string("hello");
    let println = class.constants.add_string("println");
    let answer = class.constants.add_integer(42);

    let mut run = BytecodeWriter::new();
    run.emit_indexed(Opcode::ConstStr, greeting);
    run.emit_invoke(Opcode::InvokeMethod, println, 1);
    run.emit_opcode(Opcode::Pop);
    run.emit_opcode(Opcode::ReturnNull);

    let mut answer_method = BytecodeWriter::new();
    answer_method.emit_indexed(Opcode::ConstInt, answer);
    answer_method.emit_load_local(0);
    answer_method.emit_opcode(Opcode::Add);
    answer_method.emit_opcode(Opcode::Return);

    class.methods.push(Method {
        name: "run".to_string(),
        param_count: 0,
        local_count: 0,
        line: 1,
        code: run.into_bytes(),
    });
    class.methods.push(Method {
        name: "answer".to_string(),
        param_count: 1,
        local_count: 1,
        line: 3,
        code: answer_method.into_bytes(),
    });
    class
}

#[test]
fn test_encode_verify_decode() {
    let class = script_class();
    verify_class(&class).expect("class should verify");

    let decoded = ClassFile::decode(&class.encode()).expect("Failed to decode");
    verify_class(&decoded).expect("decoded class should verify");

    assert_eq!(decoded.name, "settings_7f3c");
    assert_eq!(decoded.super_name.as_deref(), Some("groovy.lang.Script"));
    assert_eq!(decoded.methods.len(), 2);
    assert_eq!(decoded.method("answer").map(|m| m.param_count), Some(1));
}

#[test]
fn test_source_file_attribute_survives_encoding() {
    let mut class = script_class();
    class.source_file = Some("/projects/demo/settings.gradle".to_string());

    let decoded = ClassFile::decode(&class.encode()).unwrap();
    assert_eq!(
        decoded.source_file.as_deref(),
        Some("/projects/demo/settings.gradle")
    );
}

#[test]
fn test_source_file_changes_checksum() {
    let plain = script_class().encode();
    let mut stamped = script_class();
    stamped.source_file = Some("build.gradle".to_string());
    let stamped = stamped.encode();

    assert_ne!(plain[12..16], stamped[12..16]);
}

#[test]
fn test_garbage_is_rejected() {
    let result = ClassFile::decode(b"not a class file at all");
    assert!(matches!(result, Err(ClassFileError::InvalidMagic(_))));
}
