//! Disassembler tests

use vectorvm_exec::{
    BytecodeBuilder, BytecodeReader, ExternalFunction, FunctionTable, Src, decode_instruction,
    disassemble, format_instruction,
};
use vectorvm_foundation::RegisterId;

fn functions() -> FunctionTable {
    let mut table = FunctionTable::new();
    table.push(ExternalFunction::new("lookup", 1, 2, |_| Ok(())).with_user_ptr());
    table
}

#[test]
fn listing_has_one_line_per_instruction() {
    let code = BytecodeBuilder::new()
        .exec_index(RegisterId(0))
        .acquire_id(0, RegisterId(1), RegisterId(2))
        .update_id(0, RegisterId(1), RegisterId(0))
        .done()
        .build()
        .unwrap();
    let listing = disassemble(&code, &FunctionTable::new()).unwrap();
    let mnemonics: Vec<&str> = listing
        .lines()
        .map(|line| line.split_whitespace().nth(1).unwrap())
        .collect();
    assert_eq!(mnemonics, vec!["exec_index", "acquire_id", "update_id", "done"]);
    assert!(listing.starts_with("0000  exec_index -> r0"));
}

#[test]
fn external_calls_show_function_and_user_ptr() {
    let code = BytecodeBuilder::new()
        .external_call(0, Some(0), &[Src::Reg(RegisterId(3))], &[RegisterId(1), RegisterId(2)])
        .done()
        .build()
        .unwrap();
    let mut reader = BytecodeReader::new(&code);
    let ins = decode_instruction(&mut reader, &functions()).unwrap();
    let line = format_instruction(&ins);

    assert!(line.contains("external_func_call"));
    assert!(line.contains("fn0"));
    assert!(line.contains("user0"));
    assert!(line.ends_with("-> r1, r2"));
}

#[test]
fn garbage_is_reported() {
    assert!(disassemble(&[0xFE], &FunctionTable::new()).is_err());
}
