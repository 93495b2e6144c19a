use std::fs;
use std::path::{Path, PathBuf};

use assembler::*;

fn get_test_input_file_name(relative_to_manifest: &str) -> PathBuf {
    let mut location = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    location.push(relative_to_manifest);
    if location.exists() {
        location
    } else {
        panic!(
            "Cannot find input {relative_to_manifest}: {} does not exist",
            location.display()
        );
    }
}

fn get_temp_output_file_name(suffix: &str) -> tempfile::TempPath {
    tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("should be able to create a temporary file")
        .into_temp_path()
}

fn words_to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

fn must_read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("should be able to read {}: {e}", path.display()))
}

const PRIMARY_BASELINE: AssemblyOptions = AssemblyOptions {
    profile: Profile::Baseline,
    role: Role::Primary,
};

#[test]
fn golden_output_assembling_hello_program() {
    let input = get_test_input_file_name("testdata/hello.asm");
    let object = get_temp_output_file_name(".obj");
    let symbols = get_temp_output_file_name(".sym");
    let hex = get_temp_output_file_name(".hex");
    let outputs = OutputOptions {
        list: false,
        symbols: Some(symbols.to_path_buf()),
        hex: Some(hex.to_path_buf()),
    };
    if let Err(e) = assemble_file(&input, &object, &PRIMARY_BASELINE, &outputs) {
        panic!("failed to assemble {}: {e}", input.display());
    }

    let expected: Vec<u16> = vec![
        0x3000, 0xE002, 0xF022, 0xF025, 0x0048, 0x0065, 0x006C, 0x006C, 0x006F, 0x002C, 0x0020,
        0x0057, 0x006F, 0x0072, 0x006C, 0x0064, 0x0021, 0x0000,
    ];
    assert_eq!(must_read(&object), words_to_bytes(&expected));
    assert_eq!(must_read(&symbols), b"msg = 3003\n".to_vec());
    assert_eq!(
        String::from_utf8(must_read(&hex)).expect("hex listing should be text"),
        concat!(
            "3000 E002 F022 F025 0048 0065 006C 006C\n",
            "006F 002C 0020 0057 006F 0072 006C 0064\n",
            "0021 0000\n"
        )
    );
}

#[test]
fn golden_output_assembling_compact_program() {
    let input = get_test_input_file_name("testdata/countdown.asm");
    let object = get_temp_output_file_name(".obj");
    let options = AssemblyOptions {
        profile: Profile::Compact,
        role: Role::Primary,
    };
    if let Err(e) = assemble_file(&input, &object, &options, &OutputOptions::default()) {
        panic!("failed to assemble {}: {e}", input.display());
    }
    let expected: Vec<u16> = vec![
        0x3000, 0x2005, 0x3801, 0x2800, 0xD1FD, 0x4901, 0xDF00, 0xFFFF,
    ];
    assert_eq!(must_read(&object), words_to_bytes(&expected));
}

#[test]
fn compact_program_needs_prologue_unless_library() {
    let source = fs::read_to_string(get_test_input_file_name("testdata/countdown.asm"))
        .expect("should be able to read test input");
    let without_prologue: String = source
        .lines()
        .filter(|line| !line.contains(".text") && !line.contains(".global"))
        .map(|line| format!("{line}\n"))
        .collect();
    let primary = AssemblyOptions {
        profile: Profile::Compact,
        role: Role::Primary,
    };
    let library = AssemblyOptions {
        profile: Profile::Compact,
        role: Role::Library,
    };
    assert!(assemble(&without_prologue, &primary).is_err());
    let assembly = assemble(&without_prologue, &library).expect("library code needs no prologue");
    assert_eq!(assembly.binary().words()[0], 0x2005);
}

#[test]
fn broken_program_reports_every_error() {
    let input = get_test_input_file_name("testdata/broken.asm");
    let object = get_temp_output_file_name(".obj");
    match assemble_file(&input, &object, &PRIMARY_BASELINE, &OutputOptions::default()) {
        Err(AssemblerFailure::BadInput { diagnostics, .. }) => {
            let lines: Vec<Option<LineNumber>> = diagnostics.iter().map(Diagnostic::line).collect();
            assert_eq!(lines, vec![Some(1), Some(2)]);
            assert!(matches!(
                diagnostics[0].kind(),
                ErrorKind::ImmediateOutOfRange { .. }
            ));
            assert_eq!(
                diagnostics[1].kind(),
                &ErrorKind::UnknownLabel("missing".to_string())
            );
        }
        Err(e) => panic!("expected the program to be rejected, got {e}"),
        Ok(()) => panic!("expected the program to be rejected"),
    }
}

#[test]
fn missing_input_is_an_io_failure() {
    let object = get_temp_output_file_name(".obj");
    let input = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/no-such-file.asm");
    match assemble_file(&input, &object, &PRIMARY_BASELINE, &OutputOptions::default()) {
        Err(AssemblerFailure::Io(IoFailed {
            action: IoAction::Read,
            ..
        })) => (),
        Err(e) => panic!("expected a read failure, got {e}"),
        Ok(()) => panic!("expected a read failure"),
    }
}
