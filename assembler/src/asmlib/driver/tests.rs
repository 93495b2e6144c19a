use base::prelude::Address;

use super::super::diagnostics::Location;
use super::super::types::ErrorKind;
use super::*;

const BASELINE: AssemblyOptions = AssemblyOptions {
    profile: Profile::Baseline,
    role: Role::Primary,
};

const COMPACT: AssemblyOptions = AssemblyOptions {
    profile: Profile::Compact,
    role: Role::Primary,
};

const COMPACT_LIBRARY: AssemblyOptions = AssemblyOptions {
    profile: Profile::Compact,
    role: Role::Library,
};

fn assemble_valid(source: &str, options: &AssemblyOptions) -> Assembly {
    match assemble(source, options) {
        Ok(assembly) => assembly,
        Err(failed) => panic!(
            "expected {source:?} to assemble, but it failed:\n{}",
            render(failed.diagnostics())
        ),
    }
}

fn error_kinds(source: &str, options: &AssemblyOptions) -> Vec<ErrorKind> {
    match assemble(source, options) {
        Ok(_) => panic!("expected {source:?} to fail"),
        Err(failed) => failed
            .diagnostics()
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.kind().clone())
            .collect(),
    }
}

#[test]
fn test_add_and_halt() {
    let assembly = assemble_valid(".orig x3000\nadd r0, r1, r2\nhalt\n.end", &BASELINE);
    assert_eq!(assembly.binary().image(), vec![0x3000, 0x1042, 0xF025]);
    assert!(assembly.warnings().is_empty());
    let lines: Vec<(Address, &str)> = assembly
        .source_lines()
        .iter()
        .map(|(a, s)| (*a, s.as_str()))
        .collect();
    assert_eq!(
        lines,
        vec![
            (Address::new(0x3000), "add r0, r1, r2"),
            (Address::new(0x3001), "halt"),
        ]
    );
}

#[test]
fn test_forward_branch() {
    let assembly = assemble_valid(".orig x3000\nbrnzp L1\nL1: halt\n.end", &BASELINE);
    assert_eq!(assembly.binary().words(), &[0x0E00, 0xF025]);
    assert_eq!(assembly.symbols().to_string(), "l1 = 3001\n");
}

#[test]
fn test_forward_and_backward_references_agree() {
    let forward = assemble_valid(
        ".orig x3000\nbr skip\nadd r0, r0, #1\nskip halt\n.end",
        &BASELINE,
    );
    assert_eq!(forward.binary().words(), &[0x0E01, 0x1021, 0xF025]);
    let backward = assemble_valid(".orig x3000\ntop add r0, r0, #1\nbr top\n.end", &BASELINE);
    assert_eq!(backward.binary().words(), &[0x1021, 0x0FFE]);
}

#[test]
fn test_blkw_with_value() {
    let assembly = assemble_valid(".orig x3000\n.blkw #3 x0420\nhalt\n.end", &BASELINE);
    assert_eq!(
        assembly.binary().words(),
        &[0x0420, 0x0420, 0x0420, 0xF025]
    );
    // Data words have no source line.
    assert_eq!(
        assembly.source_lines().keys().copied().collect::<Vec<_>>(),
        vec![Address::new(0x3003)]
    );
}

#[test]
fn test_fill_with_forward_label() {
    let assembly = assemble_valid(".orig x3000\n.fill data\ndata .fill #-1\n.end", &BASELINE);
    assert_eq!(assembly.binary().words(), &[0x3001, 0xFFFF]);
}

#[test]
fn test_stringz() {
    let assembly = assemble_valid(".orig x3000\nmsg .stringz \"Hi; there\"\n.end", &BASELINE);
    assert_eq!(
        assembly.binary().words(),
        &[72, 105, 59, 32, 116, 104, 101, 114, 101, 0]
    );
}

#[test]
fn test_unknown_label_is_reported_once() {
    let failed = match assemble(".orig x3000\nlea r0, NOPE\n.end", &BASELINE) {
        Ok(_) => panic!("an unknown label should cause failure"),
        Err(failed) => failed,
    };
    assert_eq!(failed.diagnostics().len(), 1);
    let diagnostic = &failed.diagnostics()[0];
    assert_eq!(diagnostic.kind(), &ErrorKind::UnknownLabel("nope".to_string()));
    assert_eq!(
        diagnostic.location(),
        &Location::Line {
            number: 1,
            text: "lea r0, NOPE".to_string()
        }
    );
    // The image is still built, with a zero in place of the
    // instruction.
    assert_eq!(failed.image().map(Binary::words), Some(&[0][..]));
}

#[test]
fn test_empty_string_literal() {
    assert_eq!(
        error_kinds(".orig x3000\n.stringz \"\"\n.end", &BASELINE),
        vec![ErrorKind::EmptyString]
    );
}

#[test]
fn test_label_out_of_range() {
    let kinds = error_kinds(".orig x3000\nbr far\n.blkw #300\nfar halt\n.end", &BASELINE);
    assert_eq!(
        kinds,
        vec![ErrorKind::LabelOutOfRange {
            label: "far".to_string(),
            offset: 300,
            field: base::prelude::Field::signed(9),
        }]
    );
    let kinds = error_kinds(".orig x3000\nnear halt\n.blkw #256\nbr near\n.end", &BASELINE);
    assert!(matches!(
        kinds.as_slice(),
        [ErrorKind::LabelOutOfRange { offset: -258, .. }]
    ));
}

#[test]
fn test_branch_offset_limits() {
    // Forward: the displacement is the number of words skipped.
    let forward = |skipped: u32| format!(".orig x3000\nbr far\n.blkw #{skipped}\nfar halt\n.end");
    let assembly = assemble_valid(&forward(255), &BASELINE);
    assert_eq!(assembly.binary().words()[0], 0x0EFF);
    assert!(matches!(
        error_kinds(&forward(256), &BASELINE).as_slice(),
        [ErrorKind::LabelOutOfRange { offset: 256, .. }]
    ));

    // Backward: the branch is reached after `skipped` words, and the
    // displacement counts from the word after the branch.
    let backward = |skipped: u32| format!(".orig x3000\nnear halt\n.blkw #{skipped}\nbr near\n.end");
    let assembly = assemble_valid(&backward(254), &BASELINE);
    assert_eq!(assembly.binary().words()[255], 0x0F00);
    assert!(matches!(
        error_kinds(&backward(255), &BASELINE).as_slice(),
        [ErrorKind::LabelOutOfRange { offset: -257, .. }]
    ));
}

#[test]
fn test_assembly_is_idempotent() {
    let source = ".orig x3000\nloop add r1, r1, #-1\nbrp loop\nlea r0, msg\nputs\nhalt\nmsg .stringz \"done\"\n.end\n";
    let first = assemble_valid(source, &BASELINE);
    let second = assemble_valid(source, &BASELINE);
    assert_eq!(first, second);
    assert_eq!(first.binary().to_be_bytes(), second.binary().to_be_bytes());
}

#[test]
fn test_empty_source() {
    assert_eq!(error_kinds("", &BASELINE), vec![ErrorKind::EmptySource]);
    assert_eq!(
        error_kinds("   \n; only a comment\n", &BASELINE),
        vec![ErrorKind::EmptySource]
    );
}

#[test]
fn test_missing_origin_stops_the_scan() {
    assert_eq!(
        error_kinds("add r0, r0, r0\nbogus bogus\n", &BASELINE),
        vec![ErrorKind::MissingOrigin]
    );
    assert!(matches!(
        error_kinds(".orig x3g00\nhalt\n", &BASELINE).as_slice(),
        [ErrorKind::MalformedImmediate(_)]
    ));
}

#[test]
fn test_all_errors_are_reported() {
    let kinds = error_kinds(
        ".orig x3000\nadd r0, r1\nfrobnicate r1\nx10 halt\nloop halt\nloop halt\n.orig x4000\n.end",
        &BASELINE,
    );
    assert_eq!(kinds.len(), 5);
    assert!(matches!(kinds[0], ErrorKind::OperandCount { .. }));
    assert_eq!(kinds[1], ErrorKind::UnknownMnemonic("frobnicate".to_string()));
    assert_eq!(kinds[2], ErrorKind::InvalidSymbol("x10".to_string()));
    assert_eq!(kinds[3], ErrorKind::DuplicateLabel("loop".to_string()));
    assert_eq!(kinds[4], ErrorKind::DuplicateOrigin);
}

#[test]
fn test_missing_end_is_a_warning() {
    let assembly = assemble_valid(".orig x3000\nhalt\n", &BASELINE);
    assert_eq!(assembly.binary().words(), &[0xF025]);
    assert_eq!(assembly.warnings().len(), 1);
    assert_eq!(assembly.warnings()[0].kind(), &ErrorKind::MissingEnd);
}

#[test]
fn test_lines_after_end_are_ignored() {
    let assembly = assemble_valid(".orig x3000\nhalt\n.end\nthis is not assembled\n", &BASELINE);
    assert_eq!(assembly.binary().words(), &[0xF025]);
}

#[test]
fn test_program_too_large() {
    let kinds = error_kinds(".orig xFFFF\nhalt\nhalt\n.end", &BASELINE);
    assert_eq!(
        kinds,
        vec![ErrorKind::ProgramTooLarge {
            start: Address::new(0xFFFF),
            length: 2
        }]
    );
}

#[test]
fn test_value_too_large_becomes_zero() {
    let failed = match assemble(".orig xFFFF\n.fill past\npast .end", &BASELINE) {
        Ok(_) => panic!("the address of 'past' does not fit in a word"),
        Err(failed) => failed,
    };
    assert!(failed
        .diagnostics()
        .iter()
        .any(|d| d.kind() == &ErrorKind::ValueTooLarge(0x1_0000)
            && d.location()
                == &Location::Line {
                    number: 1,
                    text: ".fill past".to_string()
                }));
    assert_eq!(failed.image().map(Binary::words), Some(&[0][..]));
}

#[test]
fn test_oversized_character_is_reported_at_its_line() {
    let failed = match assemble(".orig x3000\nhalt\n.stringz \"a\u{1F600}\"\n.end", &BASELINE) {
        Ok(_) => panic!("a character outside the 16-bit range cannot be stored"),
        Err(failed) => failed,
    };
    assert_eq!(failed.diagnostics().len(), 1);
    let diagnostic = &failed.diagnostics()[0];
    assert_eq!(diagnostic.kind(), &ErrorKind::ValueTooLarge(0x1F600));
    assert_eq!(diagnostic.line(), Some(2));
    assert_eq!(
        failed.image().map(Binary::words),
        Some(&[0xF025, 97, 0, 0][..])
    );
}

#[test]
fn test_failed_data_keeps_its_place() {
    let failed = match assemble(".orig x3000\n.fill #99999\nhalt\n.end", &BASELINE) {
        Ok(_) => panic!("99999 does not fit in a word"),
        Err(failed) => failed,
    };
    assert_eq!(failed.image().map(Binary::words), Some(&[0, 0xF025][..]));

    let failed = match assemble(
        ".orig x3000\n.blkw #2 #99999\nlea r0, msg\nmsg .fill #1\n.end",
        &BASELINE,
    ) {
        Ok(_) => panic!("99999 does not fit in a word"),
        Err(failed) => failed,
    };
    assert_eq!(failed.diagnostics().len(), 1);
    // msg is still at x3003, so the lea is assembled with offset 0.
    assert_eq!(
        failed.image().map(Binary::words),
        Some(&[0, 0, 0xE000, 1][..])
    );
}

#[test]
fn test_misspelled_mnemonic_after_label() {
    assert_eq!(
        error_kinds(".orig x3000\nloop: hlat\nbr loop\n.end", &BASELINE),
        vec![ErrorKind::UnknownMnemonic("hlat".to_string())]
    );
    let failed = match assemble(".orig x3000\nloop hlat\nbr loop\n.end", &BASELINE) {
        Ok(_) => panic!("hlat is not an instruction"),
        Err(failed) => failed,
    };
    assert_eq!(failed.image().map(Binary::words), Some(&[0, 0x0FFE][..]));
}

#[test]
fn test_misspelled_mnemonic_with_operands() {
    assert_eq!(
        error_kinds(".orig x3000\nfrobnicate r1\nadd r0, r1, #-1\nhalt\n.end", &BASELINE),
        vec![ErrorKind::UnknownMnemonic("frobnicate".to_string())]
    );
    assert_eq!(
        error_kinds(".orig x3000\nfrobnicate #3\nhalt\n.end", &BASELINE),
        vec![ErrorKind::UnknownMnemonic("frobnicate".to_string())]
    );
}

#[test]
fn test_baseline_has_no_sections() {
    assert_eq!(
        error_kinds(".orig x3000\n.text\nhalt\n.end", &BASELINE),
        vec![ErrorKind::UnknownMnemonic(".text".to_string())]
    );
}

const COMPACT_PROGRAM: &str = "\
        .orig x3000
        .text
        .global _start
_start: mov r0, #1
        b done
        push {r4, lr}
done:   swi #0
        .data
msg:    .stringz \"hi\"
        .end
";

#[test]
fn test_compact_program() {
    let assembly = assemble_valid(COMPACT_PROGRAM, &COMPACT);
    assert_eq!(
        assembly.binary().words(),
        &[0x2001, 0xE001, 0xB510, 0xDF00, 104, 105, 0]
    );
    assert_eq!(
        assembly.symbols().to_string(),
        "_start = 3000\ndone = 3003\nmsg = 3004\n"
    );
}

#[test]
fn test_compact_prologue_is_required() {
    assert_eq!(
        error_kinds(".orig x3000\nmov r0, #1\n.end", &COMPACT),
        vec![ErrorKind::MissingPrologue { expected: ".text" }]
    );
    assert_eq!(
        error_kinds(".orig x3000\n.text\n.global main\nmain: mov r0, #1\n.end", &COMPACT),
        vec![ErrorKind::MissingPrologue {
            expected: ".global _start"
        }]
    );
    assert_eq!(
        error_kinds(".orig x3000\n.text\n", &COMPACT),
        vec![ErrorKind::MissingPrologue {
            expected: ".global _start"
        }]
    );
}

#[test]
fn test_library_code_needs_no_prologue() {
    let assembly = assemble_valid(".orig x0200\nmov r0, #1\n.end", &COMPACT_LIBRARY);
    assert_eq!(assembly.binary().image(), vec![0x0200, 0x2001]);
}

#[test]
fn test_section_discipline() {
    assert_eq!(
        error_kinds(".orig x0\n.fill #1\nmov r0, #1\n.end", &COMPACT_LIBRARY),
        vec![ErrorKind::DataInTextSection(".fill".to_string())]
    );
    assert_eq!(
        error_kinds(".orig x0\n.data\nmov r0, #1\n.end", &COMPACT_LIBRARY),
        vec![ErrorKind::InstructionInDataSection("mov".to_string())]
    );
}

#[test]
fn test_text_after_data_stops_the_scan() {
    assert_eq!(
        error_kinds(
            ".orig x0\n.data\n.fill #1\n.text\nbogus bogus\n.end",
            &COMPACT_LIBRARY
        ),
        vec![ErrorKind::SectionOrder(".text".to_string())]
    );
}

#[test]
fn test_register_names_are_not_labels() {
    assert_eq!(
        error_kinds(".orig x0\nsp: mov r0, #1\n.end", &COMPACT_LIBRARY),
        vec![ErrorKind::InvalidSymbol("sp".to_string())]
    );
}
