use std::error::Error;
use std::ffi::OsStr;
use std::fmt::{self, Display, Formatter};
use std::io::Error as IoError;
use std::path::PathBuf;

use base::prelude::{Address, Field};

use super::diagnostics::Diagnostic;

/// Zero-based index of a line within the source text.  Messages
/// show it counting from 1.
pub type LineNumber = usize;

/// How many operands a mnemonic or directive takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
}

impl Arity {
    pub(crate) fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == *k,
            Arity::Between(lo, hi) => (*lo..=*hi).contains(&n),
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(1) => f.write_str("1 operand"),
            Arity::Exactly(n) => write!(f, "{n} operands"),
            Arity::Between(lo, hi) if hi - lo == 1 => write!(f, "{lo} or {hi} operands"),
            Arity::Between(lo, hi) => write!(f, "between {lo} and {hi} operands"),
        }
    }
}

/// Everything that can be wrong with a program.
///
/// Field-level parsing returns `Result<T, ErrorKind>`; the driver
/// attaches a location to make a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    EmptySource,
    MissingOrigin,
    DuplicateOrigin,
    OperandCount {
        name: String,
        expected: Arity,
        found: usize,
    },
    UnknownMnemonic(String),
    InvalidSymbol(String),
    DuplicateLabel(String),
    MalformedImmediate(String),
    ImmediateOutOfRange {
        token: String,
        field: Field,
    },
    MalformedRegister(String),
    MalformedOperand {
        token: String,
        expected: &'static str,
    },
    UnknownLabel(String),
    LabelOutOfRange {
        label: String,
        offset: i64,
        field: Field,
    },
    MalformedString(String),
    EmptyString,
    ValueTooLarge(u32),
    ProgramTooLarge {
        start: Address,
        length: usize,
    },
    MissingLineInfo,
    MissingPrologue {
        expected: &'static str,
    },
    DataInTextSection(String),
    InstructionInDataSection(String),
    SectionOrder(String),
    MissingEnd,
}

impl ErrorKind {
    /// Some problems leave the rest of the program meaningless, so
    /// the scan stops when one of these is found.
    pub(crate) fn aborts_scan(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptySource
                | ErrorKind::MissingOrigin
                | ErrorKind::MissingPrologue { .. }
                | ErrorKind::SectionOrder(_)
        )
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::EmptySource => f.write_str("source file is empty"),
            ErrorKind::MissingOrigin => {
                f.write_str("the first line of the program must be a .orig directive with one operand")
            }
            ErrorKind::DuplicateOrigin => f.write_str(".orig may only appear once"),
            ErrorKind::OperandCount {
                name,
                expected,
                found,
            } => write!(f, "{name} expects {expected} but {found} were given"),
            ErrorKind::UnknownMnemonic(name) => {
                write!(f, "'{name}' is not a known instruction or directive")
            }
            ErrorKind::InvalidSymbol(name) => write!(f, "'{name}' is not a valid label name"),
            ErrorKind::DuplicateLabel(name) => {
                write!(f, "label '{name}' has already been defined")
            }
            ErrorKind::MalformedImmediate(token) => {
                write!(f, "'{token}' is not a valid numeric value")
            }
            ErrorKind::ImmediateOutOfRange { token, field } => {
                let range = field.range();
                write!(
                    f,
                    "{token} does not fit in a {field} field (the range is {} to {})",
                    range.start(),
                    range.end()
                )
            }
            ErrorKind::MalformedRegister(token) => write!(f, "'{token}' is not a valid register"),
            ErrorKind::MalformedOperand { token, expected } => {
                write!(f, "expected {expected} but found '{token}'")
            }
            ErrorKind::UnknownLabel(name) => write!(f, "label '{name}' is not defined"),
            ErrorKind::LabelOutOfRange {
                label,
                offset,
                field,
            } => write!(
                f,
                "label '{label}' is {offset} words away, which does not fit in a {field} offset"
            ),
            ErrorKind::MalformedString(literal) => {
                write!(f, "{literal} is not a valid string literal")
            }
            ErrorKind::EmptyString => f.write_str("string literal is empty"),
            ErrorKind::ValueTooLarge(value) => {
                write!(f, "value {value:#X} does not fit in a 16-bit word")
            }
            ErrorKind::ProgramTooLarge { start, length } => write!(
                f,
                "program of {length} words starting at {start} extends past the end of memory"
            ),
            ErrorKind::MissingLineInfo => {
                f.write_str("no source line is recorded for a deferred label reference")
            }
            ErrorKind::MissingPrologue { expected } => {
                write!(f, "expected '{expected}' here; programs must begin with .orig, .text, .global _start and _start:")
            }
            ErrorKind::DataInTextSection(name) => {
                write!(f, "{name} places data in the .text section")
            }
            ErrorKind::InstructionInDataSection(name) => {
                write!(f, "instruction '{name}' appears in the .data section")
            }
            ErrorKind::SectionOrder(name) => write!(
                f,
                "{name} would interleave the .text and .data sections; text must come before data"
            ),
            ErrorKind::MissingEnd => f.write_str("program has no .end directive"),
        }
    }
}

impl Error for ErrorKind {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoAction {
    Read,
    Write,
}

impl Display for IoAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IoAction::Read => "read",
            IoAction::Write => "write",
        })
    }
}

#[derive(Debug)]
pub struct IoFailed {
    pub action: IoAction,
    pub target: PathBuf,
    pub error: IoError,
}

impl Display for IoFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to {} {}: {}",
            self.action,
            self.target.display(),
            self.error
        )
    }
}

#[derive(Debug)]
pub enum AssemblerFailure {
    Io(IoFailed),
    BadInput {
        filename: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },
}

fn write_os_string(f: &mut Formatter<'_>, s: &OsStr) -> Result<(), fmt::Error> {
    match s.to_str() {
        Some(unicode_name) => f.write_str(unicode_name),
        None => write!(
            f,
            "{} (some non-Unicode characters changed to make it printable)",
            s.to_string_lossy(),
        ),
    }
}

impl Display for AssemblerFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            AssemblerFailure::Io(failed) => failed.fmt(f),
            AssemblerFailure::BadInput {
                filename,
                diagnostics,
            } => {
                f.write_str("failed to assemble ")?;
                write_os_string(f, filename.as_os_str())?;
                let errors = diagnostics.iter().filter(|d| d.is_error()).count();
                write!(f, ": {errors} error(s)")
            }
        }
    }
}

impl Error for AssemblerFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssemblerFailure::Io(failed) => Some(&failed.error),
            AssemblerFailure::BadInput { .. } => None,
        }
    }
}
