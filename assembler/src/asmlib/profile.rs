//! The instruction sets the assembler understands.
//!
//! The driver, tokenizer and symbol table are shared; everything
//! which differs between the two instruction sets is behind the
//! [`InstructionSet`] trait.
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use super::lexer::{shape_of, Shape};
use super::operand::{parse_register, FieldResult, RegisterNames};
use super::symtab::Resolver;
use super::types::{Arity, ErrorKind};

mod baseline;
mod compact;

pub(crate) use baseline::Baseline;
pub(crate) use compact::Compact;

/// The label which the compressed-register instruction set requires
/// user programs to define as their entry point.
pub(crate) const ENTRY_SYMBOL: &str = "_start";

/// A line which must appear, in order, immediately after `.orig` in
/// a user program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrologueLine {
    Text,
    GlobalEntry,
    EntryLabel,
}

impl PrologueLine {
    pub(crate) fn expected(self) -> &'static str {
        match self {
            PrologueLine::Text => ".text",
            PrologueLine::GlobalEntry => ".global _start",
            PrologueLine::EntryLabel => "_start:",
        }
    }

    /// `line` is the normalized line and `tokens` its tokens.
    pub(crate) fn matches(self, line: &str, tokens: &[String]) -> bool {
        match self {
            PrologueLine::Text => tokens == [".text"],
            PrologueLine::GlobalEntry => tokens == [".global", ENTRY_SYMBOL],
            PrologueLine::EntryLabel => line
                .strip_prefix(ENTRY_SYMBOL)
                .is_some_and(|rest| rest.trim_start().starts_with(':')),
        }
    }
}

/// One row of an instruction set's opcode table.
#[derive(Debug)]
pub(crate) struct OpcodeSpec<F: 'static> {
    pub(crate) mnemonic: &'static str,
    /// The bits which are fixed for this mnemonic.
    pub(crate) bits: u16,
    pub(crate) arity: Arity,
    pub(crate) format: F,
}

impl<F> OpcodeSpec<F> {
    pub(crate) const fn new(mnemonic: &'static str, bits: u16, arity: Arity, format: F) -> Self {
        OpcodeSpec {
            mnemonic,
            bits,
            arity,
            format,
        }
    }
}

pub(crate) fn lookup<F>(table: &'static [OpcodeSpec<F>], mnemonic: &str) -> Option<&'static OpcodeSpec<F>> {
    table.iter().find(|spec| spec.mnemonic == mnemonic)
}

pub(crate) fn check_arity(name: &str, expected: Arity, operands: &[String]) -> FieldResult<()> {
    if expected.accepts(operands.len()) {
        Ok(())
    } else {
        Err(ErrorKind::OperandCount {
            name: name.to_string(),
            expected,
            found: operands.len(),
        })
    }
}

pub(crate) trait InstructionSet: Sync {
    fn register_names(&self) -> RegisterNames;

    fn is_mnemonic(&self, name: &str) -> bool;

    /// Assemble the instruction `mnemonic` located at offset `pc`.
    fn encode(
        &self,
        mnemonic: &str,
        operands: &[String],
        pc: usize,
        resolver: &mut Resolver<'_>,
    ) -> FieldResult<u16>;

    /// Whether instructions and data must be kept in separate
    /// sections.
    fn has_sections(&self) -> bool {
        false
    }

    /// Lines which user programs must start with (after `.orig`).
    fn prologue(&self) -> &'static [PrologueLine] {
        &[]
    }

    fn is_register_name(&self, name: &str) -> bool {
        match shape_of(name) {
            Some(Shape::LowRegister | Shape::HighRegister | Shape::Name) => {
                parse_register(name, self.register_names()).is_ok()
            }
            _ => false,
        }
    }
}

/// Selects an instruction set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Profile {
    /// The baseline 16-bit instruction set.
    #[default]
    Baseline,
    /// The compressed-register instruction set, with high registers
    /// and separate text and data sections.
    Compact,
}

static BASELINE: Baseline = Baseline;
static COMPACT: Compact = Compact;

impl Profile {
    pub(crate) fn instruction_set(self) -> &'static dyn InstructionSet {
        match self {
            Profile::Baseline => &BASELINE,
            Profile::Compact => &COMPACT,
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Baseline => "baseline",
            Profile::Compact => "compact",
        })
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Profile, String> {
        match s {
            "baseline" => Ok(Profile::Baseline),
            "compact" => Ok(Profile::Compact),
            other => Err(format!("unknown instruction set profile '{other}'")),
        }
    }
}
