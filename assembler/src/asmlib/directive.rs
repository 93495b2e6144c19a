//! Assembler directives, and the words the data directives produce.
use base::prelude::{Address, Field};

use super::operand::{parse_immediate, parse_number, string_to_codes, FieldResult};
use super::symtab::Resolver;
use super::types::{Arity, ErrorKind};

pub(crate) const DIRECTIVE_PREFIX: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Directive {
    /// Sets the address at which the program is loaded.
    Orig,
    /// Stops the scan.
    End,
    /// One word, given by a number or a label.
    Fill,
    /// A number of copies of a word.
    Blkw,
    /// A null-terminated string, one character per word.
    Stringz,
    /// Selects the section holding instructions.
    Text,
    /// Selects the section holding data.
    Data,
    /// Names the program's entry point.
    Global,
}

const ALL: [Directive; 8] = [
    Directive::Orig,
    Directive::End,
    Directive::Fill,
    Directive::Blkw,
    Directive::Stringz,
    Directive::Text,
    Directive::Data,
    Directive::Global,
];

impl Directive {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Directive::Orig => ".orig",
            Directive::End => ".end",
            Directive::Fill => ".fill",
            Directive::Blkw => ".blkw",
            Directive::Stringz => ".stringz",
            Directive::Text => ".text",
            Directive::Data => ".data",
            Directive::Global => ".global",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Directive> {
        ALL.into_iter().find(|d| d.name() == name)
    }

    pub(crate) fn arity(self) -> Arity {
        match self {
            Directive::End | Directive::Text | Directive::Data => Arity::Exactly(0),
            Directive::Orig | Directive::Fill | Directive::Stringz | Directive::Global => {
                Arity::Exactly(1)
            }
            Directive::Blkw => Arity::Between(1, 2),
        }
    }

    /// Directives only understood by instruction sets which divide
    /// the program into sections.
    pub(crate) fn needs_sections(self) -> bool {
        matches!(self, Directive::Text | Directive::Data | Directive::Global)
    }
}

pub(crate) fn parse_origin(operands: &[String]) -> FieldResult<Address> {
    match operands {
        [start] => parse_immediate(start, Field::WORD).map(Address::from),
        _ => Err(ErrorKind::MissingOrigin),
    }
}

/// Produce the words for a data directive.  Operand counts have
/// already been checked.
pub(crate) fn encode_data(
    directive: Directive,
    operands: &[String],
    resolver: &mut Resolver<'_>,
) -> FieldResult<Vec<u32>> {
    match (directive, operands) {
        (Directive::Fill, [value]) => Ok(vec![resolver.word_value(value)?]),
        (Directive::Blkw, [count]) => Ok(vec![0; blkw_count(count)?]),
        (Directive::Blkw, [count, value]) => {
            let count = blkw_count(count)?;
            let value = resolver.word_value(value)?;
            Ok(vec![value; count])
        }
        (Directive::Stringz, [literal]) => {
            let mut codes = string_to_codes(literal)?;
            codes.push(0);
            Ok(codes)
        }
        _ => unreachable!("{} is not a data directive, or has the wrong operand count", directive.name()),
    }
}

/// How many words a data directive occupies, if that can be told
/// without assembling it.  A string which cannot be decoded has no
/// known length.
pub(crate) fn data_length(directive: Directive, operands: &[String]) -> Option<usize> {
    match (directive, operands) {
        (Directive::Fill, _) => Some(1),
        (Directive::Blkw, [count, ..]) => blkw_count(count).ok(),
        _ => None,
    }
}

/// The count must be known during the first pass, so it cannot be a
/// label.  Unlike other full-word values it may not be negative.
fn blkw_count(token: &str) -> FieldResult<usize> {
    let count = parse_number(token)?;
    u16::try_from(count)
        .map(usize::from)
        .map_err(|_| ErrorKind::ImmediateOutOfRange {
            token: token.to_string(),
            field: Field::WORD,
        })
}

#[cfg(test)]
mod tests {
    use super::super::symtab::{Pass, SymbolTable};
    use super::*;

    fn data(directive: Directive, operands: &[&str]) -> FieldResult<Vec<u32>> {
        let symbols = SymbolTable::default();
        let mut resolver = Resolver::new(&symbols, Address::new(0x3000), Pass::Second);
        let operands: Vec<String> = operands.iter().map(|s| s.to_string()).collect();
        encode_data(directive, &operands, &mut resolver)
    }

    #[test]
    fn test_names_round_trip() {
        for d in ALL {
            assert_eq!(Directive::from_name(d.name()), Some(d));
        }
        assert_eq!(Directive::from_name(".bogus"), None);
    }

    #[test]
    fn test_blkw_with_value() {
        assert_eq!(
            data(Directive::Blkw, &["#3", "x0420"]),
            Ok(vec![0x420, 0x420, 0x420])
        );
    }

    #[test]
    fn test_blkw_defaults_to_zero() {
        assert_eq!(data(Directive::Blkw, &["2"]), Ok(vec![0, 0]));
    }

    #[test]
    fn test_blkw_count_may_not_be_negative() {
        assert!(matches!(
            data(Directive::Blkw, &["#-1"]),
            Err(ErrorKind::ImmediateOutOfRange { .. })
        ));
    }

    #[test]
    fn test_fill_negative() {
        assert_eq!(data(Directive::Fill, &["#-2"]), Ok(vec![0xFFFE]));
    }

    #[test]
    fn test_stringz_adds_terminator() {
        assert_eq!(data(Directive::Stringz, &["\"ok\""]), Ok(vec![111, 107, 0]));
    }

    #[test]
    fn test_empty_stringz_fails() {
        assert_eq!(data(Directive::Stringz, &["\"\""]), Err(ErrorKind::EmptyString));
    }

    #[test]
    fn test_data_length() {
        let operands = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        assert_eq!(data_length(Directive::Fill, &operands(&["#99999"])), Some(1));
        assert_eq!(data_length(Directive::Blkw, &operands(&["#4", "#99999"])), Some(4));
        assert_eq!(data_length(Directive::Blkw, &operands(&["count"])), None);
        assert_eq!(data_length(Directive::Stringz, &operands(&["\"oops"])), None);
    }

    #[test]
    fn test_origin() {
        assert_eq!(
            parse_origin(&["x3000".to_string()]),
            Ok(Address::new(0x3000))
        );
        assert!(parse_origin(&["x10000".to_string()]).is_err());
    }
}
