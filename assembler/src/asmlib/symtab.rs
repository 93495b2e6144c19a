//! Label bindings, and the deferred references which have to wait
//! for them.
//!
//! During the first pass each label is bound to its offset from the
//! start of the program as soon as it is seen.  A reference to a
//! label which has not been bound yet (a forward reference) is
//! assembled with a zero in place of the label's value, and the
//! statement is recorded in the [`FixupLedger`].  Once the scan is
//! complete, each entry in the ledger is assembled again with the
//! complete table and the result replaces the placeholder words.
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use base::prelude::{Address, Field};

use super::ast::Statement;
use super::lexer::rx::LABEL_NAME;
use super::operand::{looks_numeric, parse_immediate, FieldResult};
use super::types::{ErrorKind, LineNumber};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Definition {
    name: String,
    offset: usize,
    line: LineNumber,
}

#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    by_name: HashMap<String, usize>,
    definitions: Vec<Definition>,
}

impl SymbolTable {
    /// Checks only the spelling of `name`; the caller is responsible
    /// for rejecting names which collide with mnemonics or registers.
    pub(crate) fn is_valid_name(name: &str) -> bool {
        LABEL_NAME.is_match(name) && !looks_numeric(name)
    }

    pub(crate) fn define(
        &mut self,
        name: &str,
        offset: usize,
        line: LineNumber,
    ) -> Result<(), ErrorKind> {
        if self.by_name.contains_key(name) {
            return Err(ErrorKind::DuplicateLabel(name.to_string()));
        }
        self.by_name.insert(name.to_string(), self.definitions.len());
        self.definitions.push(Definition {
            name: name.to_string(),
            offset,
            line,
        });
        Ok(())
    }

    pub(crate) fn offset_of(&self, name: &str) -> Option<usize> {
        self.by_name
            .get(name)
            .map(|&index| self.definitions[index].offset)
    }

    #[cfg(test)]
    pub(crate) fn line_of(&self, name: &str) -> Option<LineNumber> {
        self.by_name
            .get(name)
            .map(|&index| self.definitions[index].line)
    }

    pub(crate) fn finalise(&self, origin: Address) -> FinalSymbolTable {
        FinalSymbolTable {
            entries: self
                .definitions
                .iter()
                .map(|def| (def.name.clone(), absolute(origin, def.offset)))
                .collect(),
        }
    }
}

fn absolute(origin: Address, offset: usize) -> u32 {
    u32::from(origin).saturating_add(u32::try_from(offset).unwrap_or(u32::MAX))
}

fn signed(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// The symbol table of a successfully assembled program, with
/// absolute addresses.  Its `Display` form is the serialized symbol
/// table: one `name = HEX` line per label, in definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalSymbolTable {
    entries: Vec<(String, u32)>,
}

impl FinalSymbolTable {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, addr)| *addr)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(n, a)| (n.as_str(), *a))
    }
}

impl Display for FinalSymbolTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, address) in &self.entries {
            writeln!(f, "{name} = {address:X}")?;
        }
        Ok(())
    }
}

/// A statement which referred to a label before the label was
/// defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fixup {
    pub(crate) line: LineNumber,
    pub(crate) offset: usize,
    /// The number of placeholder words.
    pub(crate) length: usize,
    pub(crate) statement: Statement,
}

/// Fixups in the order they were recorded.
#[derive(Debug, Default)]
pub(crate) struct FixupLedger {
    entries: Vec<Fixup>,
}

impl FixupLedger {
    pub(crate) fn record(&mut self, fixup: Fixup) {
        self.entries.push(fixup);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl IntoIterator for FixupLedger {
    type Item = Fixup;
    type IntoIter = std::vec::IntoIter<Fixup>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    /// Labels may not have been seen yet.
    First,
    /// Every label that will ever be defined is in the table.
    Second,
}

/// Looks up the labels an encoder needs.  In the first pass an
/// unknown label yields a zero and marks the statement as needing a
/// fixup.
#[derive(Debug)]
pub(crate) struct Resolver<'a> {
    symbols: &'a SymbolTable,
    origin: Address,
    pass: Pass,
    deferred: bool,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(symbols: &'a SymbolTable, origin: Address, pass: Pass) -> Resolver<'a> {
        Resolver {
            symbols,
            origin,
            pass,
            deferred: false,
        }
    }

    /// Whether a forward reference was encountered (first pass only).
    pub(crate) fn deferred(&self) -> bool {
        self.deferred
    }

    fn lookup(&mut self, label: &str) -> FieldResult<Option<usize>> {
        match (self.symbols.offset_of(label), self.pass) {
            (Some(offset), _) => Ok(Some(offset)),
            (None, Pass::First) => {
                self.deferred = true;
                Ok(None)
            }
            (None, Pass::Second) => Err(ErrorKind::UnknownLabel(label.to_string())),
        }
    }

    /// The absolute address of `label`.
    pub(crate) fn address_of(&mut self, label: &str) -> FieldResult<u32> {
        Ok(self
            .lookup(label)?
            .map_or(0, |offset| absolute(self.origin, offset)))
    }

    /// The displacement from the instruction after `pc` to `label`,
    /// encoded for `field`.
    pub(crate) fn pc_offset(&mut self, label: &str, pc: usize, field: Field) -> FieldResult<u16> {
        match self.lookup(label)? {
            None => Ok(0),
            Some(target) => {
                let offset = signed(target) - (signed(pc) + 1);
                field
                    .encode(offset)
                    .map_err(|_| ErrorKind::LabelOutOfRange {
                        label: label.to_string(),
                        offset,
                        field,
                    })
            }
        }
    }

    /// A PC-relative operand which may be given either as a label or
    /// as a literal displacement.
    pub(crate) fn displacement(&mut self, token: &str, pc: usize, field: Field) -> FieldResult<u16> {
        if looks_numeric(token) {
            parse_immediate(token, field)
        } else {
            self.pc_offset(token, pc, field)
        }
    }

    /// A data word given either as a number or as a label (meaning
    /// its address).
    pub(crate) fn word_value(&mut self, token: &str) -> FieldResult<u32> {
        if looks_numeric(token) {
            parse_immediate(token, Field::WORD).map(u32::from)
        } else {
            self.address_of(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(defs: &[(&str, usize)]) -> SymbolTable {
        let mut t = SymbolTable::default();
        for (line, (name, offset)) in defs.iter().enumerate() {
            t.define(name, *offset, line).expect("test labels are unique");
        }
        t
    }

    #[test]
    fn test_duplicate_definition_is_rejected() {
        let mut t = table(&[("loop", 3)]);
        assert_eq!(
            t.define("loop", 9, 7),
            Err(ErrorKind::DuplicateLabel("loop".to_string()))
        );
        assert_eq!(t.offset_of("loop"), Some(3));
        assert_eq!(t.line_of("loop"), Some(0));
    }

    #[test]
    fn test_label_names() {
        assert!(SymbolTable::is_valid_name("loop"));
        assert!(SymbolTable::is_valid_name("_start"));
        assert!(!SymbolTable::is_valid_name("x10"));
        assert!(!SymbolTable::is_valid_name("b01"));
        assert!(!SymbolTable::is_valid_name("9lives"));
    }

    #[test]
    fn test_backward_offset() {
        let t = table(&[("top", 0)]);
        let mut r = Resolver::new(&t, Address::new(0x3000), Pass::First);
        // From offset 4, the next instruction is at 5, so the
        // displacement to 0 is -5.
        assert_eq!(r.pc_offset("top", 4, Field::signed(9)), Ok(0x1FB));
        assert!(!r.deferred());
    }

    #[test]
    fn test_forward_reference_is_deferred_in_first_pass() {
        let t = SymbolTable::default();
        let mut r = Resolver::new(&t, Address::new(0x3000), Pass::First);
        assert_eq!(r.pc_offset("later", 0, Field::signed(9)), Ok(0));
        assert!(r.deferred());
    }

    #[test]
    fn test_unknown_label_in_second_pass() {
        let t = SymbolTable::default();
        let mut r = Resolver::new(&t, Address::new(0x3000), Pass::Second);
        assert_eq!(
            r.address_of("nope"),
            Err(ErrorKind::UnknownLabel("nope".to_string()))
        );
    }

    #[test]
    fn test_offset_out_of_range() {
        let t = table(&[("far", 300)]);
        let mut r = Resolver::new(&t, Address::new(0x3000), Pass::Second);
        assert_eq!(
            r.pc_offset("far", 0, Field::signed(9)),
            Err(ErrorKind::LabelOutOfRange {
                label: "far".to_string(),
                offset: 299,
                field: Field::signed(9),
            })
        );
    }

    #[test]
    fn test_word_value_of_label_is_absolute() {
        let t = table(&[("data", 2)]);
        let mut r = Resolver::new(&t, Address::new(0x3000), Pass::Second);
        assert_eq!(r.word_value("data"), Ok(0x3002));
        assert_eq!(r.word_value("#-1"), Ok(0xFFFF));
    }

    #[test]
    fn test_serialized_symbol_table() {
        let t = table(&[("start", 0), ("msg", 0x1F)]);
        let fin = t.finalise(Address::new(0x3000));
        assert_eq!(fin.to_string(), "start = 3000\nmsg = 301F\n");
        assert_eq!(fin.get("msg"), Some(0x301F));
    }
}
