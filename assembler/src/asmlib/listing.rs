use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use base::prelude::Address;

use super::binary::Binary;
use super::symtab::FinalSymbolTable;

/// A human-readable account of an assembled program: the symbol
/// table, then every word with the source line which produced it.
#[derive(Debug, Default)]
pub struct Listing {
    final_symbols: FinalSymbolTable,
    output: Vec<ListingLine>,
}

#[derive(Debug)]
enum ListingLine {
    Origin(Address),
    Word {
        address: Address,
        value: u16,
        source: Option<String>,
    },
}

impl Listing {
    pub(crate) fn new(
        binary: &Binary,
        source_lines: &BTreeMap<Address, String>,
        final_symbols: FinalSymbolTable,
    ) -> Listing {
        let mut output = vec![ListingLine::Origin(binary.start())];
        output.extend(binary.words().iter().enumerate().filter_map(|(offset, value)| {
            let address = binary.start().checked_offset(offset)?;
            Some(ListingLine::Word {
                address,
                value: *value,
                source: source_lines.get(&address).map(|s| s.trim().to_string()),
            })
        }));
        Listing {
            final_symbols,
            output,
        }
    }
}

impl Display for ListingLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ListingLine::Origin(origin) => write!(f, ".orig {origin}"),
            ListingLine::Word {
                address,
                value,
                source,
            } => {
                write!(f, "{address}  {value:04X}")?;
                match source {
                    Some(text) => write!(f, "  {text}"),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Display for Listing {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symbol Table:")?;
        write!(f, "{}", self.final_symbols)?;
        writeln!(f)?;

        writeln!(f, "Listing:")?;
        for line in &self.output {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[test]
fn test_listing_shows_source_of_instructions_only() {
    let binary = Binary::new(Address::new(0x3000), vec![0xF025, 0x0041]);
    let mut lines = BTreeMap::new();
    lines.insert(Address::new(0x3000), "  halt ; stop".to_string());
    let listing = Listing::new(&binary, &lines, FinalSymbolTable::default());
    assert_eq!(
        listing.to_string(),
        "Symbol Table:\n\nListing:\n.orig x3000\nx3000  F025  halt ; stop\nx3001  0041\n"
    );
}
