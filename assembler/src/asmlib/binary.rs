//! The assembled program, and its serialized forms.
use std::fmt::{self, Display, Formatter};

use base::prelude::Address;

/// Words per line in the object listing.
const LISTING_WORDS_PER_LINE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    start: Address,
    words: Vec<u16>,
}

impl Binary {
    #[must_use]
    pub fn new(start: Address, words: Vec<u16>) -> Binary {
        Binary { start, words }
    }

    #[must_use]
    pub fn start(&self) -> Address {
        self.start
    }

    /// The memory contents, starting at [`Binary::start`].
    #[must_use]
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The loadable image: the start address followed by the memory
    /// contents in address order.
    #[must_use]
    pub fn image(&self) -> Vec<u16> {
        std::iter::once(u16::from(self.start))
            .chain(self.words.iter().copied())
            .collect()
    }

    /// The image as big-endian bytes, which is the format of the
    /// object file.
    #[must_use]
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.image().into_iter().flat_map(u16::to_be_bytes).collect()
    }

    /// The image as 4-digit hexadecimal words, eight to a line.
    #[must_use]
    pub fn object_listing(&self) -> ObjectListing<'_> {
        ObjectListing { binary: self }
    }
}

pub struct ObjectListing<'a> {
    binary: &'a Binary,
}

impl Display for ObjectListing<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let image = self.binary.image();
        for chunk in image.chunks(LISTING_WORDS_PER_LINE) {
            for (i, word) in chunk.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{word:04X}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_starts_with_origin() {
        let binary = Binary::new(Address::new(0x3000), vec![0x1042, 0xF025]);
        assert_eq!(binary.image(), vec![0x3000, 0x1042, 0xF025]);
        assert_eq!(
            binary.to_be_bytes(),
            vec![0x30, 0x00, 0x10, 0x42, 0xF0, 0x25]
        );
    }

    #[test]
    fn test_object_listing_wraps_after_eight_words() {
        let binary = Binary::new(Address::new(0x3000), (1..=8).collect());
        assert_eq!(
            binary.object_listing().to_string(),
            "3000 0001 0002 0003 0004 0005 0006 0007\n0008\n"
        );
    }
}
