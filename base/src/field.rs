//! Bit fields within a 16-bit instruction word.
//!
//! Both instruction sets pack registers, immediates and PC-relative
//! displacements into fixed-width fields.  A [`Field`] knows its
//! width and whether the value it holds is to be interpreted as
//! signed (two's complement) or unsigned, and so can decide whether a
//! value fits, and what bit pattern represents it.
use std::fmt::{self, Display, Formatter};
use std::ops::RangeInclusive;

use super::error::ConversionFailed;

/// The number of bits in a machine word.
pub const WORD_BITS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signed,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Field {
    width: u32,
    signedness: Signedness,
}

impl Field {
    /// A whole word.  Values are accepted if they fit either as a
    /// signed or as an unsigned 16-bit quantity.
    pub const WORD: Field = Field {
        width: WORD_BITS,
        signedness: Signedness::Unsigned,
    };

    /// # Panics
    ///
    /// Panics if `width` is zero or wider than a word.
    #[must_use]
    pub const fn new(width: u32, signedness: Signedness) -> Field {
        assert!(width > 0 && width <= WORD_BITS);
        Field { width, signedness }
    }

    #[must_use]
    pub const fn signed(width: u32) -> Field {
        Field::new(width, Signedness::Signed)
    }

    #[must_use]
    pub const fn unsigned(width: u32) -> Field {
        Field::new(width, Signedness::Unsigned)
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn signedness(&self) -> Signedness {
        self.signedness
    }

    #[must_use]
    pub const fn mask(&self) -> u16 {
        if self.width == WORD_BITS {
            u16::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// The values which this field can represent.
    #[must_use]
    pub fn range(&self) -> RangeInclusive<i64> {
        let half: i64 = 1 << (self.width - 1);
        if self.width == WORD_BITS {
            -half..=i64::from(u16::MAX)
        } else {
            match self.signedness {
                Signedness::Signed => -half..=(half - 1),
                Signedness::Unsigned => 0..=((half << 1) - 1),
            }
        }
    }

    /// Convert `value` to the bit pattern which represents it in
    /// this field (in the low bits of the result).
    ///
    /// # Errors
    ///
    /// Fails if `value` lies outside [`Field::range`].
    pub fn encode(&self, value: i64) -> Result<u16, ConversionFailed> {
        let range = self.range();
        if value < *range.start() {
            Err(ConversionFailed::TooSmall)
        } else if value > *range.end() {
            Err(ConversionFailed::TooLarge)
        } else {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Ok((value & i64::from(self.mask())) as u16)
        }
    }

    /// Recover the value represented by the low `width` bits of
    /// `bits`.  Whole-word fields decode as unsigned.
    #[must_use]
    pub fn decode(&self, bits: u16) -> i64 {
        let raw = i64::from(bits & self.mask());
        match self.signedness {
            Signedness::Signed if self.width < WORD_BITS && raw >= 1 << (self.width - 1) => {
                raw - (1 << self.width)
            }
            _ => raw,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.width, self.signedness) {
            (WORD_BITS, _) => f.write_str("16-bit"),
            (w, Signedness::Signed) => write!(f, "signed {w}-bit"),
            (w, Signedness::Unsigned) => write!(f, "unsigned {w}-bit"),
        }
    }
}

/// Position `bits` so that its least significant bit lands at bit
/// `shift` of the word.
#[must_use]
pub const fn place(bits: u16, shift: u32) -> u16 {
    bits << shift
}

#[test]
fn test_signed_range() {
    assert_eq!(Field::signed(5).range(), -16..=15);
    assert_eq!(Field::signed(9).range(), -256..=255);
}

#[test]
fn test_unsigned_range() {
    assert_eq!(Field::unsigned(8).range(), 0..=255);
    assert_eq!(Field::unsigned(3).range(), 0..=7);
}

#[test]
fn test_word_accepts_signed_and_unsigned() {
    assert_eq!(Field::WORD.encode(-1), Ok(0xFFFF));
    assert_eq!(Field::WORD.encode(0xFFFF), Ok(0xFFFF));
    assert_eq!(Field::WORD.encode(-32768), Ok(0x8000));
    assert_eq!(Field::WORD.encode(0x1_0000), Err(ConversionFailed::TooLarge));
    assert_eq!(Field::WORD.encode(-32769), Err(ConversionFailed::TooSmall));
}

#[test]
fn test_encode_masks_negative_values() {
    assert_eq!(Field::signed(5).encode(-1), Ok(0x1F));
    assert_eq!(Field::signed(9).encode(-2), Ok(0x1FE));
    assert_eq!(Field::signed(5).encode(16), Err(ConversionFailed::TooLarge));
    assert_eq!(Field::unsigned(8).encode(-1), Err(ConversionFailed::TooSmall));
}

#[test]
fn test_display() {
    assert_eq!(Field::signed(6).to_string(), "signed 6-bit");
    assert_eq!(Field::unsigned(8).to_string(), "unsigned 8-bit");
    assert_eq!(Field::WORD.to_string(), "16-bit");
}
