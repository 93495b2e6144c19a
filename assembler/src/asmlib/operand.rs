//! Conversion of operand tokens into numbers, registers and
//! character codes.
//!
//! Every function here returns `Result<_, ErrorKind>`; a failure in
//! any sub-field of an instruction makes the whole instruction fail.
use base::prelude::{Field, Register};

use super::lexer::{shape_of, Shape};
use super::source::ESCAPE;
use super::types::ErrorKind;


pub(crate) type FieldResult<T> = Result<T, ErrorKind>;

/// Which register names an instruction set understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterNames {
    /// `r0`..`r7` only.
    LowOnly,
    /// Also `h0`..`h7`, with `sp`, `lr` and `pc` as aliases for
    /// `h5`, `h6` and `h7`.
    LowAndHigh,
}

fn strip_minus(s: &str) -> (bool, &str) {
    match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    }
}

/// Parse the numeric value of `token`.
///
/// The radix is selected by an optional `#` followed by `x` (hex),
/// `b` (binary) or nothing (decimal); or by a `0x`/`0b` prefix; or,
/// without `#`, by a leading `x` or `b`.  A single minus sign may
/// appear either before or after the radix marker.  All the remaining
/// characters must be valid digits in the selected radix.
pub(crate) fn parse_number(token: &str) -> FieldResult<i64> {
    let malformed = || ErrorKind::MalformedImmediate(token.to_string());
    let rest = token.strip_prefix('#').unwrap_or(token);
    let (leading_minus, rest) = strip_minus(rest);
    let (radix, rest) = if let Some(digits) = rest.strip_prefix("0x") {
        (16, digits)
    } else if let Some(digits) = rest.strip_prefix("0b") {
        (2, digits)
    } else if let Some(digits) = rest.strip_prefix('x') {
        (16, digits)
    } else if let Some(digits) = rest.strip_prefix('b') {
        (2, digits)
    } else {
        (10, rest)
    };
    let (trailing_minus, digits) = strip_minus(rest);
    if (leading_minus && trailing_minus)
        || digits.is_empty()
        || !digits.chars().all(|ch| ch.is_digit(radix))
    {
        return Err(malformed());
    }
    let magnitude = i64::from_str_radix(digits, radix).map_err(|_| {
        ErrorKind::ImmediateOutOfRange {
            token: token.to_string(),
            field: Field::WORD,
        }
    })?;
    if leading_minus || trailing_minus {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

/// Parse `token` as a value for `field`, returning the bit pattern
/// which represents it.
pub(crate) fn parse_immediate(token: &str, field: Field) -> FieldResult<u16> {
    let value = parse_number(token)?;
    field
        .encode(value)
        .map_err(|_| ErrorKind::ImmediateOutOfRange {
            token: token.to_string(),
            field,
        })
}

/// True if `token` should be read as a number rather than as a
/// label, in an operand position which accepts either.
pub(crate) fn looks_numeric(token: &str) -> bool {
    match shape_of(token) {
        Some(shape) => shape.is_number(),
        // Anything which is not a plausible name is treated as a
        // (probably malformed) number so that the message is about
        // the digits rather than about an unknown label.
        None => true,
    }
}

pub(crate) fn parse_register(token: &str, names: RegisterNames) -> FieldResult<Register> {
    let malformed = || ErrorKind::MalformedRegister(token.to_string());
    let number = |digits: &str| -> FieldResult<u8> { digits.parse::<u8>().map_err(|_| malformed()) };
    match (shape_of(token), names) {
        (Some(Shape::LowRegister), _) => Register::low(number(&token[1..])?).ok_or_else(malformed),
        (Some(Shape::HighRegister), RegisterNames::LowAndHigh) => {
            Register::high(number(&token[1..])?).ok_or_else(malformed)
        }
        (Some(Shape::Name), RegisterNames::LowAndHigh) => match token {
            "sp" => Ok(Register::SP),
            "lr" => Ok(Register::LR),
            "pc" => Ok(Register::PC),
            _ => Err(malformed()),
        },
        _ => Err(malformed()),
    }
}

/// Convert a quoted string literal into character codes.  The
/// opening and closing quotes must match; an unescaped quote of the
/// same kind may not appear inside.
pub(crate) fn string_to_codes(literal: &str) -> FieldResult<Vec<u32>> {
    let malformed = || ErrorKind::MalformedString(literal.to_string());
    let mut chars = literal.chars();
    let quote = match chars.next() {
        Some(q) if super::source::is_quote(q) => q,
        _ => return Err(malformed()),
    };
    if chars.next_back() != Some(quote) {
        return Err(malformed());
    }
    let body = chars.as_str();
    if body.is_empty() {
        return Err(ErrorKind::EmptyString);
    }
    let mut codes: Vec<u32> = Vec::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        let code = match ch {
            ESCAPE => match chars.next() {
                Some('\\') => '\\',
                Some('\'') => '\'',
                Some('"') => '"',
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                _ => return Err(malformed()),
            },
            ch if ch == quote => return Err(malformed()),
            ch => ch,
        };
        codes.push(u32::from(code));
    }
    Ok(codes)
}
