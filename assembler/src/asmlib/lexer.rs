//! Splitting a normalized line into tokens, and classifying the
//! shape of individual operand tokens.
use logos::Logos;

use super::source::is_quote;

pub(crate) mod rx;

/// Split a normalized, non-empty line into tokens.
///
/// If the line contains a quote character, everything from there to
/// the end of the line is a string operand; it is kept as a single
/// token (with its case preserved) and placed last.  The rest of the
/// line is split on commas and colons and then on whitespace.  Empty
/// pieces (such as the one following the colon of a label which is
/// alone on its line) are discarded.
pub(crate) fn tokenize(line: &str) -> Vec<String> {
    let (body, literal) = match line.find(is_quote) {
        Some(pos) => (&line[..pos], Some(&line[pos..])),
        None => (line, None),
    };
    let mut tokens: Vec<String> = body
        .split([',', ':'])
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect();
    if let Some(literal) = literal {
        tokens.push(literal.trim_end().to_string());
    }
    tokens
}

/// Remove the enclosing punctuation from a group of operands such as
/// `[r1, #4]` or `{r0, r2-r4, lr}`, which the tokenizer will have
/// split into `[r1` `#4]`.  Returns `None` if the group is not
/// properly enclosed.  The input tokens are left untouched.
pub(crate) fn ungroup(tokens: &[String], open: char, close: char) -> Option<Vec<String>> {
    let first = tokens.first()?;
    let last = tokens.last()?;
    if !first.starts_with(open) || !last.ends_with(close) {
        return None;
    }
    let mut inner: Vec<String> = tokens.to_vec();
    inner[0].remove(0);
    let n = inner.len();
    inner[n - 1].pop();
    inner.retain(|t| !t.is_empty());
    if inner
        .iter()
        .any(|t| t.contains([open, close]))
    {
        None
    } else {
        Some(inner)
    }
}

/// The general shape of an operand token.  Numbers are only
/// recognised here by their leading characters; the operand parser
/// checks that the digits are valid for the radix.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum Shape {
    #[regex(r"#[0-9a-z_\-]*", priority = 20)]
    MarkedNumber,

    #[regex(r"-?[0-9][0-9a-z_]*", priority = 20)]
    Digits,

    #[regex(r"-?x-?[0-9a-f]+", priority = 15)]
    #[regex(r"-?b-?[01]+", priority = 15)]
    PrefixedNumber,

    #[regex(r"r[0-9]+", priority = 12)]
    LowRegister,

    #[regex(r"h[0-9]+", priority = 12)]
    HighRegister,

    #[regex(r"[a-z_][a-z0-9_]*", priority = 1)]
    Name,
}

impl Shape {
    pub(crate) fn is_number(self) -> bool {
        matches!(
            self,
            Shape::MarkedNumber | Shape::Digits | Shape::PrefixedNumber
        )
    }
}

/// Classify `token`, which must match one of the [`Shape`] patterns
/// in its entirety.
pub(crate) fn shape_of(token: &str) -> Option<Shape> {
    let mut lex = Shape::lexer(token);
    match lex.next() {
        Some(Ok(shape)) if lex.span() == (0..token.len()) => Some(shape),
        _ => None,
    }
}
