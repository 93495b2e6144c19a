//! Representation of the original input, and the first step of
//! processing each line: removing the comment and folding case.
use super::diagnostics::Location;
use super::types::LineNumber;

pub(crate) const COMMENT_MARKER: char = ';';
pub(crate) const ESCAPE: char = '\\';

pub(crate) fn is_quote(ch: char) -> bool {
    matches!(ch, '"' | '\'')
}

/// One line of the source text, as the user wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceLine<'s> {
    pub(crate) number: LineNumber,
    pub(crate) text: &'s str,
}

impl<'s> SourceLine<'s> {
    pub(crate) fn new(number: LineNumber, text: &'s str) -> SourceLine<'s> {
        SourceLine { number, text }
    }

    pub(crate) fn location(&self) -> Location {
        Location::Line {
            number: self.number,
            text: self.text.to_string(),
        }
    }
}

pub(crate) fn lines(body: &str) -> Vec<SourceLine<'_>> {
    body.lines()
        .enumerate()
        .map(|(n, text)| SourceLine::new(n, text))
        .collect()
}

/// Remove any comment and surrounding whitespace from `line`, and
/// fold everything outside string literals to lower case.
///
/// A comment marker inside a string literal does not start a
/// comment, so we track whether we are inside quotes (and whether the
/// previous character was an escape) as we go.
pub(crate) fn normalize(line: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(q) => {
                result.push(ch);
                if escaped {
                    escaped = false;
                } else if ch == ESCAPE {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None if ch == COMMENT_MARKER => break,
            None => {
                if is_quote(ch) {
                    quote = Some(ch);
                }
                result.extend(ch.to_lowercase());
            }
        }
    }
    result.trim().to_string()
}

#[test]
fn test_normalize_blank() {
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("   \t "), "");
    assert_eq!(normalize("; just a comment"), "");
}

#[test]
fn test_normalize_strips_comment_and_folds_case() {
    assert_eq!(normalize("  ADD R0, R1, R2 ; sum"), "add r0, r1, r2");
    assert_eq!(normalize("Loop: BRnzp Loop;again"), "loop: brnzp loop");
}

#[test]
fn test_normalize_keeps_comment_marker_inside_string() {
    assert_eq!(
        normalize(r#".STRINGZ "Hi; There" ; greeting"#),
        r#".stringz "Hi; There""#
    );
    assert_eq!(normalize(".stringz 'a;b'"), ".stringz 'a;b'");
}

#[test]
fn test_normalize_escaped_quote_does_not_end_string() {
    assert_eq!(
        normalize(r#".stringz "say \"A;B\"" ; done"#),
        r#".stringz "say \"A;B\"""#
    );
}

#[test]
fn test_lines_are_numbered_from_zero() {
    let ls = lines(".orig x3000\nhalt\n");
    assert_eq!(ls.len(), 2);
    assert_eq!(ls[1], SourceLine::new(1, "halt"));
}
