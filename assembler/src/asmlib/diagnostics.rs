//! Human-readable reports of problems found in a program.
//!
//! A line-scoped diagnostic renders as the (1-based) line number, the
//! description, and then the offending source line:
//!
//! ```text
//! 3: label 'nope' is not defined
//! lea r0, NOPE
//! ```
//!
//! Problems which are only known by address (for example a data word
//! whose value turned out to be too large once labels were resolved)
//! use a line-less form.
use std::fmt::{self, Display, Formatter};

use tracing::{event, Level};

use base::prelude::Address;

use super::source::SourceLine;
use super::types::{ErrorKind, LineNumber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Line { number: LineNumber, text: String },
    Address(Address),
    Program,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    severity: Severity,
    location: Location,
    kind: ErrorKind,
}

impl Diagnostic {
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The 0-based line number, for line-scoped diagnostics.
    #[must_use]
    pub fn line(&self) -> Option<LineNumber> {
        match &self.location {
            Location::Line { number, .. } => Some(*number),
            Location::Address(_) | Location::Program => None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Warning => "warning: ",
            Severity::Error => "",
        };
        match &self.location {
            Location::Line { number, text } => {
                write!(f, "{}: {prefix}{}\n{text}", number + 1, self.kind)
            }
            Location::Address(address) => {
                write!(f, "internal error at {address}: {prefix}{}", self.kind)
            }
            Location::Program => write!(f, "{prefix}{}", self.kind),
        }
    }
}

/// Collects the diagnostics of one assembly run.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    fn report(&mut self, severity: Severity, location: Location, kind: ErrorKind) {
        let diagnostic = Diagnostic {
            severity,
            location,
            kind,
        };
        event!(Level::DEBUG, "{severity:?}: {diagnostic}");
        self.items.push(diagnostic);
    }

    pub(crate) fn error_at(&mut self, line: &SourceLine<'_>, kind: ErrorKind) {
        self.report(Severity::Error, line.location(), kind);
    }

    pub(crate) fn error_at_address(&mut self, address: Address, kind: ErrorKind) {
        self.report(Severity::Error, Location::Address(address), kind);
    }

    pub(crate) fn error(&mut self, kind: ErrorKind) {
        self.report(Severity::Error, Location::Program, kind);
    }

    pub(crate) fn warning(&mut self, kind: ErrorKind) {
        self.report(Severity::Warning, Location::Program, kind);
    }

    pub(crate) fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub(crate) fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// Render diagnostics the way the console expects them: each message
/// followed by a newline.
#[must_use]
pub fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("{d}\n")).collect()
}

#[test]
fn test_line_diagnostic_format() {
    let mut diags = Diagnostics::default();
    let line = SourceLine::new(2, "  lea r0, NOPE");
    diags.error_at(&line, ErrorKind::UnknownLabel("nope".to_string()));
    assert!(diags.has_errors());
    assert_eq!(
        render(&diags.into_vec()),
        "3: label 'nope' is not defined\n  lea r0, NOPE\n"
    );
}

#[test]
fn test_address_diagnostic_format() {
    let mut diags = Diagnostics::default();
    diags.error_at_address(Address::new(0x3004), ErrorKind::ValueTooLarge(0x1_2345));
    assert_eq!(
        diags.into_vec()[0].to_string(),
        "internal error at x3004: value 0x12345 does not fit in a 16-bit word"
    );
}

#[test]
fn test_warnings_are_not_errors() {
    let mut diags = Diagnostics::default();
    diags.warning(ErrorKind::MissingEnd);
    assert!(!diags.has_errors());
    assert_eq!(
        diags.into_vec()[0].to_string(),
        "warning: program has no .end directive"
    );
}
