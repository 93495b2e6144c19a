use std::{ops::Deref, sync::OnceLock};

use regex::Regex;

pub(crate) struct LazyRegex {
    once: OnceLock<Regex>,
    pattern: &'static str,
}

impl LazyRegex {
    pub(crate) const fn new(pattern: &'static str) -> Self {
        LazyRegex {
            once: OnceLock::new(),
            pattern,
        }
    }
}

impl Deref for LazyRegex {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        self.once.get_or_init(|| match Regex::new(self.pattern) {
            Ok(r) => r,
            Err(e) => {
                panic!("'{}' is not a valid regular expression: {e}", self.pattern,);
            }
        })
    }
}

/// Label names, after case folding.
pub(crate) static LABEL_NAME: LazyRegex = LazyRegex::new(r"^[a-z_][a-z0-9_]*$");

/// An entry in a register list, for example `r2` or `r2-r5`.
pub(crate) static REGISTER_RANGE: LazyRegex =
    LazyRegex::new(r"^r(?<first>[0-9]+)(-r(?<last>[0-9]+))?$");

#[test]
fn test_label_name() {
    assert!(LABEL_NAME.is_match("loop"));
    assert!(LABEL_NAME.is_match("_start"));
    assert!(LABEL_NAME.is_match("l2_done"));
    assert!(!LABEL_NAME.is_match("2nd"));
    assert!(!LABEL_NAME.is_match("a-b"));
    assert!(!LABEL_NAME.is_match(""));
}

#[test]
fn test_register_range() {
    let caps = REGISTER_RANGE.captures("r2-r5").expect("should match");
    assert_eq!(&caps["first"], "2");
    assert_eq!(&caps["last"], "5");
    let caps = REGISTER_RANGE.captures("r7").expect("should match");
    assert!(caps.name("last").is_none());
    assert!(!REGISTER_RANGE.is_match("lr"));
}
