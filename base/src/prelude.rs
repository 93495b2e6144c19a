//! The prelude exports the structs which are useful in representing
//! machine words.  Providing this prelude is the main purpose of the
//! base crate.
pub use super::error::*;
pub use super::field::*;
pub use super::register::*;
pub use super::types::*;
