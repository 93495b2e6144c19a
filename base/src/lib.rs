//! The `base` crate defines the things which are useful both to the
//! assembler and to anything which loads or executes its output.  The
//! idea is that a simulator can depend on the base crate without
//! depending on the assembler itself.
//!
//! Everything here is independent of which of the two instruction
//! sets is in use; the instruction sets only differ in how they
//! arrange these pieces within a word.

mod error;
mod field;
mod register;
mod types;

pub mod prelude;
