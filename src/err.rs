//! Error interface for this crate.
//!
//! Every error this crate raises implements [`Error`],
//! which extends [`std::error::Error`] with an optional hint.
//!
//! The concrete error types are re-exported here:
//! - [`LexErr`]: tokenizing assembly source failed
//! - [`ParseErr`]: tokens did not form a valid statement
//! - [`AsmErr`]: statements could not be assembled
//! - [`SimErr`]: an object file could not be loaded or executed
use std::borrow::Cow;

pub use crate::parse::lex::LexErr;
pub use crate::parse::ParseErr;
pub use crate::asm::AsmErr;
pub use crate::sim::SimErr;

/// Unified error interface for all errors in this crate.
///
/// The [`std::fmt::Display`] of an error describes what went wrong.
/// [`Error::help`] may additionally suggest how to fix it.
pub trait Error: std::error::Error {
    /// A hint on how to resolve the error, if one exists.
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}

/// Renders an error and its hint (if present) in the form printed by the `lc3sim` binary.
///
/// ```
/// use lc3_sim::err::report;
/// use lc3_sim::sim::SimErr;
///
/// let msg = report(&SimErr::FileTooShort);
/// assert!(msg.starts_with("error: object file is too short"));
/// assert!(msg.contains("help: "));
/// ```
pub fn report(e: &(impl Error + ?Sized)) -> String {
    match e.help() {
        Some(help) => format!("error: {e}\nhelp: {help}"),
        None => format!("error: {e}"),
    }
}
