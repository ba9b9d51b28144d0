//! Command implementations.
//!
//! Each subcommand is implemented in its own module for clean separation.

pub(crate) mod completions;
pub(crate) mod dump;
pub(crate) mod inspect;
pub(crate) mod ports;
