//! Subcommand implementations.

pub(crate) mod fetch;
pub(crate) mod resolve;
pub(crate) mod strip;
