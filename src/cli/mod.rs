//! Command-line surface for the `enhance` binary.

pub mod commands;
