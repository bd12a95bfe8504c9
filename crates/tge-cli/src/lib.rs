//! tge-cli
//!
//! Command handlers for the `tge-cli` binary. They live in a library so the
//! whole fetch-to-archive run can be driven in-process with a substituted
//! page source and archive.

pub mod commands;
