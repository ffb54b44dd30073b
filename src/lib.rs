//! docweave — execute fenced script fragments in markup documents.
//!
//! Scans documents for fenced fragments, runs them in order against one
//! environment per document, and weaves their output back in place between
//! sentinel comments. Re-running is idempotent.

pub mod cli;
pub mod core;
pub mod runtime;
