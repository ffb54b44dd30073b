//! Core pipeline — types, config, scanning, capture, rewriting, execution.

pub mod capture;
pub mod config;
pub mod error;
pub mod executor;
pub mod hasher;
pub mod rewriter;
pub mod scanner;
pub mod types;
