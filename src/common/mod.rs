//! Common types shared across modules
//!
//! Error types for decoding and CLI argument definitions for the
//! command-line tool.

pub mod cli;
pub mod error;

pub use error::{RawFileError, RawFileResult, Section};
