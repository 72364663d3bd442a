//! dffkit Core Library
//!
//! This crate provides the math types, colours and error handling
//! shared across all dffkit components.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;
