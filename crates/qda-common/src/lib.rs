//! Common utilities for QDA tooling.
//!
//! This crate provides the low-level building blocks used by the archive crate:
//!
//! - [`BinaryReader`] - Bounds-checked, zero-copy reading from byte slices
//! - [`fixed_str`] - NUL-terminated strings stored in fixed-width byte fields

mod error;
mod reader;

pub mod fixed_str;

pub use error::{Error, Result};
pub use reader::BinaryReader;
