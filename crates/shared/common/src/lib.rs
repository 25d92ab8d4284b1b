//! Common utilities shared across catalog crates.
//!
//! This crate provides:
//! - The error taxonomy every repository returns
//! - Store error classification
//! - Configuration structures

pub mod config;
pub mod error;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
