//! driftlog-core - Core types and traits for driftlog
//!
//! This crate provides the foundational types, traits, and error handling
//! shared by the storage, provider, and query crates.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{DriftlogError, Result};
pub use traits::*;
pub use types::*;
