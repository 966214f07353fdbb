//! # Tagtax Common Library
//!
//! Shared code for every stage of the tag taxonomy pipeline:
//! - Ledger record types (raw tags through the final mapping)
//! - Ledger file codec and checkpoint store
//! - Tag normalization
//! - Layered (base + override) maps and canonical style resolution
//! - Configuration loading and root folder resolution
//! - Query-time tag expansion over the compiled mapping

pub mod canonical;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod expansion;
pub mod layered;
pub mod ledger;
pub mod models;
pub mod normalize;
pub mod paths;

pub use error::{Error, Result};
pub use normalize::normalize_tag;
