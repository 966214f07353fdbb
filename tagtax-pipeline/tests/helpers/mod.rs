//! Test Helper Utilities
//!
//! Shared utilities for testing tagtax-pipeline

#![allow(dead_code)]

pub mod data_root;
pub mod scripted_classifier;

pub use data_root::{
    create_data_root, read_lines, stage_context, write_blacklist, write_entity, write_ledger_lines,
};
pub use scripted_classifier::ScriptedClassifier;
