//! tagtax-pipeline library interface
//!
//! The tag taxonomy pipeline: nine batch stages that turn free-text tags
//! harvested from metadata providers into a genre/subgenre taxonomy and a
//! tag → expansion-terms mapping, plus the orchestrator that runs a range
//! of stages as separate processes.

pub mod blacklist;
pub mod classifier;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod prompts;
pub mod stages;

pub use crate::error::{StageError, StageResult};
pub use crate::stages::{Stage, StageContext, StageReport};
