//! Error types for tagtax-pipeline
//!
//! Two failure classes stay distinct all the way up:
//! - service availability ([`ClassifierError`]): the call itself failed
//! - service payload ([`DecodeError`]): the service answered with something
//!   that is not the expected structure
//!
//! Which of them stops a stage is decided by the stage's
//! [`crate::policy::ErrorPolicy`]; an abort surfaces as
//! [`StageError::Service`] or [`StageError::Decode`] carrying the unit key.

use crate::classifier::{ClassifierError, DecodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
    /// Ledger or configuration failure
    #[error(transparent)]
    Common(#[from] tagtax_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Classification service could not be reached or refused the call
    #[error("Classification service error for '{key}': {source}")]
    Service {
        key: String,
        #[source]
        source: ClassifierError,
    },

    /// Classification service answered with an unusable payload
    #[error("Unusable classification response for '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },

    /// A stage that needs the classification service was run without one
    #[error("Stage {0} requires a classification service")]
    ClassifierRequired(&'static str),
}

pub type StageResult<T> = Result<T, StageError>;
