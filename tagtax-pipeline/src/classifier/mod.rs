//! Classification service boundary
//!
//! The service is a black box: a prompt goes in, free text comes out.
//! [`Classifier`] is the seam stages depend on; [`HttpClassifier`] talks to a
//! local language-model server. Turning the free text into a typed reply is
//! the job of [`decode`], never of the stages themselves.

pub mod decode;
pub mod http;
pub mod replies;

pub use decode::{decode_response, extract_json, strip_code_fences, DecodeError, ServiceReply};
pub use http::HttpClassifier;
pub use replies::{CanonicalReply, CompoundReply, HierarchyReply};

use async_trait::async_trait;
use thiserror::Error;

/// Classification service availability errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service returned status {0}: {1}")]
    Api(u16, String),

    /// The transport envelope (not the model's text) could not be read
    #[error("Invalid service envelope: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Send one prompt and return the raw response text
    async fn complete(&self, prompt: &str) -> Result<String, ClassifierError>;
}
