// Error taxonomy for the persona and assistant core
//
// Every core operation fails with a `CoreError` value; the HTTP layer maps
// each variant onto a status code (see `server::error`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The persona key is not part of the registry's fixed key set
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    /// A context fragment was empty, too long, or otherwise unusable
    #[error("Invalid context fragment: {0}")]
    InvalidFragment(String),

    /// Merging the fragment would push the persona past its size budget
    #[error("Context budget exceeded for persona '{persona}' ({len} > {limit} chars)")]
    ContextBudgetExceeded {
        persona: String,
        len: usize,
        limit: usize,
    },

    /// A configuration parameter (voice, safe phrase, phone number) was rejected
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Any failure reported by, or while talking to, the assistant platform
    #[error("External service error: {0:#}")]
    ExternalService(#[source] anyhow::Error),

    /// A required request field was absent
    #[error("Missing input: {0}")]
    MissingInput(&'static str),
}

impl CoreError {
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        CoreError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
