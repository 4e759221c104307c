//! # Publishing Errors
//!
//! Every failure while publishing aborts the command that triggered it. Objects already
//! written stay in the repository; nothing is retracted.
use thiserror::Error;

use crate::ccnb::DecodeError;
use crate::content;
use crate::key::KeyError;
use crate::name::{Name, NameError};
use crate::store::RepoError;

/// The error representing a failure while publishing slices or keys.
#[derive(Error, Debug)]
pub enum PublishError {
    /// A name or prefix could not be parsed.
    #[error("malformed name")]
    MalformedName(#[from] NameError),
    /// A key or keystore file could not be used.
    #[error("unusable key file")]
    KeyFileError(#[from] KeyError),
    /// The signer refused, or the template cannot be signed.
    #[error("signing failed")]
    SigningFailure(#[from] content::Error),
    /// The repository connection could not be opened or was lost.
    #[error("repository unavailable")]
    RepositoryUnavailable(#[source] std::io::Error),
    /// The repository did not answer in time.
    #[error("repository did not answer for {0} in time")]
    RepositoryTimeout(Name),
    /// The repository refused to store an object.
    #[error("repository rejected {0}: {1}")]
    PublishRejected(Name, String),
    /// The repository answered with bytes that do not decode.
    #[error("malformed repository response")]
    MalformedResponse(#[from] DecodeError),
    /// The info document could not be serialized.
    #[error("failed to encode key info")]
    Info(#[from] serde_json::Error),
}

impl From<RepoError> for PublishError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Unavailable(io) => PublishError::RepositoryUnavailable(io),
            RepoError::Timeout(name) => PublishError::RepositoryTimeout(name),
            RepoError::Rejected(name, why) => PublishError::PublishRejected(name, why),
            RepoError::Decode(e) => PublishError::MalformedResponse(e),
        }
    }
}

impl PublishError {
    /// Log the error at WARN level and hand it back.
    pub fn warn(self) -> Self {
        tracing::warn!(message = %self);
        self
    }
}
