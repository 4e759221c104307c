//! # Repository Interface
//!
//! The repository is the only persistent state this crate touches. It is reached through two
//! request/response operations: probing for an object under a name and writing an encoded
//! object. [`tcp::TcpRepository`] speaks to a local `ccnd`; [`memory::MemoryRepository`]
//! keeps everything in process.
pub mod memory;
pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::ccnb::DecodeError;
use crate::content::ContentObject;
use crate::name::Name;

/// How long a single fetch or write acknowledgement may take.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(6);

/// The outcome of a fetch that reached the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Found(ContentObject),
    NotFound,
}

/// Errors talking to a repository.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The connection could not be opened or was lost.
    #[error("repository unavailable")]
    Unavailable(#[source] std::io::Error),
    /// Nothing answered within the allotted time.
    #[error("no response for {0} before the timeout")]
    Timeout(Name),
    /// The repository refused to store an object.
    #[error("repository rejected {0}: {1}")]
    Rejected(Name, String),
    /// A transparent wrapper for a [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A content-addressed store of [`ContentObject`]s.
#[async_trait]
pub trait Repository: Send {
    /// Ask for the newest object whose name starts with `name`.
    async fn fetch(&mut self, name: &Name, timeout: Duration) -> Result<Fetched, RepoError>;
    /// Write an encoded object.
    async fn publish(&mut self, object: &ContentObject) -> Result<(), RepoError>;
}
