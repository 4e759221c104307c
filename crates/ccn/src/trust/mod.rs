//! # Key Chain Verification
//!
//! An object names the key that signed it through its key locator. Verification walks that
//! chain through the repository until it reaches a key the caller trusts:
//!
//! 1. The locator's namespace, the locator minus its last component, must be a prefix of
//!    the signed object's name. A key published under `/ndn/keys` may sign anything below
//!    `/ndn/keys`, but nothing under `/ndn/other`.
//! 2. The newest key object under the locator is fetched and the signature is checked
//!    against it.
//! 3. If that key is a trust anchor the chain is complete. Otherwise the key's info document
//!    must be signed by the same publisher and must not have expired, and the key itself is
//!    verified next.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use thiserror::Error;

use crate::content::{ContentObject, ContentType};
use crate::name::Name;
use crate::publish::INFO_COMPONENT;
use crate::store::{Fetched, RepoError, Repository, FETCH_TIMEOUT};

/// Longest chain followed before giving up.
pub const MAX_CHAIN: usize = 8;

#[derive(Error, Debug)]
pub enum TrustError {
    #[error("{0} carries no key locator")]
    NoKeyLocator(Name),
    /// The signing key's namespace does not cover the signed name.
    #[error("key {key} is not authorized to sign {data}")]
    WrongNamespace { data: Name, key: Name },
    #[error("no key found under {0}")]
    KeyMissing(Name),
    #[error("{0} is not a key")]
    NotAKey(Name),
    #[error("signature on {0} does not verify")]
    BadSignature(Name),
    /// A self-signed key that is not among the trusted anchors.
    #[error("chain ends in untrusted key {0}")]
    UntrustedAnchor(Name),
    #[error("no valid info document for key {0}")]
    MissingInfo(Name),
    #[error("key {0} expired at {1}")]
    Expired(Name, u64),
    #[error("key chain longer than {MAX_CHAIN}")]
    ChainTooLong,
    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// One verified signature: `name` was signed by the key published as `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub name: Name,
    pub key: Name,
}

#[derive(Deserialize)]
struct Validity {
    valid_to: u64,
}

/// Follows key locators through a repository.
pub struct Verifier<'a, R: ?Sized> {
    repo: &'a mut R,
    anchors: Vec<Vec<u8>>,
    timeout: Duration,
    now: SystemTime,
}

impl<'a, R: Repository + ?Sized> Verifier<'a, R> {
    /// A verifier trusting the given DER encoded public keys.
    pub fn new(repo: &'a mut R, anchors: Vec<Vec<u8>>) -> Self {
        Verifier {
            repo,
            anchors,
            timeout: FETCH_TIMEOUT,
            now: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Judge expiry against `now` instead of the current time.
    #[must_use]
    pub fn at(mut self, now: SystemTime) -> Self {
        self.now = now;
        self
    }

    /// Verify `object` up to a trust anchor, returning each hop from the object outwards.
    #[tracing::instrument(skip_all, fields(name = %object.name()))]
    pub async fn verify(&mut self, object: &ContentObject) -> Result<Vec<Hop>, TrustError> {
        let mut chain = Vec::new();
        let mut current = object.clone();

        for _ in 0..MAX_CHAIN {
            let locator = current
                .key_locator()
                .cloned()
                .ok_or_else(|| TrustError::NoKeyLocator(current.name().clone()))?;
            authorize(current.name(), &locator)?;

            let key = self.fetch_key(&locator).await?;
            current
                .verify(key.payload())
                .map_err(|_| TrustError::BadSignature(current.name().clone()))?;
            tracing::debug!(name = %current.name(), key = %key.name(), "signature verified");
            chain.push(Hop {
                name: current.name().clone(),
                key: key.name().clone(),
            });

            if self.anchors.iter().any(|a| a.as_slice() == key.payload()) {
                return Ok(chain);
            }
            if key.name() == current.name() {
                return Err(TrustError::UntrustedAnchor(key.name().clone()));
            }
            self.check_info(&locator, &key).await?;
            current = key;
        }
        Err(TrustError::ChainTooLong)
    }

    async fn fetch_key(&mut self, locator: &Name) -> Result<ContentObject, TrustError> {
        let key = match self.repo.fetch(locator, self.timeout).await {
            Ok(Fetched::Found(key)) => key,
            Ok(Fetched::NotFound) | Err(RepoError::Timeout(_)) => {
                return Err(TrustError::KeyMissing(locator.clone()))
            },
            Err(e) => return Err(e.into()),
        };
        if key.content_type() != ContentType::Key {
            return Err(TrustError::NotAKey(key.name().clone()));
        }
        Ok(key)
    }

    /// The info document next to `key` must come from the same publisher and be unexpired.
    async fn check_info(
        &mut self,
        locator: &Name,
        key: &ContentObject,
    ) -> Result<(), TrustError> {
        let missing = || TrustError::MissingInfo(key.name().clone());
        let digest = locator.last().ok_or_else(missing)?;
        let info_name = locator
            .prefix(locator.len() - 1)
            .append(INFO_COMPONENT)
            .append(digest.clone());

        let info = match self.repo.fetch(&info_name, self.timeout).await {
            Ok(Fetched::Found(info)) => info,
            Ok(Fetched::NotFound) | Err(RepoError::Timeout(_)) => return Err(missing()),
            Err(e) => return Err(e.into()),
        };
        if info.publisher_digest() != key.publisher_digest() {
            return Err(missing());
        }
        let validity: Validity = serde_json::from_slice(info.payload()).map_err(|_| missing())?;

        let now = self.now.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        if now >= validity.valid_to {
            return Err(TrustError::Expired(key.name().clone(), validity.valid_to));
        }
        Ok(())
    }
}

/// A key named `<namespace>/<digest>` may only sign names under `<namespace>`.
fn authorize(data: &Name, key: &Name) -> Result<(), TrustError> {
    let wrong = || TrustError::WrongNamespace {
        data: data.clone(),
        key: key.clone(),
    };
    if key.is_empty() || data.len() < key.len() {
        return Err(wrong());
    }
    if key.prefix(key.len() - 1).is_prefix_of(data) {
        Ok(())
    } else {
        Err(wrong())
    }
}
