//! # Publishing
//!
//! The two write paths into the repository:
//!
//! - [`Publisher::ensure_slice`] creates a sync slice unless it already exists.
//! - [`Publisher::publish_key`] writes a public key and its info document.
//!
//! Both look up their name before writing. A slice lives under a name derived from its own
//! bytes, so an existing object is authoritative and the write is skipped. Two publishers
//! racing on the same slice both see it missing and both write it; they write identical bytes
//! under the same name, which is harmless, and no lock is taken.
//!
//! Keys are always written, under a fresh version; the lookup only establishes that the
//! repository is reachable.
pub mod error;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use error::PublishError;

use crate::content::{self, ContentObject, ContentType, Signer, SigningTemplate};
use crate::digest;
use crate::key::KeyRecord;
use crate::name::Name;
use crate::slice::SliceDescriptor;
use crate::store::{Fetched, RepoError, Repository, FETCH_TIMEOUT};

/// Name component under which key info documents are published.
pub const INFO_COMPONENT: &str = "info";
const SECONDS_PER_DAY: u32 = 86_400;

/// What was written for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    name: Name,
    content_type: ContentType,
    size: usize,
}

impl Record {
    /// Full name of the written object.
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl From<&ContentObject> for Record {
    fn from(object: &ContentObject) -> Self {
        Record {
            name: object.name().clone(),
            content_type: object.content_type(),
            size: object.as_bytes().len(),
        }
    }
}

/// The objects written by [`Publisher::publish_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPublication {
    pub key: Record,
    pub info: Record,
}

impl KeyPublication {
    /// Every object written, key first.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        [&self.key, &self.info].into_iter()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub published: u32,
    pub skipped: u32,
}

/// A Result is used over an Option here mainly so we can report which
/// object was skipped, but it does not represent a true failure condition
pub type MaybeSkipped<T> = Result<T, Name>;

/// A Record that signifies whether an object was published or safely skipped.
pub type PublishOutcome = MaybeSkipped<Record>;

/// Writes slices and keys to a repository with one signing identity.
pub struct Publisher<'a, R: ?Sized> {
    repo: &'a mut R,
    signer: &'a dyn Signer,
    key_uri: Option<Name>,
    timeout: Duration,
}

impl<'a, R: Repository + ?Sized> Publisher<'a, R> {
    pub fn new(repo: &'a mut R, signer: &'a dyn Signer) -> Self {
        Publisher {
            repo,
            signer,
            key_uri: None,
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Prefix under which the signing key can be found. Objects carry a key locator of
    /// `<key_uri>/<signing key digest>` when this is set.
    #[must_use]
    pub fn key_uri(mut self, uri: Name) -> Self {
        self.key_uri = Some(uri);
        self
    }

    /// Override the fetch timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// A template whose key locator, when a key URI is set, is `<key_uri>/<signing_digest>`.
    fn template(
        &self,
        content_type: ContentType,
        freshness: Option<u32>,
        signing_digest: &str,
    ) -> SigningTemplate {
        let mut template = SigningTemplate::new(content_type);
        template.freshness = freshness;
        template.key_locator = self.key_uri.as_ref().map(|uri| uri.append(signing_digest));
        template
    }

    /// Create the slice object unless one already exists under its identity name.
    ///
    /// A failed lookup counts as absent. Only the write itself can fail the call.
    #[tracing::instrument(skip_all, fields(topology = %slice.topology(), prefix = %slice.prefix()))]
    pub async fn ensure_slice(
        &mut self,
        slice: &SliceDescriptor,
    ) -> Result<PublishOutcome, PublishError> {
        use Err as Skipped;
        use Ok as Published;

        let identity = slice.identity_name();
        match self.repo.fetch(&identity, self.timeout).await {
            Ok(Fetched::Found(existing)) => {
                tracing::debug!(name = %existing.name(), "found existing slice");
                return Ok(Skipped(identity));
            },
            Ok(Fetched::NotFound) => tracing::debug!(%identity, "slice not found"),
            Err(RepoError::Timeout(_)) => tracing::debug!(%identity, "slice lookup timed out"),
            Err(e) => tracing::warn!(%identity, error = %e, "slice lookup failed, writing anyway"),
        }

        let signing_digest = digest::digest_name(self.signer.public_key_der());
        let template = self.template(ContentType::Data, None, &signing_digest);
        let payload = slice.canonical_bytes();
        let object = ContentObject::build(&identity, &template, &payload, self.signer)?;
        self.repo
            .publish(&object)
            .await
            .map_err(|e| PublishError::from(e).warn())?;
        Ok(Published(Record::from(&object)))
    }

    /// Look up `name`, failing only if the repository cannot be reached at all.
    async fn look_up(&mut self, name: &Name) -> Result<(), PublishError> {
        match self.repo.fetch(name, self.timeout).await {
            Ok(Fetched::Found(current)) => {
                tracing::debug!(%name, current = %current.name(), "replacing current version")
            },
            Ok(Fetched::NotFound) | Err(RepoError::Timeout(_)) => {
                tracing::debug!(%name, "no current version")
            },
            Err(RepoError::Unavailable(e)) => return Err(PublishError::RepositoryUnavailable(e)),
            Err(e) => tracing::warn!(%name, error = %e, "unexpected lookup response"),
        }
        Ok(())
    }

    async fn write(
        &mut self,
        name: &Name,
        template: &SigningTemplate,
        payload: &[u8],
        at: SystemTime,
    ) -> Result<Record, PublishError> {
        self.look_up(name).await?;
        let versioned = name.append_version(at);
        let object = ContentObject::build_at(&versioned, template, payload, self.signer, at)?;
        self.repo
            .publish(&object)
            .await
            .map_err(|e| PublishError::from(e).warn())?;
        Ok(Record::from(&object))
    }

    /// Publish a key under `<prefix>/<key digest>` and its info document under
    /// `<prefix>/info/<key digest>`, each as a new version.
    ///
    /// Both objects stay fresh for `validity_days`.
    #[tracing::instrument(skip_all, fields(%prefix, key = %record.public_key_digest))]
    pub async fn publish_key(
        &mut self,
        record: &KeyRecord,
        prefix: &Name,
        validity_days: u32,
    ) -> Result<KeyPublication, PublishError> {
        let freshness = validity_days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or(content::Error::Template("validity period overflows"))?;
        let at = SystemTime::now();

        let key_name = prefix.append(record.public_key_digest.as_str());
        let signing_digest = record.signing_key_digest.as_str();
        let template = self.template(ContentType::Key, Some(freshness), signing_digest);
        let key = self.write(&key_name, &template, &record.public_key, at).await?;
        tracing::info!(name = %key.name(), "published key");

        let info_name = prefix
            .append(INFO_COMPONENT)
            .append(record.public_key_digest.as_str());
        let template = self.template(ContentType::Data, Some(freshness), signing_digest);
        let valid_to = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .saturating_add(u64::from(freshness));
        let info = self
            .write(&info_name, &template, &record.info_payload(valid_to)?, at)
            .await?;
        tracing::info!(name = %info.name(), "published key info");

        Ok(KeyPublication { key, info })
    }
}
