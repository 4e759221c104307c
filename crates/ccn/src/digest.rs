//! Content-addressed identifiers.
//!
//! Everything in the key namespace is identified by the SHA-1 of some canonical bytes. The raw
//! digest is used as a name component where no human ever reads it (slice identities), and the
//! name-safe base64 form is used everywhere else.
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

use crate::name::Component;

/// Length of a SHA-1 digest in bytes.
pub const DIGEST_LEN: usize = 20;

/// A SHA-1 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha1Digest([u8; DIGEST_LEN]);

impl Sha1Digest {
    #[must_use]
    pub fn compute(bytes: &[u8]) -> Self {
        Sha1Digest(Sha1::digest(bytes).into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// See [`name_safe_base64`].
    #[must_use]
    pub fn to_name_safe(&self) -> String {
        name_safe_base64(&self.0)
    }
}

impl From<Sha1Digest> for Component {
    fn from(d: Sha1Digest) -> Self {
        Component::from(d.0.to_vec())
    }
}

/// Standard base64 with every `/` rewritten to `-`. `+` and `=` padding are kept as they are,
/// which is what existing published names use.
#[must_use]
pub fn name_safe_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes).replace('/', "-")
}

/// SHA-1 of `bytes` in name-safe base64.
#[must_use]
pub fn digest_name(bytes: &[u8]) -> String {
    Sha1Digest::compute(bytes).to_name_safe()
}
