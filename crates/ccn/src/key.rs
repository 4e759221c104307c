//! # Key Material
//!
//! Loading the public key being published and the private key signing it, and the
//! [`KeyRecord`] tying both to a real-world identity.
use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use serde::Serialize;
use thiserror::Error;

use crate::content::{self, Signer};
use crate::digest;

/// Object identifier for Ed25519.
pub const ED25519_OID: &str = "1.3.101.112";

const DER_SEQUENCE: u8 = 0x30;

/// Errors reading or using key files.
#[derive(Error, Debug)]
pub enum KeyError {
    /// The file could not be read.
    #[error("failed to read key file {}", .1.display())]
    Read(#[source] std::io::Error, PathBuf),
    /// The file looks like PEM but does not parse.
    #[error("invalid PEM in {}", .1.display())]
    Pem(#[source] pem::PemError, PathBuf),
    /// The file holds neither PEM nor a DER structure.
    #[error("{} does not contain a DER encoded public key", .0.display())]
    NotDer(PathBuf),
    /// The private key is not a PKCS#8 Ed25519 key.
    #[error("{} is not a PKCS#8 Ed25519 private key: {1}", .0.display())]
    Pkcs8(PathBuf, String),
    /// A public key could not be decoded for verification.
    #[error("invalid Ed25519 public key")]
    Invalid,
}

fn read(path: &Path) -> Result<Vec<u8>, KeyError> {
    std::fs::read(path).map_err(|e| KeyError::Read(e, path.to_owned()))
}

/// Read a public key file, returning its DER bytes.
///
/// PEM files are unwrapped; anything else must already be a DER `SEQUENCE`.
pub fn load_public_key(path: &Path) -> Result<Vec<u8>, KeyError> {
    let bytes = read(path)?;
    let der = if bytes.starts_with(b"-----BEGIN") {
        pem::parse(&bytes)
            .map_err(|e| KeyError::Pem(e, path.to_owned()))?
            .into_contents()
    } else {
        bytes
    };
    if der.first() != Some(&DER_SEQUENCE) {
        return Err(KeyError::NotDer(path.to_owned()));
    }
    Ok(der)
}

/// Verify an Ed25519 `signature` over `message`.
pub fn verify(public_key_der: &[u8], message: &[u8], signature: &[u8]) -> Result<(), KeyError> {
    let key = VerifyingKey::from_public_key_der(public_key_der).map_err(|_| KeyError::Invalid)?;
    let sig = Signature::from_slice(signature).map_err(|_| KeyError::Invalid)?;
    key.verify(message, &sig).map_err(|_| KeyError::Invalid)
}

/// An Ed25519 signing identity.
pub struct Ed25519Signer {
    key: SigningKey,
    public_der: Vec<u8>,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public", &digest::digest_name(&self.public_der))
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    /// Load a PKCS#8 PEM private key.
    pub fn from_pem_file(path: &Path) -> Result<Self, KeyError> {
        let bytes = read(path)?;
        let text = String::from_utf8(bytes).map_err(|_| KeyError::NotDer(path.to_owned()))?;
        let key = SigningKey::from_pkcs8_pem(&text)
            .map_err(|e| KeyError::Pkcs8(path.to_owned(), e.to_string()))?;
        Self::from_key(key).map_err(|e| KeyError::Pkcs8(path.to_owned(), e))
    }

    fn from_key(key: SigningKey) -> Result<Self, String> {
        let public_der = key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| e.to_string())?
            .as_bytes()
            .to_vec();
        Ok(Ed25519Signer { key, public_der })
    }

    /// A signer from raw secret key bytes.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, KeyError> {
        Self::from_key(SigningKey::from_bytes(secret)).map_err(|_| KeyError::Invalid)
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, content::Error> {
        let sig = self
            .key
            .try_sign(message)
            .map_err(|e| content::Error::Signer(e.to_string()))?;
        Ok(sig.to_bytes().to_vec())
    }

    fn public_key_der(&self) -> &[u8] {
        &self.public_der
    }

    fn algorithm(&self) -> &'static str {
        ED25519_OID
    }
}

/// A public key bound to the identity publishing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub identity: String,
    pub affiliation: String,
    pub public_key: Vec<u8>,
    /// Name-safe SHA-1 of `public_key`.
    pub public_key_digest: String,
    /// Name-safe SHA-1 of the signer's public key.
    pub signing_key_digest: String,
}

#[derive(Serialize)]
struct Info<'a> {
    identity: &'a str,
    affiliation: &'a str,
    /// Seconds since the epoch after which the key should no longer be trusted.
    valid_to: u64,
}

impl KeyRecord {
    #[must_use]
    pub fn new(
        identity: impl Into<String>,
        affiliation: impl Into<String>,
        public_key: Vec<u8>,
        signer: &dyn Signer,
    ) -> Self {
        KeyRecord {
            identity: identity.into(),
            affiliation: affiliation.into(),
            public_key_digest: digest::digest_name(&public_key),
            signing_key_digest: digest::digest_name(signer.public_key_der()),
            public_key,
        }
    }

    /// The JSON document published next to the key, expiring at `valid_to` (epoch seconds).
    pub fn info_payload(&self, valid_to: u64) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&Info {
            identity: &self.identity,
            affiliation: &self.affiliation,
            valid_to,
        })
    }
}
