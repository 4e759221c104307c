//! Key files and configuration on disk for command tests.
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::SigningKey;
use std::path::PathBuf;
use tempfile::TempDir;

pub(super) struct Fixture {
    dir: TempDir,
    /// PEM public key of the owner being published.
    pub(super) pubkey: PathBuf,
    /// PKCS#8 PEM signing key.
    pub(super) signing: PathBuf,
}

impl Fixture {
    pub(super) fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;

        let signing = dir.path().join("signing.pem");
        let signing_key = SigningKey::from_bytes(&[21; 32]);
        let pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        std::fs::write(&signing, pem.as_bytes())?;

        let pubkey = dir.path().join("owner.pem");
        let owner = SigningKey::from_bytes(&[22; 32]).verifying_key();
        let pem = owner
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        std::fs::write(&pubkey, pem)?;

        Ok(Fixture { dir, pubkey, signing })
    }

    /// Write `<config>{body}</config>` and return its path.
    pub(super) fn config(&self, body: &str) -> anyhow::Result<PathBuf> {
        let path = self.dir.path().join("config.xml");
        std::fs::write(&path, format!("<config>{body}</config>"))?;
        Ok(path)
    }
}
