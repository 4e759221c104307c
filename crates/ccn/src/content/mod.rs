//! # Signed Content Objects
//!
//! A [`ContentObject`] is the immutable unit of publication: a name, the signed metadata
//! describing it, a payload and a signature over all three. Objects are built once from a
//! [`SigningTemplate`], signed by a [`Signer`] and never mutated afterwards.
//!
//! Everything this crate publishes fits in a single segment, so [`ContentObject::build`]
//! appends the segment number `0` to the given name and marks it as the final block.

use std::time::SystemTime;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ccnb::{self, dtag, DecodeError, Element, Encoder};
use crate::name::{Component, Name};

/// The kind of payload an object carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    #[default]
    Data,
    /// Marks a name as withdrawn; the payload is empty.
    Gone,
    /// A DER encoded public key.
    Key,
}

impl ContentType {
    const DATA: [u8; 3] = [0x0C, 0x04, 0xC0];
    const GONE: [u8; 3] = [0x18, 0xE3, 0x44];
    const KEY: [u8; 3] = [0x28, 0x46, 0x3F];

    /// The three byte value written in `<Type>`.
    #[must_use]
    pub fn wire(self) -> [u8; 3] {
        match self {
            ContentType::Data => Self::DATA,
            ContentType::Gone => Self::GONE,
            ContentType::Key => Self::KEY,
        }
    }

    fn from_wire(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b if b == Self::DATA => Some(ContentType::Data),
            b if b == Self::GONE => Some(ContentType::Gone),
            b if b == Self::KEY => Some(ContentType::Key),
            _ => None,
        }
    }
}

/// Parameters shared by every object built with the same signing setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTemplate {
    pub content_type: ContentType,
    /// Seconds a cached copy stays fresh.
    pub freshness: Option<u32>,
    /// Name of the key that verifies the signature.
    pub key_locator: Option<Name>,
    /// Set for objects that consist of exactly one segment.
    pub final_block: bool,
}

impl SigningTemplate {
    #[must_use]
    pub fn new(content_type: ContentType) -> Self {
        SigningTemplate {
            content_type,
            freshness: None,
            key_locator: None,
            final_block: true,
        }
    }

    #[must_use]
    pub fn freshness(mut self, seconds: u32) -> Self {
        self.freshness = Some(seconds);
        self
    }

    #[must_use]
    pub fn key_locator(mut self, name: Name) -> Self {
        self.key_locator = Some(name);
        self
    }
}

/// Errors from building, decoding or verifying content objects.
#[derive(Error, Debug)]
pub enum Error {
    /// The template cannot describe a single segment object.
    #[error("inconsistent signing template: {0}")]
    Template(&'static str),
    /// The signer refused to sign.
    #[error("signer rejected the request: {0}")]
    Signer(String),
    /// The signature does not match the signed bytes.
    #[error("signature verification failed for {0}")]
    Verify(Name),
    /// The public key used for verification could not be read.
    #[error("unusable verification key: {0}")]
    Key(String),
    /// A transparent wrapper for a [`DecodeError`].
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A signing identity.
pub trait Signer: Send + Sync {
    /// Sign `message`, returning the raw signature bits.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error>;
    /// DER encoding of the public half of the signing key.
    fn public_key_der(&self) -> &[u8];
    /// Object identifier of the signature algorithm, recorded in `<DigestAlgorithm>`.
    fn algorithm(&self) -> &'static str;
}

/// A signed, encoded content object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    name: Name,
    content_type: ContentType,
    freshness: Option<u32>,
    final_block: Option<Component>,
    key_locator: Option<Name>,
    publisher: Vec<u8>,
    timestamp: Vec<u8>,
    payload: Vec<u8>,
    algorithm: Option<String>,
    signature: Vec<u8>,
    signed: Vec<u8>,
    encoded: Vec<u8>,
}

impl ContentObject {
    /// Build and sign a single segment object named `name/%00`.
    pub fn build(
        name: &Name,
        template: &SigningTemplate,
        payload: &[u8],
        signer: &dyn Signer,
    ) -> Result<Self, Error> {
        Self::build_at(name, template, payload, signer, SystemTime::now())
    }

    /// [`ContentObject::build`] with an explicit signing time.
    pub fn build_at(
        name: &Name,
        template: &SigningTemplate,
        payload: &[u8],
        signer: &dyn Signer,
        at: SystemTime,
    ) -> Result<Self, Error> {
        if !template.final_block {
            return Err(Error::Template("single segment objects must carry a final block marker"));
        }
        if template.freshness == Some(0) {
            return Err(Error::Template("freshness must be positive"));
        }
        if name.last().and_then(Component::as_segment).is_some() {
            return Err(Error::Template("name already ends in a segment number"));
        }
        if template.content_type == ContentType::Gone && !payload.is_empty() {
            return Err(Error::Template("a gone object carries no payload"));
        }

        let segment = Component::segment(0);
        let name = name.append(segment.clone());

        let mut object = ContentObject {
            name,
            content_type: template.content_type,
            freshness: template.freshness,
            final_block: Some(segment),
            key_locator: template.key_locator.clone(),
            publisher: Sha256::digest(signer.public_key_der()).to_vec(),
            timestamp: ccnb::ccn_time(at),
            payload: payload.to_vec(),
            algorithm: Some(signer.algorithm().to_owned()),
            signature: Vec::new(),
            signed: Vec::new(),
            encoded: Vec::new(),
        };

        let mut enc = Encoder::new();
        object.name.encode(&mut enc);
        object.encode_signed_info(&mut enc);
        enc.tagged_blob(dtag::CONTENT, &object.payload);
        object.signed = enc.finish();
        object.signature = signer.sign(&object.signed)?;
        object.encoded = object.encode();

        tracing::trace!(name = %object.name, bytes = object.encoded.len(), "signed content object");
        Ok(object)
    }

    fn encode_signed_info(&self, enc: &mut Encoder) {
        enc.begin(dtag::SIGNED_INFO);
        enc.tagged_blob(dtag::PUBLISHER_PUBLIC_KEY_DIGEST, &self.publisher);
        enc.tagged_blob(dtag::TIMESTAMP, &self.timestamp);
        if self.content_type != ContentType::Data {
            enc.tagged_blob(dtag::TYPE, &self.content_type.wire());
        }
        if let Some(secs) = self.freshness {
            enc.tagged_udata(dtag::FRESHNESS_SECONDS, &secs.to_string());
        }
        if let Some(block) = &self.final_block {
            enc.tagged_blob(dtag::FINAL_BLOCK_ID, block.as_bytes());
        }
        if let Some(locator) = &self.key_locator {
            enc.begin(dtag::KEY_LOCATOR).begin(dtag::KEY_NAME);
            locator.encode(enc);
            enc.end().end();
        }
        enc.end();
    }

    fn encode(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.begin(dtag::CONTENT_OBJECT).begin(dtag::SIGNATURE);
        if let Some(oid) = &self.algorithm {
            enc.tagged_udata(dtag::DIGEST_ALGORITHM, oid);
        }
        enc.tagged_blob(dtag::SIGNATURE_BITS, &self.signature);
        enc.end();
        enc.raw(&self.signed);
        enc.end();
        enc.finish()
    }

    /// Parse an encoded object, returning it with the number of bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), DecodeError> {
        let (root, used) = Element::decode_as(buf, dtag::CONTENT_OBJECT, "ContentObject")?;
        let signature = root.require(dtag::SIGNATURE, "Signature")?;
        let name_el = root.require(dtag::NAME, "Name")?;
        let info = root.require(dtag::SIGNED_INFO, "SignedInfo")?;
        let content = root.require(dtag::CONTENT, "Content")?;

        let content_type = match info.child(dtag::TYPE) {
            Some(t) => ContentType::from_wire(&t.blob()).ok_or(DecodeError::Unexpected("Type"))?,
            None => ContentType::Data,
        };
        let freshness = info
            .child(dtag::FRESHNESS_SECONDS)
            .map(|f| f.udata().parse().map_err(|_| DecodeError::Number("FreshnessSeconds")))
            .transpose()?;
        let key_locator = info
            .child(dtag::KEY_LOCATOR)
            .and_then(|l| l.child(dtag::KEY_NAME))
            .and_then(|k| k.child(dtag::NAME))
            .map(Name::from_element)
            .transpose()?;

        let mut enc = Encoder::new();
        name_el.encode(&mut enc);
        info.encode(&mut enc);
        content.encode(&mut enc);

        let object = ContentObject {
            name: Name::from_element(name_el)?,
            content_type,
            freshness,
            final_block: info.child(dtag::FINAL_BLOCK_ID).map(|b| Component::from(b.blob())),
            key_locator,
            publisher: info
                .child(dtag::PUBLISHER_PUBLIC_KEY_DIGEST)
                .map(Element::blob)
                .unwrap_or_default(),
            timestamp: info.child(dtag::TIMESTAMP).map(Element::blob).unwrap_or_default(),
            payload: content.blob(),
            algorithm: signature.child(dtag::DIGEST_ALGORITHM).map(Element::udata),
            signature: signature.require(dtag::SIGNATURE_BITS, "SignatureBits")?.blob(),
            signed: enc.finish(),
            encoded: buf[..used].to_vec(),
        };
        Ok((object, used))
    }

    /// Check the signature against a DER encoded Ed25519 public key.
    pub fn verify(&self, public_key_der: &[u8]) -> Result<(), Error> {
        crate::key::verify(public_key_der, &self.signed, &self.signature)
            .map_err(|_| Error::Verify(self.name.clone()))
    }

    /// Full name, including the segment component.
    #[must_use]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn freshness(&self) -> Option<u32> {
        self.freshness
    }

    #[must_use]
    pub fn final_block(&self) -> Option<&Component> {
        self.final_block.as_ref()
    }

    /// Whether this object is the last segment of its content.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.final_block.is_some() && self.final_block.as_ref() == self.name.last()
    }

    #[must_use]
    pub fn key_locator(&self) -> Option<&Name> {
        self.key_locator.as_ref()
    }

    /// SHA-256 of the signer's DER public key.
    #[must_use]
    pub fn publisher_digest(&self) -> &[u8] {
        &self.publisher
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The complete ccnb encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }
}
