//! # Sync Slices
//!
//! A slice tells sync peers which namespace to mirror: every name under `prefix`, announced
//! within the `topology` namespace. Its name is derived from the SHA-1 of its canonical
//! encoding, so two publishers describing the same slice always address the same object.

use crate::ccnb::{dtag, DecodeError, Element, Encoder};
use crate::digest::Sha1Digest;
use crate::name::{Name, NameError};

/// The slice format version every peer expects.
pub const SYNC_VERSION: u32 = 20_120_325;

const LOCALHOST_MARKER: &[u8] = b"\xC1.M.S.localhost";
const SLICE_MARKER: &[u8] = b"\xC1.S.cs";

/// A (topology, prefix) pair describing a namespace kept in sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceDescriptor {
    version: u32,
    topology: Name,
    prefix: Name,
    filters: Vec<Name>,
}

impl SliceDescriptor {
    #[must_use]
    pub fn new(topology: Name, prefix: Name) -> Self {
        SliceDescriptor {
            version: SYNC_VERSION,
            topology,
            prefix,
            filters: Vec::new(),
        }
    }

    /// Parse both prefixes and build the descriptor.
    pub fn build(topology: &str, prefix: &str) -> Result<Self, NameError> {
        Ok(Self::new(Name::parse(topology)?, Name::parse(prefix)?))
    }

    #[must_use]
    pub fn topology(&self) -> &Name {
        &self.topology
    }

    #[must_use]
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// Filters are reserved and always empty for slices built here.
    #[must_use]
    pub fn filters(&self) -> &[Name] {
        &self.filters
    }

    /// The encoding that is hashed and published:
    /// `<SyncConfigSlice><SyncVersion/><Name topology/><Name prefix/><SyncConfigSliceList/>`.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.begin(dtag::SYNC_CONFIG_SLICE);
        enc.tagged_udata(dtag::SYNC_VERSION, &self.version.to_string());
        self.topology.encode(&mut enc);
        self.prefix.encode(&mut enc);
        enc.begin(dtag::SYNC_CONFIG_SLICE_LIST);
        for filter in &self.filters {
            filter.encode(&mut enc);
        }
        enc.end();
        enc.end();
        enc.finish()
    }

    /// `/%C1.M.S.localhost/%C1.S.cs/<raw sha1 of the canonical bytes>`.
    #[must_use]
    pub fn identity_name(&self) -> Name {
        Name::new()
            .append(LOCALHOST_MARKER)
            .append(SLICE_MARKER)
            .append(Sha1Digest::compute(&self.canonical_bytes()))
    }

    /// Read a slice back from its canonical bytes.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let (root, _) = Element::decode_as(buf, dtag::SYNC_CONFIG_SLICE, "SyncConfigSlice")?;
        let version = root
            .require(dtag::SYNC_VERSION, "SyncVersion")?
            .udata()
            .parse()
            .map_err(|_| DecodeError::Number("SyncVersion"))?;
        let mut names = root.children_with(dtag::NAME);
        let topology = Name::from_element(names.next().ok_or(DecodeError::Missing("Name"))?)?;
        let prefix = Name::from_element(names.next().ok_or(DecodeError::Missing("Name"))?)?;
        let filters = root
            .require(dtag::SYNC_CONFIG_SLICE_LIST, "SyncConfigSliceList")?
            .children_with(dtag::NAME)
            .map(Name::from_element)
            .collect::<Result<_, _>>()?;
        Ok(SliceDescriptor {
            version,
            topology,
            prefix,
            filters,
        })
    }
}
