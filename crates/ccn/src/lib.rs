//! # CCNx Key Publication
//!
//! Named content, its binary encoding and signing, and the protocols that publish keys and
//! sync slices into a repository.
pub mod ccnb;
pub mod content;
pub mod digest;
pub mod key;
pub mod name;
pub mod publish;
pub mod slice;
pub mod store;
pub mod trust;

pub use content::{ContentObject, ContentType, Signer, SigningTemplate};
pub use key::{Ed25519Signer, KeyRecord};
pub use name::{Component, Name};
pub use publish::Publisher;
pub use slice::SliceDescriptor;
pub use store::Repository;
pub use trust::Verifier;
