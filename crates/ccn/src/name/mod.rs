//! # Names
//!
//! Hierarchical names addressing content in the repository. A [`Name`] is an ordered list
//! of opaque byte string [`Component`]s; equality is component-wise.
//!
//! The textual form is the `ccnx:` URI scheme: components are separated by `/`, bytes outside
//! the unreserved set are percent-escaped and a component made of periods only is written
//! with three extra periods, so the empty component is `...`.
#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use nom::bytes::complete::{tag_no_case, take_while};
use nom::character::complete::char;
use nom::combinator::{all_consuming, opt};
use nom::multi::many1;
use nom::sequence::preceded;
use nom::IResult;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::ccnb::{self, dtag, DecodeError, Element, Encoder};

const SEGMENT_MARKER: u8 = 0x00;
const VERSION_MARKER: u8 = 0xFD;

/// Errors produced while parsing a textual name.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NameError {
    /// The input is not of the form `[ccnx:]/component/...`.
    #[error("not a name: {0:?}")]
    Syntax(String),
    /// A `%` is not followed by two hex digits.
    #[error("invalid percent escape in {0:?}")]
    Escape(String),
    /// A character that must be escaped appears literally.
    #[error("reserved character {0:?} in name component")]
    Reserved(char),
    /// `.` and `..` have no meaning inside a name.
    #[error("relative component {0:?} in name")]
    Relative(String),
}

/// One opaque component of a [`Name`].
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Component(Vec<u8>);

impl Component {
    /// A sequence number marker component.
    #[must_use]
    pub fn segment(n: u64) -> Self {
        let mut bytes = vec![SEGMENT_MARKER];
        bytes.extend(minimal_be(n));
        Component(bytes)
    }

    /// A version marker component holding a ccn timestamp.
    #[must_use]
    pub fn version(at: SystemTime) -> Self {
        let mut bytes = vec![VERSION_MARKER];
        bytes.extend(ccnb::ccn_time(at));
        Component(bytes)
    }

    /// The value of a sequence number marker component.
    #[must_use]
    pub fn as_segment(&self) -> Option<u64> {
        match self.0.split_first() {
            Some((&SEGMENT_MARKER, rest)) if rest.len() <= 8 => {
                Some(rest.iter().fold(0, |n, &b| (n << 8) | u64::from(b)))
            },
            _ => None,
        }
    }

    /// Whether this is a version marker component.
    #[must_use]
    pub fn is_version(&self) -> bool {
        self.0.first() == Some(&VERSION_MARKER) && self.0.len() > 1
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn minimal_be(n: u64) -> Vec<u8> {
    let bytes = n.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Component(s.as_bytes().to_vec())
    }
}

impl From<String> for Component {
    fn from(s: String) -> Self {
        Component(s.into_bytes())
    }
}

impl From<&[u8]> for Component {
    fn from(b: &[u8]) -> Self {
        Component(b.to_vec())
    }
}

impl From<Vec<u8>> for Component {
    fn from(b: Vec<u8>) -> Self {
        Component(b)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|&b| b == b'.') {
            f.write_str("...")?;
        }
        for &b in &self.0 {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "%{b:02X}")?;
            }
        }
        Ok(())
    }
}

/// A hierarchical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    components: Vec<Component>,
}

fn segments(input: &str) -> IResult<&str, Vec<&str>> {
    all_consuming(preceded(
        opt(tag_no_case("ccnx:")),
        many1(preceded(char('/'), take_while(|c| c != '/'))),
    ))(input)
}

fn is_pchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';'
                | '=' | ':' | '@'
        )
}

fn unescape(segment: &str) -> Result<Vec<u8>, NameError> {
    let mut out = Vec::with_capacity(segment.len());
    let mut chars = segment.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '%' {
            let hex = segment
                .get(i + 1..i + 3)
                .filter(|h| h.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| NameError::Escape(segment.to_owned()))?;
            out.push(
                u8::from_str_radix(hex, 16).map_err(|_| NameError::Escape(segment.to_owned()))?,
            );
            chars.nth(1);
        } else if is_pchar(c) {
            out.push(c as u8);
        } else {
            return Err(NameError::Reserved(c));
        }
    }
    Ok(out)
}

impl Name {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `ccnx:` URI into a name.
    pub fn parse(uri: &str) -> Result<Self, NameError> {
        let (_, parts) = segments(uri).map_err(|_| NameError::Syntax(uri.to_owned()))?;
        let mut components = Vec::with_capacity(parts.len());
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            let mut bytes = unescape(part)?;
            if bytes.iter().all(|&b| b == b'.') {
                if bytes.len() < 3 {
                    return Err(NameError::Relative(part.to_owned()));
                }
                bytes.truncate(bytes.len() - 3);
            }
            components.push(Component(bytes));
        }
        Ok(Name { components })
    }

    /// A new name with `component` added at the end.
    #[must_use]
    pub fn append(&self, component: impl Into<Component>) -> Self {
        let mut next = self.clone();
        next.components.push(component.into());
        next
    }

    /// A new name made of this name followed by every component of `other`.
    #[must_use]
    pub fn join(&self, other: &Name) -> Self {
        let mut next = self.clone();
        next.components.extend(other.components.iter().cloned());
        next
    }

    #[must_use]
    pub fn append_segment(&self, n: u64) -> Self {
        self.append(Component::segment(n))
    }

    #[must_use]
    pub fn append_version(&self, at: SystemTime) -> Self {
        self.append(Component::version(at))
    }

    /// Whether every component of `self` matches the start of `other`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self.components.iter().zip(&other.components).all(|(a, b)| a == b)
    }

    /// The first `n` components.
    #[must_use]
    pub fn prefix(&self, n: usize) -> Self {
        Name {
            components: self.components.iter().take(n).cloned().collect(),
        }
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    #[must_use]
    pub fn last(&self) -> Option<&Component> {
        self.components.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Write `<Name>(<Component>BLOB</Component>)*</Name>`.
    pub fn encode(&self, enc: &mut Encoder) {
        enc.begin(dtag::NAME);
        for c in &self.components {
            enc.tagged_blob(dtag::COMPONENT, c.as_bytes());
        }
        enc.end();
    }

    #[must_use]
    pub fn to_ccnb(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.encode(&mut enc);
        enc.finish()
    }

    /// Read a name back from a decoded `<Name>` element.
    pub fn from_element(element: &Element) -> Result<Self, DecodeError> {
        if element.dtag != dtag::NAME {
            return Err(DecodeError::Unexpected("Name"));
        }
        let components = element
            .children_with(dtag::COMPONENT)
            .map(|c| Component(c.blob()))
            .collect();
        Ok(Name { components })
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::parse(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

