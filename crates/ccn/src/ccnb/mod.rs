//! # ccnb Binary Encoding
//!
//! The compact binary XML encoding used on the wire by CCNx. Every token starts with a
//! variable length header: a big-endian base-128 number whose final byte has the high bit
//! set and carries four value bits plus a three bit token type. Elements are identified by
//! a numeric dictionary tag and terminated by a single `0x00` byte.
//!
//! The encoding is canonical: headers never carry leading zero groups, so decoding and
//! re-encoding an element yields the original bytes. Signatures and content-addressed names
//! rely on that property.
#[cfg(test)]
mod tests;

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Dictionary tags for the elements this crate reads and writes.
pub mod dtag {
    pub const NAME: u32 = 14;
    pub const COMPONENT: u32 = 15;
    pub const CONTENT: u32 = 19;
    pub const SIGNED_INFO: u32 = 20;
    pub const INTEREST: u32 = 26;
    pub const KEY_LOCATOR: u32 = 28;
    pub const KEY_NAME: u32 = 29;
    pub const SIGNATURE: u32 = 37;
    pub const CHILD_SELECTOR: u32 = 38;
    pub const TIMESTAMP: u32 = 39;
    pub const TYPE: u32 = 40;
    pub const NONCE: u32 = 41;
    pub const SCOPE: u32 = 42;
    pub const INTEREST_LIFETIME: u32 = 48;
    pub const SIGNATURE_BITS: u32 = 54;
    pub const DIGEST_ALGORITHM: u32 = 55;
    pub const FRESHNESS_SECONDS: u32 = 58;
    pub const FINAL_BLOCK_ID: u32 = 59;
    pub const PUBLISHER_PUBLIC_KEY_DIGEST: u32 = 60;
    pub const CONTENT_OBJECT: u32 = 64;
    pub const SYNC_VERSION: u32 = 118;
    pub const SYNC_CONFIG_SLICE: u32 = 124;
    pub const SYNC_CONFIG_SLICE_LIST: u32 = 125;
}

/// The token type stored in the low bits of a header's final byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenType {
    Ext = 0,
    Tag = 1,
    DTag = 2,
    Attr = 3,
    DAttr = 4,
    Blob = 5,
    UData = 6,
}

const TT_BITS: u32 = 3;
const TT_MASK: u8 = 0x07;
const TT_HBIT: u8 = 0x80;
const MAX_TINY: u64 = 0x0f;
const CLOSE: u8 = 0x00;

/// Deepest element nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 64;
/// Largest message ccnd puts on the wire.
pub const MAX_MESSAGE_SIZE: usize = 8800;

impl TryFrom<u8> for TokenType {
    type Error = DecodeError;

    fn try_from(tt: u8) -> Result<Self, Self::Error> {
        Ok(match tt {
            0 => TokenType::Ext,
            1 => TokenType::Tag,
            2 => TokenType::DTag,
            3 => TokenType::Attr,
            4 => TokenType::DAttr,
            5 => TokenType::Blob,
            6 => TokenType::UData,
            other => return Err(DecodeError::Unsupported(other)),
        })
    }
}

/// Errors encountered while decoding ccnb input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// The input ended before the outermost element was closed.
    #[error("ccnb input ended before the element was closed")]
    Incomplete,
    /// The token type is valid ccnb but is never produced by the peers we talk to.
    #[error("unsupported ccnb token type {0}")]
    Unsupported(u8),
    /// A header value does not fit in 64 bits.
    #[error("ccnb header value overflows")]
    Overflow,
    /// The input does not start with the element that was expected.
    #[error("expected a <{0}> element")]
    Unexpected(&'static str),
    /// A UDATA token is not valid UTF-8.
    #[error("ccnb UDATA is not valid UTF-8")]
    Utf8,
    /// A mandatory child element is absent.
    #[error("missing required <{0}> element")]
    Missing(&'static str),
    /// A numeric UDATA value could not be parsed.
    #[error("invalid number in <{0}>")]
    Number(&'static str),
    /// Elements are nested deeper than [`MAX_DEPTH`].
    #[error("ccnb elements nested deeper than {MAX_DEPTH}")]
    TooDeep,
    /// A message grew past [`MAX_MESSAGE_SIZE`] without completing.
    #[error("ccnb message exceeds {MAX_MESSAGE_SIZE} bytes")]
    TooLarge,
}

/// Builds ccnb encoded bytes.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
    open: usize,
}

impl Encoder {
    /// Create an empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&mut self, val: u64, tt: TokenType) {
        let mut tmp = [0u8; 10];
        let mut i = tmp.len() - 1;
        tmp[i] = TT_HBIT | (((val & MAX_TINY) as u8) << TT_BITS) | (tt as u8 & TT_MASK);
        let mut rest = val >> (7 - TT_BITS);
        while rest != 0 {
            i -= 1;
            tmp[i] = (rest as u8) & !TT_HBIT;
            rest >>= 7;
        }
        self.buf.extend_from_slice(&tmp[i..]);
    }

    /// Open an element with the given dictionary tag.
    pub fn begin(&mut self, dtag: u32) -> &mut Self {
        self.header(u64::from(dtag), TokenType::DTag);
        self.open += 1;
        self
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> &mut Self {
        debug_assert!(self.open > 0, "closing an element that was never opened");
        self.buf.push(CLOSE);
        self.open = self.open.saturating_sub(1);
        self
    }

    /// Write a BLOB token. Empty blobs produce no token at all.
    pub fn blob(&mut self, bytes: &[u8]) -> &mut Self {
        if !bytes.is_empty() {
            self.header(bytes.len() as u64, TokenType::Blob);
            self.buf.extend_from_slice(bytes);
        }
        self
    }

    /// Write a UDATA token. Empty strings produce no token at all.
    pub fn udata(&mut self, s: &str) -> &mut Self {
        if !s.is_empty() {
            self.header(s.len() as u64, TokenType::UData);
            self.buf.extend_from_slice(s.as_bytes());
        }
        self
    }

    /// Write `<dtag>BLOB</dtag>`.
    pub fn tagged_blob(&mut self, dtag: u32, bytes: &[u8]) -> &mut Self {
        self.begin(dtag).blob(bytes).end()
    }

    /// Write `<dtag>UDATA</dtag>`.
    pub fn tagged_udata(&mut self, dtag: u32, s: &str) -> &mut Self {
        self.begin(dtag).udata(s).end()
    }

    /// Append bytes that are already ccnb encoded.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Return the encoded bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        debug_assert_eq!(self.open, 0, "unterminated ccnb element");
        self.buf
    }
}

/// A decoded child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Blob(Vec<u8>),
    UData(String),
}

/// A decoded ccnb element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub dtag: u32,
    pub children: Vec<Node>,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Read the next header, returning `None` for an element close.
    fn header(&mut self) -> Result<Option<(u64, TokenType)>, DecodeError> {
        let mut val: u64 = 0;
        let mut first = true;
        loop {
            let b = *self.buf.get(self.pos).ok_or(DecodeError::Incomplete)?;
            self.pos += 1;
            if b & TT_HBIT != 0 {
                if val > u64::MAX >> 4 {
                    return Err(DecodeError::Overflow);
                }
                val = (val << 4) | u64::from((b >> TT_BITS) & MAX_TINY as u8);
                return Ok(Some((val, TokenType::try_from(b & TT_MASK)?)));
            }
            if first && b == CLOSE {
                return Ok(None);
            }
            if val > u64::MAX >> 7 {
                return Err(DecodeError::Overflow);
            }
            val = (val << 7) | u64::from(b);
            first = false;
        }
    }

    fn take(&mut self, n: u64) -> Result<&'a [u8], DecodeError> {
        let n = usize::try_from(n).map_err(|_| DecodeError::Overflow)?;
        let end = self.pos.checked_add(n).ok_or(DecodeError::Overflow)?;
        let bytes = self.buf.get(self.pos..end).ok_or(DecodeError::Incomplete)?;
        self.pos = end;
        Ok(bytes)
    }

    fn element(&mut self, dtag: u32, depth: usize) -> Result<Element, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::TooDeep);
        }
        let mut children = Vec::new();
        while let Some((val, tt)) = self.header()? {
            let node = match tt {
                TokenType::DTag => {
                    let dtag = u32::try_from(val).map_err(|_| DecodeError::Overflow)?;
                    Node::Element(self.element(dtag, depth + 1)?)
                },
                TokenType::Blob => Node::Blob(self.take(val)?.to_vec()),
                TokenType::UData => {
                    let s = std::str::from_utf8(self.take(val)?).map_err(|_| DecodeError::Utf8)?;
                    Node::UData(s.to_owned())
                },
                other => return Err(DecodeError::Unsupported(other as u8)),
            };
            children.push(node);
        }
        Ok(Element { dtag, children })
    }
}

impl Element {
    /// Decode one complete element from the front of `buf`.
    ///
    /// Returns the element and the number of bytes it occupied. A buffer holding only part of
    /// an element yields [`DecodeError::Incomplete`], which stream readers use as the signal
    /// to wait for more input.
    pub fn decode(buf: &[u8]) -> Result<(Element, usize), DecodeError> {
        let mut cursor = Cursor { buf, pos: 0 };
        match cursor.header()? {
            Some((val, TokenType::DTag)) => {
                let dtag = u32::try_from(val).map_err(|_| DecodeError::Overflow)?;
                let element = cursor.element(dtag, 1)?;
                Ok((element, cursor.pos))
            },
            _ => Err(DecodeError::Unexpected("element")),
        }
    }

    /// Decode an element and require it to carry `dtag`.
    pub fn decode_as(
        buf: &[u8],
        dtag: u32,
        what: &'static str,
    ) -> Result<(Element, usize), DecodeError> {
        let (element, used) = Element::decode(buf)?;
        if element.dtag != dtag {
            return Err(DecodeError::Unexpected(what));
        }
        Ok((element, used))
    }

    /// Iterate over the child elements carrying `dtag`.
    pub fn children_with(&self, dtag: u32) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(move |node| match node {
            Node::Element(e) if e.dtag == dtag => Some(e),
            _ => None,
        })
    }

    /// The first child element carrying `dtag`.
    #[must_use]
    pub fn child(&self, dtag: u32) -> Option<&Element> {
        self.children_with(dtag).next()
    }

    /// The first child element carrying `dtag`, or [`DecodeError::Missing`].
    pub fn require(&self, dtag: u32, what: &'static str) -> Result<&Element, DecodeError> {
        self.child(dtag).ok_or(DecodeError::Missing(what))
    }

    /// The concatenated BLOB payload of this element; empty when it has none.
    #[must_use]
    pub fn blob(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for node in &self.children {
            if let Node::Blob(b) = node {
                out.extend_from_slice(b);
            }
        }
        out
    }

    /// The concatenated UDATA text of this element.
    #[must_use]
    pub fn udata(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            if let Node::UData(s) = node {
                out.push_str(s);
            }
        }
        out
    }

    /// Write this element back out.
    pub fn encode(&self, enc: &mut Encoder) {
        enc.begin(self.dtag);
        for node in &self.children {
            match node {
                Node::Element(e) => e.encode(enc),
                Node::Blob(b) => {
                    enc.blob(b);
                },
                Node::UData(s) => {
                    enc.udata(s);
                },
            }
        }
        enc.end();
    }
}

/// Encode a point in time the way CCNx does: seconds since the epoch scaled by 4096 plus the
/// binary fraction, as a big-endian number without leading zero bytes.
#[must_use]
pub fn ccn_time(at: SystemTime) -> Vec<u8> {
    let since = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let fraction = (u64::from(since.subsec_nanos()) * 4096) / 1_000_000_000;
    let ts = (since.as_secs() << 12) | fraction;
    let bytes = ts.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(bytes.len() - 1);
    bytes[skip..].to_vec()
}
