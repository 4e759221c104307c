//! # ccnd over TCP
//!
//! Interests and content objects are exchanged as a plain stream of ccnb elements. The daemon
//! never answers negatively: an absent object shows up as silence until the timeout expires.
//!
//! Writing goes through the repository's start-write command. Expressing
//! `<name>/%C1.R.sw/<nonce>` asks the repository to fetch `<name>`; the object itself is then
//! written to the daemon, which hands it to the repository's matching interest.
#[cfg(test)]
mod test;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{Fetched, RepoError, Repository, FETCH_TIMEOUT};
use crate::ccnb::{dtag, DecodeError, Element, Encoder, MAX_MESSAGE_SIZE};
use crate::content::{ContentObject, ContentType};
use crate::name::{Component, Name};

const START_WRITE: &[u8] = b"\xC1.R.sw";
const NONCE_MARKER: &[u8] = b"\xC1.N\x00";
const READ_CHUNK: usize = 8 * 1024;
/// Ask for the rightmost, that is newest, match.
const RIGHTMOST_CHILD: &str = "1";

/// A connection to ccnd.
#[derive(Debug)]
pub struct TcpRepository {
    stream: TcpStream,
    buf: Vec<u8>,
    ack_timeout: Duration,
}

impl TcpRepository {
    /// Open a connection; any failure is [`RepoError::Unavailable`].
    #[tracing::instrument(err)]
    pub async fn connect(addr: &str) -> Result<Self, RepoError> {
        let stream = TcpStream::connect(addr).await.map_err(RepoError::Unavailable)?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "connected to ccnd");
        Ok(TcpRepository {
            stream,
            buf: Vec::with_capacity(READ_CHUNK),
            ack_timeout: FETCH_TIMEOUT,
        })
    }

    /// Override how long a start-write command waits for the repository.
    #[must_use]
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    async fn express(
        &mut self,
        name: &Name,
        scope: Option<u8>,
        lifetime: Duration,
    ) -> Result<(), RepoError> {
        let interest = interest(name, scope, lifetime);
        self.stream
            .write_all(&interest)
            .await
            .map_err(RepoError::Unavailable)?;
        tracing::trace!(%name, "expressed interest");
        Ok(())
    }

    /// Read elements until a content object under `name` arrives.
    async fn answer(&mut self, name: &Name) -> Result<ContentObject, RepoError> {
        loop {
            match Element::decode(&self.buf) {
                Ok((element, used)) => {
                    let frame: Vec<u8> = self.buf.drain(..used).collect();
                    if element.dtag != dtag::CONTENT_OBJECT {
                        continue;
                    }
                    let (object, _) = ContentObject::decode(&frame)?;
                    if name.is_prefix_of(object.name()) {
                        return Ok(object);
                    }
                    tracing::trace!(name = %object.name(), "ignoring unrelated content object");
                },
                Err(DecodeError::Incomplete) => {
                    if self.buf.len() >= MAX_MESSAGE_SIZE {
                        self.buf.clear();
                        return Err(DecodeError::TooLarge.into());
                    }
                    let mut chunk = [0u8; READ_CHUNK];
                    let n = self
                        .stream
                        .read(&mut chunk)
                        .await
                        .map_err(RepoError::Unavailable)?;
                    if n == 0 {
                        return Err(RepoError::Unavailable(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "ccnd closed the connection",
                        )));
                    }
                    self.buf.extend_from_slice(&chunk[..n]);
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn request(
        &mut self,
        name: &Name,
        scope: Option<u8>,
        timeout: Duration,
    ) -> Result<ContentObject, RepoError> {
        self.express(name, scope, timeout).await?;
        tokio::time::timeout(timeout, self.answer(name))
            .await
            .map_err(|_| RepoError::Timeout(name.clone()))?
    }
}

/// `<Interest><Name/><ChildSelector/>[<Scope/>]<InterestLifetime/><Nonce/></Interest>`
fn interest(name: &Name, scope: Option<u8>, lifetime: Duration) -> Vec<u8> {
    let mut nonce = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut enc = Encoder::new();
    enc.begin(dtag::INTEREST);
    name.encode(&mut enc);
    enc.tagged_udata(dtag::CHILD_SELECTOR, RIGHTMOST_CHILD);
    if let Some(scope) = scope {
        enc.tagged_udata(dtag::SCOPE, &scope.to_string());
    }
    enc.tagged_blob(dtag::INTEREST_LIFETIME, &lifetime_bytes(lifetime));
    enc.tagged_blob(dtag::NONCE, &nonce);
    enc.end();
    enc.finish()
}

/// Lifetime in units of 1/4096 s, big-endian without leading zeros.
fn lifetime_bytes(lifetime: Duration) -> Vec<u8> {
    let ticks = lifetime.as_millis().saturating_mul(4096) / 1000;
    let ticks = u64::try_from(ticks).unwrap_or(u64::MAX);
    let bytes = ticks.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(bytes.len() - 1);
    bytes[skip..].to_vec()
}

fn start_write_name(object: &ContentObject) -> Name {
    let name = object.name();
    let base = match name.last().and_then(Component::as_segment) {
        Some(_) => name.prefix(name.len() - 1),
        None => name.clone(),
    };
    let mut nonce = NONCE_MARKER.to_vec();
    let mut random = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random);
    nonce.extend_from_slice(&random);
    base.append(START_WRITE).append(nonce)
}

#[async_trait]
impl Repository for TcpRepository {
    #[tracing::instrument(skip_all, fields(%name, ?timeout))]
    async fn fetch(&mut self, name: &Name, timeout: Duration) -> Result<Fetched, RepoError> {
        self.request(name, None, timeout).await.map(Fetched::Found)
    }

    #[tracing::instrument(skip_all, fields(name = %object.name()))]
    async fn publish(&mut self, object: &ContentObject) -> Result<(), RepoError> {
        let command = start_write_name(object);
        let ack_timeout = self.ack_timeout;
        match self.request(&command, Some(1), ack_timeout).await {
            // a gone reply is the repository declining the write
            Ok(reply) if reply.content_type() == ContentType::Gone => {
                return Err(RepoError::Rejected(
                    object.name().clone(),
                    String::from_utf8_lossy(reply.payload()).into_owned(),
                ));
            },
            Ok(_) => tracing::debug!("repository accepted start-write"),
            Err(RepoError::Timeout(_)) => {
                tracing::debug!("no start-write acknowledgement, writing anyway")
            },
            Err(e) => return Err(e),
        }
        self.stream
            .write_all(object.as_bytes())
            .await
            .map_err(RepoError::Unavailable)?;
        self.stream.flush().await.map_err(RepoError::Unavailable)?;
        Ok(())
    }
}
