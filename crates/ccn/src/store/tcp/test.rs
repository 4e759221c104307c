use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use super::*;
use crate::content::SigningTemplate;
use crate::key::Ed25519Signer;

/// Read one ccnb element from a fake ccnd peer.
async fn read_element(
    stream: &mut TcpStream,
    buf: &mut Vec<u8>,
) -> anyhow::Result<(Element, Vec<u8>)> {
    loop {
        match Element::decode(buf) {
            Ok((element, used)) => return Ok((element, buf.drain(..used).collect())),
            Err(DecodeError::Incomplete) => {
                let mut chunk = [0u8; 1024];
                let n = stream.read(&mut chunk).await?;
                anyhow::ensure!(n > 0, "client hung up");
                buf.extend_from_slice(&chunk[..n]);
            },
            Err(e) => return Err(e.into()),
        }
    }
}

fn interest_name(interest: &Element) -> anyhow::Result<Name> {
    anyhow::ensure!(interest.dtag == dtag::INTEREST, "expected an interest");
    Ok(Name::from_element(interest.require(dtag::NAME, "Name")?)?)
}

fn object(
    name: &str,
    content_type: ContentType,
    payload: &[u8],
) -> anyhow::Result<ContentObject> {
    let signer = Ed25519Signer::from_bytes(&[5; 32])?;
    Ok(ContentObject::build(
        &Name::parse(name)?,
        &SigningTemplate::new(content_type),
        payload,
        &signer,
    )?)
}

async fn listener() -> anyhow::Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();
    Ok((listener, addr))
}

#[tokio::test]
async fn connect_refused_is_unavailable() {
    let result = TcpRepository::connect("127.0.0.1:1").await;
    assert!(matches!(result, Err(RepoError::Unavailable(_))));
}

#[tokio::test]
async fn fetch_answers_with_matching_object() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    let unrelated = object("/other", ContentType::Data, b"noise")?;
    let wanted = object("/ndn/keys/abc", ContentType::Key, b"key")?;
    let reply = wanted.clone();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = Vec::new();
        let (interest, _) = read_element(&mut stream, &mut buf).await?;
        let name = interest_name(&interest)?;
        let nonce = interest.child(dtag::NONCE).map(Element::blob);
        anyhow::ensure!(nonce.map(|n| n.len()) == Some(8), "interest without nonce");
        anyhow::ensure!(
            interest.child(dtag::INTEREST_LIFETIME).is_some(),
            "interest without lifetime"
        );
        let selector = interest.child(dtag::CHILD_SELECTOR).map(Element::udata);
        anyhow::ensure!(selector.as_deref() == Some("1"), "interest asks for the oldest match");
        // unrelated traffic is skipped, and the reply is split across writes
        stream.write_all(unrelated.as_bytes()).await?;
        let (head, tail) = reply.as_bytes().split_at(5);
        stream.write_all(head).await?;
        stream.flush().await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(tail).await?;
        anyhow::Ok(name)
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    let fetched = repo
        .fetch(&Name::parse("/ndn/keys/abc")?, Duration::from_secs(5))
        .await?;
    assert_eq!(fetched, Fetched::Found(wanted));
    assert_eq!(server.await??.to_string(), "/ndn/keys/abc");
    Ok(())
}

#[tokio::test]
async fn silence_is_a_timeout() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    let (done, hold) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let _ = hold.await;
        drop(stream);
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    let result = repo
        .fetch(&Name::parse("/ndn/keys")?, Duration::from_millis(100))
        .await;
    assert!(matches!(result, Err(RepoError::Timeout(_))));
    let _ = done.send(());
    Ok(())
}

#[tokio::test]
async fn hangup_is_unavailable() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        drop(stream);
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    let result = repo
        .fetch(&Name::parse("/ndn/keys")?, Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(RepoError::Unavailable(_))));
    Ok(())
}

#[tokio::test]
async fn publish_sends_start_write_then_object() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    let published = object("/ndn/keys/abc", ContentType::Key, b"key")?;
    let expected = published.as_bytes().to_vec();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = Vec::new();
        let (interest, _) = read_element(&mut stream, &mut buf).await?;
        let command = interest_name(&interest)?;
        anyhow::ensure!(interest.child(dtag::SCOPE).is_some(), "start-write without scope");
        let ack = ContentObject::build(
            &command,
            &SigningTemplate::new(ContentType::Data),
            b"ok",
            &Ed25519Signer::from_bytes(&[6; 32])?,
        )?;
        stream.write_all(ack.as_bytes()).await?;
        let (_, written) = read_element(&mut stream, &mut buf).await?;
        let _ = tx.send((command, written));
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    repo.publish(&published).await?;

    let (command, written) = rx.await?;
    assert_eq!(written, expected);
    assert_eq!(command.len(), 5);
    assert!(Name::parse("/ndn/keys/abc/%C1.R.sw")?.is_prefix_of(&command));
    Ok(())
}

#[tokio::test]
async fn publish_without_ack_still_writes() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    let published = object("/slice", ContentType::Data, b"bytes")?;
    let expected = published.as_bytes().to_vec();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = Vec::new();
        let _ = read_element(&mut stream, &mut buf).await?;
        let (_, written) = read_element(&mut stream, &mut buf).await?;
        let _ = tx.send(written);
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr)
        .await?
        .with_ack_timeout(Duration::from_millis(50));
    repo.publish(&published).await?;
    assert_eq!(rx.await?, expected);
    Ok(())
}

#[tokio::test]
async fn gone_ack_is_a_rejection() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = Vec::new();
        let (interest, _) = read_element(&mut stream, &mut buf).await?;
        let nack = ContentObject::build(
            &interest_name(&interest)?,
            &SigningTemplate::new(ContentType::Gone),
            b"",
            &Ed25519Signer::from_bytes(&[6; 32])?,
        )?;
        stream.write_all(nack.as_bytes()).await?;
        // keep the connection open until the client is done
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    let result = repo.publish(&object("/slice", ContentType::Data, b"x")?).await;
    assert!(matches!(result, Err(RepoError::Rejected(..))));
    Ok(())
}

#[tokio::test]
async fn oversized_reply_is_malformed() -> anyhow::Result<()> {
    let (listener, addr) = listener().await?;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = Vec::new();
        let _ = read_element(&mut stream, &mut buf).await?;
        // an element that opens and never closes
        stream.write_all(&[0x04, 0x82]).await?;
        stream.write_all(&vec![0x9D; 3 * MAX_MESSAGE_SIZE]).await?;
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
        anyhow::Ok(())
    });

    let mut repo = TcpRepository::connect(&addr).await?;
    let result = repo
        .fetch(&Name::parse("/ndn/keys")?, Duration::from_secs(5))
        .await;
    assert!(matches!(result, Err(RepoError::Decode(DecodeError::TooLarge))));
    Ok(())
}

#[test]
fn interest_selects_the_newest_child() -> anyhow::Result<()> {
    let bytes = interest(&Name::parse("/ndn/keys/abc")?, Some(1), Duration::from_secs(6));
    let (element, _) = Element::decode(&bytes)?;
    let order: Vec<u32> = element
        .children
        .iter()
        .filter_map(|node| match node {
            crate::ccnb::Node::Element(e) => Some(e.dtag),
            _ => None,
        })
        .collect();
    assert_eq!(
        order,
        [
            dtag::NAME,
            dtag::CHILD_SELECTOR,
            dtag::SCOPE,
            dtag::INTEREST_LIFETIME,
            dtag::NONCE
        ]
    );
    Ok(())
}

#[test]
fn lifetime_ticks() {
    assert_eq!(lifetime_bytes(Duration::from_secs(6)), vec![0x60, 0x00]);
    assert_eq!(lifetime_bytes(Duration::ZERO), vec![0x00]);
    assert_eq!(lifetime_bytes(Duration::MAX), vec![0xFF; 8]);
}
