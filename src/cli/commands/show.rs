use super::{parse_name, ConfigArgs};
use crate::cli::logging::LogValue;
use crate::cli::store;

use ccn::name::Name;
use ccn::publish::error::PublishError;
use ccn::store::{Fetched, Repository, FETCH_TIMEOUT};
use ccn::{digest, key};
use ccn::{ContentObject, ContentType, SliceDescriptor, Verifier};
use clap::Parser;
use config::{require, Config};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Serialize)]
pub(in super::super) struct ShowArgs {
    /// Name to look under; the newest object with this prefix is shown
    #[serde(skip)]
    name: String,

    /// Seconds to wait for an answer
    #[arg(long, value_name = "SECS", default_value_t = FETCH_TIMEOUT.as_secs())]
    #[serde(skip)]
    timeout: u64,

    /// Follow the key locators and check every signature up to a trusted key
    #[arg(long)]
    #[serde(skip)]
    verify: bool,

    /// Public key (PEM or DER) to trust as the end of a chain; repeatable
    #[arg(long, value_name = "FILE", requires = "verify")]
    #[serde(skip)]
    anchor: Vec<PathBuf>,

    #[command(flatten)]
    #[serde(flatten)]
    source: ConfigArgs,
}

/// What `show` prints for an object.
#[derive(Serialize, Debug, PartialEq)]
struct Description {
    name: String,
    #[serde(rename = "type")]
    content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    freshness: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_locator: Option<String>,
    publisher: String,
    #[serde(rename = "final")]
    is_final: bool,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    slice: Option<SliceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<serde_json::Value>,
    /// Keys that signed the object and each key above it, innermost first.
    #[serde(skip_serializing_if = "Option::is_none")]
    verified: Option<Vec<String>>,
}

#[derive(Serialize, Debug, PartialEq)]
struct SliceSummary {
    topology: String,
    prefix: String,
    filters: Vec<String>,
}

impl From<&SliceDescriptor> for SliceSummary {
    fn from(slice: &SliceDescriptor) -> Self {
        SliceSummary {
            topology: slice.topology().to_string(),
            prefix: slice.prefix().to_string(),
            filters: slice.filters().iter().map(ToString::to_string).collect(),
        }
    }
}

impl From<&ContentObject> for Description {
    fn from(object: &ContentObject) -> Self {
        let payload = object.payload();
        let (slice, info) = match object.content_type() {
            ContentType::Data => match SliceDescriptor::decode(payload) {
                Ok(slice) => (Some(SliceSummary::from(&slice)), None),
                Err(_) => (None, serde_json::from_slice(payload).ok()),
            },
            ContentType::Gone | ContentType::Key => (None, None),
        };

        Description {
            name: object.name().to_string(),
            content_type: format!("{:?}", object.content_type()),
            freshness: object.freshness(),
            key_locator: object.key_locator().map(ToString::to_string),
            publisher: digest::name_safe_base64(object.publisher_digest()),
            is_final: object.is_final(),
            size: payload.len(),
            slice,
            info,
            verified: None,
        }
    }
}

pub(super) async fn run(args: ShowArgs) -> anyhow::Result<()> {
    let config = Config::load(args.source.config.as_deref(), &args)?;
    let repository = require(&config.repository, "repository")?;
    let name = parse_name(&args.name)?;

    let anchors = args
        .anchor
        .iter()
        .map(|path| key::load_public_key(path).map_err(PublishError::from))
        .collect::<Result<Vec<_>, _>>()?;
    let timeout = Duration::from_secs(args.timeout);

    let mut repo = store::connect(repository).await?;
    let object = fetch(&mut repo, &name, timeout).await?;
    let mut description = Description::from(&object);
    if args.verify {
        description.verified = Some(verify(&mut repo, &object, anchors, timeout).await?);
    }
    println!("{}", description.as_json());
    Ok(())
}

async fn fetch<R: Repository + ?Sized>(
    repo: &mut R,
    name: &Name,
    timeout: Duration,
) -> anyhow::Result<ContentObject> {
    match repo.fetch(name, timeout).await.map_err(PublishError::from)? {
        Fetched::Found(object) => {
            tracing::debug!(requested = %name, found = %object.name(), "fetched");
            Ok(object)
        },
        Fetched::NotFound => anyhow::bail!("no object under {name}"),
    }
}

/// Names of the keys vouching for `object`, up to one of `anchors`.
async fn verify<R: Repository + ?Sized>(
    repo: &mut R,
    object: &ContentObject,
    anchors: Vec<Vec<u8>>,
    timeout: Duration,
) -> anyhow::Result<Vec<String>> {
    let hops = Verifier::new(repo, anchors)
        .timeout(timeout)
        .verify(object)
        .await?;
    for hop in &hops {
        tracing::info!(name = %hop.name, key = %hop.key, "Verified");
    }
    Ok(hops.iter().map(|hop| hop.key.to_string()).collect())
}
