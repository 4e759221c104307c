use super::{load_signer, parse_name, tally, ConfigArgs};
use crate::cli::store;

use ccn::name::Name;
use ccn::publish::{Publisher, Stats};
use ccn::slice::SliceDescriptor;
use ccn::store::Repository;
use ccn::Signer;
use clap::Parser;
use config::{require, Config};
use serde::Serialize;
use std::path::PathBuf;

const DEFAULT_NAMESPACE: &str = "/ndn/keys";

#[derive(Parser, Debug, Serialize)]
pub(in super::super) struct SyncArgs {
    /// Topology prefix peers exchange sync traffic under [default: /ndn/keys]
    #[arg(short, long, value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    topology: Option<String>,

    /// Name prefix the slice mirrors [default: /ndn/keys]
    #[arg(short, long, value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,

    /// PKCS#8 PEM private key to sign with
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    signing_key: Option<PathBuf>,

    /// Prefix under which the signing key is published
    #[arg(short = 'k', long = "key-uri", value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pubkey_uri: Option<String>,

    #[command(flatten)]
    #[serde(flatten)]
    source: ConfigArgs,
}

#[derive(Debug)]
struct SyncSettings {
    slice: SliceDescriptor,
    signing_key: PathBuf,
    key_uri: Option<Name>,
    repository: String,
}

impl SyncSettings {
    fn load(args: &SyncArgs) -> anyhow::Result<Self> {
        let config = Config::load(args.source.config.as_deref(), args)?;

        let signing_key = require(&config.signing_key, "signing_key")?;
        let repository = require(&config.repository, "repository")?;
        let topology = config.topology.as_deref().unwrap_or(DEFAULT_NAMESPACE);
        let prefix = config.prefix.as_deref().unwrap_or(DEFAULT_NAMESPACE);

        Ok(SyncSettings {
            slice: SliceDescriptor::new(parse_name(topology)?, parse_name(prefix)?),
            signing_key: signing_key.clone(),
            key_uri: config.pubkey_uri.as_deref().map(parse_name).transpose()?,
            repository: repository.clone(),
        })
    }
}

pub(super) async fn run(args: SyncArgs) -> anyhow::Result<Stats> {
    let settings = SyncSettings::load(&args)?;
    let signer = load_signer(&settings.signing_key)?;

    let mut repo = store::connect(&settings.repository).await?;
    ensure(&settings, &signer, &mut repo).await
}

async fn ensure<R: Repository + ?Sized>(
    settings: &SyncSettings,
    signer: &dyn Signer,
    repo: &mut R,
) -> anyhow::Result<Stats> {
    let mut publisher = Publisher::new(repo, signer);
    if let Some(uri) = &settings.key_uri {
        publisher = publisher.key_uri(uri.clone());
    }

    let mut stats = Stats::default();
    let outcome = publisher.ensure_slice(&settings.slice).await?;
    tally(&mut stats, &outcome);
    tracing::info!(stats.published, stats.skipped, "Done");
    Ok(stats)
}
