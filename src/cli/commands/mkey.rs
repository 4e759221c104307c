use super::{load_signer, parse_name, tally, ConfigArgs};
use crate::cli::store;

use ccn::key::{self, Ed25519Signer, KeyRecord};
use ccn::name::Name;
use ccn::publish::error::PublishError;
use ccn::publish::{Publisher, Stats};
use ccn::slice::SliceDescriptor;
use ccn::store::Repository;
use clap::Parser;
use config::{require, Config, ConfigError};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Serialize)]
#[command(arg_required_else_help = true)]
pub(in super::super) struct MkeyArgs {
    /// Real-world identity of the key's owner
    #[arg(short, long)]
    #[serde(skip)]
    identity: String,

    /// Affiliation of the key's owner
    #[arg(short, long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    affiliation: Option<String>,

    /// Public key to publish, PEM or DER
    #[arg(short = 'f', long = "pubkey", value_name = "FILE")]
    #[serde(skip)]
    pubkey: PathBuf,

    /// PKCS#8 PEM private key to sign with
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    signing_key: Option<PathBuf>,

    /// Prefix under which the signing key is published
    #[arg(short = 'k', long = "key-uri", value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pubkey_uri: Option<String>,

    /// Name prefix to publish the key under
    #[arg(short, long, value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,

    /// Days the published key stays fresh
    #[arg(short = 'x', long = "validity", value_name = "DAYS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    validity_period: Option<u32>,

    /// Topology prefix of a sync slice to create for the name prefix first
    #[arg(short, long, value_name = "URI")]
    #[serde(skip_serializing_if = "Option::is_none")]
    topology: Option<String>,

    #[command(flatten)]
    #[serde(flatten)]
    source: ConfigArgs,
}

/// Everything `mkey` needs, validated.
#[derive(Debug)]
struct KeySettings {
    identity: String,
    affiliation: String,
    pubkey: PathBuf,
    signing_key: PathBuf,
    key_uri: Name,
    prefix: Name,
    validity: u32,
    topology: Option<Name>,
    repository: String,
}

impl KeySettings {
    fn load(args: &MkeyArgs) -> anyhow::Result<Self> {
        let config = Config::load(args.source.config.as_deref(), args)?;

        let affiliation = require(&config.affiliation, "affiliation")?;
        let signing_key = require(&config.signing_key, "signing_key")?;
        let key_uri = require(&config.pubkey_uri, "pubkey_uri")?;
        let prefix = require(&config.prefix, "prefix")?;
        let validity = *require(&config.validity_period, "validity_period")?;
        let repository = require(&config.repository, "repository")?;
        if validity == 0 {
            let reason = "must be at least one day".to_string();
            return Err(ConfigError::Invalid("validity_period", reason).into());
        }

        Ok(KeySettings {
            identity: args.identity.clone(),
            affiliation: affiliation.clone(),
            pubkey: args.pubkey.clone(),
            signing_key: signing_key.clone(),
            key_uri: parse_name(key_uri)?,
            prefix: parse_name(prefix)?,
            validity,
            topology: config.topology.as_deref().map(parse_name).transpose()?,
            repository: repository.clone(),
        })
    }
}

pub(super) async fn run(args: MkeyArgs) -> anyhow::Result<Stats> {
    let settings = KeySettings::load(&args)?;
    let public_key = key::load_public_key(&settings.pubkey).map_err(PublishError::from)?;
    let signer = load_signer(&settings.signing_key)?;

    let mut repo = store::connect(&settings.repository).await?;
    publish(&settings, public_key, &signer, &mut repo).await
}

async fn publish<R: Repository + ?Sized>(
    settings: &KeySettings,
    public_key: Vec<u8>,
    signer: &Ed25519Signer,
    repo: &mut R,
) -> anyhow::Result<Stats> {
    let mut stats = Stats::default();
    let mut publisher = Publisher::new(repo, signer).key_uri(settings.key_uri.clone());

    if let Some(topology) = &settings.topology {
        let slice = SliceDescriptor::new(topology.clone(), settings.prefix.clone());
        let outcome = publisher.ensure_slice(&slice).await?;
        tally(&mut stats, &outcome);
    }

    let record = KeyRecord::new(&settings.identity, &settings.affiliation, public_key, signer);
    let published = publisher
        .publish_key(&record, &settings.prefix, settings.validity)
        .await?;
    for written in published.records() {
        stats.published += 1;
        tracing::info!(name = %written.name(), size = written.size(), "Published");
    }
    tracing::info!(identity = %record.identity, "Key successfully published");
    tracing::info!(stats.published, stats.skipped, "Done");
    Ok(stats)
}
