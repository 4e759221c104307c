mod mkey;
mod show;
mod sync;

#[cfg(test)]
mod fixture;

use super::Args;

use ccn::key::Ed25519Signer;
use ccn::name::Name;
use ccn::publish::error::PublishError;
use ccn::publish::{PublishOutcome, Stats};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub(super) enum Commands {
    /// Publish a public key and its owner's identity.
    ///
    /// The key is written under `<prefix>/<digest>` and a small info document under
    /// `<prefix>/info/<digest>`, where `<digest>` is the name-safe base64 SHA-1 of the DER
    /// encoded key. Both are signed with the signing key and stay fresh for the validity
    /// period.
    ///
    /// When a topology prefix is given, the sync slice for `<prefix>` is created first,
    /// unless it already exists.
    #[command(verbatim_doc_comment)]
    Mkey(mkey::MkeyArgs),
    /// Make sure the sync slice for a namespace exists.
    ///
    /// Peers mirroring `<prefix>` within `<topology>` agree on one slice object whose name
    /// is derived from its content. It is written only if the repository does not already
    /// hold it.
    #[command(verbatim_doc_comment)]
    Sync(sync::SyncArgs),
    /// Fetch the newest object under a name and describe it.
    Show(show::ShowArgs),
}

/// Where settings come from, shared by every command.
#[derive(Parser, Debug, Serialize)]
struct ConfigArgs {
    /// XML configuration file
    ///
    /// Defaults to `ndnkey/config.xml` in the user's configuration directory, when it
    /// exists. Flags given on the command line override values from the file.
    #[arg(short, long, value_name = "FILE")]
    #[serde(skip)]
    config: Option<PathBuf>,

    /// Address of the ccnd to talk to [default: 127.0.0.1:9695]
    #[arg(long, value_name = "ADDR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Mkey(args) => {
            mkey::run(args).await?;
        },
        Commands::Sync(args) => {
            sync::run(args).await?;
        },
        Commands::Show(args) => show::run(args).await?,
    }
    Ok(())
}

fn parse_name(uri: &str) -> Result<Name, PublishError> {
    Ok(Name::parse(uri)?)
}

fn load_signer(path: &Path) -> Result<Ed25519Signer, PublishError> {
    let signer = Ed25519Signer::from_pem_file(path)?;
    tracing::debug!(key = ?signer, "loaded signing key");
    Ok(signer)
}

fn tally(stats: &mut Stats, outcome: &PublishOutcome) {
    use Err as Skipped;
    use Ok as Published;
    match outcome {
        Published(record) => {
            stats.published += 1;
            tracing::info!(name = %record.name(), size = record.size(), "Slice published");
        },
        Skipped(name) => {
            stats.skipped += 1;
            tracing::info!(%name, "Skipping existing slice");
        },
    }
}
