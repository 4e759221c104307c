mod commands;
pub mod logging;
mod store;

pub use commands::run;
pub use logging::init_global_subscriber;

use ccn::publish::error::PublishError;
use ccn::trust::TrustError;
use clap::Parser;
use config::ConfigError;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Publish keys and sync slices into a CCNx repository
pub struct Args {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    command: commands::Commands,
}

#[derive(Parser, Clone, Copy, Debug)]
#[command(next_help_heading = "Log Options")]
pub struct LogArgs {
    /// Set the level of verbosity
    ///
    /// This flag can be used multiple times to increase verbosity:
    ///   -v    for INFO level
    ///   -vv   for DEBUG level
    ///   -vvv  for TRACE level
    ///
    /// If not specified, defaults to WARN level.
    ///
    /// Alternatively, set the `RUST_LOG` environment variable
    /// (e.g., `RUST_LOG=info`), which takes precedence over this flag.
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity",
        verbatim_doc_comment
    )]
    verbosity: u8,

    /// Suppress all output except errors
    ///
    /// Overrides both `--verbosity` and `RUST_LOG`.
    #[arg(short, long, global = true, verbatim_doc_comment)]
    quiet: bool,
}

/// Name the kind of failure behind a fatal error for the diagnostic line.
pub fn error_kind(e: &anyhow::Error) -> &'static str {
    if e.downcast_ref::<ConfigError>().is_some() {
        return "ConfigError";
    }
    if e.downcast_ref::<TrustError>().is_some() {
        return "VerificationFailure";
    }
    match e.downcast_ref::<PublishError>() {
        Some(PublishError::MalformedName(_)) => "MalformedName",
        Some(PublishError::KeyFileError(_)) => "KeyFileError",
        Some(PublishError::SigningFailure(_)) | Some(PublishError::Info(_)) => "SigningFailure",
        Some(PublishError::RepositoryUnavailable(_)) => "RepositoryUnavailable",
        Some(PublishError::RepositoryTimeout(_)) => "RepositoryTimeout",
        Some(PublishError::PublishRejected(..)) => "PublishRejected",
        Some(PublishError::MalformedResponse(_)) => "MalformedResponse",
        None => "Error",
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use ccn::name::Name;

    use super::*;

    #[test]
    fn kinds() {
        let e = anyhow::Error::from(ConfigError::Missing("prefix"));
        assert_eq!(error_kind(&e), "ConfigError");

        let e = anyhow::Error::from(PublishError::RepositoryUnavailable(io::Error::from(
            io::ErrorKind::ConnectionRefused,
        )));
        assert_eq!(error_kind(&e), "RepositoryUnavailable");

        let e = anyhow::Error::from(PublishError::RepositoryTimeout(Name::new()));
        assert_eq!(error_kind(&e), "RepositoryTimeout");

        let e = anyhow::Error::from(TrustError::ChainTooLong);
        assert_eq!(error_kind(&e), "VerificationFailure");

        assert_eq!(error_kind(&anyhow::anyhow!("other")), "Error");
    }

    #[test]
    fn parses_mkey_flags() {
        let args = Args::try_parse_from([
            "ndnkey", "-vv", "mkey", "-i", "Alice", "-a", "UCLA", "-f", "key.pem", "-s",
            "signing.pem", "-k", "/ndn/keys", "-p", "/ndn/keys", "-x", "30", "-t", "/KEYS",
        ]);
        assert!(args.is_ok());
        assert!(Args::try_parse_from(["ndnkey", "mkey", "-f", "key.pem"]).is_err());
        let args = ["ndnkey", "mkey", "-i", "A", "-f", "k", "-x", "many"];
        assert!(Args::try_parse_from(args).is_err());
    }

    #[test]
    fn anchors_need_verify() {
        let args = [
            "ndnkey", "show", "/ndn/keys", "--verify", "--anchor", "a.pem", "--anchor", "b.der",
        ];
        assert!(Args::try_parse_from(args).is_ok());
        let args = ["ndnkey", "show", "/ndn/keys", "--anchor", "a.pem"];
        assert!(Args::try_parse_from(args).is_err());
    }
}
