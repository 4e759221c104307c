mod ansi;

use std::process::ExitCode;

use clap::Parser;
use ndnkey::cli::{self, Args};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let (_guard, ansi) = cli::init_global_subscriber(args.log);

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let (on, off) = if ansi {
                (ansi::MAGENTA, ansi::RESET)
            } else {
                ("", "")
            };
            tracing::error!(fatal = true, kind = cli::error_kind(&e), "{on}FATAL{off} {e:#}");
            ExitCode::FAILURE
        },
    }
}
