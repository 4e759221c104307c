use super::LogArgs;

use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn get_log_level(args: LogArgs, rust_log: Option<&str>) -> LevelFilter {
    if args.quiet {
        return LevelFilter::ERROR;
    }

    if let Some(level) = rust_log.and_then(|l| LevelFilter::from_str(l).ok()) {
        return level;
    }

    match args.verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber, returning the writer guard and whether ANSI colour is on.
///
/// Output goes to stderr: plain text on a terminal, JSON otherwise.
pub fn init_global_subscriber(args: LogArgs) -> (WorkerGuard, bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let log_level = get_log_level(args, rust_log.as_deref());

    let env_filter = EnvFilter::from_default_env().add_directive(log_level.into());

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    let ansi = std::io::stderr().is_terminal();
    let fmt = if ansi {
        fmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(non_blocking)
            .boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .with_writer(non_blocking)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter)
        .with(ErrorLayer::default())
        .init();

    (guard, ansi)
}

pub(super) trait LogValue {
    fn as_json(&self) -> String
    where
        Self: Serialize;
}

impl<T> LogValue for T {
    fn as_json(&self) -> String
    where
        Self: Serialize,
    {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "null".to_string())
    }
}
