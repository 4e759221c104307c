//! # Configuration
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. an XML file, either given explicitly or found in the user's config directory
//! 3. `NDNKEY_*` environment variables
//! 4. command line flags
//!
//! The XML file has a `config` root with one child per setting:
//!
//! ```xml
//! <config>
//!   <affiliation>UCLA</affiliation>
//!   <prefix>/ndn/keys</prefix>
//!   <signing_key>/etc/ndnkey/signing.pem</signing_key>
//!   <pubkey_uri>/ndn/keys</pubkey_uri>
//!   <validity_period>365</validity_period>
//! </config>
//! ```
use std::io;
use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use figment::providers::{Env, Serialized};
use figment::value::{Dict, Map};
use figment::{Figment, Metadata, Profile, Provider, Source};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where ccnd listens by default.
pub const DEFAULT_REPOSITORY: &str = "127.0.0.1:9695";
const ENV_PREFIX: &str = "NDNKEY_";
const APP_DIR: &str = "ndnkey";
const FILE_NAME: &str = "config.xml";

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A layer could not be read or the merged settings do not deserialize.
    #[error(transparent)]
    Load(#[from] Box<figment::Error>),
    /// A setting the command needs was given nowhere.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    /// A setting has an unusable value.
    #[error("invalid setting `{0}`: {1}")]
    Invalid(&'static str, String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Load(Box::new(e))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    /// Name prefix keys are published under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// PKCS#8 PEM private key used to sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<PathBuf>,
    /// Name prefix under which the signing key is published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubkey_uri: Option<String>,
    /// Days a published key stays fresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<u32>,
    /// Topology prefix of the sync slice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    /// Address of ccnd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            affiliation: None,
            prefix: None,
            signing_key: None,
            pubkey_uri: None,
            validity_period: None,
            topology: None,
            repository: Some(DEFAULT_REPOSITORY.into()),
        }
    }
}

impl Config {
    /// The file and environment layers.
    ///
    /// An explicit `file` must exist. Without one, `config.xml` in the user's config
    /// directory is used when present.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut fig = Figment::from(Config::default());

        match file {
            Some(path) => fig = fig.admerge(Xml::file(path).required()),
            None => {
                if let Ok(c) = etcetera::choose_base_strategy() {
                    let config = c.config_dir().join(APP_DIR).join(FILE_NAME);
                    fig = fig.admerge(Xml::file(config));
                }
            },
        }

        fig.admerge(Env::prefixed(ENV_PREFIX))
    }

    /// Merge every layer, with `overrides` on top. Fields of `overrides` that serialize to
    /// nothing leave lower layers untouched.
    pub fn load<T: Serialize>(file: Option<&Path>, overrides: &T) -> Result<Config, ConfigError> {
        let config: Config = Self::figment(file)
            .admerge(Serialized::defaults(overrides))
            .extract()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }
}

/// Return a required setting or [`ConfigError::Missing`].
pub fn require<'a, T>(value: &'a Option<T>, name: &'static str) -> Result<&'a T, ConfigError> {
    value.as_ref().ok_or(ConfigError::Missing(name))
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("ndnkey defaults")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}

/// A [`Provider`] reading the XML configuration format.
#[derive(Debug, Clone)]
pub struct Xml {
    path: PathBuf,
    required: bool,
}

impl Xml {
    /// Read `path` if it exists.
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Xml {
            path: path.as_ref().to_owned(),
            required: false,
        }
    }

    /// Fail when the file does not exist.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl Provider for Xml {
    fn metadata(&self) -> Metadata {
        Metadata::named("XML file").source(Source::File(self.path.clone()))
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !self.required => {
                return Ok(Map::new());
            },
            Err(e) => {
                return Err(format!("cannot read {}: {e}", self.path.display()).into());
            },
        };
        let parsed: Config = quick_xml::de::from_str(&text)
            .map_err(|e| format!("invalid XML in {}: {e}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "read configuration file");
        Serialized::defaults(parsed).data()
    }
}
