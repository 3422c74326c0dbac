//! Server settings, read from an optional TOML file and the environment.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use crate::{directory::UserRecord, token::DEFAULT_EXPIRY_SECONDS};

/// Environment variable naming the settings file.
pub const CONFIG_PATH_VAR: &str = "AUTHLOCAL_CONFIG";
/// Settings file read when [`CONFIG_PATH_VAR`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct JwtSettings {
    #[serde(default = "default_expiry")]
    pub expiry_seconds: u64,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            expiry_seconds: default_expiry(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
    /// When set, logs go to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            directory: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub jwt: JwtSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl Settings {
    /// Loads settings from the file named by `AUTHLOCAL_CONFIG` (or the
    /// default path), overridden by `AUTHLOCAL__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());

        Self::from_file(&path)
    }

    /// Loads settings from `path`, which may be missing.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("AUTHLOCAL").separator("__"))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()
    }

    /// Parses settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.jwt.expiry_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "jwt.expiry_seconds",
                reason: "tokens must stay valid for at least one second",
            });
        }

        Ok(self)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_expiry() -> u64 {
    DEFAULT_EXPIRY_SECONDS
}

fn default_filter() -> String {
    "server=debug,authlocal=debug".to_owned()
}
