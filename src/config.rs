// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`ServerConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for database, media and audit files | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `SESSION_SECRET` | HS256 signing secret (at least 32 bytes) | random per process |
//! | `SESSION_TTL_SECS` | Session lifetime in seconds | `86400` |
//! | `PASSWORD_HASH_ITERATIONS` | PBKDF2 rounds for new hashes | `100000` |
//! | `MAX_UPLOAD_BYTES` | Request body limit | `26214400` |
//! | `ADMIN_USERNAMES` | Usernames promoted to admin at startup, if registered | empty |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::auth::password::DEFAULT_ITERATIONS;
use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the data directory path.
///
/// The redb database, uploaded media and audit logs all live under it.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable holding the session token signing secret.
///
/// When unset a random secret is generated at startup, which invalidates
/// every outstanding token on restart.
pub const SESSION_SECRET_ENV: &str = "SESSION_SECRET";

pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const PASSWORD_HASH_ITERATIONS_ENV: &str = "PASSWORD_HASH_ITERATIONS";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const ADMIN_USERNAMES_ENV: &str = "ADMIN_USERNAMES";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("SESSION_SECRET must be at least 32 bytes")]
    WeakSessionSecret,

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_secret: Option<String>,
    pub session_ttl: chrono::Duration,
    pub password_hash_iterations: u32,
    pub max_upload_bytes: usize,
    pub admin_usernames: Vec<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Defaults, rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_secret: None,
            session_ttl: chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS),
            password_hash_iterations: DEFAULT_ITERATIONS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            admin_usernames: Vec::new(),
            tls: None,
            log_format: LogFormat::Pretty,
        }
    }

    pub fn with_admin_usernames(mut self, usernames: impl IntoIterator<Item = String>) -> Self {
        self.admin_usernames = usernames.into_iter().collect();
        self
    }

    pub fn with_password_hash_iterations(mut self, iterations: u32) -> Self {
        self.password_hash_iterations = iterations;
        self
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let data_dir = get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string());
        let mut config = Self::for_data_dir(data_dir);

        if let Some(host) = get(HOST_ENV) {
            config.host = host;
        }
        if let Some(port) = get(PORT_ENV) {
            config.port = parse(PORT_ENV, &port)?;
        }

        if let Some(secret) = get(SESSION_SECRET_ENV) {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::WeakSessionSecret);
            }
            config.session_secret = Some(secret);
        }
        if let Some(ttl) = get(SESSION_TTL_ENV) {
            let secs: i64 = parse(SESSION_TTL_ENV, &ttl)?;
            if secs <= 0 {
                return Err(invalid(SESSION_TTL_ENV, &ttl, "must be positive"));
            }
            config.session_ttl = chrono::Duration::seconds(secs);
        }
        if let Some(iterations) = get(PASSWORD_HASH_ITERATIONS_ENV) {
            config.password_hash_iterations = parse(PASSWORD_HASH_ITERATIONS_ENV, &iterations)?;
            if config.password_hash_iterations == 0 {
                return Err(invalid(PASSWORD_HASH_ITERATIONS_ENV, &iterations, "must be positive"));
            }
        }
        if let Some(limit) = get(MAX_UPLOAD_BYTES_ENV) {
            config.max_upload_bytes = parse(MAX_UPLOAD_BYTES_ENV, &limit)?;
        }
        if let Some(admins) = get(ADMIN_USERNAMES_ENV) {
            config.admin_usernames = admins
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteTls),
        };

        config.log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(invalid(LOG_FORMAT_ENV, other, "expected `json` or `pretty`"));
            }
        };

        Ok(config)
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e: std::net::AddrParseError| invalid(HOST_ENV, &addr, &e.to_string()))
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(name, value, &e.to_string()))
}
