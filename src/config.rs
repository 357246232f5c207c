// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the loader used at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | Required |
//! | `LEDGER_PATH` | redb ledger file | In-memory ledger |
//! | `REQUEST_LOG_PATH` | Append-only request log | `logs/api_requests.log` |
//! | `DAILY_LIMIT` | Transactions per student per day | `10` |
//! | `BUDGET_RESET_INTERVAL_SECS` | Seconds between budget resets (`0` disables) | `86400` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Plain HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Secret used to sign and verify session tokens. Must be non-empty.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Path of the redb ledger file. When unset the ledger lives in memory and
/// is lost on restart.
pub const LEDGER_PATH_ENV: &str = "LEDGER_PATH";

pub const REQUEST_LOG_PATH_ENV: &str = "REQUEST_LOG_PATH";
pub const DAILY_LIMIT_ENV: &str = "DAILY_LIMIT";
pub const BUDGET_RESET_INTERVAL_ENV: &str = "BUDGET_RESET_INTERVAL_SECS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

/// `json` for machine-readable logs, anything else for human-readable.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_REQUEST_LOG_PATH: &str = "logs/api_requests.log";
pub const DEFAULT_DAILY_LIMIT: u32 = 10;
pub const DEFAULT_BUDGET_RESET_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("TLS_CERT_PATH and TLS_KEY_PATH must be set together")]
    PartialTls,
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub ledger_path: Option<PathBuf>,
    pub request_log_path: PathBuf,
    pub daily_limit: u32,
    /// `None` disables the budget reset task.
    pub budget_reset_interval: Option<Duration>,
    pub tls: Option<TlsPaths>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(get(PORT_ENV), PORT_ENV, DEFAULT_PORT)?;
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: HOST_ENV,
                value: host,
            })?;

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let reset_secs = parse_or(
            get(BUDGET_RESET_INTERVAL_ENV),
            BUDGET_RESET_INTERVAL_ENV,
            DEFAULT_BUDGET_RESET_INTERVAL_SECS,
        )?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialTls),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            ledger_path: get(LEDGER_PATH_ENV).map(PathBuf::from),
            request_log_path: get(REQUEST_LOG_PATH_ENV)
                .unwrap_or_else(|| DEFAULT_REQUEST_LOG_PATH.to_string())
                .into(),
            daily_limit: parse_or(get(DAILY_LIMIT_ENV), DAILY_LIMIT_ENV, DEFAULT_DAILY_LIMIT)?,
            budget_reset_interval: (reset_secs > 0).then(|| Duration::from_secs(reset_secs)),
            tls,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
