//! Configuration for the eigenwire daemon and clients.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $EIGENWIRE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/eigenwire/config.toml
//!   3. ~/.config/eigenwire/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::plan::MAX_CHUNK_BYTES;

/// Extra room allowed on a gRPC message beyond its payload, for protobuf
/// framing and the repeated shape fields.
const MESSAGE_SLACK_BYTES: usize = 64 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EigenwireConfig {
    pub grpc: GrpcConfig,
    pub rest: RestConfig,
    pub transfer: TransferConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrpcConfig {
    pub host: String,
    /// 0 = OS-assigned.
    pub port: u16,
    /// Calls computed at once; further calls wait for a slot.
    pub max_concurrent_calls: usize,
    /// Client-side connect timeout.
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    pub host: String,
    pub port: u16,
    /// SQLite file, recreated on every start.
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Payload bytes per wire message.
    pub max_chunk_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub grpc: bool,
    pub rest: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 50051,
            max_concurrent_calls: 10,
            connect_timeout_secs: 1,
        }
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            database_path: data_dir().join("eigen.db"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: MAX_CHUNK_BYTES,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            grpc: true,
            rest: true,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".config"))
        .join("eigenwire")
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home().join(".local").join("share"))
        .join("eigenwire")
}

fn home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl EigenwireConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path. A missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            EigenwireConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("EIGENWIRE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            Self::write_default_to(&path)?;
        }
        Ok(path)
    }

    pub fn write_default_to(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        let text = toml::to_string_pretty(&EigenwireConfig::default())
            .map_err(ConfigError::SerializeFailed)?;
        std::fs::write(path, text).map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))
    }

    /// Apply `EIGENWIRE_<SECTION>__<KEY>` overrides read through `lookup`.
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("EIGENWIRE_GRPC__HOST") {
            self.grpc.host = v;
        }
        parse_into(&lookup, "EIGENWIRE_GRPC__PORT", &mut self.grpc.port);
        parse_into(
            &lookup,
            "EIGENWIRE_GRPC__MAX_CONCURRENT_CALLS",
            &mut self.grpc.max_concurrent_calls,
        );
        parse_into(
            &lookup,
            "EIGENWIRE_GRPC__CONNECT_TIMEOUT_SECS",
            &mut self.grpc.connect_timeout_secs,
        );
        if let Some(v) = lookup("EIGENWIRE_REST__HOST") {
            self.rest.host = v;
        }
        parse_into(&lookup, "EIGENWIRE_REST__PORT", &mut self.rest.port);
        if let Some(v) = lookup("EIGENWIRE_REST__DATABASE_PATH") {
            self.rest.database_path = PathBuf::from(v);
        }
        parse_into(
            &lookup,
            "EIGENWIRE_TRANSFER__MAX_CHUNK_BYTES",
            &mut self.transfer.max_chunk_bytes,
        );
        if let Some(v) = lookup("EIGENWIRE_SERVICES__GRPC") {
            self.services.grpc = v == "true" || v == "1";
        }
        if let Some(v) = lookup("EIGENWIRE_SERVICES__REST") {
            self.services.rest = v == "true" || v == "1";
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_chunk_limit(self.transfer.max_chunk_bytes)?;
        if self.grpc.max_concurrent_calls == 0 {
            return Err(ConfigError::Invalid {
                key: "grpc.max_concurrent_calls",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// A chunk limit must hold whole elements of every width, so it must be a
/// positive multiple of 8 bytes (one f64, two i32). Otherwise chunks come
/// out smaller than the limit and the count exceeds `ceil(nbytes / limit)`.
pub fn check_chunk_limit(max_chunk_bytes: usize) -> Result<(), ConfigError> {
    let reason = if max_chunk_bytes < 8 {
        format!("{max_chunk_bytes} is below one 8-byte element")
    } else if max_chunk_bytes % 8 != 0 {
        format!("{max_chunk_bytes} is not a multiple of 8 bytes")
    } else {
        return Ok(());
    };
    Err(ConfigError::Invalid {
        key: "transfer.max_chunk_bytes",
        reason,
    })
}

/// gRPC message size limit for a given chunk payload limit.
pub fn message_limit(max_chunk_bytes: usize) -> usize {
    max_chunk_bytes.saturating_add(MESSAGE_SLACK_BYTES)
}

fn parse_into<F, T>(lookup: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(key) else { return };
    match raw.parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_reference_deployment() {
        let config = EigenwireConfig::default();
        assert_eq!(config.grpc.port, 50051);
        assert_eq!(config.grpc.max_concurrent_calls, 10);
        assert_eq!(config.rest.port, 5000);
        assert_eq!(config.rest.host, "127.0.0.1");
        assert_eq!(config.transfer.max_chunk_bytes, 3 * 1024 * 1024);
        assert!(config.services.grpc && config.services.rest);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("EIGENWIRE_GRPC__PORT", "6000"),
            ("EIGENWIRE_TRANSFER__MAX_CHUNK_BYTES", "1024"),
            ("EIGENWIRE_SERVICES__REST", "false"),
            ("EIGENWIRE_REST__PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let mut config = EigenwireConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.grpc.port, 6000);
        assert_eq!(config.transfer.max_chunk_bytes, 1024);
        assert!(!config.services.rest);
        assert_eq!(config.rest.port, 5000);
    }

    #[test]
    fn tiny_chunk_limit_is_rejected() {
        let mut config = EigenwireConfig::default();
        config.transfer.max_chunk_bytes = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "transfer.max_chunk_bytes", .. })
        ));
    }

    #[test]
    fn unaligned_chunk_limit_is_rejected() {
        let mut config = EigenwireConfig::default();
        config.transfer.max_chunk_bytes = 12;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "transfer.max_chunk_bytes", .. })
        ));
        assert!(check_chunk_limit(3 * 1024 * 1024 + 4).is_err());
        assert!(check_chunk_limit(8).is_ok());
        assert!(check_chunk_limit(64).is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = std::env::temp_dir().join(format!("eigenwire-config-partial-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("config.toml");
        std::fs::write(&path, "[grpc]\nport = 7000\n\n[services]\nrest = false\n").unwrap();

        let config = EigenwireConfig::load_from(&path).expect("load should succeed");
        assert_eq!(config.grpc.port, 7000);
        assert_eq!(config.grpc.max_concurrent_calls, 10);
        assert!(!config.services.rest);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn default_file_round_trips() {
        let tmp = std::env::temp_dir().join(format!("eigenwire-config-default-{}", std::process::id()));
        let path = tmp.join("nested").join("config.toml");

        EigenwireConfig::write_default_to(&path).expect("write failed");
        assert!(path.exists());
        let config = EigenwireConfig::load_from(&path).expect("load should succeed");
        assert_eq!(config.transfer.max_chunk_bytes, MAX_CHUNK_BYTES);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let tmp = std::env::temp_dir().join(format!("eigenwire-config-bad-{}", std::process::id()));
        std::fs::create_dir_all(&tmp).unwrap();
        let path = tmp.join("config.toml");
        std::fs::write(&path, "[grpc\nport = ").unwrap();

        assert!(matches!(
            EigenwireConfig::load_from(&path),
            Err(ConfigError::ParseFailed(..))
        ));

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
