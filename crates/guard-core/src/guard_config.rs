use crate::error::GuardError;
use crate::{
    DEFAULT_CONFIRMATIONS, DEFAULT_CONTRACT_ADDRESS, DEFAULT_DELEGATION_WEI,
    DEFAULT_EVENT_POLL_INTERVAL_MS, DEFAULT_MAX_DIRECTORY_PAGES, DEFAULT_RPC_URL,
};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Serde adapter for u128 ↔ TOML: serialize as string, deserialize from string or integer.
/// TOML integers are i64, and 1000 tokens in wei already overflow that.
mod u128_toml {
    use super::*;

    pub fn serialize<S: Serializer>(val: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        use serde::de::{self, Visitor};
        struct U128Visitor;

        impl<'de> Visitor<'de> for U128Visitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a u128 as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.replace('_', "").parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
                if v >= 0 {
                    Ok(v as u128)
                } else {
                    Err(E::custom("negative value for u128"))
                }
            }
        }

        d.deserialize_any(U128Visitor)
    }
}

/// Watchdog settings, fixed for the lifetime of the process.
///
/// The signing key is not part of the file: it is read from
/// `WALLET_PRIVATE_KEY` and never written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub rpc_url: String,
    pub contract_address: String,
    #[serde(with = "u128_toml")]
    pub delegation_amount_wei: u128,
    pub max_directory_pages: u32,
    /// Blocks on top of the inclusion block before a delegation counts as confirmed
    pub confirmations: u64,
    /// Receipt wait limit handed to the gateway; `None` waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_secs: Option<u64>,
    pub event_poll_interval_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            delegation_amount_wei: DEFAULT_DELEGATION_WEI,
            max_directory_pages: DEFAULT_MAX_DIRECTORY_PAGES,
            confirmations: DEFAULT_CONFIRMATIONS,
            confirmation_timeout_secs: None,
            event_poll_interval_ms: DEFAULT_EVENT_POLL_INTERVAL_MS,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, GuardError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .replace('_', "")
            .parse()
            .map_err(|e| GuardError::Config(format!("{} is invalid: {}", name, e))),
        _ => Ok(default),
    }
}

impl GuardConfig {
    /// Load config from TOML file. Missing keys fall back to defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, GuardError> {
        let content = fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| GuardError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Load config from environment variables
    /// Useful for containerized deployments
    pub fn load_from_env() -> Result<Self, GuardError> {
        Self::load_from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`load_from_env`](Self::load_from_env) with an injectable source.
    pub fn load_from_lookup<F>(lookup: F) -> Result<Self, GuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let rpc_url = lookup("STAKEGUARD_RPC_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.rpc_url);
        let contract_address = lookup("STAKEGUARD_CONTRACT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.contract_address);

        let delegation_amount_wei = parse_var(
            "STAKEGUARD_DELEGATION_WEI",
            lookup("STAKEGUARD_DELEGATION_WEI"),
            defaults.delegation_amount_wei,
        )?;
        let max_directory_pages = parse_var(
            "STAKEGUARD_MAX_PAGES",
            lookup("STAKEGUARD_MAX_PAGES"),
            defaults.max_directory_pages,
        )?;
        let confirmations = parse_var(
            "STAKEGUARD_CONFIRMATIONS",
            lookup("STAKEGUARD_CONFIRMATIONS"),
            defaults.confirmations,
        )?;
        let confirmation_timeout_secs = match lookup("STAKEGUARD_CONFIRMATION_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => Some(parse_var(
                "STAKEGUARD_CONFIRMATION_TIMEOUT_SECS",
                Some(raw),
                0u64,
            )?),
            _ => defaults.confirmation_timeout_secs,
        };
        let event_poll_interval_ms = parse_var(
            "STAKEGUARD_POLL_INTERVAL_MS",
            lookup("STAKEGUARD_POLL_INTERVAL_MS"),
            defaults.event_poll_interval_ms,
        )?;

        Ok(Self {
            rpc_url,
            contract_address,
            delegation_amount_wei,
            max_directory_pages,
            confirmations,
            confirmation_timeout_secs,
            event_poll_interval_ms,
        })
    }

    /// Layer a TOML file over the environment: keys present in the file win,
    /// keys it leaves out come from `lookup`, then from the defaults.
    pub fn load_layered<F>(path: &Path, lookup: F) -> Result<Self, GuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = fs::read_to_string(path)
            .map_err(|e| GuardError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let file_table: toml::Table = content
            .parse()
            .map_err(|e| GuardError::Config(format!("cannot parse {}: {}", path.display(), e)))?;

        let base = Self::load_from_lookup(lookup)?;
        let mut merged = match toml::Value::try_from(&base) {
            Ok(toml::Value::Table(table)) => table,
            Ok(_) => return Err(GuardError::Config("config is not a table".to_string())),
            Err(e) => return Err(GuardError::Config(format!("cannot serialize config: {}", e))),
        };
        for (key, value) in file_table {
            merged.insert(key, value);
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| GuardError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), GuardError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GuardError::Config(format!("cannot serialize config: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| GuardError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), GuardError> {
        let url = self.rpc_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GuardError::Config(format!(
                "rpc_url must be an http(s) endpoint, got '{}'",
                self.rpc_url
            )));
        }

        self.contract()?;

        if self.delegation_amount_wei == 0 {
            return Err(GuardError::Config(
                "delegation_amount_wei must be greater than zero".to_string(),
            ));
        }

        if self.max_directory_pages == 0 {
            return Err(GuardError::Config(
                "max_directory_pages must be at least 1".to_string(),
            ));
        }

        if self.confirmations == 0 {
            return Err(GuardError::Config(
                "confirmations must be at least 1".to_string(),
            ));
        }

        if self.confirmation_timeout_secs == Some(0) {
            return Err(GuardError::Config(
                "confirmation_timeout_secs must be positive when set".to_string(),
            ));
        }

        if self.event_poll_interval_ms == 0 {
            return Err(GuardError::Config(
                "event_poll_interval_ms must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed DPOS contract address
    pub fn contract(&self) -> Result<Address, GuardError> {
        self.contract_address.trim().parse().map_err(|e| {
            GuardError::Config(format!(
                "invalid contract address '{}': {}",
                self.contract_address, e
            ))
        })
    }

    pub fn delegation_amount(&self) -> U256 {
        U256::from(self.delegation_amount_wei)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_millis(self.event_poll_interval_ms)
    }
}
