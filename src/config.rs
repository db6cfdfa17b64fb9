// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Solstice Pay

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup; the process
//! refuses to start on a missing or malformed required variable rather than
//! limping along with defaults that would misroute funds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RPC_URL` | Ledger JSON-RPC endpoint | Required |
//! | `RELAY_SECRET_KEY` | Relay keypair, base58 of 64 bytes | Required |
//! | `TOKEN_MINT` | SPL token mint address | Required |
//! | `PLATFORM_FEE_ACCOUNT` | Wallet that collects platform fees | Required |
//! | `FEE_RULE_KIND` | `fixed` or `ratio` | `fixed` |
//! | `FEE_RULE_VALUE` | Flat fee or ratio rate | `0.5` |
//! | `FEE_RULE_MIN` | Minimum fee for `ratio` rules | Unset |
//! | `TOKEN_DECIMALS` | Mint precision | `6` |
//! | `DATA_DIR` | Root directory for records and blobs | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `RPC_TIMEOUT_SECS` | Per-request ledger RPC timeout | `30` |
//! | `BLOCKHASH_TTL_SECS` | Freshness window for built transactions | `60` |
//! | `STATUS_POLL_ATTEMPTS` | Max status polls after submission | `30` |
//! | `STATUS_POLL_INTERVAL_MS` | Delay between status polls | `1000` |
//! | `STATUS_POLL_TIMEOUT_SECS` | Wall-clock budget for polling | `45` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use url::Url;

use crate::address::Address;
use crate::fee::FeeRule;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {variable}: {reason}")]
    Invalid {
        variable: &'static str,
        reason: String,
    },
}

/// Resolved service configuration.
pub struct Config {
    pub rpc_url: Url,
    pub relay_keypair: SigningKey,
    pub mint: Address,
    pub platform_fee_wallet: Address,
    pub fee_rule: FeeRule,
    pub decimals: u8,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub rpc_timeout: Duration,
    pub blockhash_ttl_secs: i64,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary lookup function. Tests inject maps here so
    /// they never mutate process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let rpc_url = parse(&lookup, "RPC_URL", |s| Url::parse(s).ok())?;
        let relay_keypair = parse(&lookup, "RELAY_SECRET_KEY", decode_keypair)?;
        let mint = parse(&lookup, "TOKEN_MINT", |s| Address::parse(s).ok())?;
        let platform_fee_wallet =
            parse(&lookup, "PLATFORM_FEE_ACCOUNT", |s| Address::parse(s).ok())?;
        let fee_rule = fee_rule_from(&lookup)?;

        Ok(Self {
            rpc_url,
            relay_keypair,
            mint,
            platform_fee_wallet,
            fee_rule,
            decimals: parse_or(&lookup, "TOKEN_DECIMALS", 6u8)?,
            data_dir: PathBuf::from(
                lookup("DATA_DIR").unwrap_or_else(|| "/data".to_string()),
            ),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080u16)?,
            rpc_timeout: Duration::from_secs(parse_or(&lookup, "RPC_TIMEOUT_SECS", 30u64)?),
            blockhash_ttl_secs: parse_or(&lookup, "BLOCKHASH_TTL_SECS", 60i64)?,
            poll_attempts: parse_or(&lookup, "STATUS_POLL_ATTEMPTS", 30u32)?,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "STATUS_POLL_INTERVAL_MS",
                1000u64,
            )?),
            poll_timeout: Duration::from_secs(parse_or(
                &lookup,
                "STATUS_POLL_TIMEOUT_SECS",
                45u64,
            )?),
        })
    }
}

fn parse<T>(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
    convert: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    let raw = lookup(variable).ok_or(ConfigError::Missing(variable))?;
    convert(&raw).ok_or_else(|| ConfigError::Invalid {
        variable,
        reason: format!("could not parse {raw:?}"),
    })
}

fn parse_or<T: std::str::FromStr>(
    lookup: impl Fn(&str) -> Option<String>,
    variable: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(variable) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            variable,
            reason: format!("could not parse {raw:?}"),
        }),
    }
}

fn decode_keypair(raw: &str) -> Option<SigningKey> {
    let bytes = bs58::decode(raw).into_vec().ok()?;
    let bytes: [u8; 64] = bytes.try_into().ok()?;
    SigningKey::from_keypair_bytes(&bytes).ok()
}

fn fee_rule_from(lookup: impl Fn(&str) -> Option<String>) -> Result<FeeRule, ConfigError> {
    let kind = lookup("FEE_RULE_KIND").unwrap_or_else(|| "fixed".to_string());
    let value: f64 = parse_or(&lookup, "FEE_RULE_VALUE", 0.5)?;
    match kind.as_str() {
        "fixed" => Ok(FeeRule::Fixed { value }),
        "ratio" => {
            let min = match lookup("FEE_RULE_MIN") {
                None => None,
                Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                    variable: "FEE_RULE_MIN",
                    reason: format!("could not parse {raw:?}"),
                })?),
            };
            Ok(FeeRule::Ratio { value, min })
        }
        other => Err(ConfigError::Invalid {
            variable: "FEE_RULE_KIND",
            reason: format!("expected `fixed` or `ratio`, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        let keypair = SigningKey::generate(&mut rand::rngs::OsRng);
        let secret = bs58::encode(keypair.to_keypair_bytes()).into_string();
        HashMap::from([
            ("RPC_URL", "http://127.0.0.1:8899".to_string()),
            ("RELAY_SECRET_KEY", secret),
            (
                "TOKEN_MINT",
                "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".to_string(),
            ),
            (
                "PLATFORM_FEE_ACCOUNT",
                Address::from_bytes([8u8; 32]).to_base58(),
            ),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn loads_with_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.decimals, 6);
        assert_eq!(config.port, 8080);
        assert_eq!(config.fee_rule, FeeRule::Fixed { value: 0.5 });
        assert_eq!(config.poll_attempts, 30);
        assert_eq!(config.data_dir, PathBuf::from("/data"));
    }

    #[test]
    fn missing_required_variable_fails() {
        let mut env = base_env();
        env.remove("RPC_URL");
        assert!(matches!(load(&env), Err(ConfigError::Missing("RPC_URL"))));
    }

    #[test]
    fn malformed_relay_key_fails() {
        let mut env = base_env();
        env.insert("RELAY_SECRET_KEY", "too-short".to_string());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn ratio_fee_rule_with_minimum() {
        let mut env = base_env();
        env.insert("FEE_RULE_KIND", "ratio".to_string());
        env.insert("FEE_RULE_VALUE", "0.01".to_string());
        env.insert("FEE_RULE_MIN", "0.5".to_string());

        let config = load(&env).unwrap();
        assert_eq!(
            config.fee_rule,
            FeeRule::Ratio {
                value: 0.01,
                min: Some(0.5)
            }
        );
    }

    #[test]
    fn unknown_fee_rule_kind_fails() {
        let mut env = base_env();
        env.insert("FEE_RULE_KIND", "percentage".to_string());
        assert!(matches!(load(&env), Err(ConfigError::Invalid { .. })));
    }
}
