//! Service configuration.
//!
//! [`Settings`] holds raw, optional values as they arrive from the process
//! environment. [`TokenConfig::from_settings`] validates them once, decodes the
//! payer key, and produces the typed configuration the service is built from.
//! Nothing here is global: callers construct a config and hand it to
//! [`TokenService`](crate::TokenService).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chain_sol::{Pubkey, SigningIdentity};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Defaults and environment keys
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";
pub const DEFAULT_TOKEN_NAME: &str = "Minecraft Token";
pub const DEFAULT_TOKEN_SYMBOL: &str = "MCFT";

/// Decimals assumed when a mint's metadata cannot be read.
pub const DEFAULT_DECIMALS: u8 = 9;

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub mod env {
    pub const RPC_URL: &str = "SOLANA_RPC_URL";
    pub const MINT_ADDRESS: &str = "TOKEN_MINT_ADDRESS";
    pub const PAYER_PRIVATE_KEY: &str = "PAYER_PRIVATE_KEY";
    pub const TOKEN_NAME: &str = "TOKEN_NAME";
    pub const TOKEN_SYMBOL: &str = "TOKEN_SYMBOL";
    pub const TOKEN_DECIMALS: &str = "TOKEN_DECIMALS";
    pub const COMMITMENT: &str = "SOLANA_COMMITMENT";
    pub const CONFIRM_TIMEOUT_SECS: &str = "CONFIRM_TIMEOUT_SECS";
    pub const CONFIRM_POLL_MS: &str = "CONFIRM_POLL_MS";
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Raw settings
// ---------------------------------------------------------------------------

/// Unvalidated configuration values. Blank values count as absent.
#[derive(Debug, Default)]
pub struct Settings {
    pub rpc_url: Option<String>,
    pub mint_address: Option<String>,
    pub payer_private_key: Option<SecretString>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub token_decimals: Option<String>,
    pub commitment: Option<String>,
    pub confirm_timeout_secs: Option<String>,
    pub confirm_poll_ms: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            rpc_url: get(env::RPC_URL),
            mint_address: get(env::MINT_ADDRESS),
            payer_private_key: get(env::PAYER_PRIVATE_KEY).map(SecretString::from),
            token_name: get(env::TOKEN_NAME),
            token_symbol: get(env::TOKEN_SYMBOL),
            token_decimals: get(env::TOKEN_DECIMALS),
            commitment: get(env::COMMITMENT),
            confirm_timeout_secs: get(env::CONFIRM_TIMEOUT_SECS),
            confirm_poll_ms: get(env::CONFIRM_POLL_MS),
        }
    }

    /// The RPC endpoint, falling back to devnet.
    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_deref().unwrap_or(DEFAULT_RPC_URL)
    }

    pub fn payer_secret(&self) -> Option<&str> {
        self.payer_private_key.as_ref().map(|s| s.expose_secret())
    }

    /// Endpoint, commitment and confirmation timing, validated.
    ///
    /// Needs nothing else to be configured, so diagnostics can read the
    /// chain the same way the service does.
    pub fn rpc_config(&self) -> Result<RpcConfig, ConfigError> {
        let mut rpc = RpcConfig::new(self.rpc_url());
        if let Some(c) = self.commitment.as_deref() {
            rpc.commitment = c.parse().map_err(|reason| ConfigError::Invalid {
                key: env::COMMITMENT,
                reason,
            })?;
        }
        if let Some(v) = self.confirm_timeout_secs.as_deref() {
            rpc.confirm_timeout =
                Duration::from_secs(parse_number::<u64>(env::CONFIRM_TIMEOUT_SECS, v)?);
        }
        if let Some(v) = self.confirm_poll_ms.as_deref() {
            let ms = parse_number::<u64>(env::CONFIRM_POLL_MS, v)?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: env::CONFIRM_POLL_MS,
                    reason: "must be greater than zero".into(),
                });
            }
            rpc.poll_interval = Duration::from_millis(ms);
        }
        Ok(rpc)
    }
}

// ---------------------------------------------------------------------------
// Typed configuration
// ---------------------------------------------------------------------------

/// The token being minted. Immutable once the service is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDescriptor {
    pub mint: Pubkey,
    /// Advisory only; mint operations always read decimals from chain.
    pub decimals_hint: Option<u8>,
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }

    /// Whether a status reported by the cluster satisfies this commitment.
    pub fn is_satisfied_by(self, reported: Commitment) -> bool {
        reported as u8 >= self as u8
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level `{other}`")),
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub url: String,
    pub commitment: Commitment,
    /// Upper bound on waiting for a submitted transaction to confirm.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl RpcConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            commitment: Commitment::Confirmed,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn cluster(&self) -> Cluster {
        Cluster::from_url(&self.url)
    }
}

/// Everything the service needs, validated.
#[derive(Debug)]
pub struct TokenConfig {
    pub token: TokenDescriptor,
    pub rpc: RpcConfig,
    pub payer: SigningIdentity,
}

impl TokenConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_settings(&Settings::from_env())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let mint_address = settings
            .mint_address
            .as_deref()
            .ok_or(ConfigError::Missing(env::MINT_ADDRESS))?;
        let payer_secret = settings
            .payer_secret()
            .ok_or(ConfigError::Missing(env::PAYER_PRIVATE_KEY))?;

        let mint = mint_address.parse::<Pubkey>().map_err(|e| ConfigError::Invalid {
            key: env::MINT_ADDRESS,
            reason: e.to_string(),
        })?;
        let payer = SigningIdentity::from_base58(payer_secret).map_err(|e| ConfigError::Invalid {
            key: env::PAYER_PRIVATE_KEY,
            reason: e.to_string(),
        })?;

        let decimals_hint = settings
            .token_decimals
            .as_deref()
            .map(|v| parse_number::<u8>(env::TOKEN_DECIMALS, v))
            .transpose()?;

        let rpc = settings.rpc_config()?;

        Ok(Self {
            token: TokenDescriptor {
                mint,
                decimals_hint,
                symbol: settings
                    .token_symbol
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOKEN_SYMBOL.to_string()),
                name: settings
                    .token_name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string()),
            },
            rpc,
            payer,
        })
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// Network name inferred from an RPC endpoint URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cluster {
    Devnet,
    Testnet,
    Localnet,
    Mainnet,
}

impl Cluster {
    pub fn from_url(url: &str) -> Self {
        if url.contains("devnet") {
            Cluster::Devnet
        } else if url.contains("testnet") {
            Cluster::Testnet
        } else if url.contains("localhost") || url.contains("127.0.0.1") {
            Cluster::Localnet
        } else {
            Cluster::Mainnet
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
            Cluster::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
