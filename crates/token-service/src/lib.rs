//! Token service: links game identities to Solana wallets and mints a
//! fungible token to them.
//!
//! The service combines:
//! - **Configuration** ([`TokenConfig`]) validated once at startup
//! - **RPC** ([`SolanaRpc`]) for every chain read and transaction submission
//! - **Signing** ([`chain_sol::SigningIdentity`]) for the payer / mint authority
//!
//! Operations live in [`operations`], one file per concern, each adding
//! methods to [`TokenService`].
//!
//! # Usage
//!
//! ```no_run
//! use token_service::{TokenConfig, TokenService};
//!
//! # async fn example() -> Result<(), token_service::TokenServiceError> {
//! let service = TokenService::connect(TokenConfig::from_env()?)?;
//!
//! // Cheap to clone; share across tasks.
//! let shared = service.clone();
//! let receipt = shared
//!     .mint("4pw5VSwn2Sec4SjMhbUSBcVjS51rG34Ho1WuHQgxqVd2", 10.0)
//!     .await?;
//! println!("{}", receipt.signature);
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod config;
pub mod error;
pub mod identity;
pub mod operations;
pub mod rpc;

pub use amount::{format_base_units, AmountError, TokenAmount};
pub use config::{Cluster, Commitment, ConfigError, RpcConfig, Settings, TokenConfig, TokenDescriptor};
pub use error::{ErrorContext, ErrorKind, Stage, TokenServiceError};
pub use identity::{IdentityError, IdentityStore, InMemoryIdentityStore, LinkedIdentity};
pub use operations::diagnose::{diagnose, DiagnosticReport};
pub use operations::metadata::{MintMetadata, TokenMintInfo};
pub use operations::mint::{MintOutcome, MintReceipt};
pub use operations::players::PlayerTokenBalance;
pub use operations::provision::EnsuredAccount;
pub use operations::resolve::ResolvedAccount;
pub use rpc::{HttpRpcClient, RpcError, SolanaRpc};

use std::sync::Arc;

use chain_sol::{Pubkey, SigningIdentity};

use crate::operations::provision::WalletLocks;

// ---------------------------------------------------------------------------
// TokenService
// ---------------------------------------------------------------------------

pub(crate) struct ServiceInner<R> {
    pub config: TokenConfig,
    pub rpc: R,
    pub locks: WalletLocks,
}

/// The service entry point.
///
/// `Clone`-able (wraps an `Arc`). Built once at startup and handed to
/// whatever needs it; there is no global instance.
pub struct TokenService<R = HttpRpcClient> {
    pub(crate) inner: Arc<ServiceInner<R>>,
}

impl<R> Clone for TokenService<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> std::fmt::Debug for TokenService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("mint", &self.inner.config.token.mint)
            .field("payer", &self.inner.config.payer.public_key())
            .field("rpc_url", &self.inner.config.rpc.url)
            .finish()
    }
}

impl<R: SolanaRpc> TokenService<R> {
    /// Build a service around an existing RPC client. No network I/O.
    pub fn new(config: TokenConfig, rpc: R) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                config,
                rpc,
                locks: WalletLocks::default(),
            }),
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.inner.config
    }

    pub fn rpc(&self) -> &R {
        &self.inner.rpc
    }

    pub fn token(&self) -> &TokenDescriptor {
        &self.inner.config.token
    }

    pub fn mint_address(&self) -> Pubkey {
        self.inner.config.token.mint
    }

    pub fn payer(&self) -> &SigningIdentity {
        &self.inner.config.payer
    }
}

impl TokenService<HttpRpcClient> {
    /// Build a service talking JSON-RPC to `config.rpc.url`.
    pub fn connect(config: TokenConfig) -> Result<Self, TokenServiceError> {
        let rpc = HttpRpcClient::new(&config.rpc).map_err(|e| ConfigError::Invalid {
            key: config::env::RPC_URL,
            reason: e.to_string(),
        })?;
        Ok(Self::new(config, rpc))
    }
}
