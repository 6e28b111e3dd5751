//! The Solana RPC seam.
//!
//! [`SolanaRpc`] is the only way the service touches the network. The
//! production implementation is [`HttpRpcClient`]; tests substitute an
//! in-memory chain.

pub mod errors;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use chain_sol::{Pubkey, SignedTransaction};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{Commitment, RpcConfig};

pub use errors::RpcError;
pub use http::HttpRpcClient;

/// A raw on-chain account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub pubkey: Pubkey,
    pub account: AccountInfo,
}

/// Balance of a token account as reported by `getTokenAccountBalance`.
#[derive(Debug, Clone, PartialEq)]
pub struct UiTokenAmount {
    /// Raw base-unit amount.
    pub amount: String,
    pub decimals: u8,
    /// Human-readable amount; `None` when the node cannot express it.
    pub ui_amount: Option<f64>,
    pub ui_amount_string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcVersion {
    pub solana_core: String,
    pub feature_set: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation_status: Option<Commitment>,
    /// On-chain error, rendered as text.
    pub err: Option<String>,
}

#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Endpoint the client talks to.
    fn url(&self) -> &str;

    async fn get_version(&self) -> Result<RpcVersion, RpcError>;

    /// `Ok(None)` means the account does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError>;

    /// All token accounts of `owner` held under `program_id`.
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<KeyedAccount>, RpcError>;

    async fn get_token_account_balance(&self, account: &Pubkey)
        -> Result<UiTokenAmount, RpcError>;

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError>;

    /// Submit a signed wire transaction; returns its Base58 signature.
    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError>;

    /// `Ok(None)` while the cluster has not seen the signature yet.
    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError>;
}

#[async_trait]
impl<T: SolanaRpc + ?Sized> SolanaRpc for Arc<T> {
    fn url(&self) -> &str {
        (**self).url()
    }

    async fn get_version(&self) -> Result<RpcVersion, RpcError> {
        (**self).get_version().await
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        (**self).get_account(address).await
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<KeyedAccount>, RpcError> {
        (**self).get_token_accounts_by_owner(owner, program_id).await
    }

    async fn get_token_account_balance(
        &self,
        account: &Pubkey,
    ) -> Result<UiTokenAmount, RpcError> {
        (**self).get_token_account_balance(account).await
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        (**self).get_latest_blockhash().await
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        (**self).send_transaction(wire).await
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        (**self).get_signature_status(signature).await
    }
}

/// Submit a transaction and poll until it reaches the configured commitment.
///
/// Returns the signature on success. A JSON-RPC error from `sendTransaction`
/// becomes [`RpcError::Rejected`]. Once the transaction is sent, a failed
/// status poll is logged and polling continues: the transaction may already
/// have landed. An on-chain failure or running past `confirm_timeout` is an
/// error; there are no resubmissions.
pub async fn send_and_confirm<R: SolanaRpc + ?Sized>(
    rpc: &R,
    tx: &SignedTransaction,
    config: &RpcConfig,
) -> Result<String, RpcError> {
    let signature = rpc
        .send_transaction(&tx.wire)
        .await
        .map_err(|e| match e {
            RpcError::Rpc { code, message } => RpcError::Rejected { code, message },
            other => other,
        })?;
    let deadline = Instant::now() + config.confirm_timeout;

    loop {
        match rpc.get_signature_status(&signature).await {
            Ok(Some(status)) => {
                if let Some(reason) = status.err {
                    return Err(RpcError::TransactionFailed { signature, reason });
                }
                if status
                    .confirmation_status
                    .is_some_and(|reported| config.commitment.is_satisfied_by(reported))
                {
                    debug!(%signature, commitment = %config.commitment, "transaction confirmed");
                    return Ok(signature);
                }
            }
            Ok(None) => {}
            Err(e) => warn!(%signature, error = %e, "signature status poll failed"),
        }

        if Instant::now() >= deadline {
            return Err(RpcError::ConfirmationTimeout {
                signature,
                seconds: config.confirm_timeout.as_secs(),
            });
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}
