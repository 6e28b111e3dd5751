//! Player-level flows: resolve a game identity to its wallet, then act on it.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::amount::TokenAmount;
use crate::error::{Result, TokenServiceError};
use crate::identity::{IdentityStore, LinkedIdentity};
use crate::operations::mint::{failure_message, MintOutcome};
use crate::operations::parse_wallet;
use crate::rpc::SolanaRpc;
use crate::TokenService;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTokenBalance {
    pub uuid: String,
    pub wallet_address: Option<String>,
    pub balance: f64,
    pub success: bool,
    pub error: Option<String>,
}

impl PlayerTokenBalance {
    fn failed(uuid: &str, error: impl Into<String>) -> Self {
        Self {
            uuid: uuid.to_string(),
            wallet_address: None,
            balance: 0.0,
            success: false,
            error: Some(error.into()),
        }
    }
}

impl<R: SolanaRpc> TokenService<R> {
    /// Link `wallet` to the identity, creating the identity on first link.
    /// The address is validated and stored in canonical form.
    pub fn link_wallet<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        uuid: &str,
        wallet: &str,
    ) -> Result<LinkedIdentity> {
        let wallet = parse_wallet(wallet)?.to_string();
        let linked = store.link(uuid, &wallet)?;
        info!(uuid, %wallet, "wallet linked");
        Ok(linked)
    }

    pub async fn player_token_balance<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        uuid: &str,
    ) -> PlayerTokenBalance {
        let identity = match store.find(uuid) {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                warn!(uuid, "player not found");
                return PlayerTokenBalance::failed(uuid, "User not found");
            }
            Err(e) => {
                return PlayerTokenBalance::failed(uuid, format!("Error fetching token balance: {e}"))
            }
        };
        let Some(wallet) = identity.wallet_address else {
            warn!(uuid, "player has no linked wallet");
            return PlayerTokenBalance::failed(uuid, "No wallet linked to this account");
        };

        match self.balance(&wallet).await {
            Ok(balance) => PlayerTokenBalance {
                uuid: uuid.to_string(),
                wallet_address: Some(wallet),
                balance,
                success: true,
                error: None,
            },
            Err(e) => {
                error!(uuid, %wallet, error = %e, "player balance failed");
                PlayerTokenBalance::failed(uuid, format!("Error fetching token balance: {e}"))
            }
        }
    }

    /// Mint to the wallet linked to `uuid`.
    ///
    /// Failures name the identity as recipient; a success names the wallet.
    pub async fn mint_to_player<S: IdentityStore + ?Sized>(
        &self,
        store: &S,
        uuid: &str,
        amount: f64,
    ) -> MintOutcome {
        if let Err(e) = TokenAmount::from_f64(amount) {
            return MintOutcome::failed(e.to_string(), amount, uuid);
        }

        let wallet = match store.find(uuid) {
            Ok(Some(LinkedIdentity {
                wallet_address: Some(wallet),
                ..
            })) => wallet,
            Ok(Some(_)) => {
                warn!(uuid, "player has no linked wallet");
                return MintOutcome::failed("No wallet linked to this player", amount, uuid);
            }
            Ok(None) => {
                warn!(uuid, "player not found");
                return MintOutcome::failed("Player not found", amount, uuid);
            }
            Err(e) => {
                let e = TokenServiceError::from(e);
                return MintOutcome::failed(failure_message(&e), amount, uuid);
            }
        };

        info!(uuid, %wallet, amount, "minting to player");
        match self.mint(&wallet, amount).await {
            Ok(receipt) => MintOutcome::succeeded(receipt.signature, amount, wallet),
            Err(e) => {
                error!(uuid, %wallet, kind = ?e.kind(), error = %e, "mint to player failed");
                MintOutcome::failed(failure_message(&e), amount, uuid)
            }
        }
    }
}
