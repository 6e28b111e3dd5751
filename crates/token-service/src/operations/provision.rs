//! Creating token accounts, and the per-wallet lock that serializes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chain_sol::{build_create_associated_account, Pubkey, TokenProgram};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::info;

use crate::error::{ErrorContext, Result, Stage};
use crate::operations::{build_failed, parse_wallet};
use crate::operations::resolve::derive_for;
use crate::rpc::SolanaRpc;
use crate::TokenService;

// ---------------------------------------------------------------------------
// WalletLocks
// ---------------------------------------------------------------------------

/// In-process keyed lock: one holder per wallet, wallets independent.
///
/// Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
pub(crate) struct WalletLocks {
    slots: Mutex<HashMap<Pubkey, Arc<AsyncMutex<()>>>>,
}

pub(crate) struct WalletGuard<'a> {
    locks: &'a WalletLocks,
    wallet: Pubkey,
    _held: OwnedMutexGuard<()>,
}

impl WalletLocks {
    pub async fn acquire(&self, wallet: Pubkey) -> WalletGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(wallet).or_default())
        };
        WalletGuard {
            locks: self,
            wallet,
            _held: slot.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for WalletGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // map + this guard
        if slots
            .get(&self.wallet)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            slots.remove(&self.wallet);
        }
    }
}

// ---------------------------------------------------------------------------
// ensure
// ---------------------------------------------------------------------------

/// Result of [`TokenService::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredAccount {
    pub address: Pubkey,
    pub program: TokenProgram,
    /// Signature of the creation transaction, `None` if the account existed.
    pub created: Option<String>,
}

impl<R: SolanaRpc> TokenService<R> {
    /// Make sure the wallet has a token account for the configured mint.
    ///
    /// Submits one transaction only when no account exists. Calls for the
    /// same wallet are serialized; a creation racing with another process
    /// still fails on-chain and surfaces as a transaction error.
    pub async fn ensure(&self, wallet: &str) -> Result<EnsuredAccount> {
        let wallet = parse_wallet(wallet)?;
        let _guard = self.inner.locks.acquire(wallet).await;

        if let Some(existing) = self.locate_account(&wallet).await? {
            return Ok(EnsuredAccount {
                address: existing.address,
                program: existing.program,
                created: None,
            });
        }

        let context = ErrorContext::new(Stage::Derive).wallet(wallet);
        let mint = self.fetch_mint_account(context).await?;
        let context = context.mint(self.mint_address()).program(mint.program);

        let address = derive_for(&wallet, &self.mint_address(), mint.program)?;
        let instruction = build_create_associated_account(
            &self.payer().public_key(),
            &address,
            &wallet,
            &self.mint_address(),
            mint.program,
        )
        .map_err(|e| build_failed(e, context))?;

        info!(%wallet, account = %address, program = mint.program.name(), "creating token account");
        let signature = self.submit(&[instruction], context).await?;
        info!(%wallet, account = %address, %signature, "token account created");

        Ok(EnsuredAccount {
            address,
            program: mint.program,
            created: Some(signature),
        })
    }
}
