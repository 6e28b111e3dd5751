//! Minting the configured token to a wallet.

use chain_sol::{build_create_associated_account, build_mint_to, Pubkey, TokenProgram};
use serde::Serialize;
use tracing::{error, info};

use crate::amount::TokenAmount;
use crate::config::DEFAULT_DECIMALS;
use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::operations::{build_failed, parse_wallet};
use crate::operations::resolve::derive_for;
use crate::rpc::SolanaRpc;
use crate::TokenService;

/// A confirmed mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub signature: String,
    pub recipient: Pubkey,
    /// Token account credited.
    pub destination: Pubkey,
    pub program: TokenProgram,
    pub base_units: u64,
    pub decimals: u8,
    /// Whether the same transaction also created `destination`.
    pub created_account: bool,
}

/// Boundary result of a mint: never an error, always this shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub amount: f64,
    pub recipient: String,
}

impl MintOutcome {
    pub fn succeeded(signature: String, amount: f64, recipient: impl Into<String>) -> Self {
        Self {
            success: true,
            signature: Some(signature),
            error: None,
            amount,
            recipient: recipient.into(),
        }
    }

    pub fn failed(error: impl Into<String>, amount: f64, recipient: impl Into<String>) -> Self {
        Self {
            success: false,
            signature: None,
            error: Some(error.into()),
            amount,
            recipient: recipient.into(),
        }
    }
}

impl<R: SolanaRpc> TokenService<R> {
    /// Mint `amount` whole tokens to `wallet` and wait for confirmation.
    ///
    /// The amount is validated before any network call. If the wallet has no
    /// token account yet, its creation goes into the same transaction as the
    /// mint.
    pub async fn mint(&self, wallet: &str, amount: f64) -> Result<MintReceipt> {
        let amount = TokenAmount::from_f64(amount)?;
        let wallet = parse_wallet(wallet)?;
        let mint = self.mint_address();
        let _guard = self.inner.locks.acquire(wallet).await;

        info!(%wallet, %mint, %amount, "mint requested");

        let located = self.locate_account(&wallet).await?;

        let mint_account = self
            .fetch_mint_account(ErrorContext::new(Stage::FetchMint).wallet(wallet))
            .await?;
        let program = mint_account.program;
        let context = ErrorContext::new(Stage::FetchDecimals)
            .wallet(wallet)
            .mint(mint)
            .program(program);

        let (destination, needs_create) = match located {
            Some(found) => (found.address, false),
            None => {
                let address = derive_for(&wallet, &mint, program)?;
                let exists = self
                    .rpc()
                    .get_account(&address)
                    .await
                    .map_err(|e| TokenServiceError::from_rpc(e, context.at(Stage::Locate)))?
                    .is_some();
                (address, !exists)
            }
        };

        let known_decimals = mint_account.decimals(&context);
        let decimals = known_decimals.unwrap_or(DEFAULT_DECIMALS);
        let base_units = amount.to_base_units(decimals)?;

        let payer = self.payer().public_key();
        let mut instructions = Vec::with_capacity(2);
        if needs_create {
            info!(%wallet, account = %destination, program = program.name(), "token account will be created");
            instructions.push(
                build_create_associated_account(&payer, &destination, &wallet, &mint, program)
                    .map_err(|e| build_failed(e, context))?,
            );
        }
        let mint_to = build_mint_to(program, &mint, &destination, &payer, base_units, known_decimals)
            .map_err(|e| build_failed(e, context))?;
        instructions.push(mint_to);

        let signature = self.submit(&instructions, context).await?;
        info!(
            %wallet,
            account = %destination,
            %signature,
            base_units,
            decimals,
            program = program.name(),
            "mint confirmed"
        );

        Ok(MintReceipt {
            signature,
            recipient: wallet,
            destination,
            program,
            base_units,
            decimals,
            created_account: needs_create,
        })
    }

    /// [`mint`](Self::mint) folded into a [`MintOutcome`].
    pub async fn mint_outcome(&self, wallet: &str, amount: f64) -> MintOutcome {
        match self.mint(wallet, amount).await {
            Ok(receipt) => MintOutcome::succeeded(receipt.signature, amount, wallet),
            Err(e) => {
                error!(wallet, amount, kind = ?e.kind(), error = %e, "mint failed");
                MintOutcome::failed(failure_message(&e), amount, wallet)
            }
        }
    }
}

pub(crate) fn failure_message(e: &TokenServiceError) -> String {
    match e {
        TokenServiceError::Validation(reason) => reason.clone(),
        other => format!("Failed to mint tokens: {other}"),
    }
}
