//! Read-only views of the configured mint.

use chain_sol::{MintState, Pubkey, TokenProgram};
use serde::Serialize;
use tracing::warn;

use crate::amount::format_base_units;
use crate::config::DEFAULT_DECIMALS;
use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::rpc::{RpcError, SolanaRpc};
use crate::TokenService;

/// Mint state read fresh from chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintMetadata {
    pub decimals: u8,
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    pub supply: u64,
    pub program: TokenProgram,
}

/// Token description for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMintInfo {
    pub mint_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,
    /// Whole tokens; absent when the chain could not be read.
    pub total_supply: Option<String>,
}

impl<R: SolanaRpc> TokenService<R> {
    /// Decode the mint. Unlike minting, an owner that is not a token program
    /// is an error here.
    pub async fn mint_metadata(&self) -> Result<MintMetadata> {
        let mint = self.fetch_mint_account(ErrorContext::new(Stage::FetchMint)).await?;
        let context = ErrorContext::new(Stage::FetchMint)
            .mint(self.mint_address())
            .program(mint.program);

        if !mint.recognized {
            return Err(TokenServiceError::OwnershipMismatch {
                account: self.mint_address(),
                owner: mint.info.owner,
                context,
            });
        }

        let state = MintState::unpack(&mint.info.data).map_err(|e| {
            TokenServiceError::from_rpc(RpcError::Decode(format!("mint data: {e}")), context)
        })?;

        Ok(MintMetadata {
            decimals: state.decimals,
            mint_authority: state.mint_authority,
            freeze_authority: state.freeze_authority,
            supply: state.supply,
            program: mint.program,
        })
    }

    /// Configured token description, with live decimals and supply when the
    /// mint can be read.
    pub async fn mint_info(&self) -> TokenMintInfo {
        let token = self.token();
        let mut info = TokenMintInfo {
            mint_address: token.mint.to_string(),
            token_name: token.name.clone(),
            token_symbol: token.symbol.clone(),
            decimals: token.decimals_hint.unwrap_or(DEFAULT_DECIMALS),
            total_supply: None,
        };

        match self.mint_metadata().await {
            Ok(meta) => {
                info.decimals = meta.decimals;
                info.total_supply = Some(format_base_units(meta.supply, meta.decimals));
            }
            Err(e) => warn!(error = %e, "mint metadata unavailable, using configured values"),
        }
        info
    }
}
