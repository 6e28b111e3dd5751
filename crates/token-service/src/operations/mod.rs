//! Service operations, one module per concern.
//!
//! Each module adds methods to [`TokenService`]. Helpers shared by
//! several of them (wallet parsing, reading the mint account, submitting a
//! transaction) live here.

pub mod balance;
pub mod diagnose;
pub mod locate;
pub mod metadata;
pub mod mint;
pub mod players;
pub mod provision;
pub mod resolve;

use chain_sol::{
    compile_transaction, sign_transaction, MintState, Pubkey, SolError, SolInstruction,
    TokenProgram,
};
use tracing::{debug, warn};

use crate::config::DEFAULT_DECIMALS;
use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::rpc::{send_and_confirm, AccountInfo, SolanaRpc};
use crate::TokenService;

/// Parse a caller-supplied wallet address.
pub(crate) fn parse_wallet(wallet: &str) -> Result<Pubkey> {
    wallet
        .parse::<Pubkey>()
        .map_err(|e| TokenServiceError::Validation(format!("invalid wallet address: {e}")))
}

/// An instruction or transaction that could not be built.
pub(crate) fn build_failed(e: SolError, context: ErrorContext) -> TokenServiceError {
    TokenServiceError::Transaction {
        message: e.to_string(),
        signature: None,
        context: context.at(Stage::BuildTransaction),
    }
}

/// The mint account together with the program it is driven through.
pub(crate) struct MintAccount {
    pub program: TokenProgram,
    /// `false` when the owner is not a token program and `program` is a guess.
    pub recognized: bool,
    pub info: AccountInfo,
}

impl MintAccount {
    /// Decimals from the mint layout, `None` when it does not parse.
    pub fn decimals(&self, context: &ErrorContext) -> Option<u8> {
        match MintState::unpack(&self.info.data) {
            Ok(state) => Some(state.decimals),
            Err(e) => {
                warn!(
                    %context,
                    error = %e,
                    default = DEFAULT_DECIMALS,
                    "could not read mint decimals, using default"
                );
                None
            }
        }
    }
}

impl<R: SolanaRpc> TokenService<R> {
    /// Read the configured mint and map its owner to a token program.
    ///
    /// An unrecognized owner is not an error here: minting proceeds with the
    /// standard program and lets the chain decide.
    pub(crate) async fn fetch_mint_account(&self, context: ErrorContext) -> Result<MintAccount> {
        let mint = self.mint_address();
        let context = context.mint(mint).at(Stage::FetchMint);

        let info = self
            .rpc()
            .get_account(&mint)
            .await
            .map_err(|e| TokenServiceError::from_rpc(e, context))?
            .ok_or_else(|| TokenServiceError::not_found("mint account", context))?;

        let (program, recognized) = match TokenProgram::from_id(&info.owner) {
            Some(program) => (program, true),
            None => {
                warn!(
                    %mint,
                    owner = %info.owner,
                    "mint is not owned by a token program, assuming standard"
                );
                (TokenProgram::Standard, false)
            }
        };

        Ok(MintAccount {
            program,
            recognized,
            info,
        })
    }

    /// Sign `instructions` with the payer, submit, and wait for confirmation.
    pub(crate) async fn submit(
        &self,
        instructions: &[SolInstruction],
        context: ErrorContext,
    ) -> Result<String> {
        let build_context = context.at(Stage::BuildTransaction);
        let blockhash = self
            .rpc()
            .get_latest_blockhash()
            .await
            .map_err(|e| TokenServiceError::from_rpc(e, build_context))?;

        let payer = self.payer();
        let signed = compile_transaction(instructions, &payer.public_key(), &blockhash)
            .and_then(|tx| sign_transaction(&tx, payer))
            .map_err(|e| build_failed(e, build_context))?;

        debug!(
            signature = %signed.signature_base58(),
            instructions = instructions.len(),
            "submitting transaction"
        );

        send_and_confirm(self.rpc(), &signed, &self.config().rpc)
            .await
            .map_err(|e| TokenServiceError::from_rpc(e, context.at(Stage::Submit)))
    }
}
