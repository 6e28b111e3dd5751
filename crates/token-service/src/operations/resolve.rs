//! Associated token account address derivation.

use chain_sol::{derive_associated_token_address, Pubkey, TokenProgram};
use tracing::warn;

use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::operations::parse_wallet;
use crate::rpc::SolanaRpc;
use crate::TokenService;

/// A token account address and the program it lives under.
///
/// Recomputed on every call; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub address: Pubkey,
    pub program: TokenProgram,
}

/// Derive the associated account of `wallet` for `mint` under `program`.
pub fn derive_for(wallet: &Pubkey, mint: &Pubkey, program: TokenProgram) -> Result<Pubkey> {
    derive_associated_token_address(wallet, mint, program).map_err(|source| {
        TokenServiceError::derivation(
            source,
            ErrorContext::new(Stage::Derive)
                .wallet(*wallet)
                .mint(*mint)
                .program(program),
        )
    })
}

/// Derive under the custom program, falling back to the standard program.
///
/// Fails only when both derivations fail. A derivation only fails when no
/// bump seed yields an off-curve address, so in practice the custom program
/// always answers.
pub fn derive(wallet: &Pubkey, mint: &Pubkey) -> Result<ResolvedAccount> {
    derive_with(wallet, mint, derive_for)
}

fn derive_with<F>(wallet: &Pubkey, mint: &Pubkey, derive_one: F) -> Result<ResolvedAccount>
where
    F: Fn(&Pubkey, &Pubkey, TokenProgram) -> Result<Pubkey>,
{
    let custom_error = match derive_one(wallet, mint, TokenProgram::Custom) {
        Ok(address) => {
            return Ok(ResolvedAccount {
                address,
                program: TokenProgram::Custom,
            })
        }
        Err(e) => e,
    };

    warn!(
        %wallet,
        %mint,
        error = %custom_error,
        "custom program derivation failed, falling back to standard"
    );
    let address = derive_one(wallet, mint, TokenProgram::Standard)?;
    Ok(ResolvedAccount {
        address,
        program: TokenProgram::Standard,
    })
}

impl<R: SolanaRpc> TokenService<R> {
    /// Expected associated account of `wallet` for the configured mint.
    /// Pure computation; nothing is read from chain.
    pub fn derive_address(&self, wallet: &str) -> Result<ResolvedAccount> {
        let wallet = parse_wallet(wallet)?;
        derive(&wallet, &self.mint_address())
    }
}
