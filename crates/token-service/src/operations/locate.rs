//! Finding an existing token account for a wallet.

use chain_sol::{Pubkey, TokenAccountState, TokenProgram};
use tracing::debug;

use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::operations::parse_wallet;
use crate::operations::resolve::ResolvedAccount;
use crate::rpc::SolanaRpc;
use crate::TokenService;

impl<R: SolanaRpc> TokenService<R> {
    /// Find the wallet's token account for the configured mint.
    ///
    /// Programs are queried in [`TokenProgram::LOOKUP_ORDER`]; the standard
    /// program is only asked when the custom one has nothing. `Ok(None)`
    /// means confirmed absent, any query failure is an error.
    pub async fn locate(&self, wallet: &str) -> Result<Option<ResolvedAccount>> {
        let wallet = parse_wallet(wallet)?;
        self.locate_account(&wallet).await
    }

    pub(crate) async fn locate_account(&self, wallet: &Pubkey) -> Result<Option<ResolvedAccount>> {
        let mint = self.mint_address();

        for program in TokenProgram::LOOKUP_ORDER {
            let context = ErrorContext::new(Stage::Locate)
                .wallet(*wallet)
                .mint(mint)
                .program(program);

            let accounts = self
                .rpc()
                .get_token_accounts_by_owner(wallet, &program.id())
                .await
                .map_err(|e| TokenServiceError::from_rpc(e, context))?;

            let found = accounts.into_iter().find(|keyed| {
                TokenAccountState::unpack(&keyed.account.data).is_ok_and(|state| state.mint == mint)
            });

            if let Some(keyed) = found {
                debug!(%wallet, account = %keyed.pubkey, program = program.name(), "token account located");
                return Ok(Some(ResolvedAccount {
                    address: keyed.pubkey,
                    program,
                }));
            }
        }

        debug!(%wallet, %mint, "no token account");
        Ok(None)
    }
}
