//! Token balance reads.

use tracing::debug;

use crate::error::{ErrorContext, Result, Stage, TokenServiceError};
use crate::operations::parse_wallet;
use crate::rpc::SolanaRpc;
use crate::TokenService;

impl<R: SolanaRpc> TokenService<R> {
    /// Balance of the configured token held by `wallet`, in whole tokens.
    ///
    /// A wallet without a token account reads as `0`, as does an account
    /// that disappears between lookup and read, or whose amount the node
    /// reports as indeterminate.
    pub async fn balance(&self, wallet: &str) -> Result<f64> {
        let wallet = parse_wallet(wallet)?;

        let Some(account) = self.locate_account(&wallet).await? else {
            return Ok(0.0);
        };

        let context = ErrorContext::new(Stage::Balance)
            .wallet(wallet)
            .mint(self.mint_address())
            .program(account.program);
        let amount = match self.rpc().get_token_account_balance(&account.address).await {
            Ok(amount) => amount,
            Err(e) if e.is_account_not_found() => {
                debug!(%wallet, account = %account.address, "token account closed since lookup");
                return Ok(0.0);
            }
            Err(e) => return Err(TokenServiceError::from_rpc(e, context)),
        };

        debug!(%wallet, account = %account.address, raw = %amount.amount, "balance read");
        Ok(amount.ui_amount.unwrap_or(0.0))
    }
}
