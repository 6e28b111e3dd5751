use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Mint tokens to a wallet, creating its token account if needed.
    Mint {
        wallet: String,
        /// Whole tokens; fractional amounts are floored to the mint's decimals.
        amount: f64,
    },

    /// Token balance of a wallet.
    Balance { wallet: String },

    /// Create the wallet's token account if it has none.
    Ensure { wallet: String },

    /// Find the wallet's token account without creating anything.
    Locate { wallet: String },

    /// Check configuration and the on-chain mint.
    Diagnose,

    /// Describe the configured token.
    MintInfo,
}

#[derive(Debug, Parser)]
#[clap(name = "token-cli", version)]
pub struct App {
    /// Overrides SOLANA_RPC_URL.
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}
