mod args;

use crate::args::{App, Command};
use clap::Parser;
use dotenv::dotenv;
use serde_json::{json, Value};
use token_service::{diagnose, HttpRpcClient, Settings, TokenConfig, TokenService};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _ = dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let app = App::parse();

    let mut settings = Settings::from_env();
    if let Some(url) = app.rpc_url.filter(|url| !url.trim().is_empty()) {
        settings.rpc_url = Some(url);
    }

    match app.command {
        // Runs against incomplete configuration.
        Command::Diagnose => {
            let report = diagnose(&settings, HttpRpcClient::new).await;
            emit(&serde_json::to_value(&report)?, report.success)
        }
        command => run(command, &settings).await,
    }
}

async fn run(command: Command, settings: &Settings) -> eyre::Result<()> {
    let config = TokenConfig::from_settings(settings)?;
    let service = TokenService::connect(config)?;
    tracing::debug!(?service, "token service ready");

    match command {
        Command::Mint { wallet, amount } => {
            let outcome = service.mint_outcome(&wallet, amount).await;
            emit(&serde_json::to_value(&outcome)?, outcome.success)
        }
        Command::Balance { wallet } => {
            let balance = service.balance(&wallet).await?;
            emit(&json!({ "walletAddress": wallet, "balance": balance }), true)
        }
        Command::Ensure { wallet } => {
            let ensured = service.ensure(&wallet).await?;
            emit(
                &json!({
                    "address": ensured.address.to_string(),
                    "program": ensured.program.name(),
                    "created": ensured.created.is_some(),
                    "signature": ensured.created,
                }),
                true,
            )
        }
        Command::Locate { wallet } => {
            let found = service.locate(&wallet).await?;
            let value = match found {
                Some(account) => json!({
                    "found": true,
                    "address": account.address.to_string(),
                    "program": account.program.name(),
                }),
                None => json!({ "found": false }),
            };
            emit(&value, true)
        }
        Command::MintInfo => {
            let info = service.mint_info().await;
            emit(&serde_json::to_value(&info)?, true)
        }
        Command::Diagnose => eyre::bail!("diagnose does not need a configured service"),
    }
}

fn emit(value: &Value, success: bool) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    if !success {
        std::process::exit(1);
    }
    Ok(())
}
