//! Read-only troubleshooting of the mint setup.
//!
//! [`diagnose`] runs its checks in a fixed order and stops at the first
//! failure. The report always carries every detail gathered up to that point,
//! so it is useful on its own. It works from raw [`Settings`] because it has
//! to run when the configuration is incomplete.

use chain_sol::{MintState, Pubkey, SigningIdentity, TokenProgram};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{env, Cluster, RpcConfig, Settings};
use crate::rpc::{RpcError, SolanaRpc};

/// Hex characters of account data included in a report.
const PREVIEW_HEX_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Configuration,
    PayerKey,
    MintAddress,
    RpcConnection,
    MintAccount,
    MintOwner,
    MintData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticReport {
    pub success: bool,
    /// The check that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<DiagnosticStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub details: DiagnosticDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticDetails {
    pub rpc_url: String,
    pub network: Option<Cluster>,
    pub mint_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<PayerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mint_info: Option<MintInfoDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_preview: Option<DataPreview>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayerDetails {
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mint_authority: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDetails {
    pub address: String,
    pub program: Option<&'static str>,
    pub is_token_program: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfoDetails {
    pub decimals: u8,
    pub is_initialized: bool,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    /// Base units.
    pub supply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPreview {
    pub hex: String,
    pub length: usize,
}

impl DataPreview {
    fn of(data: &[u8]) -> Self {
        let mut hex = hex::encode(data);
        hex.truncate(PREVIEW_HEX_CHARS);
        Self {
            hex,
            length: data.len(),
        }
    }
}

struct Probe {
    details: DiagnosticDetails,
}

impl Probe {
    fn fail(self, stage: DiagnosticStage, error: impl Into<String>) -> DiagnosticReport {
        let error = error.into();
        warn!(?stage, %error, "diagnostic check failed");
        DiagnosticReport {
            success: false,
            stage: Some(stage),
            error: Some(error),
            details: self.details,
        }
    }

    fn pass(self) -> DiagnosticReport {
        DiagnosticReport {
            success: true,
            stage: None,
            error: None,
            details: self.details,
        }
    }
}

/// Check configuration and on-chain mint state without changing anything.
///
/// `connect` builds the RPC client; it is only called once every local
/// check has passed, so a bad configuration never touches the network.
pub async fn diagnose<R, F>(settings: &Settings, connect: F) -> DiagnosticReport
where
    R: SolanaRpc,
    F: FnOnce(&RpcConfig) -> Result<R, RpcError>,
{
    let rpc_url = settings.rpc_url();
    let mut probe = Probe {
        details: DiagnosticDetails {
            rpc_url: rpc_url.to_string(),
            network: Some(Cluster::from_url(rpc_url)),
            mint_address: settings.mint_address.clone(),
            ..Default::default()
        },
    };
    info!(%rpc_url, "running mint diagnostics");

    // (a) configuration present and well-formed
    let rpc_config = match settings.rpc_config() {
        Ok(rpc_config) => rpc_config,
        Err(e) => return probe.fail(DiagnosticStage::Configuration, e.to_string()),
    };
    let Some(mint_address) = settings.mint_address.clone() else {
        return probe.fail(
            DiagnosticStage::Configuration,
            format!("token mint address is not configured ({} is not set)", env::MINT_ADDRESS),
        );
    };
    let Some(payer_secret) = settings.payer_secret() else {
        return probe.fail(
            DiagnosticStage::Configuration,
            format!("payer private key is not configured ({} is not set)", env::PAYER_PRIVATE_KEY),
        );
    };

    // (b) payer key decodes
    let payer = match SigningIdentity::from_base58(payer_secret) {
        Ok(payer) => payer.public_key(),
        Err(e) => return probe.fail(DiagnosticStage::PayerKey, format!("Invalid payer private key: {e}")),
    };
    probe.details.payer = Some(PayerDetails {
        public_key: payer.to_string(),
        is_mint_authority: None,
    });

    // (c) mint address well-formed
    let mint = match mint_address.parse::<Pubkey>() {
        Ok(mint) => mint,
        Err(e) => {
            return probe.fail(
                DiagnosticStage::MintAddress,
                format!("Invalid mint address format: {e}"),
            )
        }
    };
    probe.details.mint_address = Some(mint.to_string());

    // (d) endpoint reachable
    let rpc = match connect(&rpc_config) {
        Ok(rpc) => rpc,
        Err(e) => {
            return probe.fail(
                DiagnosticStage::RpcConnection,
                format!("Failed to connect to Solana RPC: {e}"),
            )
        }
    };
    match rpc.get_version().await {
        Ok(version) => probe.details.rpc_version = Some(version.solana_core),
        Err(e) => {
            return probe.fail(
                DiagnosticStage::RpcConnection,
                format!("Failed to connect to Solana RPC: {e}"),
            )
        }
    }

    // (e) mint account exists
    let account = match rpc.get_account(&mint).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return probe.fail(
                DiagnosticStage::MintAccount,
                "Mint account does not exist on this network",
            )
        }
        Err(e) => {
            return probe.fail(
                DiagnosticStage::MintAccount,
                format!("Failed to fetch mint account: {e}"),
            )
        }
    };
    let program = TokenProgram::from_id(&account.owner);
    probe.details.owner = Some(OwnerDetails {
        address: account.owner.to_string(),
        program: program.map(TokenProgram::name),
        is_token_program: program.is_some(),
    });
    probe.details.data_preview = Some(DataPreview::of(&account.data));

    // (f) owned by a token program
    let Some(program) = program else {
        return probe.fail(
            DiagnosticStage::MintOwner,
            format!(
                "Account exists but is owned by {}, not a token program",
                account.owner
            ),
        );
    };

    // (g) mint data parses
    let state = match MintState::unpack(&account.data) {
        Ok(state) => state,
        Err(e) => {
            return probe.fail(
                DiagnosticStage::MintData,
                format!(
                    "Account is owned by the {} token program but failed to parse as mint: {e}",
                    program.name()
                ),
            )
        }
    };

    if let Some(payer_details) = probe.details.payer.as_mut() {
        payer_details.is_mint_authority = Some(state.mint_authority == Some(payer));
    }
    probe.details.mint_info = Some(MintInfoDetails {
        decimals: state.decimals,
        is_initialized: state.is_initialized,
        mint_authority: state.mint_authority.map(|k| k.to_string()),
        freeze_authority: state.freeze_authority.map(|k| k.to_string()),
        supply: state.supply.to_string(),
    });

    info!(%mint, program = program.name(), "mint diagnostics passed");
    probe.pass()
}
