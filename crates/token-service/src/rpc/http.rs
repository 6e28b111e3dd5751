//! JSON-RPC 2.0 over HTTP.
//!
//! Requests go out through `reqwest`; everything that turns a response body
//! into typed values lives in plain functions below so it can be tested
//! without a node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chain_sol::Pubkey;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    AccountInfo, KeyedAccount, RpcError, RpcVersion, SignatureStatus, SolanaRpc, UiTokenAmount,
};
use crate::config::{Commitment, RpcConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpRpcClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            commitment: config.commitment,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, url = %self.url, "rpc_request");

        let response = self.http.post(&self.url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Transport(format!("HTTP {status}: {body}")));
        }

        let body: Value = response.json().await?;
        decode_envelope(body)
    }

    fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment.as_str() })
    }
}

#[async_trait]
impl SolanaRpc for HttpRpcClient {
    fn url(&self) -> &str {
        &self.url
    }

    async fn get_version(&self) -> Result<RpcVersion, RpcError> {
        let result = self.call("getVersion", json!([])).await?;
        decode_version(result)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        let params = json!([
            address.to_string(),
            { "encoding": "base64", "commitment": self.commitment.as_str() },
        ]);
        let result = self.call("getAccountInfo", params).await?;
        decode_account(result)
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<KeyedAccount>, RpcError> {
        let params = json!([
            owner.to_string(),
            { "programId": program_id.to_string() },
            { "encoding": "base64", "commitment": self.commitment.as_str() },
        ]);
        let result = self.call("getTokenAccountsByOwner", params).await?;
        decode_keyed_accounts(result)
    }

    async fn get_token_account_balance(
        &self,
        account: &Pubkey,
    ) -> Result<UiTokenAmount, RpcError> {
        let params = json!([account.to_string(), self.commitment_config()]);
        let result = self.call("getTokenAccountBalance", params).await?;
        decode_token_amount(result)
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let result = self
            .call("getLatestBlockhash", json!([self.commitment_config()]))
            .await?;
        decode_blockhash(result)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        let params = json!([
            BASE64.encode(wire),
            { "encoding": "base64", "preflightCommitment": self.commitment.as_str() },
        ]);
        let result = self.call("sendTransaction", params).await?;
        from_result::<String>(result)
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let params = json!([[signature], { "searchTransactionHistory": true }]);
        let result = self.call("getSignatureStatuses", params).await?;
        decode_signature_status(result)
    }
}

// ---------------------------------------------------------------------------
// Response decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Envelope {
    result: Option<Value>,
    error: Option<ErrorObject>,
}

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

/// `{ "context": {...}, "value": T }`
#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
    executable: bool,
}

#[derive(Deserialize)]
struct UiKeyedAccount {
    pubkey: String,
    account: UiAccount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiBalance {
    amount: String,
    decimals: u8,
    ui_amount: Option<f64>,
    ui_amount_string: Option<String>,
}

#[derive(Deserialize)]
struct UiVersion {
    #[serde(rename = "solana-core")]
    solana_core: String,
    #[serde(rename = "feature-set")]
    feature_set: Option<u64>,
}

#[derive(Deserialize)]
struct UiBlockhash {
    blockhash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiSignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

fn decode_envelope(body: Value) -> Result<Value, RpcError> {
    let envelope: Envelope = from_result(body)?;
    if let Some(error) = envelope.error {
        return Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| RpcError::Decode("response has neither result nor error".into()))
}

fn from_result<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string()))
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, RpcError> {
    value
        .parse()
        .map_err(|e| RpcError::Decode(format!("{field}: {e}")))
}

fn convert_account(account: UiAccount) -> Result<AccountInfo, RpcError> {
    let (payload, encoding) = account.data;
    if encoding != "base64" {
        return Err(RpcError::Decode(format!(
            "unexpected account data encoding `{encoding}`"
        )));
    }
    let data = BASE64
        .decode(payload)
        .map_err(|e| RpcError::Decode(format!("account data: {e}")))?;

    Ok(AccountInfo {
        owner: parse_pubkey("owner", &account.owner)?,
        lamports: account.lamports,
        data,
        executable: account.executable,
    })
}

fn decode_version(result: Value) -> Result<RpcVersion, RpcError> {
    let version: UiVersion = from_result(result)?;
    Ok(RpcVersion {
        solana_core: version.solana_core,
        feature_set: version.feature_set,
    })
}

fn decode_account(result: Value) -> Result<Option<AccountInfo>, RpcError> {
    let response: WithContext<Option<UiAccount>> = from_result(result)?;
    response.value.map(convert_account).transpose()
}

fn decode_keyed_accounts(result: Value) -> Result<Vec<KeyedAccount>, RpcError> {
    let response: WithContext<Vec<UiKeyedAccount>> = from_result(result)?;
    response
        .value
        .into_iter()
        .map(|keyed| {
            Ok(KeyedAccount {
                pubkey: parse_pubkey("pubkey", &keyed.pubkey)?,
                account: convert_account(keyed.account)?,
            })
        })
        .collect()
}

fn decode_token_amount(result: Value) -> Result<UiTokenAmount, RpcError> {
    let response: WithContext<UiBalance> = from_result(result)?;
    let balance = response.value;
    Ok(UiTokenAmount {
        amount: balance.amount,
        decimals: balance.decimals,
        ui_amount: balance.ui_amount,
        ui_amount_string: balance.ui_amount_string,
    })
}

fn decode_blockhash(result: Value) -> Result<[u8; 32], RpcError> {
    let response: WithContext<UiBlockhash> = from_result(result)?;
    let bytes = bs58::decode(&response.value.blockhash)
        .into_vec()
        .map_err(|e| RpcError::Decode(format!("blockhash: {e}")))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| RpcError::Decode(format!("blockhash is {} bytes", b.len())))
}

fn decode_signature_status(result: Value) -> Result<Option<SignatureStatus>, RpcError> {
    let response: WithContext<Vec<Option<UiSignatureStatus>>> = from_result(result)?;
    let Some(status) = response.value.into_iter().next().flatten() else {
        return Ok(None);
    };

    let confirmation_status = status
        .confirmation_status
        .as_deref()
        .map(str::parse::<Commitment>)
        .transpose()
        .map_err(RpcError::Decode)?;
    let err = status.err.filter(|e| !e.is_null()).map(|e| e.to_string());

    Ok(Some(SignatureStatus {
        confirmation_status,
        err,
    }))
}
