//! In-memory chain for driving the service without a node.
//!
//! Submitted transactions are decoded from their wire bytes, signature
//! checked, and applied: associated account creation and mint-to /
//! mint-to-checked are understood. Every RPC method is counted and can be
//! made to fail, once or until cleared.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chain_sol::token_program::{pack_mint, pack_token_account};
use chain_sol::{
    derive_associated_token_address, parse_transaction, MintState, ParsedTransaction, Pubkey,
    SigningIdentity, TokenAccountState, TokenProgram, ASSOCIATED_TOKEN_PROGRAM_ID,
};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use token_service::rpc::{
    AccountInfo, KeyedAccount, RpcError, RpcVersion, SignatureStatus, SolanaRpc, UiTokenAmount,
};
use token_service::{Commitment, RpcConfig, TokenConfig, TokenDescriptor, TokenService};

pub const GET_VERSION: &str = "getVersion";
pub const GET_ACCOUNT: &str = "getAccountInfo";
pub const GET_TOKEN_ACCOUNTS: &str = "getTokenAccountsByOwner";
pub const GET_BALANCE: &str = "getTokenAccountBalance";
pub const GET_BLOCKHASH: &str = "getLatestBlockhash";
pub const SEND: &str = "sendTransaction";
pub const GET_STATUS: &str = "getSignatureStatuses";

const BLOCKHASH: [u8; 32] = [7; 32];
const RENT_EXEMPT_LAMPORTS: u64 = 2_039_280;

pub fn key(byte: u8) -> Pubkey {
    Pubkey::new_from_array([byte; 32])
}

pub fn payer_identity() -> SigningIdentity {
    SigningIdentity::from_seed(&[1; 32])
}

pub fn payer_secret_base58() -> String {
    bs58::encode([1u8; 32]).into_string()
}

pub fn mint_key() -> Pubkey {
    key(0xA1)
}

pub fn wallet_key() -> Pubkey {
    key(0x42)
}

pub fn test_config(mint: Pubkey) -> TokenConfig {
    TokenConfig {
        token: TokenDescriptor {
            mint,
            decimals_hint: Some(9),
            symbol: "MCFT".into(),
            name: "Minecraft Token".into(),
        },
        rpc: RpcConfig {
            url: "http://localhost:8899".into(),
            commitment: Commitment::Confirmed,
            confirm_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
        },
        payer: payer_identity(),
    }
}

/// A service over a fresh chain holding the configured mint under `program`,
/// with the payer as mint authority.
pub fn service_with_mint(
    program: TokenProgram,
    decimals: u8,
) -> (TokenService<Arc<FakeChain>>, Arc<FakeChain>) {
    let chain = Arc::new(FakeChain::new());
    chain.add_mint(mint_key(), program, decimals, Some(payer_identity().public_key()));
    let service = TokenService::new(test_config(mint_key()), Arc::clone(&chain));
    (service, chain)
}

#[derive(Default)]
struct State {
    accounts: BTreeMap<Pubkey, AccountInfo>,
    statuses: HashMap<String, SignatureStatus>,
    submitted: Vec<ParsedTransaction>,
}

#[derive(Default)]
pub struct FakeChain {
    state: Mutex<State>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, RpcError>>,
    /// Consumed by the next call of the method.
    one_shot: Mutex<HashMap<&'static str, RpcError>>,
    /// Reported as the on-chain error of every submitted transaction.
    status_error: Mutex<Option<String>>,
    /// When false, signature statuses stay unknown forever.
    statuses_hidden: Mutex<bool>,
    null_ui_amount: Mutex<bool>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self::default()
    }

    // -- setup ---------------------------------------------------------------

    pub fn set_account(&self, address: Pubkey, account: AccountInfo) {
        self.state.lock().unwrap().accounts.insert(address, account);
    }

    pub fn add_mint(
        &self,
        mint: Pubkey,
        program: TokenProgram,
        decimals: u8,
        authority: Option<Pubkey>,
    ) {
        let data = pack_mint(&MintState {
            mint_authority: authority,
            supply: 0,
            decimals,
            is_initialized: true,
            freeze_authority: None,
        });
        self.set_account(
            mint,
            AccountInfo {
                owner: program.id(),
                lamports: 1_461_600,
                data,
                executable: false,
            },
        );
    }

    pub fn add_token_account(
        &self,
        address: Pubkey,
        program: TokenProgram,
        mint: Pubkey,
        owner: Pubkey,
        amount: u64,
    ) {
        self.set_account(
            address,
            AccountInfo {
                owner: program.id(),
                lamports: RENT_EXEMPT_LAMPORTS,
                data: pack_token_account(&TokenAccountState {
                    mint,
                    owner,
                    amount,
                }),
                executable: false,
            },
        );
    }

    pub fn fail_on(&self, method: &'static str, err: RpcError) {
        self.failures.lock().unwrap().insert(method, err);
    }

    pub fn fail_next(&self, method: &'static str, err: RpcError) {
        self.one_shot.lock().unwrap().insert(method, err);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
        self.one_shot.lock().unwrap().clear();
    }

    pub fn report_chain_error(&self, reason: &str) {
        *self.status_error.lock().unwrap() = Some(reason.to_string());
    }

    pub fn hide_statuses(&self) {
        *self.statuses_hidden.lock().unwrap() = true;
    }

    pub fn report_null_ui_amount(&self) {
        *self.null_ui_amount.lock().unwrap() = true;
    }

    // -- inspection ----------------------------------------------------------

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Every transaction handed to `sendTransaction`, accepted or not.
    pub fn submitted(&self) -> Vec<ParsedTransaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn account(&self, address: &Pubkey) -> Option<AccountInfo> {
        self.state.lock().unwrap().accounts.get(address).cloned()
    }

    pub fn token_amount(&self, address: &Pubkey) -> Option<u64> {
        self.account(address)
            .and_then(|a| TokenAccountState::unpack(&a.data).ok())
            .map(|s| s.amount)
    }

    // -- internals -----------------------------------------------------------

    fn enter(&self, method: &'static str) -> Result<(), RpcError> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        if let Some(err) = self.one_shot.lock().unwrap().remove(method) {
            return Err(err);
        }
        match self.failures.lock().unwrap().get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn apply(accounts: &mut BTreeMap<Pubkey, AccountInfo>, tx: &ParsedTransaction) -> Result<(), String> {
        let message = &tx.message;
        let signer = message.account_keys[0];

        for ix in &message.compiled_instructions {
            let program_id = message.program_id(ix).ok_or("bad program index")?;
            let keys = message.instruction_accounts(ix).ok_or("bad account index")?;

            if program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
                create_associated_account(accounts, &keys)?;
            } else if let Some(program) = TokenProgram::from_id(&program_id) {
                mint_to(accounts, program, &keys, &ix.data, &signer)?;
            } else {
                return Err(format!("unknown program {program_id}"));
            }
        }
        Ok(())
    }
}

fn create_associated_account(
    accounts: &mut BTreeMap<Pubkey, AccountInfo>,
    keys: &[Pubkey],
) -> Result<(), String> {
    let [_payer, address, wallet, mint, _system, token_program] = keys else {
        return Err("create: wrong account count".into());
    };
    let program = TokenProgram::from_id(token_program).ok_or("create: not a token program")?;

    let expected = derive_associated_token_address(wallet, mint, program).map_err(|e| e.to_string())?;
    if expected != *address {
        return Err("create: address does not match seeds".into());
    }
    if accounts.contains_key(address) {
        return Err(format!("create: account {address} already in use"));
    }
    match accounts.get(mint) {
        Some(m) if m.owner == *token_program => {}
        _ => return Err("create: mint not owned by token program".into()),
    }

    accounts.insert(
        *address,
        AccountInfo {
            owner: *token_program,
            lamports: RENT_EXEMPT_LAMPORTS,
            data: pack_token_account(&TokenAccountState {
                mint: *mint,
                owner: *wallet,
                amount: 0,
            }),
            executable: false,
        },
    );
    Ok(())
}

fn mint_to(
    accounts: &mut BTreeMap<Pubkey, AccountInfo>,
    program: TokenProgram,
    keys: &[Pubkey],
    data: &[u8],
    signer: &Pubkey,
) -> Result<(), String> {
    let [mint, destination, authority] = keys else {
        return Err("mint_to: wrong account count".into());
    };
    let (amount, checked_decimals) = match data {
        [7, rest @ ..] if rest.len() == 8 => (u64::from_le_bytes(rest.try_into().unwrap()), None),
        [14, rest @ ..] if rest.len() == 9 => (
            u64::from_le_bytes(rest[..8].try_into().unwrap()),
            Some(rest[8]),
        ),
        _ => return Err("mint_to: unknown instruction data".into()),
    };

    let mint_account = accounts.get(mint).ok_or("mint_to: mint missing")?;
    if mint_account.owner != program.id() {
        return Err("mint_to: incorrect program id for mint".into());
    }
    let mut state = MintState::unpack(&mint_account.data).map_err(|e| e.to_string())?;
    if state.mint_authority != Some(*authority) || authority != signer {
        return Err("mint_to: owner does not match".into());
    }
    if checked_decimals.is_some_and(|d| d != state.decimals) {
        return Err("mint_to: decimals mismatch".into());
    }

    let dest_account = accounts.get(destination).ok_or("mint_to: destination missing")?;
    if dest_account.owner != program.id() {
        return Err("mint_to: destination owned by another program".into());
    }
    let mut dest = TokenAccountState::unpack(&dest_account.data).map_err(|e| e.to_string())?;
    if dest.mint != *mint {
        return Err("mint_to: mint mismatch".into());
    }

    dest.amount = dest.amount.checked_add(amount).ok_or("mint_to: overflow")?;
    state.supply = state.supply.checked_add(amount).ok_or("mint_to: supply overflow")?;

    let tail_start = chain_sol::token_program::MINT_LEN;
    if let Some(m) = accounts.get_mut(mint) {
        let tail = m.data[tail_start..].to_vec();
        m.data = pack_mint(&state);
        m.data.extend_from_slice(&tail);
    }
    if let Some(d) = accounts.get_mut(destination) {
        d.data[64..72].copy_from_slice(&dest.amount.to_le_bytes());
    }
    Ok(())
}

#[async_trait]
impl SolanaRpc for FakeChain {
    fn url(&self) -> &str {
        "http://localhost:8899"
    }

    async fn get_version(&self) -> Result<RpcVersion, RpcError> {
        self.enter(GET_VERSION)?;
        Ok(RpcVersion {
            solana_core: "1.18.26".into(),
            feature_set: Some(1),
        })
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        self.enter(GET_ACCOUNT)?;
        Ok(self.account(address))
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Pubkey,
        program_id: &Pubkey,
    ) -> Result<Vec<KeyedAccount>, RpcError> {
        self.enter(GET_TOKEN_ACCOUNTS)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == *program_id)
            .filter(|(_, account)| {
                TokenAccountState::unpack(&account.data).is_ok_and(|s| s.owner == *owner)
                    && account.data.len() > chain_sol::token_program::MINT_LEN
            })
            .map(|(pubkey, account)| KeyedAccount {
                pubkey: *pubkey,
                account: account.clone(),
            })
            .collect())
    }

    async fn get_token_account_balance(
        &self,
        account: &Pubkey,
    ) -> Result<UiTokenAmount, RpcError> {
        self.enter(GET_BALANCE)?;
        let info = self.account(account).ok_or_else(|| RpcError::Rpc {
            code: -32602,
            message: "Invalid param: could not find account".into(),
        })?;
        let state = TokenAccountState::unpack(&info.data)
            .map_err(|e| RpcError::Rpc { code: -32602, message: e.to_string() })?;
        let decimals = self
            .account(&state.mint)
            .and_then(|m| MintState::unpack(&m.data).ok())
            .map(|m| m.decimals)
            .unwrap_or(0);

        let ui_amount = if *self.null_ui_amount.lock().unwrap() {
            None
        } else {
            Some(state.amount as f64 / 10f64.powi(i32::from(decimals)))
        };
        Ok(UiTokenAmount {
            amount: state.amount.to_string(),
            decimals,
            ui_amount,
            ui_amount_string: ui_amount.map(|a| a.to_string()),
        })
    }

    async fn get_latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        self.enter(GET_BLOCKHASH)?;
        Ok(BLOCKHASH)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<String, RpcError> {
        self.enter(SEND)?;
        let tx = parse_transaction(wire).map_err(|e| RpcError::Rpc {
            code: -32602,
            message: format!("failed to deserialize transaction: {e}"),
        })?;

        let verifying = VerifyingKey::from_bytes(tx.message.account_keys[0].as_bytes())
            .map_err(|e| RpcError::Rpc { code: -32003, message: e.to_string() })?;
        let signature = Signature::from_bytes(&tx.signatures[0]);
        verifying
            .verify(&tx.message_bytes, &signature)
            .map_err(|_| RpcError::Rpc {
                code: -32003,
                message: "Transaction signature verification failure".into(),
            })?;
        assert_eq!(tx.message.recent_blockhash, BLOCKHASH);

        let sig = bs58::encode(tx.signatures[0]).into_string();
        let mut state = self.state.lock().unwrap();
        state.submitted.push(tx.clone());

        let mut staged = state.accounts.clone();
        if let Err(reason) = Self::apply(&mut staged, &tx) {
            return Err(RpcError::Rpc {
                code: -32002,
                message: format!("Transaction simulation failed: {reason}"),
            });
        }

        let err = self.status_error.lock().unwrap().clone();
        if err.is_none() {
            state.accounts = staged;
        }
        state.statuses.insert(
            sig.clone(),
            SignatureStatus {
                confirmation_status: Some(Commitment::Confirmed),
                err,
            },
        );
        Ok(sig)
    }

    async fn get_signature_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        self.enter(GET_STATUS)?;
        if *self.statuses_hidden.lock().unwrap() {
            return Ok(None);
        }
        Ok(self.state.lock().unwrap().statuses.get(signature).cloned())
    }
}
