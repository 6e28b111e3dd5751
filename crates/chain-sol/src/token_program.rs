//! Token programs, associated token accounts and token instruction encoding.
//!
//! Two token programs are recognized: the original SPL Token program and the
//! token-extensions program. Both share the base mint / account layouts but are
//! driven with different mint-to encodings, and associated token account
//! addresses differ per program because the program id is one of the seeds.
//! Everything here dispatches on [`TokenProgram`] with an explicit `match`.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SolError;
use crate::transaction::{SolAccountMeta, SolInstruction, SYSTEM_PROGRAM_ID};

// ---------------------------------------------------------------------------
// Well-known program IDs
// ---------------------------------------------------------------------------

/// SPL Token Program ID: `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// Token extensions program ID: `TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb`
pub const TOKEN_2022_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x06, 0xdd, 0xf6, 0xe1, 0xee, 0x75, 0x8f, 0xde, 0x18, 0x42, 0x5d, 0xbc, 0xe4, 0x6c, 0xcd,
    0xda, 0xb6, 0x1a, 0xfc, 0x4d, 0x83, 0xb9, 0x0d, 0x27, 0xfe, 0xbd, 0xf9, 0x28, 0xd8, 0xa1,
    0x8b, 0xfc,
]);

/// Associated Token Account Program ID: `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Size of the base mint layout shared by both programs.
pub const MINT_LEN: usize = 82;

/// Size of the prefix of a token account we decode (mint, owner, amount).
const TOKEN_ACCOUNT_PREFIX_LEN: usize = 72;

const MINT_TO_TAG: u8 = 7;
const MINT_TO_CHECKED_TAG: u8 = 14;

// ---------------------------------------------------------------------------
// Program registry
// ---------------------------------------------------------------------------

/// One of the two recognized token programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenProgram {
    /// The original SPL Token program.
    Standard,
    /// The token-extensions program.
    Custom,
}

/// Instructions the token service builds against a token program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOperation {
    CreateAssociatedAccount,
    MintTo,
    MintToChecked,
}

/// Wire encoding used for the mint-to instruction of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintToEncoding {
    /// Tag 7 followed by the `u64` LE amount.
    Plain,
    /// Tag 14 followed by the `u64` LE amount and the `u8` decimals.
    Checked,
}

impl TokenProgram {
    /// Order in which programs are consulted when looking for an account.
    /// The custom program wins when both hold an account for the same pair.
    pub const LOOKUP_ORDER: [TokenProgram; 2] = [TokenProgram::Custom, TokenProgram::Standard];

    pub const fn id(self) -> Pubkey {
        match self {
            TokenProgram::Standard => TOKEN_PROGRAM_ID,
            TokenProgram::Custom => TOKEN_2022_PROGRAM_ID,
        }
    }

    /// Map an account owner to a recognized program.
    pub fn from_id(id: &Pubkey) -> Option<Self> {
        if *id == TOKEN_PROGRAM_ID {
            Some(TokenProgram::Standard)
        } else if *id == TOKEN_2022_PROGRAM_ID {
            Some(TokenProgram::Custom)
        } else {
            None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            TokenProgram::Standard => "standard",
            TokenProgram::Custom => "custom",
        }
    }

    /// Whether instructions for `op` may be built against this program.
    /// Instruction builders refuse unsupported pairs.
    pub const fn supports(self, op: TokenOperation) -> bool {
        match op {
            TokenOperation::CreateAssociatedAccount
            | TokenOperation::MintTo
            | TokenOperation::MintToChecked => true,
        }
    }

    fn require(self, op: TokenOperation) -> Result<(), SolError> {
        if self.supports(op) {
            Ok(())
        } else {
            Err(SolError::TransactionBuildError(format!(
                "{op:?} is not supported by the {} token program",
                self.name()
            )))
        }
    }

    /// Preferred mint-to encoding when the mint's decimals are known.
    pub const fn mint_to_encoding(self) -> MintToEncoding {
        match self {
            TokenProgram::Standard => MintToEncoding::Plain,
            TokenProgram::Custom => MintToEncoding::Checked,
        }
    }
}

impl std::fmt::Display for TokenProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

// ---------------------------------------------------------------------------
// Associated Token Account (PDA) derivation
// ---------------------------------------------------------------------------

/// Derive the associated token account address for a wallet + mint pair
/// under the given token program.
///
/// The ATA is a Program Derived Address (PDA) with seeds:
///   `[wallet_address, token_program_id, mint_address]`
/// derived from the Associated Token Account program.
pub fn derive_associated_token_address(
    wallet: &Pubkey,
    mint: &Pubkey,
    program: TokenProgram,
) -> Result<Pubkey, SolError> {
    let program_id = program.id();
    find_program_address(
        &[wallet.as_ref(), program_id.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SolError> {
    for bump in (0u8..=255).rev() {
        if let Some(address) = try_create_program_address(seeds, &[bump], program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::DerivationFailed(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `None` if the derived point falls on the curve.
fn try_create_program_address(
    seeds: &[&[u8]],
    bump_seed: &[u8],
    program_id: &Pubkey,
) -> Option<Pubkey> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update(bump_seed);
    hasher.update(program_id.as_ref());
    hasher.update(PDA_MARKER);

    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return None;
    }

    Some(Pubkey::new_from_array(hash))
}

/// Check if 32 bytes decompress to an Ed25519 curve point.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Build the associated token account `Create` instruction.
///
/// Uses the non-idempotent variant (empty data): creating an account that
/// already exists fails on-chain.
pub fn build_create_associated_account(
    payer: &Pubkey,
    associated_account: &Pubkey,
    wallet: &Pubkey,
    mint: &Pubkey,
    program: TokenProgram,
) -> Result<SolInstruction, SolError> {
    program.require(TokenOperation::CreateAssociatedAccount)?;

    Ok(SolInstruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta::writable(*payer, true),
            SolAccountMeta::writable(*associated_account, false),
            SolAccountMeta::readonly(*wallet, false),
            SolAccountMeta::readonly(*mint, false),
            SolAccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            SolAccountMeta::readonly(program.id(), false),
        ],
        data: Vec::new(),
    })
}

/// Build a mint-to instruction.
///
/// `amount` is in base units. `decimals` is `Some` only when read from the
/// mint itself: the program's preferred encoding is used then, and the chain
/// rejects a mismatch under [`MintToEncoding::Checked`]. With `None` the plain
/// encoding is used, which carries no decimals to get wrong.
pub fn build_mint_to(
    program: TokenProgram,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
    decimals: Option<u8>,
) -> Result<SolInstruction, SolError> {
    if amount == 0 {
        return Err(SolError::TransactionBuildError(
            "mint amount must be > 0".into(),
        ));
    }

    let encoding = match decimals {
        Some(decimals) => (program.mint_to_encoding(), decimals),
        None => (MintToEncoding::Plain, 0),
    };
    program.require(match encoding.0 {
        MintToEncoding::Plain => TokenOperation::MintTo,
        MintToEncoding::Checked => TokenOperation::MintToChecked,
    })?;
    let data = match encoding {
        (MintToEncoding::Plain, _) => {
            let mut data = Vec::with_capacity(9);
            data.push(MINT_TO_TAG);
            data.extend_from_slice(&amount.to_le_bytes());
            data
        }
        (MintToEncoding::Checked, decimals) => {
            let mut data = Vec::with_capacity(10);
            data.push(MINT_TO_CHECKED_TAG);
            data.extend_from_slice(&amount.to_le_bytes());
            data.push(decimals);
            data
        }
    };

    Ok(SolInstruction {
        program_id: program.id(),
        accounts: vec![
            SolAccountMeta::writable(*mint, false),
            SolAccountMeta::writable(*destination, false),
            SolAccountMeta::readonly(*authority, true),
        ],
        data,
    })
}

// ---------------------------------------------------------------------------
// Account state
// ---------------------------------------------------------------------------

/// Decoded base mint layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintState {
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    pub freeze_authority: Option<Pubkey>,
}

impl MintState {
    /// Decode the first [`MINT_LEN`] bytes of a mint account.
    ///
    /// Token-extensions mints carry extension data after the base layout;
    /// it is ignored.
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() < MINT_LEN {
            return Err(SolError::InvalidAccountData(format!(
                "mint data too short: {} bytes, expected at least {MINT_LEN}",
                data.len()
            )));
        }

        let mint_authority = read_coption_key(&data[0..36])?;
        let supply = read_u64(&data[36..44]);
        let decimals = data[44];
        let is_initialized = match data[45] {
            0 => false,
            1 => true,
            other => {
                return Err(SolError::InvalidAccountData(format!(
                    "invalid is_initialized flag {other}"
                )))
            }
        };
        let freeze_authority = read_coption_key(&data[46..82])?;

        if !is_initialized {
            return Err(SolError::InvalidAccountData("mint is not initialized".into()));
        }

        Ok(Self {
            mint_authority,
            supply,
            decimals,
            is_initialized,
            freeze_authority,
        })
    }
}

/// The decoded prefix of a token account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccountState {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl TokenAccountState {
    pub fn unpack(data: &[u8]) -> Result<Self, SolError> {
        if data.len() < TOKEN_ACCOUNT_PREFIX_LEN {
            return Err(SolError::InvalidAccountData(format!(
                "token account data too short: {} bytes",
                data.len()
            )));
        }

        Ok(Self {
            mint: read_key(&data[0..32]),
            owner: read_key(&data[32..64]),
            amount: read_u64(&data[64..72]),
        })
    }
}

fn read_key(bytes: &[u8]) -> Pubkey {
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[..32]);
    Pubkey::new_from_array(key)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// `COption<Pubkey>`: u32 LE tag (0 = None, 1 = Some) followed by 32 bytes.
fn read_coption_key(bytes: &[u8]) -> Result<Option<Pubkey>, SolError> {
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&bytes[..4]);
    match u32::from_le_bytes(tag) {
        0 => Ok(None),
        1 => Ok(Some(read_key(&bytes[4..36]))),
        other => Err(SolError::InvalidAccountData(format!(
            "invalid option tag {other}"
        ))),
    }
}

/// Encode a base mint layout. The inverse of [`MintState::unpack`].
pub fn pack_mint(state: &MintState) -> Vec<u8> {
    let mut data = Vec::with_capacity(MINT_LEN);
    write_coption_key(&mut data, state.mint_authority.as_ref());
    data.extend_from_slice(&state.supply.to_le_bytes());
    data.push(state.decimals);
    data.push(u8::from(state.is_initialized));
    write_coption_key(&mut data, state.freeze_authority.as_ref());
    data
}

/// Encode a 165-byte initialized token account with the given balance.
pub fn pack_token_account(state: &TokenAccountState) -> Vec<u8> {
    let mut data = vec![0u8; 165];
    data[0..32].copy_from_slice(state.mint.as_ref());
    data[32..64].copy_from_slice(state.owner.as_ref());
    data[64..72].copy_from_slice(&state.amount.to_le_bytes());
    // delegate: None (already zero), state: Initialized
    data[108] = 1;
    data
}

fn write_coption_key(out: &mut Vec<u8>, key: Option<&Pubkey>) {
    match key {
        Some(key) => {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(key.as_ref());
        }
        None => {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 32]);
        }
    }
}
