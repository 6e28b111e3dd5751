//! Manual Solana transaction wire format and signing.
//!
//! Transactions are built by hand, without `solana-sdk`.
//! The wire format is a compact binary layout documented here:
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        (see below)
//!
//! Instruction:
//!   program_id_index        u8
//!   num_accounts            compact-u16
//!   account_indices         u8 * num_accounts
//!   data_len                compact-u16
//!   data                    u8 * data_len
//! ```

use crate::address::Pubkey;
use crate::error::SolError;
use crate::keypair::SigningIdentity;

/// The Solana System Program public key: 32 zero bytes.
/// Base58: `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

// ---------------------------------------------------------------------------
// Compact-u16 encoding
// ---------------------------------------------------------------------------

/// Encode a `u16` value in Solana's compact-u16 format.
///
/// - Values 0..0x7f       -> 1 byte
/// - Values 0x80..0x3fff  -> 2 bytes
/// - Values 0x4000..      -> 3 bytes
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut val = value as u32;
    let mut out = Vec::with_capacity(3);

    loop {
        let mut byte = (val & 0x7f) as u8;
        val >>= 7;
        if val > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if val == 0 {
            break;
        }
    }

    out
}

/// Decode a compact-u16 value from a byte slice.
///
/// Returns `(value, bytes_consumed)` or an error if the data is truncated.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut consumed = 0usize;

    loop {
        let byte = *data.get(consumed).ok_or_else(|| {
            SolError::SerializationError(
                "unexpected end of data while decoding compact-u16".into(),
            )
        })?;
        consumed += 1;

        value |= ((byte & 0x7f) as u32) << shift;
        shift += 7;

        if byte & 0x80 == 0 || consumed >= 3 {
            break;
        }
    }

    if value > u16::MAX as u32 {
        return Err(SolError::SerializationError(
            "compact-u16 value overflow".into(),
        ));
    }

    Ok((value as u16, consumed))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A single account reference in a Solana instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolAccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl SolAccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: false,
        }
    }
}

/// A Solana instruction (before it is compiled into a transaction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolTransaction {
    /// All account keys referenced by this transaction, in canonical order:
    ///   1. writable signers
    ///   2. read-only signers
    ///   3. writable non-signers
    ///   4. read-only non-signers
    pub account_keys: Vec<Pubkey>,

    /// Number of required signatures (first N accounts are signers).
    pub num_required_signatures: u8,
    /// How many of the signing accounts are read-only.
    pub num_readonly_signed: u8,
    /// How many of the non-signing accounts are read-only.
    pub num_readonly_unsigned: u8,

    pub recent_blockhash: [u8; 32],

    /// Compiled instructions (account references replaced with indices).
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// A compiled instruction where account references are replaced by u8 indices
/// into the transaction's `account_keys` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

impl SolTransaction {
    /// Resolve a compiled instruction's program id.
    pub fn program_id(&self, ix: &CompiledInstruction) -> Option<Pubkey> {
        self.account_keys.get(ix.program_id_index as usize).copied()
    }

    /// Resolve a compiled instruction's account keys, in instruction order.
    pub fn instruction_accounts(&self, ix: &CompiledInstruction) -> Option<Vec<Pubkey>> {
        ix.account_indices
            .iter()
            .map(|i| self.account_keys.get(*i as usize).copied())
            .collect()
    }
}

/// A signed transaction ready for `sendTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub wire: Vec<u8>,
    pub signature: [u8; 64],
}

impl SignedTransaction {
    /// The transaction signature as Solana reports it (Base58).
    pub fn signature_base58(&self) -> String {
        bs58::encode(self.signature).into_string()
    }
}

/// A wire transaction decoded back into its parts.
#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub signatures: Vec<[u8; 64]>,
    pub message: SolTransaction,
    pub message_bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Transaction building
// ---------------------------------------------------------------------------

/// Build a transaction from a set of instructions with a single fee payer.
///
/// The fee payer is always the first signer and is placed at index 0 in the
/// account keys.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &Pubkey,
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    if instructions.is_empty() {
        return Err(SolError::TransactionBuildError(
            "transaction has no instructions".into(),
        ));
    }

    struct AccountEntry {
        pubkey: Pubkey,
        is_signer: bool,
        is_writable: bool,
    }

    let mut entries: Vec<AccountEntry> = Vec::new();

    let mut upsert = |pubkey: Pubkey, signer: bool, writable: bool| {
        if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
            entry.is_signer |= signer;
            entry.is_writable |= writable;
        } else {
            entries.push(AccountEntry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            });
        }
    };

    // Fee payer is always signer + writable.
    upsert(*fee_payer, true, true);

    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        // Program IDs are non-signer, read-only accounts.
        upsert(ix.program_id, false, false);
    }

    if entries.len() > u8::MAX as usize {
        return Err(SolError::TransactionBuildError(format!(
            "too many accounts: {}",
            entries.len()
        )));
    }

    // Stable sort: the fee payer was inserted first and ranks first.
    entries.sort_by_key(|e| match (e.is_signer, e.is_writable) {
        (true, true) => 0u8,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    });

    if entries[0].pubkey != *fee_payer {
        return Err(SolError::TransactionBuildError(
            "fee payer is not the first account".into(),
        ));
    }

    let num_signers = entries.iter().filter(|e| e.is_signer).count() as u8;
    let num_readonly_signed = entries
        .iter()
        .filter(|e| e.is_signer && !e.is_writable)
        .count() as u8;
    let num_readonly_unsigned = entries
        .iter()
        .filter(|e| !e.is_signer && !e.is_writable)
        .count() as u8;

    let account_keys: Vec<Pubkey> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &Pubkey, what: &str| -> Result<u8, SolError> {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError(format!("{what} not in account keys")))
    };

    let mut compiled = Vec::with_capacity(instructions.len());
    for ix in instructions {
        let program_id_index = index_of(&ix.program_id, "program_id")?;
        let account_indices = ix
            .accounts
            .iter()
            .map(|meta| index_of(&meta.pubkey, "account"))
            .collect::<Result<Vec<_>, _>>()?;

        compiled.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data: ix.data.clone(),
        });
    }

    Ok(SolTransaction {
        account_keys,
        num_required_signatures: num_signers,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions: compiled,
    })
}

/// Serialize the transaction message (the bytes that get signed).
pub fn serialize_message(tx: &SolTransaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    buf.push(tx.num_required_signatures);
    buf.push(tx.num_readonly_signed);
    buf.push(tx.num_readonly_unsigned);

    buf.extend_from_slice(&encode_compact_u16(tx.account_keys.len() as u16));
    for key in &tx.account_keys {
        buf.extend_from_slice(key.as_ref());
    }

    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(tx.compiled_instructions.len() as u16));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);

        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);

        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }

    buf
}

/// Sign and serialize a single-signer transaction into its wire format.
pub fn sign_transaction(
    tx: &SolTransaction,
    signer: &SigningIdentity,
) -> Result<SignedTransaction, SolError> {
    if tx.num_required_signatures != 1 {
        return Err(SolError::TransactionBuildError(format!(
            "expected exactly one signer, message requires {}",
            tx.num_required_signatures
        )));
    }
    if tx.account_keys.first() != Some(&signer.public_key()) {
        return Err(SolError::TransactionBuildError(
            "signer is not the fee payer".into(),
        ));
    }

    let message_bytes = serialize_message(tx);
    let signature = signer.sign(&message_bytes);

    let mut wire = Vec::with_capacity(1 + 64 + message_bytes.len());
    wire.extend_from_slice(&encode_compact_u16(1));
    wire.extend_from_slice(&signature);
    wire.extend_from_slice(&message_bytes);

    Ok(SignedTransaction { wire, signature })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], SolError> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let slice = &self.data[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(SolError::SerializationError(format!(
                "transaction too short while reading {what}"
            ))),
        }
    }

    fn byte(&mut self, what: &str) -> Result<u8, SolError> {
        Ok(self.take(1, what)?[0])
    }

    fn compact_u16(&mut self) -> Result<usize, SolError> {
        let (value, consumed) = decode_compact_u16(&self.data[self.pos.min(self.data.len())..])?;
        self.pos += consumed;
        Ok(value as usize)
    }
}

/// Decode a wire-format transaction.
pub fn parse_transaction(wire: &[u8]) -> Result<ParsedTransaction, SolError> {
    let mut reader = Reader { data: wire, pos: 0 };

    let num_sigs = reader.compact_u16()?;
    let mut signatures = Vec::with_capacity(num_sigs);
    for _ in 0..num_sigs {
        let mut sig = [0u8; 64];
        sig.copy_from_slice(reader.take(64, "signature")?);
        signatures.push(sig);
    }

    let message_start = reader.pos;

    let num_required_signatures = reader.byte("header")?;
    let num_readonly_signed = reader.byte("header")?;
    let num_readonly_unsigned = reader.byte("header")?;

    let num_accounts = reader.compact_u16()?;
    let mut account_keys = Vec::with_capacity(num_accounts);
    for _ in 0..num_accounts {
        let mut key = [0u8; 32];
        key.copy_from_slice(reader.take(32, "account key")?);
        account_keys.push(Pubkey::new_from_array(key));
    }

    let mut recent_blockhash = [0u8; 32];
    recent_blockhash.copy_from_slice(reader.take(32, "recent blockhash")?);

    let num_instructions = reader.compact_u16()?;
    let mut compiled_instructions = Vec::with_capacity(num_instructions);
    for _ in 0..num_instructions {
        let program_id_index = reader.byte("program index")?;
        let n = reader.compact_u16()?;
        let account_indices = reader.take(n, "account indices")?.to_vec();
        let len = reader.compact_u16()?;
        let data = reader.take(len, "instruction data")?.to_vec();
        compiled_instructions.push(CompiledInstruction {
            program_id_index,
            account_indices,
            data,
        });
    }

    if reader.pos != wire.len() {
        return Err(SolError::SerializationError(format!(
            "{} trailing bytes after message",
            wire.len() - reader.pos
        )));
    }

    Ok(ParsedTransaction {
        signatures,
        message: SolTransaction {
            account_keys,
            num_required_signatures,
            num_readonly_signed,
            num_readonly_unsigned,
            recent_blockhash,
            compiled_instructions,
        },
        message_bytes: wire[message_start..].to_vec(),
    })
}
