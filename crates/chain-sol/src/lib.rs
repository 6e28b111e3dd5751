//! Solana primitives for the token service.
//!
//! This crate handles Solana address encoding, associated token account
//! derivation under either token program, token instruction encoding, mint and
//! token account decoding, and the transaction wire format, all without
//! pulling in `solana-sdk`.
//!
//! Signing uses `ed25519-dalek`, addresses use `bs58`, and program-derived
//! addresses use `sha2` plus `curve25519-dalek` for the off-curve check.
//! Nothing in here performs I/O.

pub mod address;
pub mod error;
pub mod keypair;
pub mod token_program;
pub mod transaction;

pub use address::{address_to_bytes, bytes_to_address, Pubkey};
pub use error::SolError;
pub use keypair::SigningIdentity;
pub use token_program::{
    build_create_associated_account, build_mint_to, derive_associated_token_address,
    MintState, MintToEncoding, TokenAccountState, TokenOperation, TokenProgram,
    ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID,
};
pub use transaction::{
    compile_transaction, parse_transaction, serialize_message, sign_transaction,
    CompiledInstruction, ParsedTransaction, SignedTransaction, SolAccountMeta, SolInstruction,
    SolTransaction, SYSTEM_PROGRAM_ID,
};
