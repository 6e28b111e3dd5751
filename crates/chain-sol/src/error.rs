use thiserror::Error;

/// Solana chain operation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolError {
    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address derivation failed: {0}")]
    DerivationFailed(String),

    #[error("invalid account data: {0}")]
    InvalidAccountData(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
