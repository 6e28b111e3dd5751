use std::fmt;

use chain_sol::{Pubkey, SolError, TokenProgram};
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::identity::IdentityError;
use crate::rpc::RpcError;

/// The step of an operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Locate,
    Derive,
    FetchMint,
    FetchDecimals,
    BuildTransaction,
    Submit,
    Balance,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Locate => "locate",
            Stage::Derive => "derive",
            Stage::FetchMint => "fetch_mint",
            Stage::FetchDecimals => "fetch_decimals",
            Stage::BuildTransaction => "build_transaction",
            Stage::Submit => "submit",
            Stage::Balance => "balance",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a failure happened: the stage plus whatever identifiers were known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorContext {
    pub stage: Stage,
    pub wallet: Option<Pubkey>,
    pub mint: Option<Pubkey>,
    pub program: Option<TokenProgram>,
}

impl ErrorContext {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            wallet: None,
            mint: None,
            program: None,
        }
    }

    pub fn wallet(mut self, wallet: Pubkey) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn mint(mut self, mint: Pubkey) -> Self {
        self.mint = Some(mint);
        self
    }

    pub fn program(mut self, program: TokenProgram) -> Self {
        self.program = Some(program);
        self
    }

    /// Same identifiers, different stage.
    pub fn at(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage={}", self.stage)?;
        if let Some(wallet) = &self.wallet {
            write!(f, " wallet={wallet}")?;
        }
        if let Some(mint) = &self.mint {
            write!(f, " mint={mint}")?;
        }
        if let Some(program) = self.program {
            write!(f, " program={}", program.name())?;
        }
        Ok(())
    }
}

/// Error category, for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    NotFound,
    Connectivity,
    OwnershipMismatch,
    Transaction,
    Derivation,
}

#[derive(Debug, Error)]
pub enum TokenServiceError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{what} not found [{context}]")]
    NotFound { what: String, context: ErrorContext },

    #[error("connectivity error: {source} [{context}]")]
    Connectivity {
        #[source]
        source: RpcError,
        context: ErrorContext,
    },

    #[error("account {account} is owned by {owner}, not a token program [{context}]")]
    OwnershipMismatch {
        account: Pubkey,
        owner: Pubkey,
        context: ErrorContext,
    },

    #[error("transaction error: {message} [{context}]")]
    Transaction {
        message: String,
        signature: Option<String>,
        context: ErrorContext,
    },

    #[error("derivation error: {source} [{context}]")]
    Derivation {
        #[source]
        source: SolError,
        context: ErrorContext,
    },

    #[error("identity store error: {0}")]
    Identity(#[from] IdentityError),
}

impl TokenServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TokenServiceError::Configuration(_) => ErrorKind::Configuration,
            TokenServiceError::Validation(_) => ErrorKind::Validation,
            TokenServiceError::NotFound { .. } => ErrorKind::NotFound,
            TokenServiceError::Connectivity { .. } => ErrorKind::Connectivity,
            TokenServiceError::OwnershipMismatch { .. } => ErrorKind::OwnershipMismatch,
            TokenServiceError::Transaction { .. } => ErrorKind::Transaction,
            TokenServiceError::Derivation { .. } => ErrorKind::Derivation,
            TokenServiceError::Identity(e) => match e {
                IdentityError::NotFound(_) => ErrorKind::NotFound,
                IdentityError::DuplicateWallet { .. } => ErrorKind::Validation,
                IdentityError::Backend(_) => ErrorKind::Connectivity,
            },
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            TokenServiceError::NotFound { context, .. }
            | TokenServiceError::Connectivity { context, .. }
            | TokenServiceError::OwnershipMismatch { context, .. }
            | TokenServiceError::Transaction { context, .. }
            | TokenServiceError::Derivation { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn not_found(what: impl Into<String>, context: ErrorContext) -> Self {
        TokenServiceError::NotFound {
            what: what.into(),
            context,
        }
    }

    /// Classify an RPC failure.
    ///
    /// Rejections by `sendTransaction`, on-chain failures and confirmation
    /// timeouts are transaction failures. Everything else means the endpoint
    /// could not answer.
    pub fn from_rpc(err: RpcError, context: ErrorContext) -> Self {
        match err {
            RpcError::TransactionFailed { signature, reason } => TokenServiceError::Transaction {
                message: reason,
                signature: Some(signature),
                context,
            },
            RpcError::ConfirmationTimeout { ref signature, .. } => TokenServiceError::Transaction {
                signature: Some(signature.clone()),
                message: err.to_string(),
                context,
            },
            RpcError::Rejected { .. } => TokenServiceError::Transaction {
                message: err.to_string(),
                signature: None,
                context,
            },
            source => TokenServiceError::Connectivity { source, context },
        }
    }

    pub fn derivation(source: SolError, context: ErrorContext) -> Self {
        TokenServiceError::Derivation { source, context }
    }
}

pub type Result<T> = std::result::Result<T, TokenServiceError>;
