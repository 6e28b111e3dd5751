use thiserror::Error;

/// Failures talking to a Solana JSON-RPC endpoint.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The request never produced a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// `sendTransaction` refused the transaction, typically in preflight.
    /// Nothing reached the chain.
    #[error("transaction rejected: rpc error {code}: {message}")]
    Rejected { code: i64, message: String },

    /// A submitted transaction failed on-chain.
    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// A submitted transaction did not reach the requested commitment in time.
    #[error("transaction {signature} not confirmed within {seconds}s")]
    ConfirmationTimeout { signature: String, seconds: u64 },
}

impl RpcError {
    /// The node answered that the queried account does not exist.
    pub fn is_account_not_found(&self) -> bool {
        matches!(self, RpcError::Rpc { message, .. } if message.contains("could not find account"))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rpc_error() {
        let err = RpcError::Rpc {
            code: -32602,
            message: "Invalid param: WrongSize".into(),
        };
        assert_eq!(err.to_string(), "rpc error -32602: Invalid param: WrongSize");
    }

    #[test]
    fn account_not_found_is_recognized() {
        let missing = RpcError::Rpc {
            code: -32602,
            message: "Invalid param: could not find account".into(),
        };
        assert!(missing.is_account_not_found());
        assert!(!RpcError::Transport("could not find account".into()).is_account_not_found());
    }

    #[test]
    fn display_rejected() {
        let err = RpcError::Rejected {
            code: -32002,
            message: "insufficient funds for fee".into(),
        };
        assert_eq!(
            err.to_string(),
            "transaction rejected: rpc error -32002: insufficient funds for fee"
        );
    }

    #[test]
    fn display_confirmation_timeout() {
        let err = RpcError::ConfirmationTimeout {
            signature: "5sig".into(),
            seconds: 60,
        };
        assert_eq!(err.to_string(), "transaction 5sig not confirmed within 60s");
    }
}
