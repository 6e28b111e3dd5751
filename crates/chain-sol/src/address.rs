//! Solana address codec.
//!
//! Solana addresses are Base58-encoded 32-byte values: either Ed25519 public
//! keys or program-derived addresses (which are deliberately off the curve).
//! [`Pubkey`] is the typed form used throughout the workspace; the free
//! functions operate on raw byte arrays.

use std::fmt;
use std::str::FromStr;

use crate::error::SolError;

/// A 32-byte Solana account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pubkey([u8; 32]);

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Pubkey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Pubkey {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        address_to_bytes(s).map(Self)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bytes_to_address(&self.0))
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(SolError::InvalidAddress("address is empty".into()));
    }

    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| SolError::InvalidAddress(format!("base58 decode failed: {e}")))?;

    let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
        SolError::InvalidAddress(format!("expected 32 bytes, got {}", v.len()))
    })?;

    Ok(arr)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The System Program address is 32 zero bytes, which encodes to
    /// "11111111111111111111111111111111" in Base58.
    #[test]
    fn system_program_address() {
        assert_eq!(
            Pubkey::default().to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn parse_and_display_token_program() {
        let address = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
        let key: Pubkey = address.parse().unwrap();
        assert_eq!(key.to_string(), address);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let key: Pubkey = "  TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA\n".parse().unwrap();
        assert_eq!(key.to_string(), "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
    }

    #[test]
    fn garbage_returns_error() {
        assert!(address_to_bytes("not-a-valid-address!!!").is_err());
    }

    #[test]
    fn too_short_returns_error() {
        // "1" decodes to a single zero byte, which is not 32 bytes.
        let err = address_to_bytes("1").unwrap_err();
        assert_eq!(
            err,
            SolError::InvalidAddress("expected 32 bytes, got 1".into())
        );
    }

    #[test]
    fn empty_address_rejected() {
        assert!(matches!(
            "".parse::<Pubkey>(),
            Err(SolError::InvalidAddress(_))
        ));
    }

    #[test]
    fn debug_shows_base58() {
        let key = Pubkey::new_from_array([0u8; 32]);
        assert_eq!(format!("{key:?}"), "Pubkey(11111111111111111111111111111111)");
    }

    #[test]
    fn well_known_address_decodes_to_32_bytes() {
        // Memo Program v2
        let bytes = address_to_bytes("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr").unwrap();
        assert_eq!(bytes_to_address(&bytes), "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");
    }
}
