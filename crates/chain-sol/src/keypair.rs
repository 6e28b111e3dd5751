//! The payer's signing identity.
//!
//! Solana tooling exports keypairs as Base58 of the 64-byte concatenation
//! `secret_seed || public_key`. A bare 32-byte seed is accepted as well.
//! Decoded secret bytes are wiped as soon as the signing key is built, and the
//! signing key itself zeroizes on drop.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::address::Pubkey;
use crate::error::SolError;

/// Ed25519 key material that signs every outgoing transaction.
pub struct SigningIdentity {
    key: SigningKey,
}

impl SigningIdentity {
    /// Decode a Base58 secret key (64-byte keypair or 32-byte seed).
    pub fn from_base58(secret: &str) -> Result<Self, SolError> {
        let decoded = Zeroizing::new(
            bs58::decode(secret.trim())
                .into_vec()
                .map_err(|e| SolError::InvalidSecretKey(format!("base58 decode failed: {e}")))?,
        );

        match decoded.len() {
            64 => {
                let mut seed = Zeroizing::new([0u8; 32]);
                seed.copy_from_slice(&decoded[..32]);
                let identity = Self::from_seed(&seed);

                if identity.public_key().as_bytes()[..] != decoded[32..] {
                    return Err(SolError::InvalidSecretKey(
                        "embedded public key does not match secret".into(),
                    ));
                }
                Ok(identity)
            }
            32 => {
                let mut seed = Zeroizing::new([0u8; 32]);
                seed.copy_from_slice(&decoded);
                Ok(Self::from_seed(&seed))
            }
            n => Err(SolError::InvalidSecretKey(format!(
                "expected 64 or 32 bytes, got {n}"
            ))),
        }
    }

    /// Build an identity from a raw 32-byte Ed25519 seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> Pubkey {
        Pubkey::new_from_array(self.key.verifying_key().to_bytes())
    }

    /// Base58 address of the public key.
    pub fn address(&self) -> String {
        self.public_key().to_string()
    }

    /// Sign an arbitrary message (a serialized transaction message in practice).
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
