//! Recoverable signatures over opaque account-model payloads.
//!
//! Ethereum signs the Keccak-256 of its serialized transaction, Tron signs
//! the SHA-256 of its raw transaction, and a caller that already holds a
//! digest passes it through as [`PayloadDigest::Prehashed`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use chainkey_core::chain::PayloadDigest;
use chainkey_core::crypto::{KeyPair, PublicKey};
use chainkey_core::hash::{keccak256, sha256};

use crate::error::WalletError;

/// 65-byte `r || s || v` signature, `v` being the recovery id (0 or 1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    pub fn recovery_id(&self) -> u8 {
        self.0[64]
    }
}

impl From<[u8; 65]> for RecoverableSignature {
    fn from(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({self})")
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 65];
        hex::decode_to_slice(&s, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(bytes))
    }
}

/// The 32-byte digest signed for `payload` under `digest`.
pub fn payload_digest(payload: &[u8], digest: PayloadDigest) -> Result<[u8; 32], WalletError> {
    match digest {
        PayloadDigest::Keccak256 => Ok(keccak256(payload)),
        PayloadDigest::Sha256 => Ok(sha256(payload)),
        PayloadDigest::Prehashed => payload.try_into().map_err(|_| {
            WalletError::InvalidPayload(format!(
                "prehashed payload must be 32 bytes, got {}",
                payload.len()
            ))
        }),
    }
}

/// Sign `payload` (RFC 6979, low-S) and return a recoverable signature.
pub fn sign_payload(
    keypair: &KeyPair,
    payload: &[u8],
    digest: PayloadDigest,
) -> Result<RecoverableSignature, WalletError> {
    let hash = payload_digest(payload, digest)?;
    Ok(RecoverableSignature(keypair.sign_recoverable(&hash)))
}

/// Public key that produced `signature` over `payload`.
pub fn recover_signer(
    payload: &[u8],
    digest: PayloadDigest,
    signature: &RecoverableSignature,
) -> Result<PublicKey, WalletError> {
    let hash = payload_digest(payload, digest)?;
    Ok(PublicKey::recover(&hash, &signature.0)?)
}
