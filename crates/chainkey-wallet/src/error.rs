//! Wallet error types.

use chainkey_core::error::{AddressError, CryptoError, ScriptError, TransactionError};
use chainkey_core::types::OutPoint;
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// BIP-32 seeds must be 16 to 64 bytes.
    #[error("invalid seed length: {len} bytes (expected 16..=64)")]
    InvalidSeedLength {
        /// Length that was supplied.
        len: usize,
    },

    /// Hardened children need the parent private key.
    #[error("hardened child {index} cannot be derived from a public-only key")]
    HardenedFromPublicOnly {
        /// Child index without the hardened bit.
        index: u32,
    },

    /// The derived scalar was zero or not below the curve order.
    #[error("child key at index {index} is invalid")]
    InvalidChildKey {
        /// Child index (with the hardened bit, if any).
        index: u32,
    },

    /// The operation needs a private key but only the public half is known.
    #[error("extended key is public-only")]
    PublicOnly,

    /// Derivation path text or index out of range.
    #[error("invalid derivation path: {0}")]
    InvalidPath(String),

    /// Invalid BIP-39 mnemonic phrase or entropy size.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Insufficient funds to cover the amount plus fees.
    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds {
        /// Total value available in minor units.
        have: u64,
        /// Amount plus fee in minor units.
        need: u64,
    },

    /// No UTXOs available for spending.
    #[error("no UTXOs available")]
    NoUtxos,

    /// Invalid monetary amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A caller-supplied UTXO entry is unusable.
    #[error("malformed utxo {outpoint}: {reason}")]
    MalformedUtxo {
        /// Offending outpoint.
        outpoint: OutPoint,
        /// What is wrong with it.
        reason: String,
    },

    /// The signing key does not own the output being spent.
    #[error("signing key does not match the locking script of input {index}")]
    SigningKeyMismatch {
        /// Input index.
        index: usize,
    },

    /// The prior locking script is not pay-to-pubkey-hash.
    #[error("input {index} spends an unsupported script")]
    UnsupportedScript {
        /// Input index.
        index: usize,
    },

    /// The operation needs a UTXO chain.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    /// Payload handed to the payload signer has the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Transaction build error.
    #[error("build error: {0}")]
    BuildError(String),

    /// Configuration value could not be parsed or is inconsistent.
    #[error("config: {0}")]
    Config(String),

    /// Address encoding error from chainkey-core.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Cryptographic error from chainkey-core.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Script error from chainkey-core.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Transaction encoding error from chainkey-core.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}
