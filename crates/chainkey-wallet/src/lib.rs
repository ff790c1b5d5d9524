//! # chainkey-wallet — HD keys, coin selection and transaction signing.
//!
//! Provides BIP-39 mnemonics, BIP-32/BIP-44 key derivation, greedy coin
//! selection over caller-supplied UTXO snapshots, legacy P2PKH transaction
//! building and signing, and recoverable payload signatures for
//! account-model chains.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`mnemonic`] — BIP-39 phrases and seeds
//! - [`keys`] — Seed, extended keys, derivation paths, KeyChain
//! - [`coin_selection`] — UTXO snapshots, fee and dust policies, selector
//! - [`builder`] — Unsigned transaction builder
//! - [`signer`] — Legacy SIGHASH_ALL signing and verification
//! - [`payload`] — Recoverable signatures over opaque payloads
//! - [`config`] — Wallet configuration
//! - [`wallet`] — High-level wallet composition

pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod payload;
pub mod signer;
pub mod wallet;

// Re-exports for convenient access
pub use builder::{TransactionBuilder, UnsignedTransaction};
pub use coin_selection::{
    estimate_size, CoinSelection, CoinSelector, DustPolicy, DustRule, FeePolicy, UtxoSnapshot,
};
pub use config::WalletConfig;
pub use error::WalletError;
pub use keys::{
    derive_address, derive_path, ChildNumber, DerivationPath, DerivedAddress, ExtendedKey,
    KeyChain, Seed,
};
pub use mnemonic::{mnemonic_to_seed, Mnemonic};
pub use payload::{recover_signer, sign_payload, RecoverableSignature};
pub use signer::{sign_input, sign_transaction, verify_input, SignedTransaction};
pub use wallet::{build_and_sign_transfer, Transfer, Wallet};
