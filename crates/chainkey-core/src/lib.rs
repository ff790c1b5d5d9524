//! # chainkey-core
//! Hashes, secp256k1 keys, address encodings and the legacy transaction
//! wire format shared by every chainkey chain.

pub mod address;
pub mod amount;
pub mod base58;
pub mod c32;
pub mod chain;
pub mod constants;
pub mod crypto;
pub mod eip55;
pub mod encode;
pub mod error;
pub mod hash;
pub mod script;
pub mod types;

pub use address::{Address, AddressKind};
pub use chain::{AddressEncoding, Chain, ChainParams, Network, PayloadDigest, PubkeyHashKind};
pub use crypto::{KeyPair, PublicKey};
pub use error::{AddressError, AmountError, ChainkeyError, CryptoError, ScriptError, TransactionError};
pub use types::{Hash256, OutPoint, Transaction, TxIn, TxOut, Utxo};
