//! Protocol constants shared by the Bitcoin-family chains.
//!
//! Monetary values are integers in the chain's minor unit (satoshis,
//! litoshis, micro-STX, sun, wei).

/// Minor units per whole coin for the Bitcoin-family chains.
pub const COIN: u64 = 100_000_000;

/// Legacy transaction version produced by the builder.
pub const TX_VERSION: i32 = 1;

/// Final sequence number; disables relative lock-time and RBF signalling.
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// `SIGHASH_ALL` hash type, committed to as a 4-byte little-endian suffix.
pub const SIGHASH_ALL: u32 = 0x01;

/// Hardened child index offset (BIP-32).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// BIP-44 purpose field.
pub const BIP44_PURPOSE: u32 = 44;

/// Accepted BIP-32 seed length range in bytes.
pub const MIN_SEED_LEN: usize = 16;
/// Accepted BIP-32 seed length range in bytes.
pub const MAX_SEED_LEN: usize = 64;

/// Fixed serialized overhead of a legacy transaction:
/// version (4) + input count (1) + output count (1) + lock_time (4).
pub const TX_OVERHEAD_SIZE: u64 = 10;

/// Upper bound on a signed P2PKH input with a compressed key:
/// outpoint (36) + script length (1) + scriptSig (107) + sequence (4).
pub const P2PKH_INPUT_SIZE: u64 = 148;

/// Serialized P2PKH output: value (8) + script length (1) + script (25).
pub const P2PKH_OUTPUT_SIZE: u64 = 34;

/// Default dust threshold in minor units. Change at or below this value is
/// not worth its own output.
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

/// Default fee rate in minor units per byte.
pub const DEFAULT_FEE_RATE: u64 = 10;

/// Size of a 20-byte pubkey/script hash payload.
pub const HASH160_LEN: usize = 20;
