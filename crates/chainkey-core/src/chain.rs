//! Supported chains and their static parameters.
//!
//! Every chain-specific behavior (address encoding, pubkey hashing, version
//! bytes, WIF prefix, BIP-44 coin type) is looked up from a single closed
//! table keyed by [`Chain`] and [`Network`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount;
use crate::error::{AddressError, AmountError};

/// Network flag selecting mainnet or testnet parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(AddressError::InvalidEncoding(format!("unknown network: {other}"))),
        }
    }
}

/// Chains supported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Bitcoin,
    Litecoin,
    Stacks,
    Tron,
    Ethereum,
}

/// How a public key is reduced to the 20-byte address payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PubkeyHashKind {
    /// `RIPEMD160(SHA256(compressed_pubkey))`.
    Hash160,
    /// Last 20 bytes of `Keccak256(uncompressed_pubkey[1..])`.
    Keccak20,
}

/// Textual encoding of an address payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressEncoding {
    /// Base58 with a leading version byte and a 4-byte double-SHA256 checksum.
    Base58Check,
    /// Stacks c32check: custom base-32 alphabet, `S` prefix, version digit.
    C32,
    /// `0x`-prefixed hex with EIP-55 mixed-case checksum.
    Eip55,
}

/// Digest applied to an opaque payload before account-model signing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadDigest {
    Keccak256,
    Sha256,
    /// The payload already is a 32-byte digest.
    Prehashed,
}

/// Static per-(chain, network) parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainParams {
    pub chain: Chain,
    pub network: Network,
    pub encoding: AddressEncoding,
    pub pubkey_hash: PubkeyHashKind,
    /// Version byte of single-key addresses.
    pub p2pkh_version: u8,
    /// Version byte of script-hash addresses, if the chain has them.
    pub p2sh_version: Option<u8>,
    /// WIF private key prefix.
    pub wif_prefix: u8,
    /// BIP-44 coin type (unhardened value).
    pub coin_type: u32,
    /// Whether value lives in UTXOs spendable by this engine.
    pub utxo_based: bool,
    /// Fallback flat fee in minor units when no fee rate is configured.
    pub default_fixed_fee: u64,
    /// Digest used when signing opaque account-model payloads.
    pub payload_digest: PayloadDigest,
    /// Fractional digits of the display unit (BTC, ETH, TRX, ...).
    pub decimals: u8,
}

impl Chain {
    /// All supported chains.
    pub const ALL: [Chain; 5] = [
        Chain::Bitcoin,
        Chain::Litecoin,
        Chain::Stacks,
        Chain::Tron,
        Chain::Ethereum,
    ];

    /// Look up the parameter table entry for this chain on `network`.
    pub fn params(self, network: Network) -> ChainParams {
        use Network::*;
        let (encoding, pubkey_hash, p2pkh_version, p2sh_version, wif_prefix, coin_type) =
            match (self, network) {
                (Chain::Bitcoin, Mainnet) => (AddressEncoding::Base58Check, PubkeyHashKind::Hash160, 0x00, Some(0x05), 0x80, 0),
                (Chain::Bitcoin, Testnet) => (AddressEncoding::Base58Check, PubkeyHashKind::Hash160, 0x6f, Some(0xc4), 0xef, 1),
                (Chain::Litecoin, Mainnet) => (AddressEncoding::Base58Check, PubkeyHashKind::Hash160, 0x30, Some(0x32), 0xb0, 2),
                (Chain::Litecoin, Testnet) => (AddressEncoding::Base58Check, PubkeyHashKind::Hash160, 0x6f, Some(0x3a), 0xef, 1),
                (Chain::Stacks, Mainnet) => (AddressEncoding::C32, PubkeyHashKind::Hash160, 22, Some(20), 0x80, 5757),
                (Chain::Stacks, Testnet) => (AddressEncoding::C32, PubkeyHashKind::Hash160, 26, Some(21), 0xef, 5757),
                (Chain::Tron, _) => (AddressEncoding::Base58Check, PubkeyHashKind::Keccak20, 0x41, None, 0x80, 195),
                (Chain::Ethereum, _) => (AddressEncoding::Eip55, PubkeyHashKind::Keccak20, 0x00, None, 0x80, 60),
            };

        let (utxo_based, default_fixed_fee, payload_digest, decimals) = match self {
            Chain::Bitcoin => (true, 1_500, PayloadDigest::Prehashed, 8),
            Chain::Litecoin => (true, 1_000, PayloadDigest::Prehashed, 8),
            Chain::Stacks => (false, 180, PayloadDigest::Prehashed, 6),
            Chain::Tron => (false, 0, PayloadDigest::Sha256, 6),
            Chain::Ethereum => (false, 0, PayloadDigest::Keccak256, 18),
        };

        ChainParams {
            chain: self,
            network,
            encoding,
            pubkey_hash,
            p2pkh_version,
            p2sh_version,
            wif_prefix,
            coin_type,
            utxo_based,
            default_fixed_fee,
            payload_digest,
            decimals,
        }
    }

    /// Fractional digits of the display unit.
    pub fn decimals(self) -> u8 {
        self.params(Network::Mainnet).decimals
    }

    /// Parse a display amount ("0.5") into base units (satoshi, wei, sun, ...).
    pub fn parse_amount(self, s: &str) -> Result<u128, AmountError> {
        amount::parse_units(s, self.decimals())
    }

    /// Render base units as a display amount without rounding.
    pub fn format_amount(self, base_units: u128) -> String {
        amount::format_units(base_units, self.decimals())
    }

    /// Whether this chain spends UTXOs (and so can use the transaction engine).
    pub fn is_utxo_based(self) -> bool {
        self.params(Network::Mainnet).utxo_based
    }

    /// Lowercase chain name.
    pub fn name(self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Litecoin => "litecoin",
            Chain::Stacks => "stacks",
            Chain::Tron => "tron",
            Chain::Ethereum => "ethereum",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Chain {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "litecoin" | "ltc" => Ok(Chain::Litecoin),
            "stacks" | "stx" => Ok(Chain::Stacks),
            "tron" | "trx" => Ok(Chain::Tron),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            other => Err(AddressError::InvalidEncoding(format!("unknown chain: {other}"))),
        }
    }
}
