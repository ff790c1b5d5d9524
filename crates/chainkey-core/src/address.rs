//! Chain-aware addresses.
//!
//! An [`Address`] is a 20-byte payload hash plus the (chain, network, kind,
//! version) it belongs to. Its text form comes from the chain's
//! [`AddressEncoding`]:
//! - Bitcoin / Litecoin: Base58Check P2PKH (`1...`, `L...`) or P2SH
//! - Tron: Base58Check with version `0x41` over a Keccak-20 payload (`T...`)
//! - Stacks: c32check (`SP...` / `ST...`)
//! - Ethereum: `0x` + EIP-55 checksummed hex

use std::fmt;

use crate::base58;
use crate::c32;
use crate::chain::{AddressEncoding, Chain, ChainParams, Network, PubkeyHashKind};
use crate::constants::HASH160_LEN;
use crate::crypto::PublicKey;
use crate::eip55;
use crate::error::AddressError;
use crate::script;

impl AddressEncoding {
    /// Encode `payload` under `version`. EIP-55 has no version byte and
    /// ignores it.
    pub fn encode(self, payload: &[u8], version: u8) -> Result<String, AddressError> {
        match self {
            AddressEncoding::Base58Check => Ok(base58::encode(payload, version)),
            AddressEncoding::C32 => c32::encode_address(payload, version),
            AddressEncoding::Eip55 => {
                let payload: &[u8; HASH160_LEN] = payload
                    .try_into()
                    .map_err(|_| AddressError::InvalidLength(payload.len()))?;
                Ok(eip55::encode(payload))
            }
        }
    }

    /// Decode into `(payload, version)`; EIP-55 always reports version 0.
    pub fn decode(self, s: &str) -> Result<(Vec<u8>, u8), AddressError> {
        match self {
            AddressEncoding::Base58Check => base58::decode(s),
            AddressEncoding::C32 => c32::decode_address(s),
            AddressEncoding::Eip55 => Ok((eip55::decode(s)?.to_vec(), 0)),
        }
    }
}

/// What the payload hash commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// Hash of a single public key.
    P2pkh,
    /// Hash of a redeem script.
    P2sh,
}

/// An address on a specific chain and network.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    chain: Chain,
    network: Network,
    kind: AddressKind,
    version: u8,
    payload: [u8; HASH160_LEN],
}

impl Address {
    /// Single-key address for `public_key`, hashed the way `chain` hashes keys.
    pub fn from_public_key(public_key: &PublicKey, chain: Chain, network: Network) -> Self {
        let params = chain.params(network);
        let payload = match params.pubkey_hash {
            PubkeyHashKind::Hash160 => public_key.hash160(),
            PubkeyHashKind::Keccak20 => public_key.keccak20(),
        };
        Self {
            chain,
            network,
            kind: AddressKind::P2pkh,
            version: params.p2pkh_version,
            payload,
        }
    }

    /// Address from an already-computed payload hash.
    ///
    /// Fails with `UnsupportedChain` when `kind` is P2SH and the chain has
    /// no script-hash addresses.
    pub fn from_payload(
        payload: [u8; HASH160_LEN],
        kind: AddressKind,
        chain: Chain,
        network: Network,
    ) -> Result<Self, AddressError> {
        let params = chain.params(network);
        let version = match kind {
            AddressKind::P2pkh => params.p2pkh_version,
            AddressKind::P2sh => params
                .p2sh_version
                .ok_or_else(|| AddressError::UnsupportedChain(chain.to_string()))?,
        };
        Ok(Self {
            chain,
            network,
            kind,
            version,
            payload,
        })
    }

    /// Parse `s` as an address of `chain` on `network`.
    ///
    /// The decoded version byte must be one of the chain's P2PKH / P2SH
    /// versions for that network, otherwise `UnknownVersionByte`.
    pub fn parse(s: &str, chain: Chain, network: Network) -> Result<Self, AddressError> {
        let params: ChainParams = chain.params(network);
        let (payload, version) = params.encoding.decode(s.trim())?;
        let payload: [u8; HASH160_LEN] = payload
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(payload.len()))?;

        let kind = if params.encoding == AddressEncoding::Eip55 || version == params.p2pkh_version {
            AddressKind::P2pkh
        } else if Some(version) == params.p2sh_version {
            AddressKind::P2sh
        } else {
            return Err(AddressError::UnknownVersionByte(version));
        };

        Ok(Self {
            chain,
            network,
            kind,
            version: if kind == AddressKind::P2pkh {
                params.p2pkh_version
            } else {
                version
            },
            payload,
        })
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// The 20-byte pubkey or script hash.
    pub fn payload(&self) -> &[u8; HASH160_LEN] {
        &self.payload
    }

    /// Text form under the chain's encoding.
    pub fn encode(&self) -> String {
        match self.chain.params(self.network).encoding {
            AddressEncoding::Base58Check => base58::encode(&self.payload, self.version),
            // Versions come from the chain table and are always c32 digits.
            AddressEncoding::C32 => {
                let mut out = String::with_capacity(41);
                out.push(c32::ADDRESS_PREFIX);
                out.push_str(&c32::c32check_encode_digit(&self.payload, self.version));
                out
            }
            AddressEncoding::Eip55 => eip55::encode(&self.payload),
        }
    }

    /// Locking script paying to this address.
    ///
    /// Only UTXO chains have one; account chains fail with `UnsupportedChain`.
    pub fn locking_script(&self) -> Result<Vec<u8>, AddressError> {
        if !self.chain.is_utxo_based() {
            return Err(AddressError::UnsupportedChain(self.chain.to_string()));
        }
        Ok(match self.kind {
            AddressKind::P2pkh => script::p2pkh_script(&self.payload),
            AddressKind::P2sh => script::p2sh_script(&self.payload),
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
