//! Seed management and BIP-32 hierarchical key derivation over secp256k1.
//!
//! ```text
//! master:   I = HMAC-SHA512("Bitcoin seed", seed)
//! CKDpriv:  I = HMAC-SHA512(c_par, 0x00 || k_par || i)   hardened
//!           I = HMAC-SHA512(c_par, K_par || i)           normal
//!           k_i = I_L + k_par (mod n),  c_i = I_R
//! CKDpub:   K_i = I_L·G + K_par (normal indices only)
//! ```
//!
//! Derivation is a pure function of (parent, index); every key is
//! reproducible bit-for-bit from the seed and path.

use hmac::{Hmac, Mac};
use secp256k1::{Scalar, Secp256k1};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use chainkey_core::address::Address;
use chainkey_core::base58;
use chainkey_core::chain::{Chain, Network};
use chainkey_core::constants::{BIP44_PURPOSE, HARDENED_OFFSET, MAX_SEED_LEN, MIN_SEED_LEN};
use chainkey_core::crypto::{KeyPair, PublicKey};
use chainkey_core::error::AddressError;
use chainkey_core::hash::hash160;

use crate::error::WalletError;

type HmacSha512 = Hmac<Sha512>;

/// HMAC key for the master node.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Serialized extended key length (before the Base58Check checksum).
const EXTENDED_KEY_LEN: usize = 78;

const XPUB_VERSION: u32 = 0x0488_b21e;
const XPRV_VERSION: u32 = 0x0488_ade4;
const TPUB_VERSION: u32 = 0x0435_87cf;
const TPRV_VERSION: u32 = 0x0435_8394;

/// Keychain branch for receiving addresses.
pub const EXTERNAL_BRANCH: u32 = 0;
/// Keychain branch for change addresses.
pub const INTERNAL_BRANCH: u32 = 1;

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// BIP-32 seed bytes (16 to 64 bytes).
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: Vec<u8>,
}

impl Seed {
    /// Generate a random 64-byte seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; MAX_SEED_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a seed from raw bytes, checking the BIP-32 length bounds.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
            return Err(WalletError::InvalidSeedLength { len: bytes.len() });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<[u8; MAX_SEED_LEN]> for Seed {
    fn from(bytes: [u8; MAX_SEED_LEN]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
        }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// One path element: a 31-bit index plus the hardened flag in the high bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildNumber(u32);

impl ChildNumber {
    /// Non-hardened child `index` (must be below 2^31).
    pub fn normal(index: u32) -> Result<Self, WalletError> {
        Self::new(index, false)
    }

    /// Hardened child `index` (must be below 2^31).
    pub fn hardened(index: u32) -> Result<Self, WalletError> {
        Self::new(index, true)
    }

    pub fn new(index: u32, hardened: bool) -> Result<Self, WalletError> {
        if index >= HARDENED_OFFSET {
            return Err(WalletError::InvalidPath(format!(
                "index {index} is not below 2^31"
            )));
        }
        Ok(Self(if hardened { index | HARDENED_OFFSET } else { index }))
    }

    /// Wrap a raw 32-bit child number whose high bit is the hardened flag.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Index without the hardened bit.
    pub fn index(self) -> u32 {
        self.0 & !HARDENED_OFFSET
    }

    pub fn is_hardened(self) -> bool {
        self.0 & HARDENED_OFFSET != 0
    }

    /// Raw 32-bit value as serialized in extended keys.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

impl FromStr for ChildNumber {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (digits, hardened) = match s.strip_suffix(['\'', 'h', 'H']) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WalletError::InvalidPath(format!("bad path element {s:?}")));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| WalletError::InvalidPath(format!("index {digits} out of range")))?;
        Self::new(index, hardened)
    }
}

/// Ordered derivation path from the master key, e.g. `m/44'/0'/0'/0/0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildNumber>);

impl DerivationPath {
    /// The master path `m`.
    pub fn master() -> Self {
        Self(Vec::new())
    }

    /// `m/44'/coin_type'/account'/change/index`.
    pub fn bip44(coin_type: u32, account: u32, change: u32, index: u32) -> Result<Self, WalletError> {
        Ok(Self(vec![
            ChildNumber::hardened(BIP44_PURPOSE)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(account)?,
            ChildNumber::normal(change)?,
            ChildNumber::normal(index)?,
        ]))
    }

    /// `m/44'/coin_type'/account'`, the level a [`KeyChain`] is rooted at.
    pub fn bip44_account(coin_type: u32, account: u32) -> Result<Self, WalletError> {
        Ok(Self(vec![
            ChildNumber::hardened(BIP44_PURPOSE)?,
            ChildNumber::hardened(coin_type)?,
            ChildNumber::hardened(account)?,
        ]))
    }

    /// This path extended by one element.
    pub fn child(&self, child: ChildNumber) -> Self {
        let mut elems = self.0.clone();
        elems.push(child);
        Self(elems)
    }

    pub fn as_slice(&self) -> &[ChildNumber] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ChildNumber>> for DerivationPath {
    fn from(elems: Vec<ChildNumber>) -> Self {
        Self(elems)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for c in &self.0 {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    /// Accepts `m`, `m/0'/1`, with `'`, `h` or `H` as the hardened marker.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match parts.next() {
            Some("m") | Some("M") => {}
            _ => {
                return Err(WalletError::InvalidPath(format!(
                    "path {s:?} must start with 'm'"
                )));
            }
        }
        parts
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Extended keys
// ---------------------------------------------------------------------------

/// A BIP-32 node: key material plus chain code and tree position.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedKey {
    private: Option<KeyPair>,
    public: PublicKey,
    chain_code: [u8; 32],
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_number: ChildNumber,
}

impl ExtendedKey {
    /// Master node from a 16..=64 byte seed.
    pub fn master(seed: &[u8]) -> Result<Self, WalletError> {
        if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&seed.len()) {
            return Err(WalletError::InvalidSeedLength { len: seed.len() });
        }
        let (il, ir) = hmac_sha512(MASTER_HMAC_KEY, &[seed]);
        let keypair = KeyPair::from_secret_bytes(&il)
            .map_err(|_| WalletError::InvalidChildKey { index: 0 })?;
        Ok(Self {
            public: keypair.public_key(),
            private: Some(keypair),
            chain_code: ir,
            depth: 0,
            parent_fingerprint: [0u8; 4],
            child_number: ChildNumber(0),
        })
    }

    /// Derive child `index`, hardened if `hardened` is set.
    ///
    /// `index` must be below 2^31; the hardened bit comes from the flag.
    pub fn derive_child(&self, index: u32, hardened: bool) -> Result<Self, WalletError> {
        self.derive(ChildNumber::new(index, hardened)?)
    }

    /// Derive one path element (CKDpriv, or CKDpub for public-only keys).
    pub fn derive(&self, child: ChildNumber) -> Result<Self, WalletError> {
        let depth = self
            .depth
            .checked_add(1)
            .ok_or_else(|| WalletError::InvalidPath("depth exceeds 255".into()))?;
        let index_bytes = child.raw().to_be_bytes();

        let (il, ir) = match (&self.private, child.is_hardened()) {
            (None, true) => {
                return Err(WalletError::HardenedFromPublicOnly {
                    index: child.index(),
                });
            }
            (Some(kp), true) => {
                let mut secret = kp.secret_bytes();
                let out = hmac_sha512(&self.chain_code, &[&[0u8][..], &secret[..], &index_bytes[..]]);
                secret.zeroize();
                out
            }
            (_, false) => hmac_sha512(
                &self.chain_code,
                &[&self.public.serialize_compressed()[..], &index_bytes[..]],
            ),
        };

        let invalid = || WalletError::InvalidChildKey { index: child.raw() };
        let tweak = Scalar::from_be_bytes(il).map_err(|_| invalid())?;

        let (private, public) = match &self.private {
            Some(kp) => {
                let secret = kp.secret_key().add_tweak(&tweak).map_err(|_| invalid())?;
                let kp = KeyPair::from_secret_key(secret);
                (Some(kp.clone()), kp.public_key())
            }
            None => {
                let secp = Secp256k1::verification_only();
                let pk = self
                    .public
                    .inner()
                    .add_exp_tweak(&secp, &tweak)
                    .map_err(|_| invalid())?;
                (None, PublicKey::from(pk))
            }
        };

        Ok(Self {
            private,
            public,
            chain_code: ir,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number: child,
        })
    }

    /// Apply each element of `path` in order.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, WalletError> {
        path.as_slice()
            .iter()
            .try_fold(self.clone(), |key, &child| key.derive(child))
    }

    /// Public-only counterpart with the same chain code and position.
    pub fn neuter(&self) -> Self {
        Self {
            private: None,
            ..self.clone()
        }
    }

    /// First four bytes of Hash160 of the compressed public key.
    pub fn fingerprint(&self) -> [u8; 4] {
        let h = hash160(&self.public.serialize_compressed());
        [h[0], h[1], h[2], h[3]]
    }

    /// Signing key pair, absent for neutered keys.
    pub fn keypair(&self) -> Option<&KeyPair> {
        self.private.as_ref()
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    pub fn child_number(&self) -> ChildNumber {
        self.child_number
    }

    pub fn is_private(&self) -> bool {
        self.private.is_some()
    }

    /// BIP-32 Base58Check form: `xprv`/`xpub` on mainnet, `tprv`/`tpub` on
    /// testnet.
    pub fn to_base58(&self, network: Network) -> String {
        let version = match (network, self.is_private()) {
            (Network::Mainnet, true) => XPRV_VERSION,
            (Network::Mainnet, false) => XPUB_VERSION,
            (Network::Testnet, true) => TPRV_VERSION,
            (Network::Testnet, false) => TPUB_VERSION,
        };
        let mut payload = Vec::with_capacity(EXTENDED_KEY_LEN);
        payload.extend_from_slice(&version.to_be_bytes());
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fingerprint);
        payload.extend_from_slice(&self.child_number.raw().to_be_bytes());
        payload.extend_from_slice(&self.chain_code);
        match &self.private {
            Some(kp) => {
                payload.push(0);
                payload.extend_from_slice(&kp.secret_bytes());
            }
            None => payload.extend_from_slice(&self.public.serialize_compressed()),
        }
        let encoded = base58::encode_raw(&payload);
        payload.zeroize();
        encoded
    }

    /// Parse a Base58Check extended key, returning it with its network.
    pub fn from_base58(s: &str) -> Result<(Self, Network), WalletError> {
        let mut data = base58::decode_raw(s.trim())?;
        let parsed = Self::from_payload(&data);
        data.zeroize();
        parsed
    }

    fn from_payload(data: &[u8]) -> Result<(Self, Network), WalletError> {
        if data.len() != EXTENDED_KEY_LEN {
            return Err(AddressError::InvalidLength(data.len()).into());
        }
        let version = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let (network, is_private) = match version {
            XPUB_VERSION => (Network::Mainnet, false),
            XPRV_VERSION => (Network::Mainnet, true),
            TPUB_VERSION => (Network::Testnet, false),
            TPRV_VERSION => (Network::Testnet, true),
            other => return Err(AddressError::UnknownKeyVersion(other).into()),
        };
        let depth = data[4];
        let parent_fingerprint = [data[5], data[6], data[7], data[8]];
        let child_number = ChildNumber(u32::from_be_bytes([data[9], data[10], data[11], data[12]]));
        if depth == 0 && (parent_fingerprint != [0u8; 4] || child_number.raw() != 0) {
            return Err(AddressError::InvalidEncoding(
                "master key with non-zero parent fingerprint or child number".into(),
            )
            .into());
        }
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..45]);

        let key_data = &data[45..];
        let (private, public) = if is_private {
            if key_data[0] != 0 {
                return Err(AddressError::InvalidEncoding("private key data must start with 0x00".into()).into());
            }
            let mut secret = [0u8; 32];
            secret.copy_from_slice(&key_data[1..]);
            let kp = KeyPair::from_secret_bytes(&secret);
            secret.zeroize();
            let kp = kp?;
            let public = kp.public_key();
            (Some(kp), public)
        } else {
            (None, PublicKey::from_slice(key_data)?)
        };

        Ok((
            Self {
                private,
                public,
                chain_code,
                depth,
                parent_fingerprint,
                child_number,
            },
            network,
        ))
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("public_key", &self.public)
            .field("depth", &self.depth)
            .field("child_number", &self.child_number)
            .field("private", &self.private.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Derive the key at `path` below the master node of `seed`.
pub fn derive_path(seed: &Seed, path: &DerivationPath) -> Result<ExtendedKey, WalletError> {
    ExtendedKey::master(seed.as_bytes())?.derive_path(path)
}

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> ([u8; 32], [u8; 32]) {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    (il, ir)
}

// ---------------------------------------------------------------------------
// Derived addresses and the keychain
// ---------------------------------------------------------------------------

/// A key at a full path together with its chain address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAddress {
    pub keypair: KeyPair,
    pub address: Address,
    pub path: DerivationPath,
}

/// Derive the key at `path` from `master` and encode its address for
/// `chain` on `network`.
pub fn derive_address(
    master: &ExtendedKey,
    path: &DerivationPath,
    chain: Chain,
    network: Network,
) -> Result<DerivedAddress, WalletError> {
    let node = master.derive_path(path)?;
    let keypair = node.keypair().cloned().ok_or(WalletError::PublicOnly)?;
    let address = Address::from_public_key(&keypair.public_key(), chain, network);
    Ok(DerivedAddress {
        keypair,
        address,
        path: path.clone(),
    })
}

/// Sequential address generator rooted at a BIP-44 account node.
///
/// Receiving keys live at `account/0/i`, change keys at `account/1/i`.
/// Sequential derivation skips an index whose child key is invalid and moves
/// on to the next one; explicitly requested indices never skip.
pub struct KeyChain {
    chain: Chain,
    network: Network,
    account_path: DerivationPath,
    external: ExtendedKey,
    internal: ExtendedKey,
    next_index: u32,
    next_change_index: u32,
    /// Cache of derived keys by (branch, index).
    derived: HashMap<(u32, u32), DerivedAddress>,
    /// Reverse lookup: address payload -> (branch, index).
    payload_to_index: HashMap<[u8; 20], (u32, u32)>,
}

impl KeyChain {
    /// Keychain for BIP-44 `account` of `chain`, below `master`.
    pub fn new(
        master: &ExtendedKey,
        account: u32,
        chain: Chain,
        network: Network,
    ) -> Result<Self, WalletError> {
        let coin_type = chain.params(network).coin_type;
        let account_path = DerivationPath::bip44_account(coin_type, account)?;
        let account_key = master.derive_path(&account_path)?;
        Self::from_account_key(account_key, account_path, chain, network)
    }

    /// Keychain over an already-derived account node.
    pub fn from_account_key(
        account_key: ExtendedKey,
        account_path: DerivationPath,
        chain: Chain,
        network: Network,
    ) -> Result<Self, WalletError> {
        let external = account_key.derive_child(EXTERNAL_BRANCH, false)?;
        let internal = account_key.derive_child(INTERNAL_BRANCH, false)?;
        debug!(%chain, %network, path = %account_path, "keychain: opened account");
        Ok(Self {
            chain,
            network,
            account_path,
            external,
            internal,
            next_index: 0,
            next_change_index: 0,
            derived: HashMap::new(),
            payload_to_index: HashMap::new(),
        })
    }

    /// Receiving key at exactly `index`.
    pub fn keypair_at(&mut self, index: u32) -> Result<&DerivedAddress, WalletError> {
        self.ensure_derived(EXTERNAL_BRANCH, index)?;
        Ok(&self.derived[&(EXTERNAL_BRANCH, index)])
    }

    /// Change key at exactly `index`.
    pub fn change_keypair_at(&mut self, index: u32) -> Result<&DerivedAddress, WalletError> {
        self.ensure_derived(INTERNAL_BRANCH, index)?;
        Ok(&self.derived[&(INTERNAL_BRANCH, index)])
    }

    /// Next unused receiving key, advancing the internal index.
    pub fn next_keypair(&mut self) -> Result<&DerivedAddress, WalletError> {
        let index = self.advance(EXTERNAL_BRANCH)?;
        Ok(&self.derived[&(EXTERNAL_BRANCH, index)])
    }

    /// Next unused change key, advancing the internal change index.
    pub fn next_change_keypair(&mut self) -> Result<&DerivedAddress, WalletError> {
        let index = self.advance(INTERNAL_BRANCH)?;
        Ok(&self.derived[&(INTERNAL_BRANCH, index)])
    }

    /// Receiving address at `index` without caching the key.
    pub fn address_at(&self, index: u32) -> Result<Address, WalletError> {
        let node = self.external.derive_child(index, false)?;
        Ok(Address::from_public_key(&node.public_key(), self.chain, self.network))
    }

    /// Look up the derived key whose address payload is `payload`.
    pub fn keypair_for_payload(&self, payload: &[u8; 20]) -> Option<&DerivedAddress> {
        self.payload_to_index
            .get(payload)
            .and_then(|key| self.derived.get(key))
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn account_path(&self) -> &DerivationPath {
        &self.account_path
    }

    /// The next receiving index that will be used.
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// The next change index that will be used.
    pub fn next_change_index(&self) -> u32 {
        self.next_change_index
    }

    fn advance(&mut self, branch: u32) -> Result<u32, WalletError> {
        loop {
            let index = if branch == EXTERNAL_BRANCH {
                self.next_index
            } else {
                self.next_change_index
            };
            if index >= HARDENED_OFFSET {
                return Err(WalletError::InvalidPath(format!(
                    "branch {branch} has no non-hardened indices left"
                )));
            }
            match self.ensure_derived(branch, index) {
                Ok(()) => {
                    self.bump(branch, index);
                    return Ok(index);
                }
                Err(WalletError::InvalidChildKey { .. }) => {
                    warn!(branch, index, "keychain: skipping invalid child key");
                    self.bump(branch, index);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn bump(&mut self, branch: u32, used: u32) {
        if branch == EXTERNAL_BRANCH {
            self.next_index = used + 1;
        } else {
            self.next_change_index = used + 1;
        }
    }

    fn ensure_derived(&mut self, branch: u32, index: u32) -> Result<(), WalletError> {
        if self.derived.contains_key(&(branch, index)) {
            return Ok(());
        }
        let parent = if branch == EXTERNAL_BRANCH {
            &self.external
        } else {
            &self.internal
        };
        let node = parent.derive_child(index, false)?;
        let keypair = node.keypair().cloned().ok_or(WalletError::PublicOnly)?;
        let address = Address::from_public_key(&keypair.public_key(), self.chain, self.network);
        let path = self
            .account_path
            .child(ChildNumber(branch))
            .child(ChildNumber(index));
        self.payload_to_index
            .insert(*address.payload(), (branch, index));
        self.derived.insert(
            (branch, index),
            DerivedAddress {
                keypair,
                address,
                path,
            },
        );
        Ok(())
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyChain")
            .field("chain", &self.chain)
            .field("network", &self.network)
            .field("account_path", &self.account_path)
            .field("next_index", &self.next_index)
            .field("next_change_index", &self.next_change_index)
            .field("cached_keys", &self.derived.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// BIP-32 test vector 1 seed.
    const TV1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    /// BIP-39 seed of "abandon abandon ... about" with an empty passphrase.
    const ABANDON_SEED: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    fn tv1_master() -> ExtendedKey {
        ExtendedKey::master(&hex::decode(TV1_SEED).unwrap()).unwrap()
    }

    fn abandon_master() -> ExtendedKey {
        ExtendedKey::master(&hex::decode(ABANDON_SEED).unwrap()).unwrap()
    }

    // --- Seed ---

    #[test]
    fn seed_generate_unique() {
        let s1 = Seed::generate();
        let s2 = Seed::generate();
        assert_eq!(s1.as_bytes().len(), 64);
        assert_ne!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn seed_length_bounds() {
        assert!(Seed::from_bytes(&[0u8; 16]).is_ok());
        assert!(Seed::from_bytes(&[0u8; 64]).is_ok());
        assert_eq!(
            Seed::from_bytes(&[0u8; 15]).unwrap_err(),
            WalletError::InvalidSeedLength { len: 15 }
        );
        assert_eq!(
            Seed::from_bytes(&[0u8; 65]).unwrap_err(),
            WalletError::InvalidSeedLength { len: 65 }
        );
    }

    #[test]
    fn seed_debug_hides_bytes() {
        let seed = Seed::from_bytes(&[0xAB; 32]).unwrap();
        let debug = format!("{seed:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("ab"));
    }

    // --- Paths ---

    #[test]
    fn path_parse_and_display() {
        let p: DerivationPath = "m/44'/0'/0'/0/0".parse().unwrap();
        assert_eq!(p.len(), 5);
        assert!(p.as_slice()[0].is_hardened());
        assert_eq!(p.as_slice()[0].index(), 44);
        assert!(!p.as_slice()[4].is_hardened());
        assert_eq!(p.to_string(), "m/44'/0'/0'/0/0");
        assert_eq!(p, DerivationPath::bip44(0, 0, 0, 0).unwrap());
    }

    #[test]
    fn path_accepts_h_markers() {
        let a: DerivationPath = "m/0h/1H/2'".parse().unwrap();
        let b: DerivationPath = "m/0'/1'/2'".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn path_master_only() {
        let p: DerivationPath = "m".parse().unwrap();
        assert!(p.is_empty());
        assert_eq!(p.to_string(), "m");
    }

    #[test]
    fn path_rejects_garbage() {
        for bad in ["", "44'/0'", "m/", "m/x", "m/-1", "m/2147483648", "m/1''"] {
            assert!(
                matches!(bad.parse::<DerivationPath>(), Err(WalletError::InvalidPath(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn path_serde_as_string() {
        let p: DerivationPath = "m/44'/60'/0'/0/3".parse().unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"m/44'/60'/0'/0/3\"");
        assert_eq!(serde_json::from_str::<DerivationPath>(&json).unwrap(), p);
    }

    // --- BIP-32 test vector 1 ---

    #[test]
    fn tv1_master_key() {
        let m = tv1_master();
        assert_eq!(
            hex::encode(m.keypair().unwrap().secret_bytes()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(m.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
        assert_eq!(hex::encode(m.fingerprint()), "3442193e");
        assert_eq!(
            m.to_base58(Network::Mainnet),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            m.neuter().to_base58(Network::Mainnet),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn tv1_hardened_child() {
        let c = tv1_master().derive_child(0, true).unwrap();
        assert_eq!(c.depth(), 1);
        assert_eq!(hex::encode(c.parent_fingerprint()), "3442193e");
        assert_eq!(
            c.to_base58(Network::Mainnet),
            "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7"
        );
        assert_eq!(
            c.neuter().to_base58(Network::Mainnet),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCdrfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );
    }

    #[test]
    fn tv1_path_m_0h_1() {
        let path: DerivationPath = "m/0H/1".parse().unwrap();
        let k = tv1_master().derive_path(&path).unwrap();
        assert_eq!(
            k.to_base58(Network::Mainnet),
            "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaXwTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs"
        );
        assert_eq!(
            k.neuter().to_base58(Network::Mainnet),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
    }

    #[test]
    fn ckd_pub_matches_ckd_priv_for_normal_children() {
        let parent = tv1_master().derive_child(0, true).unwrap();
        let via_private = parent.derive_child(1, false).unwrap().neuter();
        let via_public = parent.neuter().derive_child(1, false).unwrap();
        assert_eq!(via_private, via_public);
    }

    #[test]
    fn hardened_from_public_only_rejected() {
        let xpub = tv1_master().neuter();
        assert_eq!(
            xpub.derive_child(0, true).unwrap_err(),
            WalletError::HardenedFromPublicOnly { index: 0 }
        );
    }

    #[test]
    fn child_index_must_fit_31_bits() {
        assert!(matches!(
            tv1_master().derive_child(HARDENED_OFFSET, false),
            Err(WalletError::InvalidPath(_))
        ));
    }

    #[test]
    fn master_rejects_bad_seed_length() {
        assert_eq!(
            ExtendedKey::master(&[1u8; 8]).unwrap_err(),
            WalletError::InvalidSeedLength { len: 8 }
        );
    }

    #[test]
    fn testnet_serialization() {
        let m = tv1_master();
        assert_eq!(
            m.to_base58(Network::Testnet),
            "tprv8ZgxMBicQKsPeDgjzdC36fs6bMjGApWDNLR9erAXMs5skhMv36j9MV5ecvfavji5khqjWaWSFhN3YcCUUdiKH6isR4Pwy3U5y5egddBr16m"
        );
        assert_eq!(
            m.neuter().to_base58(Network::Testnet),
            "tpubD6NzVbkrYhZ4XgiXtGrdW5XDAPFCL9h7we1vwNCpn8tGbBcgfVYjXyhWo4E1xkh56hjod1RhGjxbaTLV3X4FyWuejifB9jusQ46QzG87VKp"
        );
    }

    #[test]
    fn base58_decode_roundtrip() {
        let k = tv1_master().derive_child(0, true).unwrap();
        for network in [Network::Mainnet, Network::Testnet] {
            for key in [k.clone(), k.neuter()] {
                let (back, net) = ExtendedKey::from_base58(&key.to_base58(network)).unwrap();
                assert_eq!(back, key);
                assert_eq!(net, network);
            }
        }
    }

    #[test]
    fn base58_decode_rejects_corruption() {
        let s = tv1_master().to_base58(Network::Mainnet);
        let mut chars: Vec<char> = s.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'i' { 'j' } else { 'i' };
        let bad: String = chars.into_iter().collect();
        assert_eq!(
            ExtendedKey::from_base58(&bad).unwrap_err(),
            WalletError::Address(AddressError::ChecksumMismatch)
        );
    }

    #[test]
    fn base58_decode_rejects_unknown_version() {
        let mut payload = vec![0x01, 0x02, 0x03, 0x04];
        payload.extend_from_slice(&[0u8; 74]);
        let s = base58::encode_raw(&payload);
        assert_eq!(
            ExtendedKey::from_base58(&s).unwrap_err(),
            WalletError::Address(AddressError::UnknownKeyVersion(0x0102_0304))
        );
    }

    #[test]
    fn debug_redacts_private_key() {
        let m = tv1_master();
        let debug = format!("{m:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("e8f32e72"));
    }

    // --- BIP-44 ---

    #[test]
    fn bip44_abandon_vector() {
        let seed = Seed::from_bytes(&hex::decode(ABANDON_SEED).unwrap()).unwrap();
        let path = DerivationPath::bip44(0, 0, 0, 0).unwrap();
        let key = derive_path(&seed, &path).unwrap();
        assert_eq!(
            hex::encode(key.keypair().unwrap().secret_bytes()),
            "e284129cc0922579a535bbf4d1a3b25773090d28c909bc0fed73b5e0222cc372"
        );
    }

    #[test]
    fn derive_address_per_chain() {
        let m = abandon_master();
        let cases = [
            (Chain::Bitcoin, Network::Mainnet, "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"),
            (Chain::Bitcoin, Network::Testnet, "mkpZhYtJu2r87Js3pDiWJDmPte2NRZ8bJV"),
            (Chain::Litecoin, Network::Mainnet, "LUWPbpM43E2p7ZSh8cyTBEkvpHmr3cB8Ez"),
            (Chain::Ethereum, Network::Mainnet, "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"),
            (Chain::Tron, Network::Mainnet, "TUEZSdKsoDHQMeZwihtdoBiN46zxhGWYdH"),
            (Chain::Stacks, Network::Mainnet, "SPC5KHM41H6WHAST7MWWDD807YSPRQKJ69FSH54J"),
        ];
        for (chain, network, expected) in cases {
            let coin_type = chain.params(network).coin_type;
            let path = DerivationPath::bip44(coin_type, 0, 0, 0).unwrap();
            let d = derive_address(&m, &path, chain, network).unwrap();
            assert_eq!(d.address.to_string(), expected, "{chain} {network}");
            assert_eq!(d.path, path);
        }
    }

    #[test]
    fn derive_address_needs_private_key() {
        let xpub = abandon_master().neuter();
        let path: DerivationPath = "m/0/0".parse().unwrap();
        assert_eq!(
            derive_address(&xpub, &path, Chain::Bitcoin, Network::Mainnet).unwrap_err(),
            WalletError::PublicOnly
        );
    }

    // --- KeyChain ---

    #[test]
    fn keychain_account_xpub() {
        let kc = KeyChain::new(&abandon_master(), 0, Chain::Bitcoin, Network::Mainnet).unwrap();
        assert_eq!(kc.account_path().to_string(), "m/44'/0'/0'");
        let account = abandon_master().derive_path(kc.account_path()).unwrap();
        assert_eq!(
            account.neuter().to_base58(Network::Mainnet),
            "xpub6BosfCnifzxcFwrSzQiqu2DBVTshkCXacvNsWGYJVVhhawA7d4R5WSWGFNbi8Aw6ZRc1brxMyWMzG3DSSSSoekkudhUd9yLb6qx39T9nMdj"
        );
    }

    #[test]
    fn keychain_sequential_addresses() {
        let mut kc = KeyChain::new(&abandon_master(), 0, Chain::Bitcoin, Network::Mainnet).unwrap();
        let first = kc.next_keypair().unwrap().clone();
        assert_eq!(first.address.to_string(), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
        assert_eq!(first.path.to_string(), "m/44'/0'/0'/0/0");
        let second = kc.next_keypair().unwrap().clone();
        assert_eq!(second.address.to_string(), "1Ak8PffB2meyfYnbXZR9EGfLfFZVpzJvQP");
        assert_eq!(kc.next_index(), 2);
    }

    #[test]
    fn keychain_change_branch() {
        let mut kc = KeyChain::new(&abandon_master(), 0, Chain::Bitcoin, Network::Mainnet).unwrap();
        let change = kc.next_change_keypair().unwrap().clone();
        assert_eq!(change.address.to_string(), "1J3J6EvPrv8q6AC3VCjWV45Uf3nssNMRtH");
        assert_eq!(change.path.to_string(), "m/44'/0'/0'/1/0");
        assert_eq!(kc.change_keypair_at(0).unwrap(), &change);
        assert_eq!(kc.next_index(), 0);
    }

    #[test]
    fn keychain_lookup_by_payload() {
        let mut kc = KeyChain::new(&abandon_master(), 0, Chain::Bitcoin, Network::Mainnet).unwrap();
        let d = kc.keypair_at(5).unwrap().clone();
        let found = kc.keypair_for_payload(d.address.payload()).unwrap();
        assert_eq!(found.keypair, d.keypair);
        assert!(kc.keypair_for_payload(&[0u8; 20]).is_none());
    }

    #[test]
    fn keychain_address_at_matches_keypair_at() {
        let mut kc = KeyChain::new(&abandon_master(), 0, Chain::Litecoin, Network::Mainnet).unwrap();
        let addr = kc.address_at(3).unwrap();
        assert_eq!(kc.keypair_at(3).unwrap().address, addr);
    }

    #[test]
    fn keychain_watch_only_addresses() {
        let account = abandon_master()
            .derive_path(&DerivationPath::bip44_account(0, 0).unwrap())
            .unwrap()
            .neuter();
        let mut kc = KeyChain::from_account_key(
            account,
            DerivationPath::bip44_account(0, 0).unwrap(),
            Chain::Bitcoin,
            Network::Mainnet,
        )
        .unwrap();
        assert_eq!(
            kc.address_at(0).unwrap().to_string(),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"
        );
        assert_eq!(kc.next_keypair().unwrap_err(), WalletError::PublicOnly);
    }

    #[test]
    fn keychain_failed_advance_keeps_indices() {
        let path = DerivationPath::bip44_account(0, 0).unwrap();
        let account = abandon_master().derive_path(&path).unwrap().neuter();
        let mut kc =
            KeyChain::from_account_key(account, path, Chain::Bitcoin, Network::Mainnet).unwrap();
        for _ in 0..2 {
            assert_eq!(kc.next_keypair().unwrap_err(), WalletError::PublicOnly);
            assert_eq!(kc.next_change_keypair().unwrap_err(), WalletError::PublicOnly);
        }
        assert_eq!(kc.next_index(), 0);
        assert_eq!(kc.next_change_index(), 0);
    }
}
