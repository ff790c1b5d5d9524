//! BIP-39 mnemonic generation and seed derivation.

use bip39::Language;
use std::fmt;
use zeroize::Zeroize;

use crate::error::WalletError;
use crate::keys::Seed;

/// Entropy sizes BIP-39 defines (12 to 24 words).
pub const VALID_ENTROPY_BITS: [usize; 5] = [128, 160, 192, 224, 256];

/// A validated English BIP-39 phrase.
///
/// `Debug` never prints the words.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// Generate a fresh phrase from `entropy_bits` of OS randomness.
    pub fn generate(entropy_bits: usize) -> Result<Self, WalletError> {
        use rand::RngCore;
        if !VALID_ENTROPY_BITS.contains(&entropy_bits) {
            return Err(WalletError::InvalidMnemonic(format!(
                "entropy must be one of {VALID_ENTROPY_BITS:?} bits, got {entropy_bits}"
            )));
        }
        let mut entropy = vec![0u8; entropy_bits / 8];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let mnemonic = Self::from_entropy(&entropy);
        entropy.zeroize();
        mnemonic
    }

    /// Phrase encoding `entropy` (16, 20, 24, 28 or 32 bytes).
    pub fn from_entropy(entropy: &[u8]) -> Result<Self, WalletError> {
        bip39::Mnemonic::from_entropy_in(Language::English, entropy)
            .map(|inner| Self { inner })
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
    }

    /// Parse a phrase, normalizing whitespace and case first.
    pub fn parse(phrase: &str) -> Result<Self, WalletError> {
        let normalized = phrase
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        bip39::Mnemonic::parse_in(Language::English, &normalized)
            .map(|inner| Self { inner })
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
    }

    /// BIP-39 seed: PBKDF2-HMAC-SHA512 of the phrase salted with
    /// `"mnemonic" || passphrase`.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        let mut bytes = self.inner.to_seed(passphrase);
        let seed = Seed::from(bytes);
        bytes.zeroize();
        seed
    }

    /// The phrase as space-separated words. Handle with care.
    pub fn phrase(&self) -> String {
        self.inner.to_string()
    }

    pub fn word_count(&self) -> usize {
        self.inner.word_count()
    }

    /// The encoded entropy. Handle with care.
    pub fn entropy(&self) -> Vec<u8> {
        self.inner.to_entropy()
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &self.word_count())
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

/// Parse `phrase` and derive its BIP-39 seed with `passphrase`.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, WalletError> {
    Ok(Mnemonic::parse(phrase)?.to_seed(passphrase))
}
