//! secp256k1 key pairs, ECDSA signing and WIF private key encoding.
//!
//! Signing always uses RFC 6979 deterministic nonces (the behavior of
//! `libsecp256k1`'s default nonce function), so signing the same digest with
//! the same key yields byte-identical, low-S signatures.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

use crate::base58;
use crate::chain::{Chain, ChainParams, Network};
use crate::error::CryptoError;
use crate::hash::{hash160, keccak256};

/// Flag byte appended to a WIF payload for compressed public keys.
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// secp256k1 key pair.
///
/// The secret is only exposed through [`KeyPair::secret_bytes`] and WIF
/// export; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a random key pair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        loop {
            let mut bytes = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            if let Ok(kp) = Self::from_secret_bytes(&bytes) {
                return kp;
            }
        }
    }

    /// Create a key pair from a 32-byte big-endian scalar.
    ///
    /// Fails if the scalar is zero or not below the curve order.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidSecretKey)?;
        Ok(Self::from_secret_key(secret))
    }

    /// Import a 64-digit hex private key, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 64 {
            return Err(CryptoError::InvalidHex(format!(
                "expected 64 hex digits, got {}",
                digits.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, &mut bytes[..])
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Lowercase hex of the secret scalar, no prefix.
    pub fn to_hex(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.secret.secret_bytes());
        Zeroizing::new(hex::encode(&bytes[..]))
    }

    /// Wrap an already-validated `secp256k1` secret key.
    pub fn from_secret_key(secret: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public = PublicKey(secp256k1::PublicKey::from_secret_key(&secp, &secret));
        Self { secret, public }
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Raw secret scalar (32 bytes, big-endian). Handle with care.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    /// The underlying `secp256k1` secret key.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// ECDSA-sign a 32-byte digest (RFC 6979 nonce, low-S).
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Signature {
        let secp = Secp256k1::signing_only();
        secp.sign_ecdsa(&Message::from_digest(*digest), &self.secret)
    }

    /// ECDSA-sign a digest and return the DER encoding.
    pub fn sign_digest_der(&self, digest: &[u8; 32]) -> Vec<u8> {
        self.sign_digest(digest).serialize_der().to_vec()
    }

    /// Recoverable ECDSA signature as `r || s || v` (65 bytes, `v` in 0..=3).
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> [u8; 65] {
        let secp = Secp256k1::signing_only();
        let sig = secp.sign_ecdsa_recoverable(&Message::from_digest(*digest), &self.secret);
        let (recid, compact) = sig.serialize_compact();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recid.to_i32() as u8;
        out
    }

    /// Export as Wallet Import Format for `chain` on `network` (compressed).
    pub fn to_wif(&self, chain: Chain, network: Network) -> String {
        let params = chain.params(network);
        let mut payload = Vec::with_capacity(33);
        payload.extend_from_slice(&self.secret.secret_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        base58::encode(&payload, params.wif_prefix)
    }

    /// Import a WIF string, checking its prefix against `chain`/`network`.
    ///
    /// Both compressed (34-byte) and uncompressed (33-byte) payloads are
    /// accepted; the key pair always serializes its public key compressed.
    pub fn from_wif(wif: &str, chain: Chain, network: Network) -> Result<Self, CryptoError> {
        let params: ChainParams = chain.params(network);
        let (payload, prefix) = base58::decode(wif.trim())?;
        if prefix != params.wif_prefix {
            return Err(CryptoError::InvalidWif(format!(
                "prefix 0x{prefix:02x} is not {chain} {network} (0x{:02x})",
                params.wif_prefix
            )));
        }
        let secret: [u8; 32] = match payload.len() {
            33 if payload[32] == WIF_COMPRESSED_FLAG => payload[..32]
                .try_into()
                .map_err(|_| CryptoError::InvalidWif("bad key length".into()))?,
            32 => payload[..]
                .try_into()
                .map_err(|_| CryptoError::InvalidWif("bad key length".into()))?,
            n => return Err(CryptoError::InvalidWif(format!("payload length {n}"))),
        };
        Self::from_secret_bytes(&secret)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public)
            .finish_non_exhaustive()
    }
}

/// secp256k1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(secp256k1::PublicKey);

impl PublicKey {
    /// Parse a compressed (33-byte) or uncompressed (65-byte) SEC1 key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        secp256k1::PublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// 33-byte compressed SEC1 encoding.
    pub fn serialize_compressed(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// 65-byte uncompressed SEC1 encoding (`0x04 || X || Y`).
    pub fn serialize_uncompressed(&self) -> [u8; 65] {
        self.0.serialize_uncompressed()
    }

    /// `RIPEMD160(SHA256(compressed))`, the P2PKH payload.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.serialize_compressed())
    }

    /// Last 20 bytes of `Keccak256(X || Y)`, the EVM/Tron payload.
    pub fn keccak20(&self) -> [u8; 20] {
        let uncompressed = self.serialize_uncompressed();
        let digest = keccak256(&uncompressed[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        out
    }

    /// The underlying `secp256k1` key.
    pub fn inner(&self) -> &secp256k1::PublicKey {
        &self.0
    }

    /// Verify a DER-encoded ECDSA signature over a 32-byte digest.
    ///
    /// High-S signatures are normalized before verification.
    pub fn verify_der(&self, digest: &[u8; 32], der: &[u8]) -> Result<(), CryptoError> {
        let mut sig = Signature::from_der(der).map_err(|_| CryptoError::InvalidSignature)?;
        sig.normalize_s();
        let secp = Secp256k1::verification_only();
        secp.verify_ecdsa(&Message::from_digest(*digest), &sig, &self.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    /// Recover the signer of a 65-byte `r || s || v` signature.
    pub fn recover(digest: &[u8; 32], signature: &[u8; 65]) -> Result<Self, CryptoError> {
        let recid = RecoveryId::from_i32(signature[64] as i32)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let sig = RecoverableSignature::from_compact(&signature[..64], recid)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let secp = Secp256k1::verification_only();
        secp.recover_ecdsa(&Message::from_digest(*digest), &sig)
            .map(Self)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl From<secp256k1::PublicKey> for PublicKey {
    fn from(pk: secp256k1::PublicKey) -> Self {
        Self(pk)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.serialize_compressed()))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.serialize_compressed()))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.serialize_compressed()))
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        Self::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256d;

    /// BIP-44 m/44'/0'/0'/0/0 key of the "abandon ... about" mnemonic.
    const ABANDON_KEY: &str = "e284129cc0922579a535bbf4d1a3b25773090d28c909bc0fed73b5e0222cc372";

    fn abandon_keypair() -> KeyPair {
        let bytes: [u8; 32] = hex::decode(ABANDON_KEY).unwrap().try_into().unwrap();
        KeyPair::from_secret_bytes(&bytes).unwrap()
    }

    #[test]
    fn public_key_of_known_secret() {
        let kp = abandon_keypair();
        assert_eq!(
            kp.public_key().to_string(),
            "03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e"
        );
    }

    #[test]
    fn hex_import_export() {
        let kp = KeyPair::from_hex(ABANDON_KEY).unwrap();
        assert_eq!(kp, abandon_keypair());
        assert_eq!(kp.to_hex().as_str(), ABANDON_KEY);
        let prefixed = KeyPair::from_hex(&format!("0x{}", ABANDON_KEY.to_uppercase())).unwrap();
        assert_eq!(prefixed, kp);
        assert_eq!(KeyPair::from_hex(&kp.to_hex()).unwrap(), kp);
    }

    #[test]
    fn hex_import_rejects_bad_input() {
        let bad_inputs = [
            String::new(),
            "0x".to_string(),
            ABANDON_KEY[..62].to_string(),
            format!("{ABANDON_KEY}00"),
            format!("{}zz", &ABANDON_KEY[..62]),
        ];
        for bad in &bad_inputs {
            assert!(
                matches!(KeyPair::from_hex(bad), Err(CryptoError::InvalidHex(_))),
                "{bad:?}"
            );
        }
        assert_eq!(
            KeyPair::from_hex(&"00".repeat(32)).unwrap_err(),
            CryptoError::InvalidSecretKey
        );
    }

    #[test]
    fn zero_secret_rejected() {
        assert_eq!(
            KeyPair::from_secret_bytes(&[0u8; 32]).unwrap_err(),
            CryptoError::InvalidSecretKey
        );
    }

    #[test]
    fn secret_above_order_rejected() {
        assert!(KeyPair::from_secret_bytes(&[0xff; 32]).is_err());
    }

    #[test]
    fn generate_unique() {
        assert_ne!(KeyPair::generate().public_key(), KeyPair::generate().public_key());
    }

    #[test]
    fn debug_hides_secret() {
        let kp = abandon_keypair();
        let debug = format!("{kp:?}");
        assert!(debug.contains("KeyPair"));
        assert!(!debug.contains(ABANDON_KEY));
    }

    #[test]
    fn wif_known_vector() {
        let kp = abandon_keypair();
        assert_eq!(
            kp.to_wif(Chain::Bitcoin, Network::Mainnet),
            "L4p2b9VAf8k5aUahF1JCJUzZkgNEAqLfq8DDdQiyAprQAKSbu8hf"
        );
    }

    #[test]
    fn wif_roundtrip_and_prefix_check() {
        let kp = abandon_keypair();
        let wif = kp.to_wif(Chain::Litecoin, Network::Mainnet);
        let back = KeyPair::from_wif(&wif, Chain::Litecoin, Network::Mainnet).unwrap();
        assert_eq!(back, kp);

        let err = KeyPair::from_wif(&wif, Chain::Bitcoin, Network::Mainnet).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidWif(_)));
    }

    #[test]
    fn signature_is_deterministic_and_verifies() {
        let kp = abandon_keypair();
        let digest = sha256d(b"chainkey");
        let a = kp.sign_digest_der(&digest);
        let b = kp.sign_digest_der(&digest);
        assert_eq!(a, b);
        kp.public_key().verify_der(&digest, &a).unwrap();
    }

    #[test]
    fn verify_rejects_other_digest() {
        let kp = abandon_keypair();
        let sig = kp.sign_digest_der(&sha256d(b"one"));
        assert_eq!(
            kp.public_key().verify_der(&sha256d(b"two"), &sig).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }

    #[test]
    fn recoverable_signature_recovers_signer() {
        let kp = abandon_keypair();
        let digest = keccak256(b"payload");
        let sig = kp.sign_recoverable(&digest);
        assert!(sig[64] <= 3);
        assert_eq!(PublicKey::recover(&digest, &sig).unwrap(), kp.public_key());
    }

    #[test]
    fn keccak20_known_ethereum_payload() {
        // m/44'/60'/0'/0/0 of "abandon ... about" is 0x9858EfFD232B4033E47d90003D41EC34EcaEda94.
        let bytes: [u8; 32] =
            hex::decode("1ab42cc412b618bdea3a599e3c9bae199ebf030895b039e9db1e30dafb12b727")
                .unwrap()
                .try_into()
                .unwrap();
        let kp = KeyPair::from_secret_bytes(&bytes).unwrap();
        assert_eq!(
            hex::encode(kp.public_key().keccak20()),
            "9858effd232b4033e47d90003d41ec34ecaeda94"
        );
    }

    #[test]
    fn public_key_serde_roundtrip() {
        let pk = abandon_keypair().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }
}
