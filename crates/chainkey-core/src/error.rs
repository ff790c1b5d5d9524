//! Error types for the chainkey core.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("checksum mismatch")] ChecksumMismatch,
    #[error("unknown version byte: 0x{0:02x}")] UnknownVersionByte(u8),
    #[error("unknown extended key version: 0x{0:08x}")] UnknownKeyVersion(u32),
    #[error("invalid encoding: {0}")] InvalidEncoding(String),
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid payload length: {0}")] InvalidLength(usize),
    #[error("chain {0} has no UTXO locking script")] UnsupportedChain(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid secret key bytes")] InvalidSecretKey,
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("invalid WIF: {0}")] InvalidWif(String),
    #[error("invalid hex key: {0}")] InvalidHex(String),
    #[error(transparent)] Address(#[from] AddressError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("not a pay-to-pubkey-hash script")] NotP2pkh,
    #[error("push of {0} bytes exceeds OP_PUSHDATA1")] PushTooLarge(usize),
    #[error("truncated script")] Truncated,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("serialization: {0}")] Serialization(String),
    #[error("input index out of bounds: {index} >= {len}")] InputIndexOutOfBounds { index: usize, len: usize },
    #[error("value overflow")] ValueOverflow,
    #[error("invalid txid: {0}")] InvalidTxid(String),
    #[error("malformed utxo: {0}")] MalformedUtxo(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount: {0:?}")] Invalid(String),
    #[error("more than {decimals} fractional digits")] TooPrecise { decimals: u8 },
    #[error("amount overflows")] Overflow,
}

#[derive(Error, Debug)]
pub enum ChainkeyError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Amount(#[from] AmountError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Script(#[from] ScriptError),
    #[error(transparent)] Transaction(#[from] TransactionError),
}
