//! Hash functions used for checksums, pubkey hashes and signature hashes.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Double SHA-256, used for txids, sighashes and Base58Check/C32 checksums.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// `RIPEMD160(SHA256(data))`.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

/// Keccak-256 (the pre-standard SHA-3 padding used by Ethereum and Tron).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Four-byte checksum: first 4 bytes of `sha256d(data)`.
pub fn checksum4(data: &[u8]) -> [u8; 4] {
    let h = sha256d(data);
    [h[0], h[1], h[2], h[3]]
}
