//! EIP-55 mixed-case checksum hex addresses.
//!
//! Each hex letter of the lowercase address is upper-cased when the matching
//! nibble of `Keccak256(lowercase_hex)` is 8 or more.

use crate::constants::HASH160_LEN;
use crate::error::AddressError;
use crate::hash::keccak256;

/// Render a 20-byte payload as `0x` + checksummed hex.
pub fn encode(payload: &[u8; HASH160_LEN]) -> String {
    let lower = hex::encode(payload);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(2 + lower.len());
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> if i % 2 == 0 { 4 } else { 0 }) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse a hex address, with or without `0x`.
///
/// All-lowercase and all-uppercase input carries no checksum and is accepted
/// as is; mixed case must match the EIP-55 casing exactly.
pub fn decode(s: &str) -> Result<[u8; HASH160_LEN], AddressError> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if body.len() != HASH160_LEN * 2 {
        return Err(AddressError::InvalidEncoding(format!(
            "expected {} hex digits, got {}",
            HASH160_LEN * 2,
            body.len()
        )));
    }
    let mut payload = [0u8; HASH160_LEN];
    hex::decode_to_slice(body, &mut payload)
        .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && encode(&payload)[2..] != *body {
        return Err(AddressError::ChecksumMismatch);
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(h: &str) -> [u8; 20] {
        hex::decode(h).unwrap().try_into().unwrap()
    }

    #[test]
    fn reference_vectors() {
        assert_eq!(
            encode(&payload("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(
            encode(&payload("fb6916095ca1df60bb79ce92ce3ea74c37c5d359")),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }

    #[test]
    fn decode_checksummed() {
        let p = decode("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap();
        assert_eq!(hex::encode(p), "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn single_case_accepted_without_checksum() {
        assert!(decode("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
        assert!(decode("0X5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED").is_ok());
        assert!(decode("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_ok());
    }

    #[test]
    fn wrong_casing_is_checksum_mismatch() {
        let err = decode("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap_err();
        assert_eq!(err, AddressError::ChecksumMismatch);
    }

    #[test]
    fn bad_length_and_characters() {
        assert!(matches!(decode("0x1234"), Err(AddressError::InvalidEncoding(_))));
        assert!(matches!(
            decode("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaeg"),
            Err(AddressError::InvalidEncoding(_))
        ));
    }
}
