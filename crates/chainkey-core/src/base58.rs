//! Base58Check encoding.
//!
//! ```text
//! base58( version || payload || sha256d(version || payload)[..4] )
//! ```
//!
//! Used for Bitcoin/Litecoin P2PKH and P2SH addresses, Tron addresses
//! (version `0x41`), WIF private keys and BIP-32 extended keys (where the
//! "version" is four bytes, see [`encode_raw`]).

use crate::error::AddressError;
use crate::hash::checksum4;

/// Encode `version || payload` with a trailing 4-byte checksum.
pub fn encode(payload: &[u8], version: u8) -> String {
    let mut data = Vec::with_capacity(1 + payload.len());
    data.push(version);
    data.extend_from_slice(payload);
    encode_raw(&data)
}

/// Append the checksum to arbitrary bytes and Base58-encode.
pub fn encode_raw(data: &[u8]) -> String {
    let mut buf = Vec::with_capacity(data.len() + 4);
    buf.extend_from_slice(data);
    buf.extend_from_slice(&checksum4(data));
    bs58::encode(buf).into_string()
}

/// Decode and verify a Base58Check string, returning `(payload, version)`.
pub fn decode(s: &str) -> Result<(Vec<u8>, u8), AddressError> {
    let mut data = decode_raw(s)?;
    if data.is_empty() {
        return Err(AddressError::InvalidEncoding("missing version byte".into()));
    }
    let version = data.remove(0);
    Ok((data, version))
}

/// Decode and verify a Base58Check string, returning everything before the
/// checksum.
pub fn decode_raw(s: &str) -> Result<Vec<u8>, AddressError> {
    let mut buf = bs58::decode(s)
        .into_vec()
        .map_err(|e| AddressError::InvalidEncoding(e.to_string()))?;
    if buf.len() < 5 {
        return Err(AddressError::InvalidEncoding(format!(
            "decoded length {} is too short",
            buf.len()
        )));
    }
    let checksum_start = buf.len() - 4;
    if checksum4(&buf[..checksum_start]) != buf[checksum_start..] {
        return Err(AddressError::ChecksumMismatch);
    }
    buf.truncate(checksum_start);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_p2pkh() {
        // Hash160 of the BIP-44 "abandon ... about" m/44'/0'/0'/0/0 key.
        let h = hex::decode("d986ed01b7a22225a70edbf2ba7cfb63a15cb3aa").unwrap();
        assert_eq!(encode(&h, 0x00), "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");
    }

    #[test]
    fn decode_returns_version_and_payload() {
        let (payload, version) = decode("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA").unwrap();
        assert_eq!(version, 0x00);
        assert_eq!(hex::encode(payload), "d986ed01b7a22225a70edbf2ba7cfb63a15cb3aa");
    }

    #[test]
    fn leading_zero_version_encodes_as_one() {
        let s = encode(&[0u8; 20], 0x00);
        assert!(s.starts_with("11"));
        assert_eq!(decode(&s).unwrap(), (vec![0u8; 20], 0x00));
    }

    #[test]
    fn corrupted_character_fails_checksum() {
        let good = "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA";
        let bad = good.replace("abA", "abB");
        assert_eq!(decode(&bad).unwrap_err(), AddressError::ChecksumMismatch);
    }

    #[test]
    fn invalid_alphabet_rejected() {
        // '0', 'O', 'I' and 'l' are not in the Base58 alphabet.
        let err = decode("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWe0bA").unwrap_err();
        assert!(matches!(err, AddressError::InvalidEncoding(_)));
    }

    #[test]
    fn too_short_rejected() {
        let err = decode("1111").unwrap_err();
        assert!(matches!(err, AddressError::InvalidEncoding(_)));
    }
}
