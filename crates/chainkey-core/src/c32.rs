//! Stacks c32check address encoding.
//!
//! An address is `'S'`, one c32 digit holding the version (0..32), then the
//! c32 encoding of `payload || checksum`, where the checksum is the first
//! four bytes of `sha256d(version || payload)`.
//!
//! c32 treats its input as a big-endian integer written in base 32 with the
//! Crockford-style alphabet below; every leading zero byte of the input is
//! written as one leading `'0'` digit so that the byte length survives the
//! round trip.

use crate::error::AddressError;
use crate::hash::checksum4;

/// c32 alphabet (Crockford base32 without `I`, `L`, `O`, `U`).
pub const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Leading character of every Stacks address.
pub const ADDRESS_PREFIX: char = 'S';

/// Encode raw bytes as c32.
pub fn c32_encode(data: &[u8]) -> String {
    // Emit 5-bit digits starting from the least significant end.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in data.iter().rev() {
        acc |= (byte as u32) << bits;
        bits += 8;
        while bits >= 5 {
            digits.push((acc & 0x1f) as u8);
            acc >>= 5;
            bits -= 5;
        }
    }
    if bits > 0 {
        digits.push((acc & 0x1f) as u8);
    }

    // Strip leading (most significant) zero digits, then restore one '0'
    // per leading zero byte.
    while digits.last() == Some(&0) {
        digits.pop();
    }
    let leading_zero_bytes = data.iter().take_while(|&&b| b == 0).count();
    digits.extend(std::iter::repeat_n(0u8, leading_zero_bytes));

    digits
        .iter()
        .rev()
        .map(|&d| C32_ALPHABET[d as usize] as char)
        .collect()
}

/// Decode a c32 string into raw bytes.
///
/// Input is normalized first: case-insensitive, `O` reads as `0`, `I` and
/// `L` read as `1`.
pub fn c32_decode(s: &str) -> Result<Vec<u8>, AddressError> {
    let digits = s
        .chars()
        .map(c32_digit)
        .collect::<Result<Vec<u8>, AddressError>>()?;

    let leading_zero_digits = digits.iter().take_while(|&&d| d == 0).count();

    // Accumulate 5-bit digits into bytes, least significant first.
    let mut bytes: Vec<u8> = Vec::with_capacity(digits.len() * 5 / 8 + 1);
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    for &d in digits.iter().rev() {
        acc |= (d as u32) << bits;
        bits += 5;
        if bits >= 8 {
            bytes.push((acc & 0xff) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        bytes.push((acc & 0xff) as u8);
    }

    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes.extend(std::iter::repeat_n(0u8, leading_zero_digits));
    bytes.reverse();
    Ok(bytes)
}

/// c32check: version digit followed by `c32(payload || checksum)`.
pub fn c32check_encode(payload: &[u8], version: u8) -> Result<String, AddressError> {
    if version >= 32 {
        return Err(AddressError::UnknownVersionByte(version));
    }
    Ok(c32check_encode_digit(payload, version))
}

/// [`c32check_encode`] for a version already known to be a c32 digit.
pub(crate) fn c32check_encode_digit(payload: &[u8], version: u8) -> String {
    let version = version & 0x1f;
    let mut versioned = Vec::with_capacity(1 + payload.len());
    versioned.push(version);
    versioned.extend_from_slice(payload);

    let mut body = Vec::with_capacity(payload.len() + 4);
    body.extend_from_slice(payload);
    body.extend_from_slice(&checksum4(&versioned));

    let mut out = String::with_capacity(2 + body.len() * 8 / 5);
    out.push(C32_ALPHABET[version as usize] as char);
    out.push_str(&c32_encode(&body));
    out
}

/// Inverse of [`c32check_encode`], returning `(payload, version)`.
pub fn c32check_decode(s: &str) -> Result<(Vec<u8>, u8), AddressError> {
    let mut chars = s.chars();
    let version_char = chars
        .next()
        .ok_or_else(|| AddressError::InvalidEncoding("empty c32check string".into()))?;
    let version = c32_digit(version_char)?;

    let mut body = c32_decode(chars.as_str())?;
    if body.len() < 4 {
        return Err(AddressError::InvalidEncoding(format!(
            "c32check body of {} bytes is too short",
            body.len()
        )));
    }
    let checksum_start = body.len() - 4;
    let mut versioned = Vec::with_capacity(1 + checksum_start);
    versioned.push(version);
    versioned.extend_from_slice(&body[..checksum_start]);
    if checksum4(&versioned) != body[checksum_start..] {
        return Err(AddressError::ChecksumMismatch);
    }
    body.truncate(checksum_start);
    Ok((body, version))
}

/// Encode a Stacks address: `'S' || c32check(version, payload)`.
pub fn encode_address(payload: &[u8], version: u8) -> Result<String, AddressError> {
    let mut out = String::with_capacity(41);
    out.push(ADDRESS_PREFIX);
    out.push_str(&c32check_encode(payload, version)?);
    Ok(out)
}

/// Decode a Stacks address into `(payload, version)`.
pub fn decode_address(s: &str) -> Result<(Vec<u8>, u8), AddressError> {
    let rest = s
        .strip_prefix(ADDRESS_PREFIX)
        .or_else(|| s.strip_prefix('s'))
        .ok_or_else(|| AddressError::InvalidEncoding("stacks address must start with 'S'".into()))?;
    if rest.len() < 5 {
        return Err(AddressError::InvalidEncoding("stacks address too short".into()));
    }
    c32check_decode(rest)
}

fn c32_digit(c: char) -> Result<u8, AddressError> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'I' | 'L' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|&a| a as char == normalized)
        .map(|p| p as u8)
        .ok_or(AddressError::InvalidCharacter(c))
}
