//! Legacy script templates: P2PKH and P2SH locking scripts and the P2PKH
//! unlocking script.

use crate::constants::HASH160_LEN;
use crate::error::ScriptError;

pub const OP_DUP: u8 = 0x76;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_PUSHDATA1: u8 = 0x4c;

/// Length of a P2PKH locking script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(pubkey_hash: &[u8; HASH160_LEN]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, HASH160_LEN as u8]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// `OP_HASH160 <20> OP_EQUAL`
pub fn p2sh_script(script_hash: &[u8; HASH160_LEN]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, HASH160_LEN as u8]);
    script.extend_from_slice(script_hash);
    script.push(OP_EQUAL);
    script
}

pub fn is_p2pkh(script: &[u8]) -> bool {
    script.len() == P2PKH_SCRIPT_LEN
        && script[..3] == [OP_DUP, OP_HASH160, HASH160_LEN as u8]
        && script[23..] == [OP_EQUALVERIFY, OP_CHECKSIG]
}

/// Extract the 20-byte pubkey hash from a P2PKH locking script.
pub fn p2pkh_hash(script: &[u8]) -> Result<[u8; HASH160_LEN], ScriptError> {
    if !is_p2pkh(script) {
        return Err(ScriptError::NotP2pkh);
    }
    let mut hash = [0u8; HASH160_LEN];
    hash.copy_from_slice(&script[3..23]);
    Ok(hash)
}

/// Append a minimal data push.
pub fn push_data(script: &mut Vec<u8>, data: &[u8]) -> Result<(), ScriptError> {
    match data.len() {
        n if n < OP_PUSHDATA1 as usize => script.push(n as u8),
        n if n <= u8::MAX as usize => script.extend_from_slice(&[OP_PUSHDATA1, n as u8]),
        n => return Err(ScriptError::PushTooLarge(n)),
    }
    script.extend_from_slice(data);
    Ok(())
}

/// `<signature || sighash_type> <compressed pubkey>`
pub fn p2pkh_script_sig(signature: &[u8], pubkey: &[u8]) -> Result<Vec<u8>, ScriptError> {
    let mut script = Vec::with_capacity(signature.len() + pubkey.len() + 2);
    push_data(&mut script, signature)?;
    push_data(&mut script, pubkey)?;
    Ok(script)
}

/// Split a P2PKH scriptSig into `(signature || sighash_type, pubkey)`.
pub fn parse_p2pkh_script_sig(script: &[u8]) -> Result<(Vec<u8>, Vec<u8>), ScriptError> {
    let mut pos = 0;
    let signature = read_push(script, &mut pos)?;
    let pubkey = read_push(script, &mut pos)?;
    if pos != script.len() {
        return Err(ScriptError::NotP2pkh);
    }
    Ok((signature, pubkey))
}

fn read_push(script: &[u8], pos: &mut usize) -> Result<Vec<u8>, ScriptError> {
    let op = *script.get(*pos).ok_or(ScriptError::Truncated)?;
    *pos += 1;
    let len = match op {
        0x01..=0x4b => op as usize,
        OP_PUSHDATA1 => {
            let len = *script.get(*pos).ok_or(ScriptError::Truncated)?;
            *pos += 1;
            len as usize
        }
        _ => return Err(ScriptError::NotP2pkh),
    };
    let data = script.get(*pos..*pos + len).ok_or(ScriptError::Truncated)?;
    *pos += len;
    Ok(data.to_vec())
}
