//! Core transaction types: hashes, outpoints, legacy transactions, UTXOs.
//!
//! All monetary values are u64 minor units of the chain (satoshis for
//! Bitcoin, litoshis for Litecoin).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::{SEQUENCE_FINAL, TX_VERSION};
use crate::encode::{Reader, varint_len, write_bytes, write_varint};
use crate::error::TransactionError;
use crate::hash::sha256d;

/// A 32-byte hash in internal (wire) byte order.
///
/// `Display` and `FromStr` use the reversed hex form that block explorers
/// and RPC interfaces show for txids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Wrap bytes that are already in internal order.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the reversed (display) hex form.
    pub fn from_display_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s).map_err(|e| TransactionError::InvalidTxid(format!("{s}: {e}")))?;
        let mut arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| TransactionError::InvalidTxid(format!("{} bytes, expected 32", b.len())))?;
        arr.reverse();
        Ok(Self(arr))
    }

    /// Reversed hex form.
    pub fn to_display_hex(&self) -> String {
        let mut rev = self.0;
        rev.reverse();
        hex::encode(rev)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_hex())
    }
}

impl FromStr for Hash256 {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_display_hex(s)
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_display_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_display_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutPoint {
    pub txid: Hash256,
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

/// A transaction input.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Unlocking script. Empty until signed.
    #[serde(with = "hex::serde")]
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    /// Unsigned input spending `previous_output` with a final sequence.
    pub fn unsigned(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            script_sig: Vec::new(),
            sequence: SEQUENCE_FINAL,
        }
    }
}

/// A transaction output.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    #[serde(with = "hex::serde")]
    pub script_pubkey: Vec<u8>,
}

/// A legacy (pre-segwit) transaction.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub lock_time: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: TX_VERSION,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }
}

impl Transaction {
    /// Exact serialized size in bytes.
    pub fn size(&self) -> usize {
        let ins: usize = self
            .inputs
            .iter()
            .map(|i| 36 + varint_len(i.script_sig.len() as u64) + i.script_sig.len() + 4)
            .sum();
        let outs: usize = self
            .outputs
            .iter()
            .map(|o| 8 + varint_len(o.script_pubkey.len() as u64) + o.script_pubkey.len())
            .sum();
        4 + varint_len(self.inputs.len() as u64)
            + ins
            + varint_len(self.outputs.len() as u64)
            + outs
            + 4
    }

    /// Canonical wire encoding.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.size());
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.extend_from_slice(input.previous_output.txid.as_bytes());
            buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            write_bytes(&mut buf, &input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            write_bytes(&mut buf, &output.script_pubkey);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        buf
    }

    /// Decode wire bytes. Trailing data is an error.
    pub fn parse(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader::new(bytes);
        let version = r.read_i32_le()?;

        let input_count = r.read_varint()?;
        // Each input needs at least 41 bytes; bound the allocation by what
        // the buffer can actually hold.
        let mut inputs = Vec::with_capacity(bounded_capacity(input_count, r.remaining(), 41));
        for _ in 0..input_count {
            let txid = Hash256(r.read_array()?);
            let vout = r.read_u32_le()?;
            let script_sig = r.read_bytes()?;
            let sequence = r.read_u32_le()?;
            inputs.push(TxIn {
                previous_output: OutPoint { txid, vout },
                script_sig,
                sequence,
            });
        }

        let output_count = r.read_varint()?;
        let mut outputs = Vec::with_capacity(bounded_capacity(output_count, r.remaining(), 9));
        for _ in 0..output_count {
            let value = r.read_u64_le()?;
            let script_pubkey = r.read_bytes()?;
            outputs.push(TxOut { value, script_pubkey });
        }

        let lock_time = r.read_u32_le()?;
        if !r.is_empty() {
            return Err(TransactionError::Serialization(format!(
                "{} trailing bytes",
                r.remaining()
            )));
        }
        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Decode a hex-encoded raw transaction.
    pub fn from_hex(s: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| TransactionError::Serialization(format!("hex: {e}")))?;
        Self::parse(&bytes)
    }

    /// `SHA256d(serialize(self))`, shown reversed by `Display`.
    pub fn txid(&self) -> Hash256 {
        Hash256(sha256d(&self.serialize()))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }

    /// Sum of all output values, or `ValueOverflow`.
    pub fn total_output_value(&self) -> Result<u64, TransactionError> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or(TransactionError::ValueOverflow)
    }
}

fn bounded_capacity(count: u64, remaining: usize, min_item_size: usize) -> usize {
    (count as usize).min(remaining / min_item_size)
}

/// An unspent output available to the coin selector.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: u64,
    /// Locking script the spending input must satisfy.
    #[serde(with = "hex::serde")]
    pub script_pubkey: Vec<u8>,
}

impl Utxo {
    pub fn new(outpoint: OutPoint, value: u64, script_pubkey: Vec<u8>) -> Self {
        Self {
            outpoint,
            value,
            script_pubkey,
        }
    }

    /// Build from the fields an explorer or node API reports: display-order
    /// txid hex, output index, value, and locking script hex.
    pub fn from_hex_parts(
        txid_hex: &str,
        vout: u32,
        value: u64,
        script_hex: &str,
    ) -> Result<Self, TransactionError> {
        let txid = Hash256::from_display_hex(txid_hex)
            .map_err(|e| TransactionError::MalformedUtxo(e.to_string()))?;
        let script_pubkey = hex::decode(script_hex)
            .map_err(|e| TransactionError::MalformedUtxo(format!("script hex: {e}")))?;
        if script_pubkey.is_empty() {
            return Err(TransactionError::MalformedUtxo(format!(
                "{txid}:{vout} has an empty locking script"
            )));
        }
        Ok(Self::new(OutPoint { txid, vout }, value, script_pubkey))
    }

    /// Build the output this UTXO was created by.
    pub fn to_txout(&self) -> TxOut {
        TxOut {
            value: self.value,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}
