//! Bitcoin-style wire primitives: little-endian integers and CompactSize
//! variable-length integers.

use crate::error::TransactionError;

/// Append a CompactSize integer.
pub fn write_varint(buf: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => buf.push(n as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

/// Encoded length of a CompactSize integer.
pub fn varint_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Append a length-prefixed byte string.
pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Forward-only cursor over a byte slice.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], TransactionError> {
        if len > self.remaining() {
            return Err(TransactionError::Serialization(format!(
                "unexpected end of data: need {len} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TransactionError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, TransactionError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32, TransactionError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, TransactionError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, TransactionError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Read a CompactSize integer, rejecting non-minimal encodings.
    pub fn read_varint(&mut self) -> Result<u64, TransactionError> {
        let (value, min) = match self.read_u8()? {
            0xfd => (u16::from_le_bytes(self.read_array()?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.read_array()?) as u64, 0x1_0000),
            0xff => (u64::from_le_bytes(self.read_array()?), 0x1_0000_0000),
            b => return Ok(b as u64),
        };
        if value < min {
            return Err(TransactionError::Serialization(format!(
                "non-canonical varint {value}"
            )));
        }
        Ok(value)
    }

    /// Read a CompactSize length followed by that many bytes.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, TransactionError> {
        let len = self.read_varint()?;
        if len > self.remaining() as u64 {
            return Err(TransactionError::Serialization(format!(
                "length prefix {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        Ok(self.read_slice(len as usize)?.to_vec())
    }
}
