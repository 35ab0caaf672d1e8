//! Canonical CBOR token writer and byte-view parsing helpers.
//!
//! Only an encoder is needed here: the hash builders stream CBOR tokens
//! straight into a BLAKE2b context and never hold a decoded transaction
//! body in memory. Grounded on `cbor.c`'s `cbor_writeToken` and
//! `cbor_mapKeyFulfillsCanonicalOrdering`.

use crate::error::SigningError;

const VALUE_W1_UPPER_THRESHOLD: u64 = 24;
const VALUE_W2_UPPER_THRESHOLD: u64 = 1 << 8;
const VALUE_W4_UPPER_THRESHOLD: u64 = 1 << 16;
const VALUE_W8_UPPER_THRESHOLD: u64 = 1 << 32;

/// The CBOR major type, encoded in the top three bits of the initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CborType {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Null,
    ArrayIndef,
    IndefEnd,
}

impl CborType {
    const fn major(self) -> u8 {
        match self {
            CborType::Unsigned => 0x00,
            CborType::Negative => 0x20,
            CborType::Bytes => 0x40,
            CborType::Text => 0x60,
            CborType::Array => 0x80,
            CborType::Map => 0xA0,
            CborType::Tag => 0xC0,
            CborType::Null => 0xF6,
            CborType::ArrayIndef => 0x9F,
            CborType::IndefEnd => 0xFF,
        }
    }
}

/// Emits the shortest canonical CBOR encoding of `(type, value)` into a
/// `Vec<u8>`. Mirrors `cbor_writeToken`.
pub fn write_token(ty: CborType, value: u64) -> Result<Vec<u8>, SigningError> {
    match ty {
        CborType::ArrayIndef | CborType::IndefEnd | CborType::Null => {
            return Ok(vec![ty.major()]);
        }
        _ => {}
    }

    let major = ty.major();
    let mut out = Vec::with_capacity(9);

    if value < VALUE_W1_UPPER_THRESHOLD {
        out.push(major | value as u8);
    } else if value < VALUE_W2_UPPER_THRESHOLD {
        out.push(major | 24);
        out.push(value as u8);
    } else if value < VALUE_W4_UPPER_THRESHOLD {
        out.push(major | 25);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value < VALUE_W8_UPPER_THRESHOLD {
        out.push(major | 26);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(major | 27);
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}

/// Encodes a negative integer `n < 0` as CBOR major type 1, where the wire
/// value is `-(n+1)`.
pub fn write_negative(n: i64) -> Result<Vec<u8>, SigningError> {
    if n >= 0 {
        return Err(SigningError::InvalidData("write_negative requires n < 0"));
    }
    let value = (-(n + 1)) as u64;
    write_token(CborType::Negative, value)
}

/// Length-then-lexicographic comparison used to validate that CBOR map keys
/// are appended in canonical order. Mirrors
/// `cbor_mapKeyFulfillsCanonicalOrdering`; equal keys are rejected (returns
/// `false`, matching the "key duplication is an error" source comment).
pub fn map_key_fulfills_canonical_ordering(previous: &[u8], next: &[u8]) -> bool {
    if previous.len() != next.len() {
        return previous.len() < next.len();
    }
    for (p, n) in previous.iter().zip(next.iter()) {
        if p != n {
            return p < n;
        }
    }
    false
}

/// A borrowing cursor over a byte slice, raising `INVALID_DATA` on
/// underflow. Mirrors the device's `bufView` helpers.
pub struct ByteView<'b> {
    buf: &'b [u8],
    pos: usize,
}

impl<'b> ByteView<'b> {
    pub fn new(buf: &'b [u8]) -> Self {
        ByteView { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn ensure(&self, n: usize) -> Result<(), SigningError> {
        if self.remaining() < n {
            Err(SigningError::InvalidData("buffer underflow"))
        } else {
            Ok(())
        }
    }

    pub fn parse_u1be(&mut self) -> Result<u8, SigningError> {
        self.ensure(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn parse_u2be(&mut self) -> Result<u16, SigningError> {
        self.ensure(2)?;
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn parse_u4be(&mut self) -> Result<u32, SigningError> {
        self.ensure(4)?;
        let bytes: [u8; 4] = self.buf[self.pos..self.pos + 4].try_into().unwrap();
        self.pos += 4;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn parse_u8be(&mut self) -> Result<u64, SigningError> {
        self.ensure(8)?;
        let bytes: [u8; 8] = self.buf[self.pos..self.pos + 8].try_into().unwrap();
        self.pos += 8;
        Ok(u64::from_be_bytes(bytes))
    }

    pub fn parse_buffer(&mut self, len: usize) -> Result<&'b [u8], SigningError> {
        self.ensure(len)?;
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip_bytes(&mut self, len: usize) -> Result<(), SigningError> {
        self.ensure(len)?;
        self.pos += len;
        Ok(())
    }

    /// Borrows everything not yet consumed, without advancing the cursor.
    pub fn peek_remaining(&self) -> &'b [u8] {
        &self.buf[self.pos..]
    }
}
