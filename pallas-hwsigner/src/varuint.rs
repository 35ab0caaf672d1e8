//! Variable-length unsigned integer encoding used by pointer addresses.
//!
//! 7-bit groups, most-significant bit set on every byte but the last.
//! Grounded on `pallas-addresses`' `varuint` module, reused here because
//! the signing engine needs to both emit and recover these values when
//! deriving and re-displaying pointer addresses.

use crate::error::SigningError;

/// Reads a variable-length uint from `buf`, returning the decoded value and
/// the number of bytes consumed.
pub fn read(buf: &[u8]) -> Result<(u64, usize), SigningError> {
    let mut result: u64 = 0;
    let mut consumed = 0;

    loop {
        let byte = *buf
            .get(consumed)
            .ok_or(SigningError::InvalidData("varuint: unexpected eof"))?;
        consumed += 1;

        let continuation = byte & 0x80 != 0;
        let payload = (byte & 0x7F) as u64;

        result = match result.checked_shl(7) {
            Some(shifted) => shifted | payload,
            None => u64::MAX,
        };

        if !continuation {
            break;
        }
    }

    Ok((result, consumed))
}

/// Writes `num` as a variable-length uint, MSB-continuation-bit on all but
/// the last byte.
pub fn write(mut num: u64) -> Vec<u8> {
    let mut groups = vec![(num & 0x7F) as u8];
    num >>= 7;
    while num > 0 {
        groups.push((num & 0x7F) as u8);
        num >>= 7;
    }
    groups.reverse();

    let last = groups.len() - 1;
    for (i, byte) in groups.iter_mut().enumerate() {
        if i != last {
            *byte |= 0x80;
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_value_is_one_byte() {
        assert_eq!(write(5), vec![5]);
        let (v, n) = read(&[5]).unwrap();
        assert_eq!(v, 5);
        assert_eq!(n, 1);
    }

    #[test]
    fn multi_byte_round_trips() {
        for v in [127u64, 128, 16384, 1 << 35] {
            let encoded = write(v);
            let (decoded, consumed) = read(&encoded).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[quickcheck_macros::quickcheck]
    fn round_trip_is_shortest(v: u64) -> bool {
        let v = v >> 1; // keep within [0, 2^63)
        let encoded = write(v);
        let (decoded, consumed) = read(&encoded).unwrap();
        decoded == v && consumed == encoded.len()
    }
}
