//! # BER Length Octets
//!
//! Definite-length encoding per X.690 §8.1.3: lengths below 128 fit in a
//! single octet (short form); anything larger is `0x80 | N` followed by the
//! length in N big-endian octets, N ≤ 126. Indefinite lengths (0x80) are
//! not supported.

use crate::asn1::{Error, Result};

/// Encode a length.
///
/// `long_form` forces the long form even for lengths below 128, which is
/// needed to round-trip encodings produced by peers that never use the
/// short form.
#[must_use]
pub fn encode(len: usize, long_form: bool) -> Vec<u8> {
    if len < 0x80 && !long_form {
        return vec![len as u8];
    }

    let be = len.to_be_bytes();
    let skip = be.iter().take_while(|&&b| b == 0).count();
    // a zero length still takes one content octet in long form
    let octets = &be[skip.min(be.len() - 1)..];

    let mut out = Vec::with_capacity(1 + octets.len());
    out.push(0x80 | octets.len() as u8);
    out.extend_from_slice(octets);
    out
}

/// Decode length octets, returning the length and the number of octets
/// consumed.
///
/// # Errors
///
/// `MalformedLength` when the buffer is empty, the long form claims more
/// than 126 length octets, the octets are truncated, or the length does
/// not fit the platform's `usize`.
pub fn decode(data: &[u8]) -> Result<(usize, usize)> {
    let Some(&first) = data.first() else {
        return Err(Error::MalformedLength("empty buffer".to_string()));
    };

    if first < 0x80 {
        return Ok((usize::from(first), 1));
    }

    let count = usize::from(first & 0x7f);
    if count == 0 {
        return Err(Error::MalformedLength("indefinite length".to_string()));
    }
    if count > 126 {
        return Err(Error::MalformedLength(format!("{count} length octets")));
    }
    if data.len() < 1 + count {
        return Err(Error::MalformedLength("truncated length octets".to_string()));
    }
    if count > size_of::<usize>() {
        return Err(Error::MalformedLength("length exceeds platform size".to_string()));
    }

    let mut len = 0usize;
    for &b in &data[1..=count] {
        len = (len << 8) | usize::from(b);
    }

    Ok((len, 1 + count))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn short_form_boundary() {
        assert_eq!(encode(0, false), vec![0x00]);
        assert_eq!(encode(127, false), vec![0x7f]);
        assert_eq!(encode(128, false), vec![0x81, 0x80]);
    }

    #[test]
    fn forced_long_form() {
        assert_eq!(encode(0, true), vec![0x81, 0x00]);
        assert_eq!(encode(5, true), vec![0x81, 0x05]);
        assert!(encode(127, true).len() >= 2);
    }

    #[test]
    fn multi_octet() {
        assert_eq!(encode(0x01f9, false), vec![0x82, 0x01, 0xf9]);
        assert_eq!(decode(&[0x82, 0x01, 0xf9]).unwrap(), (0x01f9, 3));
    }

    #[test]
    fn round_trip() {
        for len in [0, 1, 127, 128, 255, 256, 65_535, 65_536, 1 << 24] {
            let encoded = encode(len, false);
            assert_eq!(decode(&encoded).unwrap(), (len, encoded.len()));

            let forced = encode(len, true);
            assert_eq!(decode(&forced).unwrap(), (len, forced.len()));
        }
    }

    #[test]
    fn malformed() {
        assert!(decode(&[]).is_err());
        // indefinite form
        assert!(decode(&[0x80]).is_err());
        // truncated long form
        assert!(decode(&[0x82, 0x01]).is_err());
        // more than 126 length octets
        assert!(decode(&[0xff, 0x00]).is_err());
    }
}
