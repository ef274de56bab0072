//! # DER Codec
//!
//! The Distinguished Encoding Rules are BER with every freedom removed:
//! minimal length octets, primitive-only BIT STRING and OCTET STRING,
//! BOOLEAN content restricted to `0x00`/`0xFF`, and minimal two's
//! complement INTEGERs.
//!
//! The DER decoder is composed over the BER decoder rather than copied
//! from it: it owns a BER decoder constructed in strict mode and delegates
//! all cursor work.

use crate::asn1::schema::{Record, Schema};
use crate::asn1::{Result, ber};

/// Streaming DER decoder.
#[derive(Debug)]
pub struct Decoder<'a> {
    inner: ber::Decoder<'a>,
}

impl<'a> Decoder<'a> {
    /// A decoder over the buffer, applying DER rules.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { inner: ber::Decoder::strict(data) }
    }

    /// Octets left to consume.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    /// Decode a record described by `schema`.
    ///
    /// # Errors
    ///
    /// All BER errors, plus `UnsupportedConstructed` for constructed
    /// strings, `MalformedLength` for non-minimal lengths, and
    /// `InvalidValue` for non-canonical BOOLEAN or INTEGER content.
    pub fn decode(&mut self, schema: &Schema) -> Result<Record> {
        self.inner.decode(schema)
    }
}

/// Encode a record against its schema.
///
/// The BER encoder already emits canonical forms, so DER encoding
/// delegates to it.
///
/// # Errors
///
/// See [`ber::encode`].
pub fn encode(schema: &Schema, record: &Record) -> Result<Vec<u8>> {
    ber::encode(schema, record)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asn1::Error;
    use crate::asn1::schema::{Field, FieldType, Schema};

    #[test]
    fn rejects_constructed_octet_string() {
        let schema = Schema::sequence(vec![Field::new("data", FieldType::OctetString)]);
        // constructed OCTET STRING (0x24) containing one primitive segment
        let bytes = [0x30, 0x05, 0x24, 0x03, 0x04, 0x01, 0xaa];

        assert!(ber::Decoder::new(&bytes).decode(&schema).is_err());
        let err = Decoder::new(&bytes).decode(&schema).unwrap_err();
        assert_eq!(err, Error::UnsupportedConstructed("OCTET STRING"));
    }

    #[test]
    fn rejects_non_minimal_length() {
        let schema = Schema::sequence(vec![Field::new("n", FieldType::Integer)]);
        // long-form length for a short value
        let bytes = [0x30, 0x04, 0x02, 0x81, 0x01, 0x05];

        // BER round-trips encodings from peers that always use long form
        let lax = ber::Decoder::new(&bytes).decode(&schema).unwrap();
        assert!(lax.value("n").is_some());

        let err = Decoder::new(&bytes).decode(&schema).unwrap_err();
        assert_eq!(err, Error::MalformedLength("non-minimal length".to_string()));
    }

    #[test]
    fn rejects_non_canonical_boolean() {
        let schema = Schema::sequence(vec![Field::new("flag", FieldType::Boolean)]);
        let bytes = [0x30, 0x03, 0x01, 0x01, 0x01];

        let lax = ber::Decoder::new(&bytes).decode(&schema).unwrap();
        assert_eq!(lax.value("flag"), Some(&crate::asn1::node::Value::Boolean(true)));

        assert!(Decoder::new(&bytes).decode(&schema).is_err());
    }

    #[test]
    fn rejects_padded_integer() {
        let schema = Schema::sequence(vec![Field::new("n", FieldType::Integer)]);
        // 0x00 0x05: unnecessary pad octet
        let bytes = [0x30, 0x04, 0x02, 0x02, 0x00, 0x05];

        assert!(ber::Decoder::new(&bytes).decode(&schema).is_ok());
        assert!(Decoder::new(&bytes).decode(&schema).is_err());
    }
}
