//! # Key Structure Schemas
//!
//! Declarative schemas for the ASN.1 structures cryptographic keys travel
//! in: PKCS#1 RSA keys, SEC1 EC keys, PKCS#8 `PrivateKeyInfo`, and X.509
//! `SubjectPublicKeyInfo`. The JWK layer drives these to import and
//! export PEM/DER key material.

use crate::asn1::node::{Oid, Value};
use crate::asn1::schema::{Field, FieldType, Schema};
use crate::asn1::{Error, Result};

/// `rsaEncryption` (PKCS#1).
#[must_use]
pub fn rsa_encryption() -> Oid {
    Oid::new(vec![1, 2, 840, 113_549, 1, 1, 1]).expect("arcs are valid")
}

/// `id-ecPublicKey` (SEC1 / RFC 5480).
#[must_use]
pub fn id_ec_public_key() -> Oid {
    Oid::new(vec![1, 2, 840, 10_045, 2, 1]).expect("arcs are valid")
}

/// `id-Ed25519` (RFC 8410).
#[must_use]
pub fn id_ed25519() -> Oid {
    Oid::new(vec![1, 3, 101, 112]).expect("arcs are valid")
}

/// `id-X25519` (RFC 8410).
#[must_use]
pub fn id_x25519() -> Oid {
    Oid::new(vec![1, 3, 101, 110]).expect("arcs are valid")
}

/// The named curves the toolkit supports, with their parameter OIDs and
/// scalar/coordinate widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedCurve {
    /// prime256v1 / secp256r1.
    P256,
    /// secp384r1.
    P384,
    /// secp521r1.
    P521,
}

impl NamedCurve {
    /// The curve's parameter OID.
    #[must_use]
    pub fn oid(self) -> Oid {
        let arcs: Vec<u64> = match self {
            Self::P256 => vec![1, 2, 840, 10_045, 3, 1, 7],
            Self::P384 => vec![1, 3, 132, 0, 34],
            Self::P521 => vec![1, 3, 132, 0, 35],
        };
        Oid::new(arcs).expect("arcs are valid")
    }

    /// Look a curve up by its parameter OID.
    #[must_use]
    pub fn from_oid(oid: &Oid) -> Option<Self> {
        [Self::P256, Self::P384, Self::P521].into_iter().find(|curve| &curve.oid() == oid)
    }

    /// Width in octets of a scalar or affine coordinate.
    #[must_use]
    pub const fn scalar_width(self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// PKCS#1 `RSAPrivateKey`: version plus the eight key integers.
#[must_use]
pub fn rsa_private_key() -> Schema {
    Schema::sequence(vec![
        Field::new("version", FieldType::Integer),
        Field::new("n", FieldType::Integer),
        Field::new("e", FieldType::Integer),
        Field::new("d", FieldType::Integer),
        Field::new("p", FieldType::Integer),
        Field::new("q", FieldType::Integer),
        Field::new("dp", FieldType::Integer),
        Field::new("dq", FieldType::Integer),
        Field::new("qi", FieldType::Integer),
    ])
}

/// PKCS#1 `RSAPublicKey`.
#[must_use]
pub fn rsa_public_key() -> Schema {
    Schema::sequence(vec![
        Field::new("n", FieldType::Integer),
        Field::new("e", FieldType::Integer),
    ])
}

/// `AlgorithmIdentifier` fields: the algorithm OID and its parameters.
///
/// Parameters are a CHOICE in X.509; the two shapes the key schemas meet
/// are NULL (RSA) and a curve OID (EC). Both are optional elements so a
/// parameterless identifier (Ed25519, X25519) also decodes.
fn algorithm_identifier() -> Schema {
    Schema::nested(vec![
        Field::new("oid", FieldType::ObjectIdentifier),
        Field::new("null_params", FieldType::Null).optional(),
        Field::new("curve", FieldType::ObjectIdentifier).optional(),
    ])
}

/// X.509 `SubjectPublicKeyInfo`.
///
/// The `subject_public_key` BIT STRING content is algorithm-specific (DER
/// `RSAPublicKey`, an uncompressed EC point, or a raw OKP key), so it is
/// left opaque here and interpreted by the caller.
#[must_use]
pub fn subject_public_key_info() -> Schema {
    Schema::sequence(vec![
        Field::new("algorithm", FieldType::Sequence).model(algorithm_identifier()),
        Field::new("subject_public_key", FieldType::BitString),
    ])
}

/// PKCS#8 `PrivateKeyInfo`.
///
/// `private_key` carries algorithm-specific DER (PKCS#1 `RSAPrivateKey`,
/// SEC1 `ECPrivateKey`, or an OCTET STRING-wrapped OKP seed) and is left
/// opaque for the caller to interpret against the algorithm identifier.
#[must_use]
pub fn private_key_info() -> Schema {
    Schema::sequence(vec![
        Field::new("version", FieldType::Integer),
        Field::new("algorithm", FieldType::Sequence).model(algorithm_identifier()),
        Field::new("private_key", FieldType::OctetString),
    ])
}

/// SEC1 `ECPrivateKey` with the scalar left as it appears on the wire.
///
/// Used on the first pass over a bare `EC PRIVATE KEY` document, where
/// the curve is not yet known; re-decode with [`ec_private_key_for`] once
/// the `[0]` parameters arc has named it.
#[must_use]
pub fn ec_private_key() -> Schema {
    Schema::sequence(vec![
        Field::new("version", FieldType::Integer),
        Field::new("private_key", FieldType::OctetString),
        Field::new("curve", FieldType::ObjectIdentifier).explicit(0).optional(),
        Field::new("public_key", FieldType::BitString).explicit(1).optional(),
    ])
}

/// SEC1 `ECPrivateKey` for a known curve: the scalar is left-padded to
/// the curve width on decode and stripped of leading zero octets on
/// encode, through the declared transformers.
#[must_use]
pub fn ec_private_key_for(curve: NamedCurve) -> Schema {
    let pad: fn(Value) -> Result<Value> = match curve {
        NamedCurve::P256 => pad_to_32,
        NamedCurve::P384 => pad_to_48,
        NamedCurve::P521 => pad_to_66,
    };
    Schema::sequence(vec![
        Field::new("version", FieldType::Integer),
        Field::new("private_key", FieldType::OctetString)
            .decode_with(pad)
            .encode_with(strip_leading_zeros),
        Field::new("curve", FieldType::ObjectIdentifier).explicit(0).optional(),
        Field::new("public_key", FieldType::BitString).explicit(1).optional(),
    ])
}

/// Left-pad octets with zero bytes to the requested width.
///
/// # Errors
///
/// `InvalidValue` when the value is not an octet string or exceeds the
/// width.
pub fn left_pad(value: Value, width: usize) -> Result<Value> {
    let Value::OctetString(bytes) = value else {
        return Err(Error::InvalidValue("expected octets".to_string()));
    };
    if bytes.len() > width {
        return Err(Error::InvalidValue(format!(
            "{} octets exceed width {width}",
            bytes.len()
        )));
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    Ok(Value::OctetString(padded))
}

fn pad_to_32(value: Value) -> Result<Value> {
    left_pad(value, 32)
}

fn pad_to_48(value: Value) -> Result<Value> {
    left_pad(value, 48)
}

fn pad_to_66(value: Value) -> Result<Value> {
    left_pad(value, 66)
}

/// Strip leading zero octets, keeping at least one octet.
///
/// # Errors
///
/// `InvalidValue` when the value is not an octet string.
pub fn strip_leading_zeros(value: Value) -> Result<Value> {
    let Value::OctetString(bytes) = value else {
        return Err(Error::InvalidValue("expected octets".to_string()));
    };
    let at = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    Ok(Value::OctetString(bytes[at..].to_vec()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asn1::node::{BitString, Integer};
    use crate::asn1::schema::{Item, Record};
    use crate::asn1::{ber, der};

    #[test]
    fn rsa_private_round_trip() {
        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(0)));
        for (name, v) in
            [("n", 3233), ("e", 17), ("d", 413), ("p", 61), ("q", 53), ("dp", 53), ("dq", 49), ("qi", 38)]
        {
            record.set_value(name, Value::Integer(Integer::from_i64(v)));
        }

        let bytes = der::encode(&rsa_private_key(), &record).unwrap();
        let decoded = der::Decoder::new(&bytes).decode(&rsa_private_key()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn ed25519_spki_layout() {
        let mut algorithm = Record::new();
        algorithm.set_value("oid", Value::ObjectIdentifier(id_ed25519()));
        let mut record = Record::new();
        record.set("algorithm", Item::Record(algorithm));
        record.set_value("subject_public_key", Value::BitString(BitString::new(vec![0x11; 32])));

        let bytes = der::encode(&subject_public_key_info(), &record).unwrap();
        // 30 2a 30 05 06 03 2b 65 70 03 21 00 || key
        assert_eq!(
            &bytes[..12],
            &[0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00]
        );

        let decoded = ber::Decoder::new(&bytes).decode(&subject_public_key_info()).unwrap();
        let algorithm = decoded.record("algorithm").unwrap();
        assert_eq!(
            algorithm.value("oid").unwrap(),
            &Value::ObjectIdentifier(id_ed25519())
        );
        assert_eq!(algorithm.get("null_params").unwrap(), &Item::Absent);
        assert_eq!(decoded.bytes("subject_public_key").unwrap(), &[0x11; 32]);
    }

    #[test]
    fn sec1_scalar_padding() {
        // a scalar with leading zero octets stripped on the wire
        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(1)));
        record.set_value("private_key", Value::OctetString(vec![0x5a; 31]));
        record.set_value("curve", Value::ObjectIdentifier(NamedCurve::P256.oid()));
        record.set("public_key", Item::Absent);

        let bytes = der::encode(&ec_private_key(), &record).unwrap();
        let decoded = der::Decoder::new(&bytes).decode(&ec_private_key_for(NamedCurve::P256)).unwrap();

        let scalar = decoded.bytes("private_key").unwrap();
        assert_eq!(scalar.len(), 32);
        assert_eq!(scalar[0], 0x00);
        assert_eq!(&scalar[1..], &[0x5a; 31]);

        // the padded record re-encodes to the stripped wire form
        assert_eq!(der::encode(&ec_private_key_for(NamedCurve::P256), &decoded).unwrap(), bytes);
    }

    #[test]
    fn curve_lookup() {
        assert_eq!(NamedCurve::from_oid(&NamedCurve::P384.oid()), Some(NamedCurve::P384));
        assert_eq!(NamedCurve::from_oid(&id_ed25519()), None);
        assert_eq!(NamedCurve::P521.scalar_width(), 66);
    }
}
