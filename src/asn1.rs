//! # ASN.1 BER/DER Codec
//!
//! A tag/length/value engine for the subset of ITU-T X.690 needed to move
//! cryptographic key material between its binary encodings (PKCS#1, PKCS#8,
//! SEC1, X.509 `SubjectPublicKeyInfo`) and in-memory records.
//!
//! The codec is schema-driven: a record type owns an immutable [`Schema`]
//! describing how its fields map to ASN.1 elements, and the BER/DER
//! decoders and encoders walk that schema. Only definite-length encodings
//! are supported.
//!
//! [`Schema`]: schema::Schema

pub mod ber;
pub mod der;
pub mod keys;
pub mod length;
pub mod node;
pub mod pem;
pub mod schema;

use thiserror::Error;

/// Errors raised while encoding or decoding ASN.1 structures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A length octet sequence is truncated, oversized, or claims more
    /// content than the buffer holds.
    #[error("malformed length: {0}")]
    MalformedLength(String),

    /// The tag read from the buffer does not match the tag the schema
    /// expects at this position.
    #[error("unexpected tag: expected {expected:#04x}, got {got:#04x}")]
    UnexpectedTag {
        /// Tag the schema called for.
        expected: u8,
        /// Tag found in the buffer.
        got: u8,
    },

    /// A context-specific or private tag was encountered but the schema
    /// element carries neither explicit nor implicit tagging metadata.
    #[error("tagged value without explicit/implicit metadata")]
    TaggedWithoutMetadata,

    /// Content octets violate the value rules for their universal type.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// DER forbids a constructed encoding for this type.
    #[error("constructed encoding not permitted for {0}")]
    UnsupportedConstructed(&'static str),
}

/// Result type for ASN.1 encoding and decoding.
pub type Result<T, E = Error> = std::result::Result<T, E>;
