//! # JSON Object Signing and Encryption (JOSE)
//!
//! The JWK ([RFC7517]), JWS ([RFC7515]), and JWE ([RFC7516]) cryptographic
//! backends: key validation and materialization, signing and verification,
//! key management, and authenticated content encryption, with the
//! algorithm set of [RFC7518].
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517
//! [RFC7518]: https://www.rfc-editor.org/rfc/rfc7518

pub mod jwa;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;

use thiserror::Error;

/// Errors raised by the JOSE backends.
///
/// Cryptographic failures are deliberately opaque: a verification or
/// decryption error carries no diagnostic from the underlying primitive.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A JWK is malformed, incomplete, or unsuitable for the requested
    /// algorithm.
    #[error("invalid JWK: {0}")]
    InvalidJwk(String),

    /// A serialized artifact is not valid compact JOSE or Base64URL.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Signature verification failed.
    #[error("invalid JWS signature")]
    InvalidJws,

    /// Decryption or authentication-tag verification failed.
    #[error("invalid JWE")]
    InvalidJwe,

    /// The named algorithm is not in the registry, or is not available
    /// for the supplied key.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Result type for the JOSE backends.
pub type Result<T, E = Error> = std::result::Result<T, E>;
