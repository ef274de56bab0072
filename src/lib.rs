//! Building blocks for cryptographic identity services: an ASN.1 BER/DER
//! codec driven by declarative schemas, the JOSE ([JWK], [JWS], [JWE])
//! algorithm backends, and the OAuth 2.0 ([RFC6749]) grant and
//! response-type core.
//!
//! # Design
//!
//! The library is deliberately transport-free. Parsing, validation,
//! cryptography, and token lifecycle logic live here; HTTP routing,
//! persistence, and client authentication are supplied by the caller
//! through the narrow provider traits in [`oauth::provider`].
//!
//! The three layers build on each other: keys imported from PEM/DER pass
//! through the [`asn1`] codec on their way to a [`jose::jwk::Jwk`], and
//! tokens issued by the [`oauth`] core may be carried as JWS or JWE
//! artifacts.
//!
//! [JWK]: https://www.rfc-editor.org/rfc/rfc7517
//! [JWS]: https://www.rfc-editor.org/rfc/rfc7515
//! [JWE]: https://www.rfc-editor.org/rfc/rfc7516
//! [RFC6749]: https://www.rfc-editor.org/rfc/rfc6749

pub mod asn1;
pub mod core;
pub mod jose;
pub mod oauth;
