//! # JSON Web Token
//!
//! A minimal claims view over the compact JWS serialization, for carrying
//! issued tokens as signed artifacts. Claims follow [RFC7519]; timestamps
//! are UNIX seconds.
//!
//! [RFC7519]: https://www.rfc-editor.org/rfc/rfc7519

use chrono::serde::ts_seconds_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jose::jwa::SigningAlgorithm;
use crate::jose::jwk::Jwk;
use crate::jose::{Error, Result, jws};

/// Registered JWT claims.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Claims {
    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration time.
    #[serde(with = "ts_seconds_option")]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exp: Option<DateTime<Utc>>,

    /// Issued-at time.
    #[serde(with = "ts_seconds_option")]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub iat: Option<DateTime<Utc>>,

    /// Token identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Granted scope, space-joined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Sign claims into a compact JWT.
///
/// # Errors
///
/// Serialization and signing errors.
pub fn encode(claims: &Claims, alg: SigningAlgorithm, key: &Jwk) -> Result<String> {
    let payload = serde_json::to_vec(claims)
        .map_err(|e| Error::UnsupportedEncoding(format!("claims: {e}")))?;
    let header =
        jws::Header { alg, typ: Some("JWT".to_string()), ..jws::Header::default() };
    jws::encode(&header, &payload, key)
}

/// Verify a compact JWT and return its claims.
///
/// An expired `exp` claim is rejected.
///
/// # Errors
///
/// Verification errors from the JWS layer, `UnsupportedEncoding` for
/// malformed claims, `InvalidJws` for an expired token.
pub fn decode(token: &str, key: &Jwk) -> Result<Claims> {
    let (_, payload) = jws::decode(token, key)?;
    let claims: Claims = serde_json::from_slice(&payload)
        .map_err(|e| Error::UnsupportedEncoding(format!("claims: {e}")))?;

    if let Some(exp) = claims.exp {
        if exp < Utc::now() {
            return Err(Error::InvalidJws);
        }
    }
    Ok(claims)
}
