//! # JSON Web Encryption
//!
//! The [RFC7516] compact serialization over the content-encryption and
//! key-management backends:
//!
//! ```text
//! BASE64URL(header).BASE64URL(encrypted key).BASE64URL(IV)
//!     .BASE64URL(ciphertext).BASE64URL(tag)
//! ```
//!
//! The protected header doubles as the additional authenticated data: its
//! Base64URL form, as ASCII octets, is authenticated by the content
//! encryption algorithm.
//!
//! [RFC7516]: https://www.rfc-editor.org/rfc/rfc7516

pub mod enc;
pub mod key;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};

use crate::jose::jwa::{ContentAlgorithm, KeyAlgorithm};
use crate::jose::jwk::Jwk;
use crate::jose::{Error, Result};

/// Protected header of a compact JWE.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Key management algorithm.
    pub alg: KeyAlgorithm,

    /// Content encryption algorithm.
    pub enc: ContentAlgorithm,

    /// Ephemeral public key (ECDH-ES family).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,

    /// Agreement PartyUInfo (ECDH-ES family), Base64URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apu: Option<String>,

    /// Agreement PartyVInfo (ECDH-ES family), Base64URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apv: Option<String>,

    /// Initialization vector for the wrapped key (AES-GCM key wrap),
    /// Base64URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,

    /// Authentication tag for the wrapped key (AES-GCM key wrap),
    /// Base64URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Identifier of the recipient key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// Encrypt a plaintext for the recipient key into the compact
/// serialization.
///
/// # Errors
///
/// Key management errors from [`key::wrap`] and encryption errors from
/// the content algorithm.
pub fn encrypt(
    plaintext: &[u8], alg: KeyAlgorithm, content_alg: ContentAlgorithm, recipient: &Jwk,
) -> Result<String> {
    let wrapped = key::wrap(alg, content_alg, recipient, None, None)?;

    let header = Header {
        alg,
        enc: content_alg,
        epk: wrapped.epk,
        apu: wrapped.apu,
        apv: wrapped.apv,
        iv: wrapped.iv,
        tag: wrapped.tag,
        kid: recipient.kid.clone(),
    };
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| Error::UnsupportedEncoding(format!("header: {e}")))?;
    let header_b64 = Base64UrlUnpadded::encode_string(&header_json);

    let iv = content_alg.generate_iv();
    let (ciphertext, tag) =
        content_alg.encrypt(&wrapped.cek, &iv, plaintext, header_b64.as_bytes())?;

    Ok(format!(
        "{header_b64}.{}.{}.{}.{}",
        Base64UrlUnpadded::encode_string(&wrapped.encrypted_key),
        Base64UrlUnpadded::encode_string(&iv),
        Base64UrlUnpadded::encode_string(&ciphertext),
        Base64UrlUnpadded::encode_string(&tag)
    ))
}

/// Decrypt a compact JWE with the recipient key.
///
/// # Errors
///
/// `UnsupportedEncoding` for malformed serialization, key management
/// errors from [`key::unwrap`], and `InvalidJwe` when decryption or tag
/// verification fails.
pub fn decrypt(compact: &str, recipient: &Jwk) -> Result<Vec<u8>> {
    let parts: Vec<&str> = compact.split('.').collect();
    let [header_b64, ek_b64, iv_b64, ct_b64, tag_b64] = parts.as_slice() else {
        return Err(Error::UnsupportedEncoding("expected five segments".to_string()));
    };

    let header_json = Base64UrlUnpadded::decode_vec(header_b64)
        .map_err(|_| Error::UnsupportedEncoding("header is not Base64URL".to_string()))?;
    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|e| Error::UnsupportedEncoding(format!("header: {e}")))?;

    let encrypted_key = decode_segment(ek_b64, "encrypted key")?;
    let iv = decode_segment(iv_b64, "initialization vector")?;
    let ciphertext = decode_segment(ct_b64, "ciphertext")?;
    let tag = decode_segment(tag_b64, "tag")?;

    let cek = key::unwrap(header.alg, header.enc, recipient, &encrypted_key, &header)?;
    header.enc.decrypt(&cek, &iv, &ciphertext, &tag, header_b64.as_bytes())
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(segment)
        .map_err(|_| Error::UnsupportedEncoding(format!("{name} is not Base64URL")))
}
