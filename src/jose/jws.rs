//! # JSON Web Signature
//!
//! Sign and verify backends for the [RFC7515] compact serialization:
//! HMAC, RSASSA-PKCS1-v1_5, RSASSA-PSS, ECDSA, and EdDSA.
//!
//! Verification failures are opaque: a bad tag is [`Error::InvalidJws`]
//! with no further diagnostic, while a key of the wrong type, shape, or
//! curve is [`Error::InvalidJwk`].
//!
//! [RFC7515]: https://www.rfc-editor.org/rfc/rfc7515

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Mac, SimpleHmac};
use rand::rngs::OsRng;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::jose::jwa::SigningAlgorithm;
use crate::jose::jwk::{Curve, EcPublic, EcSecret, Jwk};
use crate::jose::{Error, Result};

/// Protected header of a compact JWS.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Header {
    /// Signing algorithm.
    pub alg: SigningAlgorithm,

    /// Media type of the complete JWS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Identifier of the signing key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Media type of the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,
}

/// Sign a message.
///
/// The key is validated against the algorithm: `kty`, HMAC secret length,
/// and curve for ECDSA/EdDSA.
///
/// # Errors
///
/// `InvalidJwk` when the key does not fit the algorithm.
pub fn sign(alg: SigningAlgorithm, key: &Jwk, message: &[u8]) -> Result<Vec<u8>> {
    key.ensure_alg(alg.as_str())?;

    match alg {
        SigningAlgorithm::Hs256 => Ok(hmac_tag::<Sha256>(alg, key, message)?),
        SigningAlgorithm::Hs384 => Ok(hmac_tag::<Sha384>(alg, key, message)?),
        SigningAlgorithm::Hs512 => Ok(hmac_tag::<Sha512>(alg, key, message)?),
        SigningAlgorithm::Rs256 => {
            let signing = rsa::pkcs1v15::SigningKey::<Sha256>::new(key.rsa_private()?);
            Ok(signing.sign(message).to_vec())
        }
        SigningAlgorithm::Rs384 => {
            let signing = rsa::pkcs1v15::SigningKey::<Sha384>::new(key.rsa_private()?);
            Ok(signing.sign(message).to_vec())
        }
        SigningAlgorithm::Rs512 => {
            let signing = rsa::pkcs1v15::SigningKey::<Sha512>::new(key.rsa_private()?);
            Ok(signing.sign(message).to_vec())
        }
        SigningAlgorithm::Ps256 => {
            let signing = rsa::pss::BlindedSigningKey::<Sha256>::new(key.rsa_private()?);
            Ok(signing.sign_with_rng(&mut OsRng, message).to_vec())
        }
        SigningAlgorithm::Ps384 => {
            let signing = rsa::pss::BlindedSigningKey::<Sha384>::new(key.rsa_private()?);
            Ok(signing.sign_with_rng(&mut OsRng, message).to_vec())
        }
        SigningAlgorithm::Ps512 => {
            let signing = rsa::pss::BlindedSigningKey::<Sha512>::new(key.rsa_private()?);
            Ok(signing.sign_with_rng(&mut OsRng, message).to_vec())
        }
        SigningAlgorithm::Es256 => {
            let EcSecret::P256(secret) = key.ec_secret()? else {
                return Err(curve_mismatch(alg));
            };
            let signature: p256::ecdsa::Signature =
                p256::ecdsa::SigningKey::from(secret).sign(message);
            Ok(signature.to_bytes().to_vec())
        }
        SigningAlgorithm::Es384 => {
            let EcSecret::P384(secret) = key.ec_secret()? else {
                return Err(curve_mismatch(alg));
            };
            let signature: p384::ecdsa::Signature =
                p384::ecdsa::SigningKey::from(secret).sign(message);
            Ok(signature.to_bytes().to_vec())
        }
        SigningAlgorithm::Es512 => {
            let EcSecret::P521(secret) = key.ec_secret()? else {
                return Err(curve_mismatch(alg));
            };
            let signing_key: p521::ecdsa::SigningKey =
                ecdsa::SigningKey::<p521::NistP521>::from(secret).into();
            let signature: p521::ecdsa::Signature = signing_key.sign(message);
            Ok(signature.to_bytes().to_vec())
        }
        SigningAlgorithm::EdDSA => {
            if key.curve()? != Curve::Ed25519 {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "no EdDSA backend for {:?}",
                    key.curve()?
                )));
            }
            Ok(key.ed25519_signing()?.sign(message).to_bytes().to_vec())
        }
    }
}

/// Verify a signature over a message.
///
/// # Errors
///
/// `InvalidJws` when the signature does not verify, `InvalidJwk` when the
/// key does not fit the algorithm.
pub fn verify(alg: SigningAlgorithm, key: &Jwk, message: &[u8], signature: &[u8]) -> Result<()> {
    key.ensure_alg(alg.as_str())?;

    match alg {
        SigningAlgorithm::Hs256 | SigningAlgorithm::Hs384 | SigningAlgorithm::Hs512 => {
            let expected = sign(alg, key, message)?;
            if bool::from(expected.ct_eq(signature)) {
                Ok(())
            } else {
                Err(Error::InvalidJws)
            }
        }
        SigningAlgorithm::Rs256 => {
            let verifying = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.rsa_public()?);
            let signature =
                rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Rs384 => {
            let verifying = rsa::pkcs1v15::VerifyingKey::<Sha384>::new(key.rsa_public()?);
            let signature =
                rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Rs512 => {
            let verifying = rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.rsa_public()?);
            let signature =
                rsa::pkcs1v15::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Ps256 => {
            let verifying = rsa::pss::VerifyingKey::<Sha256>::new(key.rsa_public()?);
            let signature =
                rsa::pss::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Ps384 => {
            let verifying = rsa::pss::VerifyingKey::<Sha384>::new(key.rsa_public()?);
            let signature =
                rsa::pss::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Ps512 => {
            let verifying = rsa::pss::VerifyingKey::<Sha512>::new(key.rsa_public()?);
            let signature =
                rsa::pss::Signature::try_from(signature).map_err(|_| Error::InvalidJws)?;
            verifying.verify(message, &signature).map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Es256 => {
            let EcPublic::P256(public) = key.ec_public()? else {
                return Err(curve_mismatch(alg));
            };
            let signature =
                p256::ecdsa::Signature::from_slice(signature).map_err(|_| Error::InvalidJws)?;
            p256::ecdsa::VerifyingKey::from(public)
                .verify(message, &signature)
                .map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Es384 => {
            let EcPublic::P384(public) = key.ec_public()? else {
                return Err(curve_mismatch(alg));
            };
            let signature =
                p384::ecdsa::Signature::from_slice(signature).map_err(|_| Error::InvalidJws)?;
            p384::ecdsa::VerifyingKey::from(public)
                .verify(message, &signature)
                .map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::Es512 => {
            let EcPublic::P521(public) = key.ec_public()? else {
                return Err(curve_mismatch(alg));
            };
            let signature =
                p521::ecdsa::Signature::from_slice(signature).map_err(|_| Error::InvalidJws)?;
            let verifying_key: p521::ecdsa::VerifyingKey =
                ecdsa::VerifyingKey::<p521::NistP521>::from(public).into();
            verifying_key
                .verify(message, &signature)
                .map_err(|_| Error::InvalidJws)
        }
        SigningAlgorithm::EdDSA => {
            if key.curve()? != Curve::Ed25519 {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "no EdDSA backend for {:?}",
                    key.curve()?
                )));
            }
            let signature =
                ed25519_dalek::Signature::from_slice(signature).map_err(|_| Error::InvalidJws)?;
            key.ed25519_verifying()?
                .verify(message, &signature)
                .map_err(|_| Error::InvalidJws)
        }
    }
}

/// Sign a payload into the compact serialization
/// `BASE64URL(header).BASE64URL(payload).BASE64URL(signature)`.
///
/// # Errors
///
/// Signing errors from [`sign`].
pub fn encode(header: &Header, payload: &[u8], key: &Jwk) -> Result<String> {
    let header_json = serde_json::to_vec(header)
        .map_err(|e| Error::UnsupportedEncoding(format!("header: {e}")))?;
    let signing_input = format!(
        "{}.{}",
        Base64UrlUnpadded::encode_string(&header_json),
        Base64UrlUnpadded::encode_string(payload)
    );
    let signature = sign(header.alg, key, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&signature)))
}

/// Verify a compact JWS and return its header and payload.
///
/// # Errors
///
/// `UnsupportedEncoding` for malformed serialization, plus any
/// verification error from [`verify`].
pub fn decode(compact: &str, key: &Jwk) -> Result<(Header, Vec<u8>)> {
    let parts: Vec<&str> = compact.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err(Error::UnsupportedEncoding("expected three segments".to_string()));
    };

    let header_json = Base64UrlUnpadded::decode_vec(header_b64)
        .map_err(|_| Error::UnsupportedEncoding("header is not Base64URL".to_string()))?;
    let header: Header = serde_json::from_slice(&header_json)
        .map_err(|e| Error::UnsupportedEncoding(format!("header: {e}")))?;
    let signature = Base64UrlUnpadded::decode_vec(signature_b64)
        .map_err(|_| Error::UnsupportedEncoding("signature is not Base64URL".to_string()))?;

    let signing_input = format!("{header_b64}.{payload_b64}");
    verify(header.alg, key, signing_input.as_bytes(), &signature)?;

    let payload = Base64UrlUnpadded::decode_vec(payload_b64)
        .map_err(|_| Error::UnsupportedEncoding("payload is not Base64URL".to_string()))?;
    Ok((header, payload))
}

fn hmac_tag<D>(alg: SigningAlgorithm, key: &Jwk, message: &[u8]) -> Result<Vec<u8>>
where
    D: sha2::Digest + sha2::digest::core_api::BlockSizeUser,
{
    let secret = key.symmetric_key()?;
    let min = <D as sha2::Digest>::output_size();
    if secret.len() < min {
        return Err(Error::InvalidJwk(format!(
            "{alg} requires a secret of at least {min} octets"
        )));
    }
    let mut mac = SimpleHmac::<D>::new_from_slice(&secret)
        .map_err(|_| Error::InvalidJwk("HMAC key rejected".to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn curve_mismatch(alg: SigningAlgorithm) -> Error {
    Error::InvalidJwk(format!("key curve does not match {alg}"))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    // Appendix A.1 of RFC 7515.
    #[test]
    fn hs256_vector() {
        let key = Jwk::load(&json!({
            "kty": "oct",
            "k": "AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow"
        }))
        .unwrap();
        let message = "eyJ0eXAiOiJKV1QiLA0KICJhbGciOiJIUzI1NiJ9.eyJpc3MiOiJqb2UiLA0KICJleHAiOjEzMDA4MTkzODAsDQogImh0dHA6Ly9leGFtcGxlLmNvbS9pc19yb290Ijp0cnVlfQ";

        let tag = sign(SigningAlgorithm::Hs256, &key, message.as_bytes()).unwrap();
        assert_eq!(
            Base64UrlUnpadded::encode_string(&tag),
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"
        );
        verify(SigningAlgorithm::Hs256, &key, message.as_bytes(), &tag).unwrap();
    }

    #[test]
    fn hmac_secret_length_enforced() {
        let key = Jwk::generate_oct(128);
        assert!(sign(SigningAlgorithm::Hs256, &key, b"msg").is_err());

        let key = Jwk::generate_oct(256);
        assert!(sign(SigningAlgorithm::Hs256, &key, b"msg").is_ok());
        assert!(sign(SigningAlgorithm::Hs512, &key, b"msg").is_err());
    }

    #[test]
    fn single_bit_flip_rejected() {
        let key = Jwk::generate_oct(256);
        let mut tag = sign(SigningAlgorithm::Hs256, &key, b"payload").unwrap();
        tag[0] ^= 0x01;
        assert_eq!(
            verify(SigningAlgorithm::Hs256, &key, b"payload", &tag),
            Err(Error::InvalidJws)
        );
    }

    #[test]
    fn ecdsa_round_trip() {
        for (alg, crv) in [
            (SigningAlgorithm::Es256, Curve::P256),
            (SigningAlgorithm::Es384, Curve::P384),
            (SigningAlgorithm::Es512, Curve::P521),
        ] {
            let key = Jwk::generate_ec(crv).unwrap();
            let signature = sign(alg, &key, b"message").unwrap();
            verify(alg, &key.public(), b"message", &signature).unwrap();

            let mut tampered = signature;
            tampered[7] ^= 0x80;
            assert_eq!(verify(alg, &key.public(), b"message", &tampered), Err(Error::InvalidJws));
        }
    }

    #[test]
    fn ecdsa_curve_must_match() {
        let key = Jwk::generate_ec(Curve::P384).unwrap();
        assert!(matches!(
            sign(SigningAlgorithm::Es256, &key, b"message"),
            Err(Error::InvalidJwk(_))
        ));
    }

    #[test]
    fn eddsa_round_trip() {
        let key = Jwk::generate_okp(Curve::Ed25519).unwrap();
        let signature = sign(SigningAlgorithm::EdDSA, &key, b"message").unwrap();
        assert_eq!(signature.len(), 64);
        verify(SigningAlgorithm::EdDSA, &key.public(), b"message", &signature).unwrap();

        let mut tampered = signature;
        tampered[63] ^= 0x01;
        assert_eq!(
            verify(SigningAlgorithm::EdDSA, &key.public(), b"message", &tampered),
            Err(Error::InvalidJws)
        );
    }

    #[test]
    fn rsa_round_trip() {
        let key = Jwk::generate_rsa(2048).unwrap();
        for alg in [SigningAlgorithm::Rs256, SigningAlgorithm::Ps256] {
            let signature = sign(alg, &key, b"message").unwrap();
            verify(alg, &key.public(), b"message", &signature).unwrap();

            let mut tampered = signature;
            tampered[11] ^= 0x40;
            assert_eq!(verify(alg, &key.public(), b"message", &tampered), Err(Error::InvalidJws));
        }
    }

    #[test]
    fn wrong_key_type_is_invalid_jwk() {
        let key = Jwk::generate_oct(256);
        assert!(matches!(
            sign(SigningAlgorithm::Es256, &key, b"message"),
            Err(Error::InvalidJwk(_))
        ));
    }

    #[test]
    fn compact_round_trip() {
        let key = Jwk::generate_okp(Curve::Ed25519).unwrap();
        let header = Header { alg: SigningAlgorithm::EdDSA, ..Header::default() };

        let compact = encode(&header, b"{\"hello\":\"world\"}", &key).unwrap();
        let (decoded_header, payload) = decode(&compact, &key.public()).unwrap();
        assert_eq!(decoded_header, header);
        assert_eq!(payload, b"{\"hello\":\"world\"}");

        // tamper with the payload segment
        let mut parts: Vec<String> = compact.split('.').map(str::to_string).collect();
        parts[1] = Base64UrlUnpadded::encode_string(b"{\"hello\":\"mallory\"}");
        assert!(decode(&parts.join("."), &key.public()).is_err());
    }
}
