//! # JSON Web Key
//!
//! JWK ([RFC7517]) parameter validation and key materialization for the
//! `oct`, `RSA`, `EC`, and `OKP` key types, plus the RFC 7638 thumbprint
//! and PEM/DER import and export through the ASN.1 codec.
//!
//! [RFC7517]: https://www.rfc-editor.org/rfc/rfc7517

use base64ct::{Base64UrlUnpadded, Encoding};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::asn1::node::{BitString, Integer, Value};
use crate::asn1::schema::{Item, Record};
use crate::asn1::{der, keys, pem::Pem};
use crate::jose::{Error, Result};

/// JWK key types.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyType {
    /// Symmetric octet sequence.
    #[default]
    #[serde(rename = "oct")]
    Oct,
    /// RSA.
    #[serde(rename = "RSA")]
    Rsa,
    /// Elliptic curve (NIST curves).
    #[serde(rename = "EC")]
    Ec,
    /// Octet key pair (Edwards/Montgomery curves).
    #[serde(rename = "OKP")]
    Okp,
}

/// Named curves for the `EC` and `OKP` key types.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256.
    #[serde(rename = "P-256")]
    P256,
    /// NIST P-384.
    #[serde(rename = "P-384")]
    P384,
    /// NIST P-521.
    #[serde(rename = "P-521")]
    P521,
    /// Ed25519 signing curve.
    Ed25519,
    /// Ed448 signing curve.
    Ed448,
    /// X25519 key agreement curve.
    X25519,
    /// X448 key agreement curve.
    X448,
}

impl Curve {
    /// Width in octets of a coordinate or scalar on this curve.
    #[must_use]
    pub const fn coordinate_width(self) -> usize {
        match self {
            Self::P256 | Self::Ed25519 | Self::X25519 => 32,
            Self::P384 => 48,
            Self::Ed448 => 57,
            Self::X448 => 56,
            Self::P521 => 66,
        }
    }

    const fn is_nist(self) -> bool {
        matches!(self, Self::P256 | Self::P384 | Self::P521)
    }
}

/// Intended key use.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum KeyUse {
    /// Digital signatures and MACs.
    #[serde(rename = "sig")]
    Signature,
    /// Encryption and key agreement.
    #[serde(rename = "enc")]
    Encryption,
}

/// A JSON Web Key.
///
/// All kind-specific parameters are Base64URL-encoded strings as they
/// appear on the wire; [`Jwk::validate`] checks the parameter set for the
/// declared `kty` and the crypto materialization methods decode on
/// demand.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type.
    pub kty: KeyType,

    /// Curve, for `EC` and `OKP` keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<Curve>,

    /// Public coordinate (EC x-coordinate, or the OKP public key).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC public y-coordinate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,

    /// Private key (EC/OKP scalar, or the RSA private exponent).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,

    /// RSA modulus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// RSA first prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,

    /// RSA second prime factor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// RSA first CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,

    /// RSA second CRT exponent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,

    /// RSA CRT coefficient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,

    /// Symmetric key value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,

    /// Algorithm this key is restricted to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Intended use.
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<KeyUse>,

    /// Permitted operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,

    /// Key identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    /// Load a key from its JWK parameters, dispatching validation on
    /// `kty`.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` when the parameter set is malformed for the declared
    /// key type.
    pub fn load(value: &serde_json::Value) -> Result<Self> {
        let jwk: Self = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidJwk(format!("malformed JWK: {e}")))?;
        jwk.validate()?;
        Ok(jwk)
    }

    /// Validate the parameter set for the declared key type.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` naming the offending parameter.
    pub fn validate(&self) -> Result<()> {
        match self.kty {
            KeyType::Oct => {
                if self.symmetric_key()?.is_empty() {
                    return Err(Error::InvalidJwk("`k` must not be empty".to_string()));
                }
            }
            KeyType::Rsa => {
                decoded(self.n.as_ref(), "n")?;
                decoded(self.e.as_ref(), "e")?;
                let private = [&self.d, &self.p, &self.q, &self.dp, &self.dq, &self.qi];
                let present = private.iter().filter(|p| p.is_some()).count();
                if present != 0 && present != private.len() {
                    return Err(Error::InvalidJwk(
                        "RSA private parameters must be supplied together".to_string(),
                    ));
                }
            }
            KeyType::Ec => {
                let crv = self.curve()?;
                if !crv.is_nist() {
                    return Err(Error::InvalidJwk(format!("invalid EC curve {crv:?}")));
                }
                let width = crv.coordinate_width();
                for (name, param) in [("x", &self.x), ("y", &self.y)] {
                    if decoded(param.as_ref(), name)?.len() != width {
                        return Err(Error::InvalidJwk(format!("`{name}` must be {width} octets")));
                    }
                }
                if let Some(d) = &self.d {
                    if decoded(Some(d), "d")?.len() != width {
                        return Err(Error::InvalidJwk(format!("`d` must be {width} octets")));
                    }
                }
            }
            KeyType::Okp => {
                let crv = self.curve()?;
                if crv.is_nist() {
                    return Err(Error::InvalidJwk(format!("invalid OKP curve {crv:?}")));
                }
                decoded(self.x.as_ref(), "x")?;
                if let Some(d) = &self.d {
                    decoded(Some(d), "d")?;
                }
            }
        }
        Ok(())
    }

    /// Whether the key carries private material.
    #[must_use]
    pub fn is_private(&self) -> bool {
        match self.kty {
            KeyType::Oct => self.k.is_some(),
            KeyType::Rsa | KeyType::Ec | KeyType::Okp => self.d.is_some(),
        }
    }

    /// The public projection: private parameters removed.
    ///
    /// Symmetric keys have no separable public half and are returned
    /// unchanged.
    #[must_use]
    pub fn public(&self) -> Self {
        let mut public = self.clone();
        public.d = None;
        public.p = None;
        public.q = None;
        public.dp = None;
        public.dq = None;
        public.qi = None;
        public
    }

    /// The RFC 7638 thumbprint: SHA-256 over the canonical JSON of the
    /// required members, keys in lexicographic order, no whitespace.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` when a required member is missing.
    pub fn thumbprint(&self) -> Result<String> {
        let canonical = self.thumbprint_input()?;
        Ok(Base64UrlUnpadded::encode_string(&Sha256::digest(canonical.as_bytes())))
    }

    fn thumbprint_input(&self) -> Result<String> {
        let input = match self.kty {
            KeyType::Oct => {
                let k = require(self.k.as_ref(), "k")?;
                format!(r#"{{"k":"{k}","kty":"oct"}}"#)
            }
            KeyType::Rsa => {
                let e = require(self.e.as_ref(), "e")?;
                let n = require(self.n.as_ref(), "n")?;
                format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#)
            }
            KeyType::Ec => {
                let crv = crv_name(self.curve()?);
                let x = require(self.x.as_ref(), "x")?;
                let y = require(self.y.as_ref(), "y")?;
                format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
            }
            KeyType::Okp => {
                let crv = crv_name(self.curve()?);
                let x = require(self.x.as_ref(), "x")?;
                format!(r#"{{"crv":"{crv}","kty":"OKP","x":"{x}"}}"#)
            }
        };
        Ok(input)
    }

    /// Enforce the key's `alg` binding: when set, it must equal the
    /// algorithm consuming the key.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` on a mismatch.
    pub fn ensure_alg(&self, algorithm: &str) -> Result<()> {
        if let Some(alg) = &self.alg {
            if alg != algorithm {
                return Err(Error::InvalidJwk(format!(
                    "key is bound to {alg}, not {algorithm}"
                )));
            }
        }
        Ok(())
    }

    /// The declared curve.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` when `crv` is missing.
    pub fn curve(&self) -> Result<Curve> {
        self.crv.ok_or_else(|| Error::InvalidJwk("`crv` is required".to_string()))
    }

    /// The decoded symmetric key.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` unless the key is an `oct` key with a decodable `k`.
    pub fn symmetric_key(&self) -> Result<Vec<u8>> {
        if self.kty != KeyType::Oct {
            return Err(Error::InvalidJwk(format!("expected oct key, found {:?}", self.kty)));
        }
        decoded(self.k.as_ref(), "k")
    }

    // --- generation -----------------------------------------------------

    /// Generate a symmetric key of `bits` length.
    #[must_use]
    pub fn generate_oct(bits: usize) -> Self {
        let mut bytes = vec![0u8; bits / 8];
        OsRng.fill_bytes(&mut bytes);
        Self {
            kty: KeyType::Oct,
            k: Some(Base64UrlUnpadded::encode_string(&bytes)),
            ..Self::default()
        }
    }

    /// Generate an RSA key pair of `bits` modulus length.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` when key generation fails.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        use rsa::traits::{PrivateKeyParts, PublicKeyParts};

        let rsa_err = |e: rsa::Error| Error::InvalidJwk(format!("RSA generation failed: {e}"));
        let mut key = rsa::RsaPrivateKey::new(&mut OsRng, bits).map_err(rsa_err)?;
        key.precompute().map_err(rsa_err)?;

        let missing =
            || Error::InvalidJwk("RSA generation produced no CRT parameters".to_string());
        let primes = key.primes();
        let dp = key.dp().ok_or_else(missing)?;
        let dq = key.dq().ok_or_else(missing)?;
        let qi = key.crt_coefficient().ok_or_else(missing)?;

        Ok(Self {
            kty: KeyType::Rsa,
            n: Some(b64(&key.n().to_bytes_be())),
            e: Some(b64(&key.e().to_bytes_be())),
            d: Some(b64(&key.d().to_bytes_be())),
            p: Some(b64(&primes[0].to_bytes_be())),
            q: Some(b64(&primes[1].to_bytes_be())),
            dp: Some(b64(&dp.to_bytes_be())),
            dq: Some(b64(&dq.to_bytes_be())),
            qi: Some(b64(&qi.to_bytes_be())),
            ..Self::default()
        })
    }

    /// Generate an EC key pair on the named curve.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` for non-NIST curves.
    pub fn generate_ec(crv: Curve) -> Result<Self> {
        let (x, y, d) = match crv {
            Curve::P256 => {
                let secret = p256::SecretKey::random(&mut OsRng);
                ec_parts(secret.public_key().to_encoded_point(false).as_bytes(), &secret.to_bytes())
            }
            Curve::P384 => {
                let secret = p384::SecretKey::random(&mut OsRng);
                ec_parts(secret.public_key().to_encoded_point(false).as_bytes(), &secret.to_bytes())
            }
            Curve::P521 => {
                let secret = p521::SecretKey::random(&mut OsRng);
                ec_parts(secret.public_key().to_encoded_point(false).as_bytes(), &secret.to_bytes())
            }
            _ => return Err(Error::UnsupportedAlgorithm(format!("{crv:?} is not an EC curve"))),
        };

        Ok(Self {
            kty: KeyType::Ec,
            crv: Some(crv),
            x: Some(x),
            y: Some(y),
            d: Some(d),
            ..Self::default()
        })
    }

    /// Generate an OKP key pair on the named curve.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` for curves without a backend (Ed448, X448)
    /// or non-OKP curves.
    pub fn generate_okp(crv: Curve) -> Result<Self> {
        let (x, d) = match crv {
            Curve::Ed25519 => {
                let signing = ed25519_dalek::SigningKey::generate(&mut OsRng);
                (signing.verifying_key().to_bytes().to_vec(), signing.to_bytes().to_vec())
            }
            Curve::X25519 => {
                let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                (
                    x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec(),
                    secret.to_bytes().to_vec(),
                )
            }
            _ => {
                return Err(Error::UnsupportedAlgorithm(format!("no backend for {crv:?}")));
            }
        };

        Ok(Self {
            kty: KeyType::Okp,
            crv: Some(crv),
            x: Some(b64(&x)),
            d: Some(b64(&d)),
            ..Self::default()
        })
    }

    // --- materialization ------------------------------------------------

    pub(crate) fn rsa_public(&self) -> Result<rsa::RsaPublicKey> {
        if self.kty != KeyType::Rsa {
            return Err(Error::InvalidJwk(format!("expected RSA key, found {:?}", self.kty)));
        }
        let n = rsa::BigUint::from_bytes_be(&decoded(self.n.as_ref(), "n")?);
        let e = rsa::BigUint::from_bytes_be(&decoded(self.e.as_ref(), "e")?);
        rsa::RsaPublicKey::new(n, e).map_err(|e| Error::InvalidJwk(format!("RSA key: {e}")))
    }

    pub(crate) fn rsa_private(&self) -> Result<rsa::RsaPrivateKey> {
        if self.kty != KeyType::Rsa {
            return Err(Error::InvalidJwk(format!("expected RSA key, found {:?}", self.kty)));
        }
        let n = rsa::BigUint::from_bytes_be(&decoded(self.n.as_ref(), "n")?);
        let e = rsa::BigUint::from_bytes_be(&decoded(self.e.as_ref(), "e")?);
        let d = rsa::BigUint::from_bytes_be(&decoded(self.d.as_ref(), "d")?);
        let p = rsa::BigUint::from_bytes_be(&decoded(self.p.as_ref(), "p")?);
        let q = rsa::BigUint::from_bytes_be(&decoded(self.q.as_ref(), "q")?);
        rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| Error::InvalidJwk(format!("RSA key: {e}")))
    }

    pub(crate) fn ec_public(&self) -> Result<EcPublic> {
        if self.kty != KeyType::Ec {
            return Err(Error::InvalidJwk(format!("expected EC key, found {:?}", self.kty)));
        }
        self.validate()?;
        let x = decoded(self.x.as_ref(), "x")?;
        let y = decoded(self.y.as_ref(), "y")?;

        match self.curve()? {
            Curve::P256 => {
                let point = p256::EncodedPoint::from_affine_coordinates(
                    p256::FieldBytes::from_slice(&x),
                    p256::FieldBytes::from_slice(&y),
                    false,
                );
                Option::from(p256::PublicKey::from_encoded_point(&point))
                    .map(EcPublic::P256)
                    .ok_or_else(|| Error::InvalidJwk("point is not on P-256".to_string()))
            }
            Curve::P384 => {
                let point = p384::EncodedPoint::from_affine_coordinates(
                    p384::FieldBytes::from_slice(&x),
                    p384::FieldBytes::from_slice(&y),
                    false,
                );
                Option::from(p384::PublicKey::from_encoded_point(&point))
                    .map(EcPublic::P384)
                    .ok_or_else(|| Error::InvalidJwk("point is not on P-384".to_string()))
            }
            Curve::P521 => {
                let point = p521::EncodedPoint::from_affine_coordinates(
                    p521::FieldBytes::from_slice(&x),
                    p521::FieldBytes::from_slice(&y),
                    false,
                );
                Option::from(p521::PublicKey::from_encoded_point(&point))
                    .map(EcPublic::P521)
                    .ok_or_else(|| Error::InvalidJwk("point is not on P-521".to_string()))
            }
            crv => Err(Error::InvalidJwk(format!("invalid EC curve {crv:?}"))),
        }
    }

    pub(crate) fn ec_secret(&self) -> Result<EcSecret> {
        if self.kty != KeyType::Ec {
            return Err(Error::InvalidJwk(format!("expected EC key, found {:?}", self.kty)));
        }
        let d = decoded(self.d.as_ref(), "d")?;

        match self.curve()? {
            Curve::P256 => p256::SecretKey::from_slice(&d)
                .map(EcSecret::P256)
                .map_err(|_| Error::InvalidJwk("invalid P-256 scalar".to_string())),
            Curve::P384 => p384::SecretKey::from_slice(&d)
                .map(EcSecret::P384)
                .map_err(|_| Error::InvalidJwk("invalid P-384 scalar".to_string())),
            Curve::P521 => p521::SecretKey::from_slice(&d)
                .map(EcSecret::P521)
                .map_err(|_| Error::InvalidJwk("invalid P-521 scalar".to_string())),
            crv => Err(Error::InvalidJwk(format!("invalid EC curve {crv:?}"))),
        }
    }

    pub(crate) fn ed25519_verifying(&self) -> Result<ed25519_dalek::VerifyingKey> {
        let x = self.okp_param(&self.x, "x")?;
        ed25519_dalek::VerifyingKey::from_bytes(&x)
            .map_err(|_| Error::InvalidJwk("invalid Ed25519 public key".to_string()))
    }

    pub(crate) fn ed25519_signing(&self) -> Result<ed25519_dalek::SigningKey> {
        let d = self.okp_param(&self.d, "d")?;
        Ok(ed25519_dalek::SigningKey::from_bytes(&d))
    }

    pub(crate) fn x25519_public(&self) -> Result<x25519_dalek::PublicKey> {
        let x = self.okp_param(&self.x, "x")?;
        Ok(x25519_dalek::PublicKey::from(x))
    }

    pub(crate) fn x25519_secret(&self) -> Result<x25519_dalek::StaticSecret> {
        let d = self.okp_param(&self.d, "d")?;
        Ok(x25519_dalek::StaticSecret::from(d))
    }

    fn okp_param(&self, param: &Option<String>, name: &str) -> Result<[u8; 32]> {
        if self.kty != KeyType::Okp {
            return Err(Error::InvalidJwk(format!("expected OKP key, found {:?}", self.kty)));
        }
        let bytes = decoded(param.as_ref(), name)?;
        bytes
            .try_into()
            .map_err(|_| Error::InvalidJwk(format!("`{name}` must be 32 octets")))
    }

    // --- PEM/DER import and export --------------------------------------

    /// Import a key from a PEM document.
    ///
    /// Recognized labels: `RSA PRIVATE KEY` (PKCS#1), `RSA PUBLIC KEY`
    /// (PKCS#1), `EC PRIVATE KEY` (SEC1), `PRIVATE KEY` (PKCS#8), and
    /// `PUBLIC KEY` (X.509 `SubjectPublicKeyInfo`).
    ///
    /// # Errors
    ///
    /// `InvalidJwk` for unrecognized labels or malformed DER, plus any
    /// codec error.
    pub fn from_pem(text: &str) -> Result<Self> {
        let pem = Pem::decode(text).map_err(asn1_err)?;
        match pem.label.as_str() {
            "RSA PRIVATE KEY" => Self::from_pkcs1_private(&pem.der),
            "RSA PUBLIC KEY" => Self::from_pkcs1_public(&pem.der),
            "EC PRIVATE KEY" => Self::from_sec1(&pem.der),
            "PRIVATE KEY" => Self::from_pkcs8(&pem.der),
            "PUBLIC KEY" => Self::from_spki(&pem.der),
            label => Err(Error::InvalidJwk(format!("unrecognized PEM label `{label}`"))),
        }
    }

    /// Export the key as a PEM document.
    ///
    /// Private keys use their native framing (PKCS#1 for RSA, SEC1 for
    /// EC, PKCS#8 for OKP); public keys export as X.509
    /// `SubjectPublicKeyInfo`.
    ///
    /// # Errors
    ///
    /// `InvalidJwk` for symmetric keys, which have no PEM form.
    pub fn to_pem(&self) -> Result<String> {
        let pem = match (self.kty, self.is_private()) {
            (KeyType::Rsa, true) => Pem {
                label: "RSA PRIVATE KEY".to_string(),
                der: self.to_pkcs1_private()?,
            },
            (KeyType::Ec, true) => {
                Pem { label: "EC PRIVATE KEY".to_string(), der: self.to_sec1()? }
            }
            (KeyType::Okp, true) => {
                Pem { label: "PRIVATE KEY".to_string(), der: self.to_pkcs8()? }
            }
            (KeyType::Rsa | KeyType::Ec | KeyType::Okp, false) => {
                Pem { label: "PUBLIC KEY".to_string(), der: self.to_spki()? }
            }
            (KeyType::Oct, _) => {
                return Err(Error::InvalidJwk("symmetric keys have no PEM form".to_string()));
            }
        };
        Ok(pem.encode())
    }

    fn from_pkcs1_private(bytes: &[u8]) -> Result<Self> {
        let record =
            der::Decoder::new(bytes).decode(&keys::rsa_private_key()).map_err(asn1_err)?;
        Ok(Self {
            kty: KeyType::Rsa,
            n: Some(b64(&record.magnitude("n").map_err(asn1_err)?)),
            e: Some(b64(&record.magnitude("e").map_err(asn1_err)?)),
            d: Some(b64(&record.magnitude("d").map_err(asn1_err)?)),
            p: Some(b64(&record.magnitude("p").map_err(asn1_err)?)),
            q: Some(b64(&record.magnitude("q").map_err(asn1_err)?)),
            dp: Some(b64(&record.magnitude("dp").map_err(asn1_err)?)),
            dq: Some(b64(&record.magnitude("dq").map_err(asn1_err)?)),
            qi: Some(b64(&record.magnitude("qi").map_err(asn1_err)?)),
            ..Self::default()
        })
    }

    fn from_pkcs1_public(bytes: &[u8]) -> Result<Self> {
        let record =
            der::Decoder::new(bytes).decode(&keys::rsa_public_key()).map_err(asn1_err)?;
        Ok(Self {
            kty: KeyType::Rsa,
            n: Some(b64(&record.magnitude("n").map_err(asn1_err)?)),
            e: Some(b64(&record.magnitude("e").map_err(asn1_err)?)),
            ..Self::default()
        })
    }

    fn from_sec1(bytes: &[u8]) -> Result<Self> {
        // first pass finds the curve, second applies its scalar width
        let scan = der::Decoder::new(bytes).decode(&keys::ec_private_key()).map_err(asn1_err)?;
        let Some(Value::ObjectIdentifier(oid)) = scan.value("curve") else {
            return Err(Error::InvalidJwk("EC key does not name its curve".to_string()));
        };
        let named = keys::NamedCurve::from_oid(oid)
            .ok_or_else(|| Error::InvalidJwk(format!("unsupported curve {oid}")))?;

        let record = der::Decoder::new(bytes)
            .decode(&keys::ec_private_key_for(named))
            .map_err(asn1_err)?;
        let d = record
            .bytes("private_key")
            .ok_or_else(|| Error::InvalidJwk("missing private key".to_string()))?;

        let point = record.bytes("public_key");
        let (x, y) = match point {
            Some(point) => split_point(point, named.scalar_width())?,
            None => return Err(Error::InvalidJwk("EC key carries no public point".to_string())),
        };

        Ok(Self {
            kty: KeyType::Ec,
            crv: Some(named_to_curve(named)),
            x: Some(b64(&x)),
            y: Some(b64(&y)),
            d: Some(b64(d)),
            ..Self::default()
        })
    }

    fn from_pkcs8(bytes: &[u8]) -> Result<Self> {
        let record =
            der::Decoder::new(bytes).decode(&keys::private_key_info()).map_err(asn1_err)?;
        let algorithm = record
            .record("algorithm")
            .ok_or_else(|| Error::InvalidJwk("missing algorithm".to_string()))?;
        let Some(Value::ObjectIdentifier(oid)) = algorithm.value("oid") else {
            return Err(Error::InvalidJwk("missing algorithm OID".to_string()));
        };
        let inner = record
            .bytes("private_key")
            .ok_or_else(|| Error::InvalidJwk("missing private key".to_string()))?;

        if oid == &keys::rsa_encryption() {
            return Self::from_pkcs1_private(inner);
        }
        if oid == &keys::id_ec_public_key() {
            return Self::from_sec1_with_params(inner, algorithm.value("curve"));
        }
        if oid == &keys::id_ed25519() || oid == &keys::id_x25519() {
            let seed = unwrap_okp_seed(inner)?;
            let crv =
                if oid == &keys::id_ed25519() { Curve::Ed25519 } else { Curve::X25519 };
            return okp_from_seed(crv, &seed);
        }
        Err(Error::InvalidJwk(format!("unsupported key algorithm {oid}")))
    }

    fn from_sec1_with_params(bytes: &[u8], params: Option<&Value>) -> Result<Self> {
        // PKCS#8 names the curve in the outer algorithm identifier; the
        // inner SEC1 structure may omit it
        if let Some(Value::ObjectIdentifier(oid)) = params {
            let named = keys::NamedCurve::from_oid(oid)
                .ok_or_else(|| Error::InvalidJwk(format!("unsupported curve {oid}")))?;
            let record = der::Decoder::new(bytes)
                .decode(&keys::ec_private_key_for(named))
                .map_err(asn1_err)?;
            let d = record
                .bytes("private_key")
                .ok_or_else(|| Error::InvalidJwk("missing private key".to_string()))?
                .to_vec();

            let (x, y) = match record.bytes("public_key") {
                Some(point) => split_point(point, named.scalar_width())?,
                None => derive_point(named, &d)?,
            };

            return Ok(Self {
                kty: KeyType::Ec,
                crv: Some(named_to_curve(named)),
                x: Some(b64(&x)),
                y: Some(b64(&y)),
                d: Some(b64(&d)),
                ..Self::default()
            });
        }
        Self::from_sec1(bytes)
    }

    fn from_spki(bytes: &[u8]) -> Result<Self> {
        let record = der::Decoder::new(bytes)
            .decode(&keys::subject_public_key_info())
            .map_err(asn1_err)?;
        let algorithm = record
            .record("algorithm")
            .ok_or_else(|| Error::InvalidJwk("missing algorithm".to_string()))?;
        let Some(Value::ObjectIdentifier(oid)) = algorithm.value("oid") else {
            return Err(Error::InvalidJwk("missing algorithm OID".to_string()));
        };
        let key = record
            .bytes("subject_public_key")
            .ok_or_else(|| Error::InvalidJwk("missing public key".to_string()))?;

        if oid == &keys::rsa_encryption() {
            return Self::from_pkcs1_public(key);
        }
        if oid == &keys::id_ec_public_key() {
            let Some(Value::ObjectIdentifier(curve_oid)) = algorithm.value("curve") else {
                return Err(Error::InvalidJwk("EC key does not name its curve".to_string()));
            };
            let named = keys::NamedCurve::from_oid(curve_oid)
                .ok_or_else(|| Error::InvalidJwk(format!("unsupported curve {curve_oid}")))?;
            let (x, y) = split_point(key, named.scalar_width())?;
            return Ok(Self {
                kty: KeyType::Ec,
                crv: Some(named_to_curve(named)),
                x: Some(b64(&x)),
                y: Some(b64(&y)),
                ..Self::default()
            });
        }
        if oid == &keys::id_ed25519() || oid == &keys::id_x25519() {
            let crv =
                if oid == &keys::id_ed25519() { Curve::Ed25519 } else { Curve::X25519 };
            return Ok(Self {
                kty: KeyType::Okp,
                crv: Some(crv),
                x: Some(b64(key)),
                ..Self::default()
            });
        }
        Err(Error::InvalidJwk(format!("unsupported key algorithm {oid}")))
    }

    fn to_pkcs1_private(&self) -> Result<Vec<u8>> {
        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(0)));
        for (name, param) in [
            ("n", &self.n),
            ("e", &self.e),
            ("d", &self.d),
            ("p", &self.p),
            ("q", &self.q),
            ("dp", &self.dp),
            ("dq", &self.dq),
            ("qi", &self.qi),
        ] {
            let bytes = decoded(param.as_ref(), name)?;
            record.set_value(name, Value::Integer(Integer::from_unsigned_be(&bytes)));
        }
        der::encode(&keys::rsa_private_key(), &record).map_err(asn1_err)
    }

    fn to_pkcs1_public(&self) -> Result<Vec<u8>> {
        let mut record = Record::new();
        for (name, param) in [("n", &self.n), ("e", &self.e)] {
            let bytes = decoded(param.as_ref(), name)?;
            record.set_value(name, Value::Integer(Integer::from_unsigned_be(&bytes)));
        }
        der::encode(&keys::rsa_public_key(), &record).map_err(asn1_err)
    }

    fn to_sec1(&self) -> Result<Vec<u8>> {
        let named = curve_to_named(self.curve()?)?;
        let d = decoded(self.d.as_ref(), "d")?;
        let x = decoded(self.x.as_ref(), "x")?;
        let y = decoded(self.y.as_ref(), "y")?;

        let mut point = vec![0x04];
        point.extend_from_slice(&x);
        point.extend_from_slice(&y);

        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(1)));
        record.set_value("private_key", Value::OctetString(d));
        record.set_value("curve", Value::ObjectIdentifier(named.oid()));
        record.set_value("public_key", Value::BitString(BitString::new(point)));
        der::encode(&keys::ec_private_key_for(named), &record).map_err(asn1_err)
    }

    fn to_pkcs8(&self) -> Result<Vec<u8>> {
        let crv = self.curve()?;
        let oid = match crv {
            Curve::Ed25519 => keys::id_ed25519(),
            Curve::X25519 => keys::id_x25519(),
            _ => return Err(Error::UnsupportedAlgorithm(format!("no backend for {crv:?}"))),
        };
        let d = decoded(self.d.as_ref(), "d")?;

        // CurvePrivateKey is an OCTET STRING nested in the privateKey
        // OCTET STRING (RFC 8410 §7)
        let mut seed = Record::new();
        seed.set_value("seed", Value::OctetString(d));
        let inner = der::encode(&okp_seed_schema(), &seed).map_err(asn1_err)?;

        let mut algorithm = Record::new();
        algorithm.set_value("oid", Value::ObjectIdentifier(oid));

        let mut record = Record::new();
        record.set_value("version", Value::Integer(Integer::from_i64(0)));
        record.set("algorithm", Item::Record(algorithm));
        record.set_value("private_key", Value::OctetString(inner));
        der::encode(&keys::private_key_info(), &record).map_err(asn1_err)
    }

    fn to_spki(&self) -> Result<Vec<u8>> {
        let (algorithm, key_bytes) = match self.kty {
            KeyType::Rsa => {
                let mut algorithm = Record::new();
                algorithm.set_value("oid", Value::ObjectIdentifier(keys::rsa_encryption()));
                algorithm.set_value("null_params", Value::Null);
                (algorithm, self.to_pkcs1_public()?)
            }
            KeyType::Ec => {
                let named = curve_to_named(self.curve()?)?;
                let mut algorithm = Record::new();
                algorithm.set_value("oid", Value::ObjectIdentifier(keys::id_ec_public_key()));
                algorithm.set_value("curve", Value::ObjectIdentifier(named.oid()));

                let x = decoded(self.x.as_ref(), "x")?;
                let y = decoded(self.y.as_ref(), "y")?;
                let mut point = vec![0x04];
                point.extend_from_slice(&x);
                point.extend_from_slice(&y);
                (algorithm, point)
            }
            KeyType::Okp => {
                let oid = match self.curve()? {
                    Curve::Ed25519 => keys::id_ed25519(),
                    Curve::X25519 => keys::id_x25519(),
                    crv => {
                        return Err(Error::UnsupportedAlgorithm(format!(
                            "no backend for {crv:?}"
                        )));
                    }
                };
                let mut algorithm = Record::new();
                algorithm.set_value("oid", Value::ObjectIdentifier(oid));
                (algorithm, decoded(self.x.as_ref(), "x")?)
            }
            KeyType::Oct => {
                return Err(Error::InvalidJwk("symmetric keys have no SPKI form".to_string()));
            }
        };

        let mut record = Record::new();
        record.set("algorithm", Item::Record(algorithm));
        record.set_value("subject_public_key", Value::BitString(BitString::new(key_bytes)));
        der::encode(&keys::subject_public_key_info(), &record).map_err(asn1_err)
    }
}

/// Crypto handle for an EC public key.
pub(crate) enum EcPublic {
    P256(p256::PublicKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

/// Crypto handle for an EC private key.
pub(crate) enum EcSecret {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

fn okp_seed_schema() -> crate::asn1::schema::Schema {
    use crate::asn1::schema::{Field, FieldType, Schema};
    Schema::nested(vec![Field::new("seed", FieldType::OctetString)])
}

fn unwrap_okp_seed(bytes: &[u8]) -> Result<Vec<u8>> {
    let record = der::Decoder::new(bytes).decode(&okp_seed_schema()).map_err(asn1_err)?;
    record
        .bytes("seed")
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::InvalidJwk("missing key seed".to_string()))
}

fn okp_from_seed(crv: Curve, seed: &[u8]) -> Result<Jwk> {
    let seed: [u8; 32] = seed
        .try_into()
        .map_err(|_| Error::InvalidJwk("key seed must be 32 octets".to_string()))?;
    let x = match crv {
        Curve::Ed25519 => {
            ed25519_dalek::SigningKey::from_bytes(&seed).verifying_key().to_bytes().to_vec()
        }
        Curve::X25519 => {
            let secret = x25519_dalek::StaticSecret::from(seed);
            x25519_dalek::PublicKey::from(&secret).as_bytes().to_vec()
        }
        _ => return Err(Error::UnsupportedAlgorithm(format!("no backend for {crv:?}"))),
    };
    Ok(Jwk {
        kty: KeyType::Okp,
        crv: Some(crv),
        x: Some(b64(&x)),
        d: Some(b64(&seed)),
        ..Jwk::default()
    })
}

/// Split a generated key pair into Base64URL `x`, `y`, and `d`
/// parameters. `point` is an uncompressed SEC1 point.
fn ec_parts(point: &[u8], d: &[u8]) -> (String, String, String) {
    let width = (point.len() - 1) / 2;
    (b64(&point[1..=width]), b64(&point[1 + width..]), b64(d))
}

fn derive_point(named: keys::NamedCurve, d: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let point = match named {
        keys::NamedCurve::P256 => {
            let secret = p256::SecretKey::from_slice(d)
                .map_err(|_| Error::InvalidJwk("invalid P-256 scalar".to_string()))?;
            secret.public_key().to_encoded_point(false).as_bytes().to_vec()
        }
        keys::NamedCurve::P384 => {
            let secret = p384::SecretKey::from_slice(d)
                .map_err(|_| Error::InvalidJwk("invalid P-384 scalar".to_string()))?;
            secret.public_key().to_encoded_point(false).as_bytes().to_vec()
        }
        keys::NamedCurve::P521 => {
            let secret = p521::SecretKey::from_slice(d)
                .map_err(|_| Error::InvalidJwk("invalid P-521 scalar".to_string()))?;
            secret.public_key().to_encoded_point(false).as_bytes().to_vec()
        }
    };
    split_point(&point, named.scalar_width())
}

fn split_point(point: &[u8], width: usize) -> Result<(Vec<u8>, Vec<u8>)> {
    if point.len() != 1 + 2 * width || point[0] != 0x04 {
        return Err(Error::InvalidJwk("expected an uncompressed EC point".to_string()));
    }
    Ok((point[1..=width].to_vec(), point[1 + width..].to_vec()))
}

const fn named_to_curve(named: keys::NamedCurve) -> Curve {
    match named {
        keys::NamedCurve::P256 => Curve::P256,
        keys::NamedCurve::P384 => Curve::P384,
        keys::NamedCurve::P521 => Curve::P521,
    }
}

fn curve_to_named(crv: Curve) -> Result<keys::NamedCurve> {
    match crv {
        Curve::P256 => Ok(keys::NamedCurve::P256),
        Curve::P384 => Ok(keys::NamedCurve::P384),
        Curve::P521 => Ok(keys::NamedCurve::P521),
        _ => Err(Error::InvalidJwk(format!("{crv:?} is not a NIST curve"))),
    }
}

const fn crv_name(crv: Curve) -> &'static str {
    match crv {
        Curve::P256 => "P-256",
        Curve::P384 => "P-384",
        Curve::P521 => "P-521",
        Curve::Ed25519 => "Ed25519",
        Curve::Ed448 => "Ed448",
        Curve::X25519 => "X25519",
        Curve::X448 => "X448",
    }
}

fn b64(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}

fn decoded(param: Option<&String>, name: &str) -> Result<Vec<u8>> {
    let value = require(param, name)?;
    Base64UrlUnpadded::decode_vec(value)
        .map_err(|_| Error::InvalidJwk(format!("`{name}` is not valid Base64URL")))
}

fn require<'a>(param: Option<&'a String>, name: &str) -> Result<&'a String> {
    param.ok_or_else(|| Error::InvalidJwk(format!("`{name}` is required")))
}

fn asn1_err(e: crate::asn1::Error) -> Error {
    Error::InvalidJwk(e.to_string())
}
