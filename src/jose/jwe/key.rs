//! # JWE Key Management
//!
//! The key management backends of RFC 7518 §4: direct use of a shared
//! key, RSA encryption (PKCS#1 v1.5 and OAEP), AES Key Wrap (RFC 3394),
//! AES-GCM key wrapping, and ECDH-ES key agreement with the Concat KDF of
//! NIST SP 800-56A §5.8.1.
//!
//! `wrap` produces the content encryption key together with its encrypted
//! form and any header parameters the algorithm contributes (`epk`,
//! `apu`/`apv`, `iv`/`tag`); `unwrap` recovers the CEK from the header
//! and encrypted key.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use base64ct::{Base64UrlUnpadded, Encoding};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use crate::jose::jwa::{ContentAlgorithm, KeyAlgorithm};
use crate::jose::jwe::Header;
use crate::jose::jwk::{Curve, EcPublic, EcSecret, Jwk, KeyType};
use crate::jose::{Error, Result};

/// Initial value for AES Key Wrap (RFC 3394 §2.2.3).
const KW_IV: u64 = 0xa6a6_a6a6_a6a6_a6a6;

/// Output of a key wrap operation.
pub struct Wrapped {
    /// The content encryption key the sender must encrypt with.
    pub cek: Zeroizing<Vec<u8>>,
    /// The encrypted key to place in the serialization (may be empty).
    pub encrypted_key: Vec<u8>,
    /// Ephemeral public key header parameter.
    pub epk: Option<Jwk>,
    /// PartyUInfo header parameter, Base64URL.
    pub apu: Option<String>,
    /// PartyVInfo header parameter, Base64URL.
    pub apv: Option<String>,
    /// Wrapping IV header parameter, Base64URL.
    pub iv: Option<String>,
    /// Wrapping tag header parameter, Base64URL.
    pub tag: Option<String>,
}

impl Wrapped {
    fn plain(cek: Vec<u8>, encrypted_key: Vec<u8>) -> Self {
        Self {
            cek: Zeroizing::new(cek),
            encrypted_key,
            epk: None,
            apu: None,
            apv: None,
            iv: None,
            tag: None,
        }
    }
}

/// Determine the content encryption key for a recipient and produce its
/// encrypted form plus any header parameters.
///
/// # Errors
///
/// `InvalidJwk` when the key fails the algorithm's type, size, curve, or
/// `alg`-binding requirements; `UnsupportedAlgorithm` for curves without
/// a backend.
pub fn wrap(
    alg: KeyAlgorithm, enc: ContentAlgorithm, key: &Jwk, apu: Option<&[u8]>, apv: Option<&[u8]>,
) -> Result<Wrapped> {
    key.ensure_alg(alg.as_str())?;

    match alg {
        KeyAlgorithm::Dir => {
            let cek = key.symmetric_key()?;
            if cek.len() != enc.key_len() {
                return Err(Error::InvalidJwk(format!(
                    "dir key must be {} octets for {enc}",
                    enc.key_len()
                )));
            }
            Ok(Wrapped::plain(cek, vec![]))
        }
        KeyAlgorithm::Rsa1_5 => {
            let cek = enc.generate_cek();
            let encrypted = key
                .rsa_public()?
                .encrypt(&mut OsRng, rsa::Pkcs1v15Encrypt, &cek)
                .map_err(|_| Error::InvalidJwk("RSA encryption failed".to_string()))?;
            Ok(Wrapped::plain(cek, encrypted))
        }
        KeyAlgorithm::RsaOaep
        | KeyAlgorithm::RsaOaep256
        | KeyAlgorithm::RsaOaep384
        | KeyAlgorithm::RsaOaep512 => {
            let cek = enc.generate_cek();
            let encrypted = key
                .rsa_public()?
                .encrypt(&mut OsRng, oaep_padding(alg), &cek)
                .map_err(|_| Error::InvalidJwk("RSA encryption failed".to_string()))?;
            Ok(Wrapped::plain(cek, encrypted))
        }
        KeyAlgorithm::A128Kw | KeyAlgorithm::A192Kw | KeyAlgorithm::A256Kw => {
            let kek = kek_bytes(key, kw_key_len(alg))?;
            let cek = enc.generate_cek();
            let encrypted = aes_wrap(&kek, &cek)?;
            Ok(Wrapped::plain(cek, encrypted))
        }
        KeyAlgorithm::A128GcmKw | KeyAlgorithm::A192GcmKw | KeyAlgorithm::A256GcmKw => {
            let kek = kek_bytes(key, kw_key_len(alg))?;
            let cek = enc.generate_cek();

            let iv = ContentAlgorithm::A128Gcm.generate_iv();
            let (encrypted, tag) = gcm_wrap(&kek, &iv, &cek)?;

            let mut wrapped = Wrapped::plain(cek, encrypted);
            wrapped.iv = Some(Base64UrlUnpadded::encode_string(&iv));
            wrapped.tag = Some(Base64UrlUnpadded::encode_string(&tag));
            Ok(wrapped)
        }
        KeyAlgorithm::EcdhEs => {
            let (z, epk) = agree_ephemeral(key)?;
            let keydatalen = bits(enc.key_len());
            let cek = concat_kdf(
                &z,
                enc.as_str().as_bytes(),
                apu.unwrap_or_default(),
                apv.unwrap_or_default(),
                keydatalen,
            );

            let mut wrapped = Wrapped::plain(cek, vec![]);
            wrapped.epk = Some(epk);
            wrapped.apu = apu.map(|b| Base64UrlUnpadded::encode_string(b));
            wrapped.apv = apv.map(|b| Base64UrlUnpadded::encode_string(b));
            Ok(wrapped)
        }
        KeyAlgorithm::EcdhEsA128Kw | KeyAlgorithm::EcdhEsA192Kw | KeyAlgorithm::EcdhEsA256Kw => {
            let (z, epk) = agree_ephemeral(key)?;
            let kek = Zeroizing::new(concat_kdf(
                &z,
                alg.as_str().as_bytes(),
                apu.unwrap_or_default(),
                apv.unwrap_or_default(),
                bits(kw_key_len(alg)),
            ));
            let cek = enc.generate_cek();
            let encrypted = aes_wrap(&kek, &cek)?;

            let mut wrapped = Wrapped::plain(cek, encrypted);
            wrapped.epk = Some(epk);
            wrapped.apu = apu.map(|b| Base64UrlUnpadded::encode_string(b));
            wrapped.apv = apv.map(|b| Base64UrlUnpadded::encode_string(b));
            Ok(wrapped)
        }
    }
}

/// Recover the content encryption key from the header and encrypted key.
///
/// Requires a private-capable key for the asymmetric algorithms.
///
/// # Errors
///
/// `InvalidJwk` for key mismatches, `InvalidJwe` when unwrapping fails.
pub fn unwrap(
    alg: KeyAlgorithm, enc: ContentAlgorithm, key: &Jwk, encrypted_key: &[u8], header: &Header,
) -> Result<Vec<u8>> {
    key.ensure_alg(alg.as_str())?;

    match alg {
        KeyAlgorithm::Dir => {
            if !encrypted_key.is_empty() {
                return Err(Error::InvalidJwe);
            }
            let cek = key.symmetric_key()?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
        KeyAlgorithm::Rsa1_5 => {
            let cek = private_rsa(key)?
                .decrypt(rsa::Pkcs1v15Encrypt, encrypted_key)
                .map_err(|_| Error::InvalidJwe)?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
        KeyAlgorithm::RsaOaep
        | KeyAlgorithm::RsaOaep256
        | KeyAlgorithm::RsaOaep384
        | KeyAlgorithm::RsaOaep512 => {
            let cek = private_rsa(key)?
                .decrypt(oaep_padding(alg), encrypted_key)
                .map_err(|_| Error::InvalidJwe)?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
        KeyAlgorithm::A128Kw | KeyAlgorithm::A192Kw | KeyAlgorithm::A256Kw => {
            let kek = kek_bytes(key, kw_key_len(alg))?;
            let cek = aes_unwrap(&kek, encrypted_key)?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
        KeyAlgorithm::A128GcmKw | KeyAlgorithm::A192GcmKw | KeyAlgorithm::A256GcmKw => {
            let kek = kek_bytes(key, kw_key_len(alg))?;
            let iv = header_param(header.iv.as_ref())?;
            let tag = header_param(header.tag.as_ref())?;
            let cek = gcm_unwrap(&kek, &iv, encrypted_key, &tag)?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
        KeyAlgorithm::EcdhEs => {
            if !encrypted_key.is_empty() {
                return Err(Error::InvalidJwe);
            }
            let z = agree_static(key, header)?;
            let cek = concat_kdf(
                &z,
                enc.as_str().as_bytes(),
                &header_param_or_empty(header.apu.as_ref())?,
                &header_param_or_empty(header.apv.as_ref())?,
                bits(enc.key_len()),
            );
            Ok(cek)
        }
        KeyAlgorithm::EcdhEsA128Kw | KeyAlgorithm::EcdhEsA192Kw | KeyAlgorithm::EcdhEsA256Kw => {
            let z = agree_static(key, header)?;
            let kek = Zeroizing::new(concat_kdf(
                &z,
                alg.as_str().as_bytes(),
                &header_param_or_empty(header.apu.as_ref())?,
                &header_param_or_empty(header.apv.as_ref())?,
                bits(kw_key_len(alg)),
            ));
            let cek = aes_unwrap(&kek, encrypted_key)?;
            enc.validate_cek(&cek)?;
            Ok(cek)
        }
    }
}

/// The Concat KDF of NIST SP 800-56A §5.8.1, instantiated with SHA-256.
///
/// `OtherInfo` is `LengthPrefix(algorithm_id) || LengthPrefix(apu) ||
/// LengthPrefix(apv) || keydatalen`, with 32-bit big-endian length
/// prefixes and `keydatalen` in bits. Hash rounds are counted with a
/// 32-bit big-endian counter starting at 1; the concatenated output is
/// truncated to `keydatalen / 8` octets.
#[must_use]
pub fn concat_kdf(z: &[u8], algorithm_id: &[u8], apu: &[u8], apv: &[u8], keydatalen: u32) -> Vec<u8> {
    let target = keydatalen as usize / 8;
    let rounds = target.div_ceil(Sha256::output_size());

    let mut derived = Vec::with_capacity(rounds * Sha256::output_size());
    for round in 1..=rounds {
        let mut hasher = Sha256::new();
        hasher.update(u32::try_from(round).unwrap_or(u32::MAX).to_be_bytes());
        hasher.update(z);
        for info in [algorithm_id, apu, apv] {
            hasher.update(u32::try_from(info.len()).unwrap_or(u32::MAX).to_be_bytes());
            hasher.update(info);
        }
        hasher.update(keydatalen.to_be_bytes());
        derived.extend_from_slice(&hasher.finalize());
    }
    derived.truncate(target);
    derived
}

// --- AES Key Wrap (RFC 3394) -------------------------------------------

fn aes_wrap(kek: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    match kek.len() {
        16 => aes_wrap_with::<aes::Aes128>(kek, plaintext),
        24 => aes_wrap_with::<aes::Aes192>(kek, plaintext),
        32 => aes_wrap_with::<aes::Aes256>(kek, plaintext),
        len => Err(Error::InvalidJwk(format!("{len}-octet key wrap key"))),
    }
}

fn aes_unwrap(kek: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    match kek.len() {
        16 => aes_unwrap_with::<aes::Aes128>(kek, ciphertext),
        24 => aes_unwrap_with::<aes::Aes192>(kek, ciphertext),
        32 => aes_unwrap_with::<aes::Aes256>(kek, ciphertext),
        len => Err(Error::InvalidJwk(format!("{len}-octet key wrap key"))),
    }
}

fn aes_wrap_with<C: BlockEncrypt + KeyInit>(kek: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.len() < 16 || plaintext.len() % 8 != 0 {
        return Err(Error::InvalidJwe);
    }
    let cipher = C::new_from_slice(kek).map_err(|_| Error::InvalidJwe)?;

    let n = plaintext.len() / 8;
    let mut a = KW_IV;
    let mut r: Vec<[u8; 8]> =
        plaintext.chunks_exact(8).map(|c| c.try_into().expect("8-octet chunk")).collect();

    for j in 0..6 {
        for (i, ri) in r.iter_mut().enumerate() {
            let mut block = GenericArray::default();
            block[..8].copy_from_slice(&a.to_be_bytes());
            block[8..].copy_from_slice(ri);
            cipher.encrypt_block(&mut block);

            let t = (n * j + i + 1) as u64;
            a = u64::from_be_bytes(block[..8].try_into().expect("8 octets")) ^ t;
            ri.copy_from_slice(&block[8..]);
        }
    }

    let mut out = Vec::with_capacity(8 + plaintext.len());
    out.extend_from_slice(&a.to_be_bytes());
    for ri in &r {
        out.extend_from_slice(ri);
    }
    Ok(out)
}

fn aes_unwrap_with<C: BlockDecrypt + KeyInit>(kek: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < 24 || ciphertext.len() % 8 != 0 {
        return Err(Error::InvalidJwe);
    }
    let cipher = C::new_from_slice(kek).map_err(|_| Error::InvalidJwe)?;

    let n = ciphertext.len() / 8 - 1;
    let mut a = u64::from_be_bytes(ciphertext[..8].try_into().expect("8 octets"));
    let mut r: Vec<[u8; 8]> =
        ciphertext[8..].chunks_exact(8).map(|c| c.try_into().expect("8-octet chunk")).collect();

    for j in (0..6).rev() {
        for i in (0..n).rev() {
            let t = (n * j + i + 1) as u64;
            let mut block = GenericArray::default();
            block[..8].copy_from_slice(&(a ^ t).to_be_bytes());
            block[8..].copy_from_slice(&r[i]);
            cipher.decrypt_block(&mut block);

            a = u64::from_be_bytes(block[..8].try_into().expect("8 octets"));
            r[i].copy_from_slice(&block[8..]);
        }
    }

    if a != KW_IV {
        return Err(Error::InvalidJwe);
    }
    Ok(r.concat())
}

// --- AES-GCM key wrap ---------------------------------------------------

fn gcm_wrap(kek: &[u8], iv: &[u8], cek: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let enc = match kek.len() {
        16 => ContentAlgorithm::A128Gcm,
        24 => ContentAlgorithm::A192Gcm,
        32 => ContentAlgorithm::A256Gcm,
        len => return Err(Error::InvalidJwk(format!("{len}-octet key wrap key"))),
    };
    enc.encrypt(kek, iv, cek, &[])
}

fn gcm_unwrap(kek: &[u8], iv: &[u8], encrypted_key: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
    let enc = match kek.len() {
        16 => ContentAlgorithm::A128Gcm,
        24 => ContentAlgorithm::A192Gcm,
        32 => ContentAlgorithm::A256Gcm,
        len => return Err(Error::InvalidJwk(format!("{len}-octet key wrap key"))),
    };
    enc.decrypt(kek, iv, encrypted_key, tag, &[])
}

// --- ECDH-ES ------------------------------------------------------------

/// Generate an ephemeral key on the recipient's curve and compute the
/// shared secret; returns the secret and the ephemeral public JWK.
fn agree_ephemeral(recipient: &Jwk) -> Result<(Zeroizing<Vec<u8>>, Jwk)> {
    match recipient.kty {
        KeyType::Ec => match recipient.ec_public()? {
            EcPublic::P256(public) => {
                let ephemeral = p256::ecdh::EphemeralSecret::random(&mut OsRng);
                let epk = ec_epk(Curve::P256, &ephemeral.public_key().to_encoded_point(false))?;
                let shared = ephemeral.diffie_hellman(&public);
                Ok((Zeroizing::new(shared.raw_secret_bytes().to_vec()), epk))
            }
            EcPublic::P384(public) => {
                let ephemeral = p384::ecdh::EphemeralSecret::random(&mut OsRng);
                let epk = ec_epk(Curve::P384, &ephemeral.public_key().to_encoded_point(false))?;
                let shared = ephemeral.diffie_hellman(&public);
                Ok((Zeroizing::new(shared.raw_secret_bytes().to_vec()), epk))
            }
            EcPublic::P521(public) => {
                let ephemeral = p521::ecdh::EphemeralSecret::random(&mut OsRng);
                let epk = ec_epk(Curve::P521, &ephemeral.public_key().to_encoded_point(false))?;
                let shared = ephemeral.diffie_hellman(&public);
                Ok((Zeroizing::new(shared.raw_secret_bytes().to_vec()), epk))
            }
        },
        KeyType::Okp => match recipient.curve()? {
            Curve::X25519 => {
                let ephemeral = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                let epk_public = x25519_dalek::PublicKey::from(&ephemeral);
                let epk = Jwk {
                    kty: KeyType::Okp,
                    crv: Some(Curve::X25519),
                    x: Some(Base64UrlUnpadded::encode_string(epk_public.as_bytes())),
                    ..Jwk::default()
                };
                let shared = ephemeral.diffie_hellman(&recipient.x25519_public()?);
                Ok((Zeroizing::new(shared.as_bytes().to_vec()), epk))
            }
            Curve::X448 => Err(Error::UnsupportedAlgorithm("no backend for X448".to_string())),
            crv => Err(Error::InvalidJwk(format!("{crv:?} cannot be used for key agreement"))),
        },
        kty => Err(Error::InvalidJwk(format!("{kty:?} keys cannot be used for key agreement"))),
    }
}

/// Recompute the shared secret from the recipient's private key and the
/// header's ephemeral public key.
fn agree_static(recipient: &Jwk, header: &Header) -> Result<Zeroizing<Vec<u8>>> {
    let epk = header
        .epk
        .as_ref()
        .ok_or_else(|| Error::InvalidJwk("missing `epk` header parameter".to_string()))?;
    if epk.kty != recipient.kty || epk.crv != recipient.crv {
        return Err(Error::InvalidJwk(
            "`epk` does not match the recipient key's type and curve".to_string(),
        ));
    }

    match recipient.kty {
        KeyType::Ec => {
            let z = match (recipient.ec_secret()?, epk.ec_public()?) {
                (EcSecret::P256(secret), EcPublic::P256(public)) => {
                    p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine())
                        .raw_secret_bytes()
                        .to_vec()
                }
                (EcSecret::P384(secret), EcPublic::P384(public)) => {
                    p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine())
                        .raw_secret_bytes()
                        .to_vec()
                }
                (EcSecret::P521(secret), EcPublic::P521(public)) => {
                    p521::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine())
                        .raw_secret_bytes()
                        .to_vec()
                }
                _ => return Err(Error::InvalidJwk("curve mismatch".to_string())),
            };
            Ok(Zeroizing::new(z))
        }
        KeyType::Okp => match recipient.curve()? {
            Curve::X25519 => {
                let shared = recipient.x25519_secret()?.diffie_hellman(&epk.x25519_public()?);
                Ok(Zeroizing::new(shared.as_bytes().to_vec()))
            }
            Curve::X448 => Err(Error::UnsupportedAlgorithm("no backend for X448".to_string())),
            crv => Err(Error::InvalidJwk(format!("{crv:?} cannot be used for key agreement"))),
        },
        kty => Err(Error::InvalidJwk(format!("{kty:?} keys cannot be used for key agreement"))),
    }
}

fn ec_epk(crv: Curve, point: &impl AsRef<[u8]>) -> Result<Jwk> {
    let bytes = point.as_ref();
    let width = crv.coordinate_width();
    if bytes.len() != 1 + 2 * width || bytes[0] != 0x04 {
        return Err(Error::InvalidJwk("expected an uncompressed EC point".to_string()));
    }
    Ok(Jwk {
        kty: KeyType::Ec,
        crv: Some(crv),
        x: Some(Base64UrlUnpadded::encode_string(&bytes[1..=width])),
        y: Some(Base64UrlUnpadded::encode_string(&bytes[1 + width..])),
        ..Jwk::default()
    })
}

// --- helpers ------------------------------------------------------------

fn oaep_padding(alg: KeyAlgorithm) -> rsa::Oaep {
    match alg {
        KeyAlgorithm::RsaOaep256 => rsa::Oaep::new::<Sha256>(),
        KeyAlgorithm::RsaOaep384 => rsa::Oaep::new::<Sha384>(),
        KeyAlgorithm::RsaOaep512 => rsa::Oaep::new::<Sha512>(),
        _ => rsa::Oaep::new::<Sha1>(),
    }
}

const fn kw_key_len(alg: KeyAlgorithm) -> usize {
    match alg {
        KeyAlgorithm::A128Kw | KeyAlgorithm::A128GcmKw | KeyAlgorithm::EcdhEsA128Kw => 16,
        KeyAlgorithm::A192Kw | KeyAlgorithm::A192GcmKw | KeyAlgorithm::EcdhEsA192Kw => 24,
        _ => 32,
    }
}

const fn bits(octets: usize) -> u32 {
    (octets * 8) as u32
}

fn kek_bytes(key: &Jwk, expected: usize) -> Result<Vec<u8>> {
    let k = key.symmetric_key()?;
    if k.len() != expected {
        return Err(Error::InvalidJwk(format!(
            "key wrap key must be {expected} octets, found {}",
            k.len()
        )));
    }
    Ok(k)
}

fn private_rsa(key: &Jwk) -> Result<rsa::RsaPrivateKey> {
    if !key.is_private() {
        return Err(Error::InvalidJwk("unwrap requires a private key".to_string()));
    }
    key.rsa_private()
}

fn header_param(param: Option<&String>) -> Result<Vec<u8>> {
    let value =
        param.ok_or_else(|| Error::InvalidJwk("missing key wrap header parameter".to_string()))?;
    Base64UrlUnpadded::decode_vec(value)
        .map_err(|_| Error::UnsupportedEncoding("header parameter is not Base64URL".to_string()))
}

fn header_param_or_empty(param: Option<&String>) -> Result<Vec<u8>> {
    param.map_or_else(|| Ok(vec![]), |value| {
        Base64UrlUnpadded::decode_vec(value).map_err(|_| {
            Error::UnsupportedEncoding("header parameter is not Base64URL".to_string())
        })
    })
}
