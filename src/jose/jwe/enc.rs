//! # JWE Content Encryption
//!
//! The authenticated content encryption backends of RFC 7518 §5:
//! `AES_CBC_HMAC_SHA2` (encrypt-then-MAC composition) and AES-GCM.
//!
//! Both families expose the same contract: generate a content encryption
//! key and initialization vector, encrypt to a ciphertext/tag pair over
//! additional authenticated data, and decrypt with constant-time tag
//! verification. All failures on the decrypt path are the opaque
//! [`Error::InvalidJwe`].

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes_gcm::aead::AeadCore;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::generic_array::typenum::{U12, U16};
use aes_gcm::{AeadInPlace, Aes128Gcm, Aes256Gcm, KeyInit};
use hmac::{Mac, SimpleHmac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use crate::jose::jwa::ContentAlgorithm;
use crate::jose::{Error, Result};

type Aes192Gcm = aes_gcm::AesGcm<aes::Aes192, U12>;

impl ContentAlgorithm {
    /// Content encryption key length in octets.
    ///
    /// The CBC-HMAC family uses a double-length key, split into a MAC half
    /// and an encryption half.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
        }
    }

    /// Initialization vector length in octets.
    #[must_use]
    pub const fn iv_len(self) -> usize {
        match self {
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => 16,
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 12,
        }
    }

    /// Authentication tag length in octets.
    #[must_use]
    pub const fn tag_len(self) -> usize {
        match self {
            Self::A128CbcHs256 => 16,
            Self::A192CbcHs384 => 24,
            Self::A256CbcHs512 => 32,
            Self::A128Gcm | Self::A192Gcm | Self::A256Gcm => 16,
        }
    }

    /// Generate a fresh content encryption key.
    #[must_use]
    pub fn generate_cek(self) -> Vec<u8> {
        let mut cek = vec![0u8; self.key_len()];
        OsRng.fill_bytes(&mut cek);
        cek
    }

    /// Generate a fresh initialization vector.
    #[must_use]
    pub fn generate_iv(self) -> Vec<u8> {
        let mut iv = vec![0u8; self.iv_len()];
        OsRng.fill_bytes(&mut iv);
        iv
    }

    /// Check a content encryption key's length.
    ///
    /// # Errors
    ///
    /// `InvalidJwe` on a length mismatch.
    pub fn validate_cek(self, key: &[u8]) -> Result<()> {
        if key.len() == self.key_len() {
            Ok(())
        } else {
            Err(Error::InvalidJwe)
        }
    }

    /// Encrypt a plaintext, authenticating `aad`.
    ///
    /// Returns the ciphertext and the authentication tag.
    ///
    /// # Errors
    ///
    /// `InvalidJwe` on a key or IV length mismatch.
    pub fn encrypt(
        self, key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        self.validate_cek(key)?;
        if iv.len() != self.iv_len() {
            return Err(Error::InvalidJwe);
        }

        match self {
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => {
                let (mac_key, enc_key) = key.split_at(key.len() / 2);
                let ciphertext = match self {
                    Self::A128CbcHs256 => cbc::Encryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
                    Self::A192CbcHs384 => cbc::Encryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
                    _ => cbc::Encryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
                };
                let tag = self.cbc_tag(mac_key, aad, iv, &ciphertext);
                Ok((ciphertext, tag))
            }
            Self::A128Gcm => gcm_encrypt::<Aes128Gcm>(key, iv, plaintext, aad),
            Self::A192Gcm => gcm_encrypt::<Aes192Gcm>(key, iv, plaintext, aad),
            Self::A256Gcm => gcm_encrypt::<Aes256Gcm>(key, iv, plaintext, aad),
        }
    }

    /// Decrypt a ciphertext, verifying the authentication tag over `aad`.
    ///
    /// # Errors
    ///
    /// `InvalidJwe` on any failure: bad lengths, tag mismatch, or invalid
    /// padding. No further diagnostic is attached.
    pub fn decrypt(
        self, key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8],
    ) -> Result<Vec<u8>> {
        self.validate_cek(key)?;
        if iv.len() != self.iv_len() || tag.len() != self.tag_len() {
            return Err(Error::InvalidJwe);
        }

        match self {
            Self::A128CbcHs256 | Self::A192CbcHs384 | Self::A256CbcHs512 => {
                let (mac_key, enc_key) = key.split_at(key.len() / 2);
                let expected = self.cbc_tag(mac_key, aad, iv, ciphertext);
                if !bool::from(expected.ct_eq(tag)) {
                    return Err(Error::InvalidJwe);
                }

                match self {
                    Self::A128CbcHs256 => cbc::Decryptor::<aes::Aes128>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| Error::InvalidJwe),
                    Self::A192CbcHs384 => cbc::Decryptor::<aes::Aes192>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| Error::InvalidJwe),
                    _ => cbc::Decryptor::<aes::Aes256>::new_from_slices(enc_key, iv)
                        .map_err(|_| Error::InvalidJwe)?
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| Error::InvalidJwe),
                }
            }
            Self::A128Gcm => gcm_decrypt::<Aes128Gcm>(key, iv, ciphertext, tag, aad),
            Self::A192Gcm => gcm_decrypt::<Aes192Gcm>(key, iv, ciphertext, tag, aad),
            Self::A256Gcm => gcm_decrypt::<Aes256Gcm>(key, iv, ciphertext, tag, aad),
        }
    }

    /// Tag = first half of `HMAC-SHA-2k(macKey, AAD || IV || C || AL)`
    /// where AL is the AAD length in bits as a 64-bit big-endian integer.
    fn cbc_tag(self, mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        let full = match self {
            Self::A128CbcHs256 => cbc_mac::<Sha256>(mac_key, aad, iv, ciphertext),
            Self::A192CbcHs384 => cbc_mac::<Sha384>(mac_key, aad, iv, ciphertext),
            _ => cbc_mac::<Sha512>(mac_key, aad, iv, ciphertext),
        };
        full[..self.tag_len()].to_vec()
    }
}

fn cbc_mac<D>(mac_key: &[u8], aad: &[u8], iv: &[u8], ciphertext: &[u8]) -> Vec<u8>
where
    D: sha2::Digest + sha2::digest::core_api::BlockSizeUser,
{
    let al = (u64::try_from(aad.len()).unwrap_or(u64::MAX) * 8).to_be_bytes();
    let mut mac =
        <SimpleHmac<D> as Mac>::new_from_slice(mac_key).expect("any key length is accepted");
    mac.update(aad);
    mac.update(iv);
    mac.update(ciphertext);
    mac.update(&al);
    mac.finalize().into_bytes().to_vec()
}

fn gcm_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<(Vec<u8>, Vec<u8>)>
where
    C: AeadInPlace + KeyInit + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidJwe)?;
    let mut buf = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(iv), aad, &mut buf)
        .map_err(|_| Error::InvalidJwe)?;
    Ok((buf, tag.to_vec()))
}

fn gcm_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> Result<Vec<u8>>
where
    C: AeadInPlace + KeyInit + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let mut buf = ciphertext.to_vec();
    let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidJwe)?;
    cipher
        .decrypt_in_place_detached(GenericArray::from_slice(iv), aad, &mut buf, GenericArray::from_slice(tag))
        .map_err(|_| Error::InvalidJwe)?;
    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;

    // Appendix B.1 of RFC 7518: AES_128_CBC_HMAC_SHA_256.
    #[test]
    fn a128cbc_hs256_vector() {
        let key = hex::decode("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
            .unwrap();
        let plaintext = hex::decode(
            "41206369706865722073797374656d206d757374206e6f742062652072657175697265642074\
             6f206265207365637265742c20616e64206974206d7573742062652061626c6520746f206661\
             6c6c20696e746f207468652068616e6473206f662074686520656e656d7920776974686f7574\
             20696e636f6e76656e69656e6365",
        )
        .unwrap();
        let iv = hex::decode("1af38c2dc2b96ffdd86694092341bc04").unwrap();
        let aad = hex::decode(
            "546865207365636f6e64207072696e6369706c65206f662041756775737465204b6572636b686f666673",
        )
        .unwrap();

        let (ciphertext, tag) =
            ContentAlgorithm::A128CbcHs256.encrypt(&key, &iv, &plaintext, &aad).unwrap();
        assert_eq!(
            hex::encode(&ciphertext),
            "c80edfa32ddf39d5ef00c0b468834279a2e46a1b8049f792f76bfe54b903a9c9a94ac9b47ad2655c\
             5f10f9aef71427e2fc6f9b3f399a221489f16362c703233609d45ac69864e3321cf82935ac4096c8\
             6e133314c540199e8ca7980dfa4b9cf1b384c486f3a54c51078158ee5d79de59fbd34d848b3d695\
             50a67646344427ade54b8851ffb598f7f80074b9473c82e2db"
        );
        assert_eq!(hex::encode(&tag), "652c3fa36b0a7c5b3219fab3a30bc1c4");

        let decrypted = ContentAlgorithm::A128CbcHs256
            .decrypt(&key, &iv, &ciphertext, &tag, &aad)
            .unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn gcm_round_trip() {
        for enc in [
            ContentAlgorithm::A128Gcm,
            ContentAlgorithm::A192Gcm,
            ContentAlgorithm::A256Gcm,
        ] {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            assert_eq!(iv.len(), 12);

            let (ciphertext, tag) = enc.encrypt(&cek, &iv, b"plaintext", b"aad").unwrap();
            assert_eq!(tag.len(), 16);
            assert_eq!(enc.decrypt(&cek, &iv, &ciphertext, &tag, b"aad").unwrap(), b"plaintext");
        }
    }

    #[test]
    fn tampering_is_detected() {
        for enc in [ContentAlgorithm::A256CbcHs512, ContentAlgorithm::A256Gcm] {
            let cek = enc.generate_cek();
            let iv = enc.generate_iv();
            let (ciphertext, tag) = enc.encrypt(&cek, &iv, b"plaintext", b"aad").unwrap();

            let mut bad_ct = ciphertext.clone();
            bad_ct[0] ^= 0x01;
            assert_eq!(enc.decrypt(&cek, &iv, &bad_ct, &tag, b"aad"), Err(Error::InvalidJwe));

            let mut bad_tag = tag.clone();
            bad_tag[0] ^= 0x01;
            assert_eq!(
                enc.decrypt(&cek, &iv, &ciphertext, &bad_tag, b"aad"),
                Err(Error::InvalidJwe)
            );

            let mut bad_iv = iv.clone();
            bad_iv[0] ^= 0x01;
            assert_eq!(
                enc.decrypt(&cek, &bad_iv, &ciphertext, &tag, b"aad"),
                Err(Error::InvalidJwe)
            );

            assert_eq!(
                enc.decrypt(&cek, &iv, &ciphertext, &tag, b"tampered"),
                Err(Error::InvalidJwe)
            );
        }
    }

    #[test]
    fn cek_length_enforced() {
        assert!(ContentAlgorithm::A128Gcm.validate_cek(&[0u8; 16]).is_ok());
        assert!(ContentAlgorithm::A128Gcm.validate_cek(&[0u8; 32]).is_err());
        assert!(ContentAlgorithm::A256CbcHs512.validate_cek(&[0u8; 64]).is_ok());
        assert!(ContentAlgorithm::A256CbcHs512.validate_cek(&[0u8; 32]).is_err());
    }
}
