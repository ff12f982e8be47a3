/// PBKDF2 key derivation and AES-128-CBC for ES3 payloads
use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;
use std::fmt;

use crate::error::Es3Error;

/// ES3 password from Dinkum's save settings
pub const PASSWORD: &str = "jamesbendon";

/// PBKDF2 rounds used by ES3 (fixed by the format)
pub const PBKDF2_ITERATIONS: u32 = 100;

/// AES-128 key length in bytes
pub const KEY_LEN: usize = 16;

/// IV length in bytes; the IV doubles as the PBKDF2 salt
pub const IV_LEN: usize = 16;

/// AES block size in bytes
pub const BLOCK_LEN: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES-128 key derived for a single blob
///
/// The key bytes never leave this type; the only things it can do are
/// CBC encryption and decryption.
pub struct CipherKey([u8; KEY_LEN]);

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

/// Derives the AES-128 key for `salt` with PBKDF2-HMAC-SHA1
pub fn derive_key(password: &str, salt: &[u8]) -> Result<CipherKey, Es3Error> {
    if salt.len() != IV_LEN {
        return Err(Es3Error::KeyDerivation(format!(
            "salt must be {} bytes, got {}",
            IV_LEN,
            salt.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);

    Ok(CipherKey(key))
}

impl CipherKey {
    /// Encrypts `plain` with PKCS#7 padding
    pub fn encrypt(&self, iv: &[u8], plain: &[u8]) -> Result<Vec<u8>, Es3Error> {
        let enc = Aes128CbcEnc::new_from_slices(&self.0, iv)
            .map_err(|e| Es3Error::Encryption(format!("invalid IV: {}", e)))?;

        Ok(enc.encrypt_padded_vec_mut::<Pkcs7>(plain))
    }

    /// Decrypts `cipher` and strips PKCS#7 padding
    pub fn decrypt(&self, iv: &[u8], cipher: &[u8]) -> Result<Vec<u8>, Es3Error> {
        if cipher.is_empty() || cipher.len() % BLOCK_LEN != 0 {
            return Err(Es3Error::Decryption(format!(
                "ciphertext length {} is not a positive multiple of {}",
                cipher.len(),
                BLOCK_LEN
            )));
        }

        let dec = Aes128CbcDec::new_from_slices(&self.0, iv)
            .map_err(|e| Es3Error::Decryption(format!("invalid IV: {}", e)))?;

        dec.decrypt_padded_vec_mut::<Pkcs7>(cipher).map_err(|_| {
            Es3Error::Decryption("bad padding (wrong password or corrupted file)".to_string())
        })
    }

    #[cfg(test)]
    pub(crate) fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_derive_key_known_vector() {
        // Reference value from Python's hashlib.pbkdf2_hmac("sha1", ...)
        let key = derive_key(PASSWORD, &SALT).unwrap();
        assert_eq!(
            key.bytes(),
            &[
                0x3d, 0x19, 0x81, 0xc1, 0xc6, 0x57, 0x59, 0x95, 0x36, 0x94, 0xe5, 0x48, 0xfe, 0x85,
                0x02, 0xd4,
            ]
        );
    }

    #[test]
    fn test_derive_key_depends_on_salt() {
        let mut other = SALT;
        other[15] ^= 0xff;

        let a = derive_key(PASSWORD, &SALT).unwrap();
        let b = derive_key(PASSWORD, &other).unwrap();
        assert_ne!(a.bytes(), b.bytes());
    }

    #[test]
    fn test_derive_key_rejects_bad_salt() {
        let err = derive_key(PASSWORD, &SALT[..8]).unwrap_err();
        assert!(matches!(err, Es3Error::KeyDerivation(_)));
    }

    #[test]
    fn test_debug_hides_key() {
        let key = derive_key(PASSWORD, &SALT).unwrap();
        assert_eq!(format!("{:?}", key), "CipherKey(..)");
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = derive_key(PASSWORD, &SALT).unwrap();
        let data = b"Hello, World!";

        let encrypted = key.encrypt(&SALT, data).unwrap();
        assert_eq!(encrypted.len(), 16);

        let decrypted = key.decrypt(&SALT, &encrypted).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_full_block_gets_extra_padding_block() {
        let key = derive_key(PASSWORD, &SALT).unwrap();
        let encrypted = key.encrypt(&SALT, &[7u8; 32]).unwrap();
        assert_eq!(encrypted.len(), 48);
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        let key = derive_key(PASSWORD, &SALT).unwrap();
        let err = key.decrypt(&SALT, &[0u8; 15]).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(_)));

        let err = key.decrypt(&SALT, &[]).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(_)));
    }
}
