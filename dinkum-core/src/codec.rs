/// ES3 container encoding/decoding
///
/// Layout: [iv(16) | AES-128-CBC(payload, PKCS#7)]
/// where payload is UTF-8 JSON, optionally gzip-compressed.
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rand::RngCore;
use rand::rngs::OsRng;
use std::io::{Read, Write};
use tracing::{debug, error, info};

use crate::crypto::{IV_LEN, PASSWORD, derive_key};
use crate::error::Es3Error;

/// gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Checks if a decrypted payload is gzip-compressed
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Encoder/decoder for ES3 files protected with a given password
///
/// `Es3Codec::default()` uses Dinkum's password. The codec holds no
/// per-call state, so one instance can be shared between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Es3Codec {
    password: String,
}

impl Default for Es3Codec {
    fn default() -> Self {
        Self::new(PASSWORD)
    }
}

impl Es3Codec {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// Decrypt an ES3 blob into its JSON text
    pub fn decode(&self, data: &[u8]) -> Result<String, Es3Error> {
        info!("Decrypting ES3 file ({} bytes)", data.len());

        self.decode_inner(data)
            .map_err(Es3Error::into_decryption)
            .inspect(|_| info!("Successfully decrypted ES3 file"))
            .inspect_err(|e| error!("Failed to decrypt ES3 file: {}", e))
    }

    fn decode_inner(&self, data: &[u8]) -> Result<String, Es3Error> {
        if data.len() < IV_LEN {
            return Err(Es3Error::Decryption(format!(
                "file too short: {} bytes, need at least {}",
                data.len(),
                IV_LEN
            )));
        }

        let (iv, cipher) = data.split_at(IV_LEN);
        debug!(iv_len = iv.len(), cipher_len = cipher.len(), "split ES3 blob");

        let key = derive_key(&self.password, iv)?;
        let mut plain = key.decrypt(iv, cipher)?;

        if is_gzip(&plain) {
            debug!("Data is gzipped, decompressing...");
            plain = gunzip(&plain)?;
            debug!("Decompressed size: {} bytes", plain.len());
        }

        String::from_utf8(plain)
            .map_err(|e| Es3Error::Decryption(format!("payload is not valid UTF-8: {}", e)))
    }

    /// Encrypt JSON text into an ES3 blob with a fresh random IV
    pub fn encode(&self, json: &str, gzip: bool) -> Result<Vec<u8>, Es3Error> {
        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| Es3Error::Encryption(format!("failed to generate IV: {}", e)))?;

        self.encode_with_iv(json, gzip, iv)
    }

    /// Encrypt with a caller-chosen IV. Only tests may pin the IV.
    pub(crate) fn encode_with_iv(
        &self,
        json: &str,
        gzip: bool,
        iv: [u8; IV_LEN],
    ) -> Result<Vec<u8>, Es3Error> {
        info!("Encrypting data ({} characters)", json.chars().count());

        self.encode_inner(json, gzip, iv)
            .map_err(Es3Error::into_encryption)
            .inspect(|out| info!("Successfully encrypted data ({} bytes)", out.len()))
            .inspect_err(|e| error!("Failed to encrypt data: {}", e))
    }

    fn encode_inner(&self, json: &str, gzip: bool, iv: [u8; IV_LEN]) -> Result<Vec<u8>, Es3Error> {
        let mut plain = json.as_bytes().to_vec();

        if gzip {
            debug!("Compressing data with gzip...");
            plain = gzip_bytes(&plain)?;
            debug!("Compressed size: {} bytes", plain.len());
        }

        let key = derive_key(&self.password, &iv)?;
        let cipher = key.encrypt(&iv, &plain)?;

        let mut out = Vec::with_capacity(IV_LEN + cipher.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&cipher);
        Ok(out)
    }
}

/// Decrypt an ES3 blob with Dinkum's password
pub fn decode(data: &[u8]) -> Result<String, Es3Error> {
    Es3Codec::default().decode(data)
}

/// Encrypt JSON text with Dinkum's password
pub fn encode(json: &str, gzip: bool) -> Result<Vec<u8>, Es3Error> {
    Es3Codec::default().encode(json, gzip)
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, Es3Error> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Es3Error::Decryption(format!("corrupt gzip stream: {}", e)))?;
    Ok(out)
}

fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>, Es3Error> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| Es3Error::Encryption(format!("gzip compression failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    const IV: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x1f]));
        assert!(!is_gzip(b"{}"));
    }

    #[test]
    fn test_x_equals_1_roundtrip() {
        let enc = encode("{\"x\":1}", false).unwrap();
        let dec = decode(&enc).unwrap();

        let parsed: Value = serde_json::from_str(&dec).unwrap();
        assert_eq!(parsed, json!({"x": 1}));
    }

    #[test]
    fn test_blob_layout() {
        let codec = Es3Codec::default();
        let enc = codec.encode_with_iv("{\"x\":1}", false, IV).unwrap();

        assert_eq!(&enc[..16], &IV);
        // 7 bytes of JSON pad up to a single block
        assert_eq!(enc.len(), 32);
    }

    #[test]
    fn test_gzip_is_transparent() {
        let text = "{\r\n\t\"gzip\" : true\r\n}";
        let enc = encode(text, true).unwrap();

        // peek under the cipher: the payload must carry the gzip magic
        let key = derive_key(PASSWORD, &enc[..16]).unwrap();
        let plain = key.decrypt(&enc[..16], &enc[16..]).unwrap();
        assert!(is_gzip(&plain));

        assert_eq!(decode(&enc).unwrap(), text);
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let a = encode("same", false).unwrap();
        let b = encode("same", false).unwrap();

        assert_ne!(a, b);
        assert_ne!(&a[..16], &b[..16]);
        assert_eq!(decode(&a).unwrap(), "same");
        assert_eq!(decode(&b).unwrap(), "same");
    }

    #[test]
    fn test_wrong_password_fails() {
        let text = "{\"playerName\":\"Sheila\",\"money\":15230,\"bankBalance\":250000}";
        let enc = Es3Codec::new("not-the-password")
            .encode_with_iv(text, false, IV)
            .unwrap();

        let err = decode(&enc).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(_)));
    }

    #[test]
    fn test_short_input_fails() {
        for len in [0, 1, 15] {
            let err = decode(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, Es3Error::Decryption(_)), "len {}", len);
        }
    }

    #[test]
    fn test_iv_only_fails() {
        let err = decode(&IV).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(_)));
    }

    #[test]
    fn test_corrupt_gzip_fails() {
        // gzip magic followed by garbage
        let mut payload = vec![0x1f, 0x8b];
        payload.extend_from_slice(b"definitely not deflate");

        let key = derive_key(PASSWORD, &IV).unwrap();
        let mut blob = IV.to_vec();
        blob.extend(key.encrypt(&IV, &payload).unwrap());

        let err = decode(&blob).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(ref m) if m.contains("gzip")));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let key = derive_key(PASSWORD, &IV).unwrap();
        let mut blob = IV.to_vec();
        blob.extend(key.encrypt(&IV, &[0xff, 0xfe, 0xfd]).unwrap());

        let err = decode(&blob).unwrap_err();
        assert!(matches!(err, Es3Error::Decryption(ref m) if m.contains("UTF-8")));
    }

    #[test]
    fn test_unicode_text_roundtrip() {
        let text = "{\"playerName\":\"Zoë 🐨\"}";
        for gzip in [false, true] {
            let enc = encode(text, gzip).unwrap();
            assert_eq!(decode(&enc).unwrap(), text);
        }
    }
}
