use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand_core::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Password fed to the KDF. The key only has to be unpredictable, not secret.
const KDF_PASSWORD: &[u8] = b"password";
const KDF_ITERATIONS: u32 = 1000;
const SALT_LEN: usize = 16;

/// Length of a derived AES-256 key in bytes.
pub const AES_KEY_LEN: usize = 32;

/// Base64-encoded symmetric key, as sent in a secret payload.
#[derive(Clone, Debug, PartialEq, Eq, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SymmetricKey(String);

impl SymmetricKey {
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    /// True when the base64 encoding of `payload` equals this key.
    pub fn matches_payload(&self, payload: &[u8]) -> bool {
        STANDARD.encode(payload) == self.0
    }
}

/// Derive 32 bytes with PBKDF2-HMAC-SHA256.
pub fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> Zeroizing<[u8; AES_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; AES_KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, key.as_mut());
    key
}

/// Create a fresh AES-256 key under a random salt, base64-encoded.
pub fn create_aes_key() -> SymmetricKey {
    let mut salt = [0u8; SALT_LEN];
    rand_core::OsRng.fill_bytes(&mut salt);
    let key = derive_key(KDF_PASSWORD, &salt, KDF_ITERATIONS);
    SymmetricKey(STANDARD.encode(key.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_matches_known_vector() {
        // PBKDF2-HMAC-SHA256, P = "password", S = "salt", c = 1, dkLen = 32
        let key = derive_key(b"password", b"salt", 1);
        assert_eq!(
            hex::encode(key.as_ref()),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
    }

    #[test]
    fn create_aes_key_is_32_bytes_base64() {
        let key = create_aes_key();
        let raw = STANDARD.decode(key.as_base64()).unwrap();
        assert_eq!(raw.len(), AES_KEY_LEN);
        assert_eq!(key.as_base64().len(), 44);
    }

    #[test]
    fn create_aes_key_uses_fresh_salt() {
        assert_ne!(create_aes_key(), create_aes_key());
    }

    #[test]
    fn matches_payload_compares_encoding() {
        let key = create_aes_key();
        let raw = STANDARD.decode(key.as_base64()).unwrap();
        assert!(key.matches_payload(&raw));

        let mut tampered = raw.clone();
        tampered[0] ^= 0x01;
        assert!(!key.matches_payload(&tampered));
    }
}
