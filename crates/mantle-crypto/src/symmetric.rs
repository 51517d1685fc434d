//! Symmetric session crypto context.
//!
//! Encrypt/decrypt and wrap/unwrap use XChaCha20-Poly1305 under two
//! independent keys; sign/verify is HMAC-SHA256 under a third. The three
//! keys are either supplied directly (key-exchange output) or derived from a
//! master secret with HKDF using per-purpose info labels.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{context::CryptoContext, error::CryptoError};

/// Key size for all three context keys, in bytes.
pub const KEY_SIZE: usize = 32;

const NONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

const ENCRYPTION_INFO: &[u8] = b"mantle encryption key";
const SIGNATURE_INFO: &[u8] = b"mantle hmac key";
const WRAP_INFO: &[u8] = b"mantle wrap key";

/// Crypto context over a fixed symmetric key set.
pub struct SymmetricCryptoContext {
    cipher: XChaCha20Poly1305,
    wrap_cipher: XChaCha20Poly1305,
    signature_key: [u8; KEY_SIZE],
}

impl SymmetricCryptoContext {
    /// Create a context from encryption, signature, and wrap keys.
    #[must_use]
    pub fn new(
        encryption_key: &[u8; KEY_SIZE],
        signature_key: &[u8; KEY_SIZE],
        wrap_key: &[u8; KEY_SIZE],
    ) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(encryption_key.into()),
            wrap_cipher: XChaCha20Poly1305::new(wrap_key.into()),
            signature_key: *signature_key,
        }
    }

    /// Derive a context from a master secret, salted by the entity identity.
    ///
    /// The same secret and identity always derive the same context, so both
    /// ends of an exchange arrive at interoperable keys.
    pub fn derive(master_secret: &[u8], identity: &str) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(identity.as_bytes()), master_secret);
        let mut encryption_key = [0_u8; KEY_SIZE];
        let mut signature_key = [0_u8; KEY_SIZE];
        let mut wrap_key = [0_u8; KEY_SIZE];
        for (info, key) in [
            (ENCRYPTION_INFO, &mut encryption_key),
            (SIGNATURE_INFO, &mut signature_key),
            (WRAP_INFO, &mut wrap_key),
        ] {
            hk.expand(info, key).map_err(|_| CryptoError::KeyMismatch("key derivation"))?;
        }
        Ok(Self::new(&encryption_key, &signature_key, &wrap_key))
    }

    fn seal(cipher: &XChaCha20Poly1305, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext =
            cipher.encrypt(&nonce, data).map_err(|_| CryptoError::KeyMismatch("encrypt"))?;
        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn open(cipher: &XChaCha20Poly1305, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Malformed("ciphertext shorter than nonce and tag"));
        }
        let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
        cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::KeyMismatch("decrypt"))
    }

    fn mac(&self) -> Result<Hmac<Sha256>, CryptoError> {
        // Qualified: the aead KeyInit import also supplies new_from_slice.
        <Hmac<Sha256> as Mac>::new_from_slice(&self.signature_key)
            .map_err(|_| CryptoError::KeyMismatch("hmac key"))
    }
}

impl CryptoContext for SymmetricCryptoContext {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::seal(&self.cipher, data)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::open(&self.cipher, ciphertext)
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.verify_slice(signature).is_ok())
    }

    fn wrap(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::seal(&self.wrap_cipher, key)
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Self::open(&self.wrap_cipher, wrapped)
    }
}
