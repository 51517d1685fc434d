//! Pass-through crypto context.

use crate::{context::CryptoContext, error::CryptoError};

/// Crypto context that applies no protection at all.
///
/// Encrypt/decrypt and wrap/unwrap are identity transforms; signatures are
/// empty and always verify. Used for unauthenticated exchanges and as the
/// default context while no keys have been negotiated yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCryptoContext;

impl CryptoContext for NullCryptoContext {
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(data.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(ciphertext.to_vec())
    }

    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(Vec::new())
    }

    fn verify(&self, _data: &[u8], _signature: &[u8]) -> Result<bool, CryptoError> {
        Ok(true)
    }

    fn wrap(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(key.to_vec())
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(wrapped.to_vec())
    }
}
