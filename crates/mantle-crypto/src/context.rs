//! The crypto context contract.

use crate::error::CryptoError;

/// Bound set of cryptographic operations for one session or message exchange.
///
/// Implementations hold their key material immutably and carry no other
/// state, so a single context can be shared across any number of streams
/// (typically as an `Arc<dyn CryptoContext>`).
///
/// # Contract
///
/// For any context `c` and input `x`:
/// - `c.decrypt(c.encrypt(x)?)? == x`
/// - `c.verify(x, &c.sign(x)?)? == true`
/// - `c.unwrap_key(c.wrap(k)?)? == k`
///
/// Operations are deterministic in that sense even when the ciphertext
/// itself is randomized. Failures never yield corrupted output.
pub trait CryptoContext: Send + Sync {
    /// Encrypt `data`, returning ciphertext.
    fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt `ciphertext`, returning the original plaintext.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Compute an integrity signature over `data`.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Verify `signature` against `data`.
    ///
    /// A wrong-but-well-formed signature is `Ok(false)`, not an error;
    /// errors are reserved for inputs the context cannot process at all.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, CryptoError>;

    /// Wrap raw key material for transport.
    fn wrap(&self, key: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Unwrap previously wrapped key material.
    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
