//! Cryptographic contexts for the Mantle protocol.
//!
//! A crypto context is the capability bundle a message exchange holds: it can
//! encrypt/decrypt, sign/verify, and wrap/unwrap keys, with all key material
//! fixed at construction. Payload chunk protection and entity authentication
//! consume contexts only through the [`CryptoContext`] trait, so sessions can
//! swap key-exchange-derived contexts for pre-provisioned ones without
//! touching the protocol layer.
//!
//! # Security
//!
//! Encryption and key wrap use XChaCha20-Poly1305 with random nonces, so the
//! same context never produces the same ciphertext twice. Signatures are
//! HMAC-SHA256 and verification is constant-time. No operation ever succeeds
//! with corrupted output; every failure is a typed [`CryptoError`].

pub mod context;
pub mod error;
pub mod null;
pub mod symmetric;

pub use context::CryptoContext;
pub use error::CryptoError;
pub use null::NullCryptoContext;
pub use symmetric::{SymmetricCryptoContext, KEY_SIZE};
