//! Mantle protocol core logic.
//!
//! This crate turns application data into a sequence of cryptographically
//! protected, ordered payload chunks behind a negotiated header, and models
//! the entity authentication claims those exchanges rest on.
//!
//! # Architecture
//!
//! The protocol layer is decoupled from concrete transports: a
//! [`output::MessageOutputStream`] writes to any `AsyncWrite` byte sink, and
//! every suspension point is timeout-aware and cooperatively abortable. The
//! four-way completion distinction (success, timeout, abort, error) is kept
//! explicit in [`outcome::Outcome`] rather than collapsed into one error
//! type: an abort is an operator request and never reported as a failure.
//!
//! Configuration (clock, randomness, capabilities, crypto contexts, factory
//! registries) enters through the [`context::MslContext`] boundary. The core
//! consumes that boundary; it does not implement token issuance, persistent
//! storage, or key-exchange negotiation.
//!
//! # Components
//!
//! - [`output`]: Message output stream state machine
//! - [`payload`]: Payload chunk construction and verification
//! - [`entityauth`]: Entity authentication data variants
//! - [`context`]: MSL context configuration boundary
//! - [`compress`]: Payload compression algorithms
//! - [`error`]: Core error taxonomy

pub mod compress;
pub mod context;
pub mod entityauth;
pub mod error;
pub mod outcome;
pub mod output;
pub mod payload;

pub use context::{EntityAuthenticationRegistry, MslContext, MslStore, TokenFactory};
pub use entityauth::{EntityAuthScheme, EntityAuthenticationData, EntityAuthenticationFactory};
pub use error::MslError;
pub use outcome::Outcome;
pub use output::{AbortHandle, MessageOutputStream};
pub use payload::PayloadChunk;
