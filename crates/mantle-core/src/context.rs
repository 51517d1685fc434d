//! MSL context configuration boundary.
//!
//! Everything the core needs from its environment arrives through
//! [`MslContext`]: clock, randomness, capabilities, the entity's own
//! authentication claim, crypto contexts, and the factory registries. Token
//! issuance and persistent storage stay behind the [`TokenFactory`] and
//! [`MslStore`] boundaries; the core consumes those interfaces and never
//! implements them.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::SystemTime,
};

use mantle_crypto::CryptoContext;
use mantle_proto::MessageCapabilities;

use crate::entityauth::{EntityAuthScheme, EntityAuthenticationData, EntityAuthenticationFactory};

/// Configuration and collaborator surface for one MSL deployment.
pub trait MslContext: Send + Sync {
    /// Current time.
    fn time(&self) -> SystemTime;

    /// Random value from the context's RNG.
    fn random(&self) -> u64;

    /// Whether this context participates in peer-to-peer exchanges.
    fn is_peer_to_peer(&self) -> bool;

    /// Local message capabilities, if any are advertised.
    fn message_capabilities(&self) -> Option<MessageCapabilities>;

    /// This entity's own authentication claim.
    fn entity_authentication_data(&self) -> EntityAuthenticationData;

    /// Crypto context protecting MSL-level structures such as
    /// master-token-protected authentication data.
    fn msl_crypto_context(&self) -> Arc<dyn CryptoContext>;

    /// Registered factory for the given scheme, if any.
    fn entity_authentication_factory(
        &self,
        scheme: EntityAuthScheme,
    ) -> Option<Arc<dyn EntityAuthenticationFactory>>;

    /// Master-token issuance collaborator.
    fn token_factory(&self) -> Arc<dyn TokenFactory>;

    /// Persistent MSL store collaborator.
    fn store(&self) -> Arc<dyn MslStore>;
}

/// Issues master-token serial numbers. Issuance and renewal logic live
/// outside the core; this is only the boundary the core hands onward.
pub trait TokenFactory: Send + Sync {
    /// Next master-token serial number.
    fn new_serial_number(&self) -> u64;
}

/// Caches session crypto contexts by entity identity. The persistent store
/// itself lives outside the core.
pub trait MslStore: Send + Sync {
    /// Remember the crypto context negotiated for an entity.
    fn set_crypto_context(&self, identity: &str, crypto: Arc<dyn CryptoContext>);

    /// Crypto context previously negotiated for an entity, if cached.
    fn crypto_context(&self, identity: &str) -> Option<Arc<dyn CryptoContext>>;

    /// Drop the cached context for an entity.
    fn clear_crypto_context(&self, identity: &str);
}

/// Runtime registry of entity authentication factories, keyed by scheme.
///
/// The built-in scheme set is closed, but which schemes a deployment accepts
/// is decided by what is registered here, and that may change at runtime.
#[derive(Default)]
pub struct EntityAuthenticationRegistry {
    factories: RwLock<HashMap<EntityAuthScheme, Arc<dyn EntityAuthenticationFactory>>>,
}

impl EntityAuthenticationRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any previous factory for its scheme.
    pub fn add_entity_authentication_factory(
        &self,
        factory: Arc<dyn EntityAuthenticationFactory>,
    ) {
        let mut factories = match self.factories.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        factories.insert(factory.scheme(), factory);
    }

    /// Remove the factory for a scheme, returning whether one was present.
    pub fn remove_entity_authentication_factory(&self, scheme: EntityAuthScheme) -> bool {
        let mut factories = match self.factories.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        factories.remove(&scheme).is_some()
    }

    /// Factory registered for a scheme, if any.
    #[must_use]
    pub fn factory(
        &self,
        scheme: EntityAuthScheme,
    ) -> Option<Arc<dyn EntityAuthenticationFactory>> {
        let factories = match self.factories.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        factories.get(&scheme).cloned()
    }
}
