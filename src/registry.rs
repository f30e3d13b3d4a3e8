//! Entity and protocol factories, keyed by entity id and protocol name.
//!
//! A process wide registry backs [`crate::Resource::new`]; register entity
//! types there at startup with [`register_entity`]. Tests and embedders
//! needing isolation build their own [`Registry`] and pass it to
//! [`crate::Resource::with_registry`].

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::{debug, info};

use crate::error::CrudError;
use crate::protocol::{InProcess, Protocol};
use crate::traits::CrudInstance;
use crate::types::{CrudUrl, DEFAULT_SCHEME, EntityId};

pub type EntityFactory = Arc<dyn Fn() -> Result<Arc<dyn CrudInstance>, CrudError> + Send + Sync>;

pub type ProtocolFactory =
    Arc<dyn Fn(&CrudUrl, &Registry) -> Result<Arc<dyn Protocol>, CrudError> + Send + Sync>;

/// Protocol key of a scheme: `x-in-process` is `x_in_process`.
pub fn protocol_key(scheme: &str) -> String {
    scheme.to_lowercase().replace('-', "_")
}

#[derive(Clone)]
pub struct Registry {
    entities: HashMap<EntityId, EntityFactory>,
    protocols: HashMap<String, ProtocolFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut protocols: Vec<_> = self.protocols.keys().collect();
        protocols.sort();
        f.debug_struct("Registry")
            .field("entities", &self.entities())
            .field("protocols", &protocols)
            .finish()
    }
}

impl Registry {
    /// A registry knowing only the in-process protocol.
    pub fn new() -> Self {
        let mut registry = Self {
            entities: HashMap::new(),
            protocols: HashMap::new(),
        };
        registry.register_protocol(DEFAULT_SCHEME, |url: &CrudUrl, registry: &Registry| {
            Ok(Arc::new(InProcess::open(url, registry)?) as Arc<dyn Protocol>)
        });
        registry
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            registry: Self::new(),
        }
    }

    pub fn register_entity<F>(&mut self, id: EntityId, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn CrudInstance>, CrudError> + Send + Sync + 'static,
    {
        debug!(event = "Registry", phase = "RegisterEntity", entity = %id);
        self.entities.insert(id, Arc::new(factory));
        self
    }

    pub fn register_protocol<F>(&mut self, scheme: &str, factory: F) -> &mut Self
    where
        F: Fn(&CrudUrl, &Registry) -> Result<Arc<dyn Protocol>, CrudError>
            + Send
            + Sync
            + 'static,
    {
        let key = protocol_key(scheme);
        debug!(event = "Registry", phase = "RegisterProtocol", protocol = %key);
        self.protocols.insert(key, Arc::new(factory));
        self
    }

    pub fn has_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Sorted ids of all registered entities.
    pub fn entities(&self) -> Vec<&EntityId> {
        let mut ids: Vec<_> = self.entities.keys().collect();
        ids.sort();
        ids
    }

    /// Creates a fresh instance of the entity registered as `id`.
    pub fn instantiate(&self, id: &EntityId) -> Result<Arc<dyn CrudInstance>, CrudError> {
        let factory = self.entities.get(id).ok_or_else(|| {
            CrudError::OperationNotSupported(format!("CRUD entity '{id}' is not registered"))
        })?;
        factory()
    }

    /// Opens the protocol selected by the scheme of `url`.
    pub fn open(&self, url: &CrudUrl) -> Result<Arc<dyn Protocol>, CrudError> {
        let factory = self.protocols.get(&url.protocol_name()).ok_or_else(|| {
            CrudError::OperationFailed(format!(
                "CRUD protocol '{}' is not supported",
                url.scheme()
            ))
        })?;
        factory(url, self)
    }
}

pub struct RegistryBuilder {
    registry: Registry,
}

impl RegistryBuilder {
    pub fn entity<F>(mut self, id: EntityId, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn CrudInstance>, CrudError> + Send + Sync + 'static,
    {
        self.registry.register_entity(id, factory);
        self
    }

    pub fn protocol<F>(mut self, scheme: &str, factory: F) -> Self
    where
        F: Fn(&CrudUrl, &Registry) -> Result<Arc<dyn Protocol>, CrudError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.register_protocol(scheme, factory);
        self
    }

    pub fn build(self) -> Registry {
        self.registry
    }
}

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| RwLock::new(Registry::new()));

/// Registers an entity in the process wide registry.
pub fn register_entity<F>(id: EntityId, factory: F)
where
    F: Fn() -> Result<Arc<dyn CrudInstance>, CrudError> + Send + Sync + 'static,
{
    info!(event = "Registry", phase = "GlobalEntity", entity = %id);
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_entity(id, factory);
}

/// Registers a protocol in the process wide registry.
pub fn register_protocol<F>(scheme: &str, factory: F)
where
    F: Fn(&CrudUrl, &Registry) -> Result<Arc<dyn Protocol>, CrudError> + Send + Sync + 'static,
{
    info!(event = "Registry", phase = "GlobalProtocol", protocol = scheme);
    REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register_protocol(scheme, factory);
}

/// A snapshot of the process wide registry.
pub fn global() -> Registry {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
