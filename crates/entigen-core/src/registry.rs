//! Name-keyed entity registry.
//!
//! Relation targets are resolved by name through a registry at generation
//! time. An explicit [`EntityRegistry`] can be created per schema universe; the
//! [`default_registry`] singleton backs [`define_entity`] and
//! [`EntityDraft::build`](crate::compose::EntityDraft::build).
//!
//! Registration is expected to happen during single-threaded start-up, before
//! any generation runs. The lock keeps the registry memory-safe when shared,
//! but concurrent registration from several threads is not a supported
//! workflow: the resulting order of entities is unspecified.

use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tracing::debug;

use crate::entity::{Entity, EntityOptions, FieldMap};
use crate::error::{Error, Result};
use crate::schema::ReferenceKeys;

static DEFAULT_REGISTRY: LazyLock<EntityRegistry> = LazyLock::new(EntityRegistry::new);

/// The process-wide registry used by top-level declarations.
pub fn default_registry() -> &'static EntityRegistry {
    &DEFAULT_REGISTRY
}

/// Build an entity and register it in the default registry.
pub fn define_entity(
    name: impl Into<String>,
    fields: FieldMap,
    options: EntityOptions,
) -> Arc<Entity> {
    default_registry().define(name, fields, options)
}

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: RwLock<IndexMap<String, Arc<Entity>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<Entity>>> {
        self.entities.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<Entity>>> {
        self.entities.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `entity`, replacing any entity registered under the same name.
    /// The replaced entity is returned so callers can surface the collision.
    pub fn register(&self, entity: Entity) -> Option<Arc<Entity>> {
        self.insert(Arc::new(entity))
    }

    pub fn define(
        &self,
        name: impl Into<String>,
        fields: FieldMap,
        options: EntityOptions,
    ) -> Arc<Entity> {
        let entity = Arc::new(Entity::new(name, fields, options));
        self.insert(Arc::clone(&entity));
        entity
    }

    fn insert(&self, entity: Arc<Entity>) -> Option<Arc<Entity>> {
        let name = entity.name().to_string();
        let previous = self.write().insert(name.clone(), entity);
        if previous.is_some() {
            debug!(entity = %name, "entity re-registered; previous definition replaced");
        } else {
            debug!(entity = %name, "entity registered");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<Entity>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Every entity, in first-registration order.
    pub fn all(&self) -> Vec<Arc<Entity>> {
        self.read().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Key schema of every registered entity, for resolving relation fields.
    pub fn reference_keys(&self) -> ReferenceKeys {
        ReferenceKeys::from_entities(self.read().values().map(Arc::as_ref))
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Replace a registered entity with a copy extended by `fields`.
    pub fn extend_entity(&self, name: &str, fields: FieldMap) -> Result<Arc<Entity>> {
        let mut entities = self.write();
        let current = entities
            .get(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))?;
        let extended = Arc::new(current.extended(fields));
        entities.insert(name.to_string(), Arc::clone(&extended));
        debug!(entity = %name, "entity extended");
        Ok(extended)
    }
}
