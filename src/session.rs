use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// State retained for the whole logical session, independent of how many
/// times the screen is rebuilt. Entries are keyed by type and created on
/// first access.
#[derive(Default)]
pub struct SessionStore {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored `T`, creating it with `init` if this is the first
    /// request. A failed `init` leaves the store unchanged.
    pub fn get_or_try_insert_with<T, E, F>(&mut self, init: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(existing) = self.get::<T>() {
            return Ok(existing);
        }
        let value = Arc::new(init()?);
        log::debug!("session: created {}", type_name::<T>());
        self.entries.insert(TypeId::of::<T>(), value.clone());
        Ok(value)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ends the session: every retained entry is released. State still
    /// borrowed elsewhere through an `Arc` lives until that last handle goes.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("session: clearing {} entries", self.entries.len());
        }
        self.entries.clear();
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("entries", &self.entries.len())
            .finish()
    }
}
