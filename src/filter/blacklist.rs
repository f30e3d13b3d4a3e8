use std::sync::{Arc, PoisonError, RwLock};

/// Filter keys excluded from contributing values while parsing.
///
/// Clones share the same underlying set, so one blacklist can be handed to
/// several parsers and changed at runtime while they are in use.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    keys: Arc<RwLock<Vec<String>>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let blacklist = Self::new();
        for key in keys {
            blacklist.add(key);
        }
        blacklist
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|k| k == key)
    }

    pub fn add(&self, key: impl Into<String>) {
        let key = key.into();
        if self.contains(&key) {
            return;
        }
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        // Re-checked under the write lock.
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    pub fn remove(&self, key: &str) {
        if !self.contains(key) {
            return;
        }
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        keys.retain(|k| k != key);
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
