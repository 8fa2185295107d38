use crate::error::AppError;
use crate::storage::KeyValueStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process store. Clones share the same entries, so a caller can keep a
/// handle to inspect what the persistence worker wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, values)| (key.into(), values))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Snapshot of one key, bypassing the trait.
    pub fn entry(&self, key: &str) -> Option<Vec<String>> {
        self.lock().ok()?.get(key).cloned()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<String>>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, AppError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, values: &[String]) -> Result<(), AppError> {
        self.lock()?.insert(key.to_string(), values.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::storage::KeyValueStore;

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let mut writer = store.clone();

        writer.set("categories", &["Work".to_string()]).unwrap();

        assert_eq!(store.entry("categories"), Some(vec!["Work".to_string()]));
        assert_eq!(store.get("tasks").unwrap(), None);
    }
}
