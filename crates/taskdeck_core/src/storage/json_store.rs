use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";
pub const STORE_ENV_VAR: &str = "TASKDECK_STORE_PATH";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, Vec<String>>,
}

/// Key-value store kept in a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, AppError> {
        Ok(load_entries(&self.path)?.entries.remove(key))
    }

    fn set(&mut self, key: &str, values: &[String]) -> Result<(), AppError> {
        let mut stored = match load_entries(&self.path) {
            Ok(stored) => stored,
            Err(AppError::DataCorruption(message)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %message,
                    "replacing unreadable store document"
                );
                StoredEntries::default()
            }
            Err(err) => return Err(err),
        };
        stored.entries.insert(key.to_string(), values.to_vec());
        save_entries(&self.path, stored)
    }
}

pub fn default_store_path() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_input("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskdeck").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_input("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskdeck")
            .join(STORE_FILE_NAME))
    }
}

fn load_entries(path: &Path) -> Result<StoredEntries, AppError> {
    if !path.exists() {
        return Ok(StoredEntries {
            schema_version: SCHEMA_VERSION,
            entries: BTreeMap::new(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let stored: StoredEntries = serde_json::from_str(&content)
        .map_err(|err| AppError::data_corruption(format!("{}: {}", path.display(), err)))?;

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::data_corruption("schema_version mismatch"));
    }

    Ok(stored)
}

fn save_entries(path: &Path, mut stored: StoredEntries) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    stored.schema_version = SCHEMA_VERSION;
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::persistence(err.to_string()))?;
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{JsonFileStore, SCHEMA_VERSION};
    use crate::storage::KeyValueStore;
    use std::fs;

    #[test]
    fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("store.json"));

        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn set_and_get_round_trip_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let mut store = JsonFileStore::new(&path);

        store.set("categories", &["Work".to_string()]).unwrap();
        store
            .set("tasks", &["{}".to_string(), "{}".to_string()])
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(
            reopened.get("categories").unwrap(),
            Some(vec!["Work".to_string()])
        );
        assert_eq!(reopened.get("tasks").unwrap().map(|v| v.len()), Some(2));

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored["schema_version"], SCHEMA_VERSION);
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut store = JsonFileStore::new(&path);
        store.set("categories", &[]).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn invalid_json_is_data_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).get("tasks").unwrap_err();
        assert_eq!(err.code(), "data_corruption");
    }

    #[test]
    fn schema_version_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"entries\": {{}}\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = JsonFileStore::new(&path).get("tasks").unwrap_err();
        assert_eq!(err.code(), "data_corruption");
    }

    #[test]
    fn set_replaces_unreadable_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "garbage").unwrap();
        let mut store = JsonFileStore::new(&path);

        store.set("categories", &["Home".to_string()]).unwrap();

        assert_eq!(
            store.get("categories").unwrap(),
            Some(vec!["Home".to_string()])
        );
    }
}
