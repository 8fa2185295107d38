use crate::error::AppError;

pub mod json_store;
pub mod memory;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

/// Key holding one serialized task record per entry.
pub const TASKS_KEY: &str = "tasks";
/// Key holding user category names, without the "All" sentinel.
pub const CATEGORIES_KEY: &str = "categories";

/// String-keyed store of string lists backing the task store.
///
/// Implementations are moved onto the persistence worker thread, hence `Send`.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, AppError>;

    fn set(&mut self, key: &str, values: &[String]) -> Result<(), AppError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<String>>, AppError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, values: &[String]) -> Result<(), AppError> {
        (**self).set(key, values)
    }
}
