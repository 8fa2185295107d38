pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod store;

pub use error::AppError;
pub use model::{Priority, PriorityEncoding, Task};
pub use store::{StoreOptions, TaskEdit, TaskStatistics, TaskStore};
