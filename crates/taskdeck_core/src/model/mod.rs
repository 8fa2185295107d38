mod priority;
mod task;

pub use priority::{Priority, PriorityEncoding};
pub use task::{DEFAULT_CATEGORY, Task, display_due_date, format_due_date, parse_due_date};
