use crate::error::AppError;
use crate::model::{Priority, PriorityEncoding};
use serde::{Deserialize, Serialize};
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use uuid::Uuid;

pub const DEFAULT_CATEGORY: &str = "Default";

const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: String,
    pub title: String,
    pub is_completed: bool,
    pub priority: Priority,
    pub due_date: Option<Date>,
    pub category: String,
}

impl Task {
    /// New pending task with a fresh id, medium priority and the default category.
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            is_completed: false,
            priority: Priority::default(),
            due_date: None,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Replaces the generated id. Only meant for rebuilding stored tasks.
    pub fn with_id<I: Into<String>>(mut self, id: I) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: Option<Date>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_category<C: Into<String>>(mut self, category: C) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = is_completed;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_record(&self, encoding: PriorityEncoding) -> Result<String, AppError> {
        let priority = match encoding {
            PriorityEncoding::Ordinal => PriorityRepr::Ordinal(u64::from(self.priority.ordinal())),
            PriorityEncoding::Name => PriorityRepr::Name(self.priority.as_str().to_string()),
        };
        let due_date = self.due_date.map(format_due_date).transpose()?;
        let record = TaskRecord {
            id: self.id.clone(),
            title: self.title.clone(),
            is_completed: self.is_completed,
            priority,
            due_date,
            category: self.category.clone(),
        };

        serde_json::to_string(&record).map_err(|err| AppError::persistence(err.to_string()))
    }

    pub fn from_record(raw: &str) -> Result<Self, AppError> {
        let record: TaskRecord = serde_json::from_str(raw)
            .map_err(|err| AppError::data_corruption(format!("task record: {err}")))?;

        if record.id.trim().is_empty() {
            return Err(AppError::data_corruption("task record has an empty id"));
        }
        if record.category.trim().is_empty() {
            return Err(AppError::data_corruption(format!(
                "task {} has an empty category",
                record.id
            )));
        }

        let priority = match record.priority {
            PriorityRepr::Ordinal(ordinal) => Priority::from_ordinal(ordinal).ok_or_else(|| {
                AppError::data_corruption(format!(
                    "task {} has priority ordinal {ordinal} out of range",
                    record.id
                ))
            })?,
            PriorityRepr::Name(name) => Priority::from_name(&name).ok_or_else(|| {
                AppError::data_corruption(format!(
                    "task {} has unknown priority '{name}'",
                    record.id
                ))
            })?,
        };

        let due_date = match record.due_date.as_deref() {
            Some(value) => Some(parse_stored_date(value).ok_or_else(|| {
                AppError::data_corruption(format!(
                    "task {} has unparseable due date '{value}'",
                    record.id
                ))
            })?),
            None => None,
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            is_completed: record.is_completed,
            priority,
            due_date,
            category: record.category,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    title: String,
    is_completed: bool,
    priority: PriorityRepr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<String>,
    category: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PriorityRepr {
    Ordinal(u64),
    Name(String),
}

pub fn format_due_date(date: Date) -> Result<String, AppError> {
    date.format(ISO_DATE)
        .map_err(|err| AppError::persistence(err.to_string()))
}

/// Parses a user-supplied `YYYY-MM-DD` date.
pub fn parse_due_date(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), ISO_DATE)
        .map_err(|_| AppError::invalid_input("due date must be YYYY-MM-DD"))
}

/// Human-facing form, e.g. `Jan 5, 2026`.
pub fn display_due_date(date: Date) -> String {
    date.format(DISPLAY_DATE)
        .unwrap_or_else(|_| date.to_string())
}

// Older payloads stored a full timestamp; only its date part is meaningful.
fn parse_stored_date(raw: &str) -> Option<Date> {
    let date_part = raw.split_once('T').map_or(raw, |(date, _)| date);
    Date::parse(date_part, ISO_DATE).ok()
}
