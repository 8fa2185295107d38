//! The task store: single owner of tasks and categories.
//!
//! Every mutation updates memory first, queues a save on the persistence
//! worker, then calls the registered listeners before returning. Saves never
//! block the caller and their failures are only logged.

mod listeners;
mod view;
mod worker;

pub use listeners::ListenerId;
pub use view::{ALL_CATEGORY, TaskStatistics, filter_tasks};

use crate::error::AppError;
use crate::model::{DEFAULT_CATEGORY, Priority, PriorityEncoding, Task};
use crate::storage::KeyValueStore;
use listeners::Listeners;
use time::Date;
use worker::{LoadOutcome, PersistenceWorker, Snapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub default_category: String,
    pub priority_encoding: PriorityEncoding,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_category: DEFAULT_CATEGORY.to_string(),
            priority_encoding: PriorityEncoding::default(),
        }
    }
}

/// Fields to change on an existing task. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Date>,
    pub category: Option<String>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
    }
}

pub struct TaskStore {
    tasks: Vec<Task>,
    categories: Vec<String>,
    search_query: String,
    selected_category: String,
    listeners: Listeners,
    worker: PersistenceWorker,
    options: StoreOptions,
    loaded: bool,
    dirty: bool,
}

impl TaskStore {
    /// Starts the persistence worker and queues the initial load.
    ///
    /// The store is usable right away; the loaded data is applied by
    /// [`process_pending`](Self::process_pending) or
    /// [`wait_until_loaded`](Self::wait_until_loaded).
    pub fn open<S: KeyValueStore + 'static>(
        adapter: S,
        mut options: StoreOptions,
    ) -> Result<Self, AppError> {
        let default_category = options.default_category.trim();
        if default_category.is_empty() || default_category == ALL_CATEGORY {
            tracing::warn!(
                requested = %options.default_category,
                fallback = DEFAULT_CATEGORY,
                "unusable default category"
            );
            options.default_category = DEFAULT_CATEGORY.to_string();
        } else {
            options.default_category = default_category.to_string();
        }

        let worker = PersistenceWorker::spawn(adapter)?;
        worker.request_load();

        Ok(Self {
            tasks: Vec::new(),
            categories: vec![options.default_category.clone()],
            search_query: String::new(),
            selected_category: ALL_CATEGORY.to_string(),
            listeners: Listeners::default(),
            worker,
            options,
            loaded: false,
            dirty: false,
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Applies the initial load if it has arrived. Never blocks.
    pub fn process_pending(&mut self) -> bool {
        if self.loaded {
            return false;
        }
        match self.worker.try_load_outcome() {
            Some(outcome) => {
                self.apply_load(outcome);
                true
            }
            None => false,
        }
    }

    pub fn wait_until_loaded(&mut self) {
        if !self.loaded {
            let outcome = self.worker.wait_load_outcome();
            self.apply_load(outcome);
        }
    }

    pub fn subscribe<F: FnMut() + 'static>(&mut self, listener: F) -> ListenerId {
        self.listeners.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Appends the task. A task filed under `"All"` lands in the default category.
    pub fn add_task(&mut self, mut task: Task) -> &Task {
        if task.category == ALL_CATEGORY {
            task.category = self.options.default_category.clone();
        }
        tracing::debug!(task_id = %task.id(), category = %task.category, "task added");
        self.register_category(&task.category);
        let index = self.tasks.len();
        self.tasks.push(task);
        self.commit();
        &self.tasks[index]
    }

    pub fn edit_task(&mut self, id: &str, edit: TaskEdit) -> Option<&Task> {
        let index = self.position(id)?;
        let TaskEdit {
            title,
            priority,
            due_date,
            category,
        } = edit;
        let category = category.filter(|name| name != ALL_CATEGORY);

        if let Some(category) = category.as_deref() {
            self.register_category(category);
        }
        let task = &mut self.tasks[index];
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(priority) = priority {
            task.priority = priority;
        }
        if let Some(due_date) = due_date {
            task.due_date = Some(due_date);
        }
        if let Some(category) = category {
            task.category = category;
        }

        tracing::debug!(task_id = id, "task edited");
        self.commit();
        Some(&self.tasks[index])
    }

    pub fn toggle_task(&mut self, id: &str) -> Option<&Task> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.is_completed = !task.is_completed;
        tracing::debug!(task_id = id, completed = task.is_completed, "task toggled");

        self.commit();
        Some(&self.tasks[index])
    }

    /// Removes the task. Its category stays registered.
    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        let index = self.position(id)?;
        let removed = self.tasks.remove(index);
        tracing::debug!(task_id = id, "task deleted");

        self.commit();
        Some(removed)
    }

    /// Registers a category. Returns `false` if it was already known.
    pub fn add_category(&mut self, name: &str) -> bool {
        if !self.register_category(name) {
            return false;
        }
        tracing::debug!(category = name, "category added");
        self.commit();
        true
    }

    pub fn set_search_query<Q: Into<String>>(&mut self, query: Q) {
        self.search_query = query.into();
        self.listeners.notify_all();
    }

    pub fn set_selected_category<C: Into<String>>(&mut self, category: C) {
        self.selected_category = category.into();
        self.listeners.notify_all();
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    /// Filtered view in insertion order.
    pub fn tasks(&self) -> Vec<&Task> {
        filter_tasks(&self.tasks, &self.search_query, &self.selected_category)
    }

    /// Every task, unfiltered.
    pub fn all_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    /// Known categories with the "All" selector first.
    pub fn categories(&self) -> Vec<String> {
        std::iter::once(ALL_CATEGORY.to_string())
            .chain(self.categories.iter().cloned())
            .collect()
    }

    pub fn task_statistics(&self) -> TaskStatistics {
        TaskStatistics::from_tasks(&self.tasks)
    }

    /// Blocks until every save queued so far has reached the adapter.
    pub fn flush(&self) {
        self.worker.flush();
    }

    /// Drops listeners, applies a pending load, and drains queued saves.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.listeners.clear();
        if !self.loaded {
            self.wait_until_loaded();
        }
        self.worker.shutdown();
    }

    fn position(&self, id: &str) -> Option<usize> {
        let index = self.tasks.iter().position(|task| task.id() == id);
        if index.is_none() {
            tracing::debug!(task_id = id, "no such task; ignoring");
        }
        index
    }

    fn register_category(&mut self, name: &str) -> bool {
        if name == ALL_CATEGORY || self.categories.iter().any(|known| known == name) {
            return false;
        }
        self.categories.push(name.to_string());
        true
    }

    fn commit(&mut self) {
        self.persist();
        self.listeners.notify_all();
    }

    fn persist(&mut self) {
        if !self.loaded {
            // Saved once the load has been merged in.
            self.dirty = true;
            return;
        }

        let encoding = self.options.priority_encoding;
        let tasks = match self
            .tasks
            .iter()
            .map(|task| task.to_record(encoding))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(tasks) => tasks,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode tasks; skipping save");
                return;
            }
        };

        self.worker.save(Snapshot {
            tasks,
            categories: self.categories.clone(),
        });
    }

    fn apply_load(&mut self, outcome: LoadOutcome) {
        self.loaded = true;

        let (tasks, categories) = match outcome {
            LoadOutcome::Loaded { tasks, categories } => (tasks, categories.unwrap_or_default()),
            LoadOutcome::Corrupted(err) => {
                tracing::warn!(error = %err, "stored tasks are corrupt; starting empty");
                (Vec::new(), Vec::new())
            }
            LoadOutcome::Failed(err) => {
                tracing::error!(error = %err, "failed to load tasks; keeping in-memory state");
                if std::mem::take(&mut self.dirty) {
                    self.persist();
                }
                return;
            }
        };

        let local_tasks = std::mem::replace(&mut self.tasks, tasks);
        let local_categories = std::mem::take(&mut self.categories);

        for name in categories.iter().map(|name| name.trim()) {
            if !name.is_empty() {
                self.register_category(name);
            }
        }
        if !self.categories.contains(&self.options.default_category) {
            self.categories.insert(0, self.options.default_category.clone());
        }
        let stored_categories: Vec<String> = self.tasks.iter().map(|t| t.category.clone()).collect();
        for name in &stored_categories {
            self.register_category(name);
        }

        // Anything created before the load finished is kept after the stored data.
        for name in &local_categories {
            self.register_category(name);
        }
        for task in local_tasks {
            if self.task(task.id()).is_none() {
                self.tasks.push(task);
            }
        }

        tracing::debug!(
            tasks = self.tasks.len(),
            categories = self.categories.len(),
            "store loaded"
        );
        if std::mem::take(&mut self.dirty) {
            self.persist();
        }
        self.listeners.notify_all();
    }
}

impl Drop for TaskStore {
    fn drop(&mut self) {
        self.teardown();
    }
}
