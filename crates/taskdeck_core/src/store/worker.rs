use crate::error::AppError;
use crate::model::Task;
use crate::storage::{CATEGORIES_KEY, KeyValueStore, TASKS_KEY};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

/// Encoded store contents, ready to hand to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub tasks: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug)]
pub(crate) enum LoadOutcome {
    Loaded {
        tasks: Vec<Task>,
        categories: Option<Vec<String>>,
    },
    Corrupted(AppError),
    Failed(AppError),
}

enum Job {
    Load,
    Save(Snapshot),
    Flush(Sender<()>),
}

/// Owns the adapter on a background thread and runs jobs in submission order.
pub(crate) struct PersistenceWorker {
    jobs: Option<Sender<Job>>,
    loads: Receiver<LoadOutcome>,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceWorker {
    pub(crate) fn spawn<S: KeyValueStore + 'static>(store: S) -> Result<Self, AppError> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (loads_tx, loads_rx) = mpsc::channel::<LoadOutcome>();

        let handle = thread::Builder::new()
            .name("taskdeck-persistence".to_string())
            .spawn(move || worker_loop(store, jobs_rx, loads_tx))?;

        Ok(Self {
            jobs: Some(jobs_tx),
            loads: loads_rx,
            handle: Some(handle),
        })
    }

    pub(crate) fn request_load(&self) {
        self.send(Job::Load);
    }

    /// Fire-and-forget.
    pub(crate) fn save(&self, snapshot: Snapshot) {
        self.send(Job::Save(snapshot));
    }

    /// Blocks until every job queued before this call has run.
    pub(crate) fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.send(Job::Flush(ack_tx)) {
            let _ = ack_rx.recv();
        }
    }

    pub(crate) fn try_load_outcome(&self) -> Option<LoadOutcome> {
        match self.loads.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(LoadOutcome::Failed(
                AppError::persistence("persistence worker stopped before loading"),
            )),
        }
    }

    pub(crate) fn wait_load_outcome(&self) -> LoadOutcome {
        self.loads.recv().unwrap_or_else(|_| {
            LoadOutcome::Failed(AppError::persistence(
                "persistence worker stopped before loading",
            ))
        })
    }

    /// Closes the queue and waits for the remaining jobs to drain.
    pub(crate) fn shutdown(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("persistence worker panicked");
        }
    }

    fn send(&self, job: Job) -> bool {
        match self.jobs.as_ref() {
            Some(jobs) => {
                let sent = jobs.send(job).is_ok();
                if !sent {
                    tracing::error!("persistence worker is gone; job dropped");
                }
                sent
            }
            None => false,
        }
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<S: KeyValueStore>(mut store: S, jobs: Receiver<Job>, loads: Sender<LoadOutcome>) {
    for job in jobs {
        match job {
            Job::Load => {
                let _ = loads.send(load_snapshot(&store));
            }
            Job::Save(snapshot) => write_snapshot(&mut store, &snapshot),
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("persistence worker drained");
}

fn load_snapshot<S: KeyValueStore>(store: &S) -> LoadOutcome {
    let raw_tasks = match store.get(TASKS_KEY) {
        Ok(raw) => raw.unwrap_or_default(),
        Err(err @ AppError::DataCorruption(_)) => return LoadOutcome::Corrupted(err),
        Err(err) => return LoadOutcome::Failed(err),
    };
    let categories = match store.get(CATEGORIES_KEY) {
        Ok(categories) => categories,
        Err(err @ AppError::DataCorruption(_)) => return LoadOutcome::Corrupted(err),
        Err(err) => return LoadOutcome::Failed(err),
    };

    match raw_tasks
        .iter()
        .map(|raw| Task::from_record(raw))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(tasks) => LoadOutcome::Loaded { tasks, categories },
        Err(err) => LoadOutcome::Corrupted(err),
    }
}

fn write_snapshot<S: KeyValueStore>(store: &mut S, snapshot: &Snapshot) {
    for (key, values) in [
        (TASKS_KEY, &snapshot.tasks),
        (CATEGORIES_KEY, &snapshot.categories),
    ] {
        match store.set(key, values) {
            Ok(()) => tracing::debug!(key, entries = values.len(), "persisted"),
            Err(err) => tracing::error!(key, error = %err, "failed to persist"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadOutcome, PersistenceWorker, Snapshot};
    use crate::error::AppError;
    use crate::model::{PriorityEncoding, Task};
    use crate::storage::{CATEGORIES_KEY, KeyValueStore, MemoryStore, TASKS_KEY};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<String>>, AppError> {
            Err(AppError::persistence("disk unavailable"))
        }

        fn set(&mut self, _key: &str, _values: &[String]) -> Result<(), AppError> {
            Err(AppError::persistence("disk unavailable"))
        }
    }

    #[test]
    fn load_decodes_records() {
        let raw = Task::new("demo")
            .with_id("task-1")
            .to_record(PriorityEncoding::Name)
            .unwrap();
        let store = MemoryStore::with_entries([(TASKS_KEY, vec![raw])]);
        let worker = PersistenceWorker::spawn(store).unwrap();

        worker.request_load();
        match worker.wait_load_outcome() {
            LoadOutcome::Loaded { tasks, categories } => {
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].id(), "task-1");
                assert_eq!(categories, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn load_flags_corrupt_records() {
        let store = MemoryStore::with_entries([(TASKS_KEY, vec!["{}".to_string()])]);
        let worker = PersistenceWorker::spawn(store).unwrap();

        worker.request_load();
        assert!(matches!(
            worker.wait_load_outcome(),
            LoadOutcome::Corrupted(_)
        ));
    }

    #[test]
    fn adapter_errors_are_reported_as_failures() {
        let worker = PersistenceWorker::spawn(FailingStore).unwrap();

        worker.request_load();
        worker.save(Snapshot {
            tasks: Vec::new(),
            categories: Vec::new(),
        });
        worker.flush();

        assert!(matches!(worker.wait_load_outcome(), LoadOutcome::Failed(_)));
    }

    #[test]
    fn shutdown_drains_pending_saves() {
        let store = MemoryStore::new();
        let mut worker = PersistenceWorker::spawn(store.clone()).unwrap();

        worker.save(Snapshot {
            tasks: vec!["a".to_string()],
            categories: vec!["Default".to_string()],
        });
        worker.shutdown();

        assert_eq!(store.entry(TASKS_KEY), Some(vec!["a".to_string()]));
        assert_eq!(store.entry(CATEGORIES_KEY), Some(vec!["Default".to_string()]));
    }
}
