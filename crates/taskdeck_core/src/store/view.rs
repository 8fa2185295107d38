use crate::model::Task;
use serde::Serialize;

/// Reserved filter selector meaning "every category". Never a task category.
pub const ALL_CATEGORY: &str = "All";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl TaskStatistics {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let completed = tasks.iter().filter(|task| task.is_completed).count();
        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
        }
    }
}

/// Tasks matching both the search query and the category selector, in
/// their original order.
pub fn filter_tasks<'a>(tasks: &'a [Task], query: &str, category: &str) -> Vec<&'a Task> {
    let needle = query.to_lowercase();
    tasks
        .iter()
        .filter(|task| needle.is_empty() || task.title.to_lowercase().contains(&needle))
        .filter(|task| category == ALL_CATEGORY || task.category == category)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ALL_CATEGORY, TaskStatistics, filter_tasks};
    use crate::model::Task;

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|task| task.title.clone()).collect()
    }

    fn fixture() -> Vec<Task> {
        vec![
            Task::new("Laundry").with_category("Home"),
            Task::new("Quarterly report").with_category("Work"),
            Task::new("Dishes").with_category("Home").with_completed(true),
        ]
    }

    #[test]
    fn empty_query_and_all_selector_match_everything() {
        let tasks = fixture();
        let view = filter_tasks(&tasks, "", ALL_CATEGORY);
        assert_eq!(titles(&view), vec!["Laundry", "Quarterly report", "Dishes"]);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let tasks = fixture();
        assert_eq!(titles(&filter_tasks(&tasks, "LAU", ALL_CATEGORY)), vec!["Laundry"]);
        assert_eq!(titles(&filter_tasks(&tasks, "port", ALL_CATEGORY)), vec!["Quarterly report"]);
    }

    #[test]
    fn query_and_category_compose() {
        let tasks = fixture();
        assert_eq!(titles(&filter_tasks(&tasks, "s", "Home")), vec!["Dishes"]);
        assert!(filter_tasks(&tasks, "report", "Home").is_empty());
    }

    #[test]
    fn category_match_is_exact() {
        let tasks = fixture();
        assert!(filter_tasks(&tasks, "", "home").is_empty());
        assert!(filter_tasks(&tasks, "", "Nowhere").is_empty());
    }

    #[test]
    fn statistics_add_up() {
        let stats = TaskStatistics::from_tasks(&fixture());
        assert_eq!(
            stats,
            TaskStatistics {
                total: 3,
                completed: 1,
                pending: 2
            }
        );
        assert_eq!(TaskStatistics::from_tasks(&[]), TaskStatistics::default());
    }
}
