use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.json")
}

fn taskdeck(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_taskdeck"));
    command
        .env("TASKDECK_STORE_PATH", store_path(dir))
        .env("TASKDECK_CONFIG_PATH", dir.path().join("config.json"))
        .env_remove("TASKDECK_LOG");
    command
}

fn write_store(dir: &TempDir) {
    let task = serde_json::json!({
        "id": "3f2a9c10-0000-4000-8000-000000000001",
        "title": "old",
        "isCompleted": false,
        "priority": "low",
        "category": "Home",
    });
    let content = serde_json::json!({
        "schema_version": 1,
        "entries": {
            "tasks": [task.to_string()],
            "categories": ["Default", "Home"],
        }
    });
    std::fs::write(store_path(dir), serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn stored(dir: &TempDir) -> (Vec<serde_json::Value>, Vec<String>) {
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store_path(dir)).unwrap()).unwrap();
    let tasks = document["entries"]["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|raw| serde_json::from_str(raw.as_str().unwrap()).unwrap())
        .collect();
    let categories = document["entries"]["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|name| name.as_str().unwrap().to_string())
        .collect();
    (tasks, categories)
}

#[test]
fn edit_command_updates_only_given_fields() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    let output = taskdeck(&dir)
        .args(["edit", "3f2a", "--title", "new title", "--category", "Errands"])
        .output()
        .expect("failed to run edit command");

    assert!(output.status.success());
    let (tasks, categories) = stored(&dir);
    assert_eq!(tasks[0]["title"], "new title");
    assert_eq!(tasks[0]["category"], "Errands");
    assert_eq!(tasks[0]["priority"], "low");
    assert_eq!(categories, vec!["Default", "Home", "Errands"]);
}

#[test]
fn edit_command_requires_a_field() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    let output = taskdeck(&dir)
        .args(["edit", "3f2a"])
        .output()
        .expect("failed to run edit command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nothing to edit"));
}

#[test]
fn toggle_command_completes_and_reopens() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    let first = taskdeck(&dir).args(["toggle", "3f2a"]).output().unwrap();
    assert!(String::from_utf8_lossy(&first.stdout).contains("Completed task: old"));
    assert_eq!(stored(&dir).0[0]["isCompleted"], true);

    let second = taskdeck(&dir).args(["toggle", "3f2a"]).output().unwrap();
    assert!(String::from_utf8_lossy(&second.stdout).contains("Reopened task: old"));
    assert_eq!(stored(&dir).0[0]["isCompleted"], false);
}

#[test]
fn delete_command_removes_task_but_keeps_category() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    let output = taskdeck(&dir)
        .args(["delete", "3f2a9c10-0000-4000-8000-000000000001"])
        .output()
        .expect("failed to run delete command");

    assert!(output.status.success());
    let (tasks, categories) = stored(&dir);
    assert!(tasks.is_empty());
    assert_eq!(categories, vec!["Default", "Home"]);
}

#[test]
fn unknown_id_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    for args in [["delete", "ffff"], ["toggle", "ffff"]] {
        let output = taskdeck(&dir)
            .args(args)
            .output()
            .expect("failed to run command");

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("ERROR: invalid_input - task not found"));
    }
    assert_eq!(stored(&dir).0.len(), 1);
}

#[test]
fn category_add_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    let first = taskdeck(&dir).args(["category", "add", "Work"]).output().unwrap();
    assert!(String::from_utf8_lossy(&first.stdout).contains("Added category: Work"));

    let second = taskdeck(&dir).args(["category", "add", "Work"]).output().unwrap();
    assert!(second.status.success());
    assert!(String::from_utf8_lossy(&second.stdout).contains("Category already exists: Work"));

    assert_eq!(stored(&dir).1, vec!["Default", "Home", "Work"]);
}

#[test]
fn category_add_rejects_all_sentinel() {
    let dir = tempfile::tempdir().unwrap();
    let output = taskdeck(&dir)
        .args(["category", "add", "All"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reserved"));
}

#[test]
fn add_and_edit_reject_all_as_category() {
    let dir = tempfile::tempdir().unwrap();
    write_store(&dir);

    for args in [
        vec!["add", "X", "--category", "All"],
        vec!["edit", "3f2a", "--category", "All"],
    ] {
        let output = taskdeck(&dir)
            .args(&args)
            .output()
            .expect("failed to run command");

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("ERROR: invalid_input - 'All' is reserved"));
    }

    let (tasks, categories) = stored(&dir);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["category"], "Home");
    assert_eq!(categories, vec!["Default", "Home"]);
}
