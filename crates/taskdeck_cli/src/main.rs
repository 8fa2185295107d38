use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::io::{self, BufRead};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskdeck_cli::cli::{
    CONFIG_OVERRIDE_FLAG, CategoryCommand, Cli, Command, collect_config_overrides,
};
use taskdeck_cli::logging::init_logging;
use taskdeck_core::config::{self, Config};
use taskdeck_core::error::AppError;
use taskdeck_core::model::{Priority, Task, display_due_date, format_due_date, parse_due_date};
use taskdeck_core::storage::JsonFileStore;
use taskdeck_core::store::{ALL_CATEGORY, TaskEdit, TaskStore};
use time::Date;

const SHORT_ID_LEN: usize = 8;

struct Session {
    store: TaskStore,
    default_category: String,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Done")]
    done: &'static str,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Priority")]
    priority: Priority,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Category")]
    category: String,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id().chars().take(SHORT_ID_LEN).collect(),
            done: if task.is_completed { "[x]" } else { "[ ]" },
            title: task.title.clone(),
            priority: task.priority,
            due: task
                .due_date
                .map(display_due_date)
                .unwrap_or_else(|| "-".to_string()),
            category: task.category.clone(),
        }
    }
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id(),
        "title": task.title,
        "isCompleted": task.is_completed,
        "priority": task.priority.as_str(),
        "dueDate": task.due_date.and_then(|date| format_due_date(date).ok()),
        "category": task.category,
    })
}

fn print_task_json(task: &Task) {
    println!("{}", task_json(task));
}

fn print_view(store: &TaskStore, json: bool) {
    let tasks = store.tasks();
    if json {
        let payload = tasks.iter().map(|task| task_json(task)).collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }

    let mut table = Table::new(tasks.iter().map(|task| TaskRow::from_task(task)));
    table.with(Style::psql());
    println!("{table}");
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn category_name(value: &str) -> Result<String, AppError> {
    let name = required_text(value, "category")?;
    if name == ALL_CATEGORY {
        return Err(AppError::invalid_input(format!(
            "'{ALL_CATEGORY}' is reserved"
        )));
    }
    Ok(name)
}

fn parse_priority(raw: Option<String>) -> Result<Option<Priority>, AppError> {
    raw.map(|value| value.parse::<Priority>()).transpose()
}

fn parse_due(raw: Option<String>) -> Result<Option<Date>, AppError> {
    raw.as_deref().map(parse_due_date).transpose()
}

/// Accepts a full id or any unambiguous prefix of one.
fn resolve_id(store: &TaskStore, raw: &str) -> Result<String, AppError> {
    let wanted = raw.trim();
    if wanted.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    if let Some(task) = store.task(wanted) {
        return Ok(task.id().to_string());
    }

    let mut matches = store
        .all_tasks()
        .iter()
        .filter(|task| task.id().starts_with(wanted));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id().to_string()),
        (Some(_), Some(_)) => Err(AppError::invalid_input(format!(
            "id prefix '{wanted}' matches several tasks"
        ))),
        (None, _) => Err(AppError::invalid_input("task not found")),
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(session: &mut Session, command: Command, json: bool) -> Result<(), AppError> {
    let store = &mut session.store;
    match command {
        Command::Add {
            title,
            priority,
            due,
            category,
        } => {
            let title = match title {
                Some(value) if !value.trim().is_empty() => value.trim().to_string(),
                _ => return Err(AppError::invalid_input("title is required")),
            };
            let category = match category {
                Some(value) => category_name(&value)?,
                None => session.default_category.clone(),
            };
            let task = Task::new(title)
                .with_priority(parse_priority(priority)?.unwrap_or_default())
                .with_due_date(parse_due(due)?)
                .with_category(category);

            let task = store.add_task(task);
            if json {
                print_task_json(task);
            } else {
                println!("Added task: {} ({})", task.title, task.id());
            }
        }
        Command::Edit {
            id,
            title,
            priority,
            due,
            category,
        } => {
            let id = resolve_id(store, &id)?;
            let edit = TaskEdit {
                title: title
                    .map(|value| required_text(&value, "title"))
                    .transpose()?,
                priority: parse_priority(priority)?,
                due_date: parse_due(due)?,
                category: category
                    .map(|value| category_name(&value))
                    .transpose()?,
            };
            if edit.is_empty() {
                return Err(AppError::invalid_input("nothing to edit"));
            }

            let task = store
                .edit_task(&id, edit)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            if json {
                print_task_json(task);
            } else {
                println!("Updated task: {} ({})", task.title, task.id());
            }
        }
        Command::Toggle { id } => {
            let id = resolve_id(store, &id)?;
            let task = store
                .toggle_task(&id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            if json {
                print_task_json(task);
            } else if task.is_completed {
                println!("Completed task: {} ({})", task.title, task.id());
            } else {
                println!("Reopened task: {} ({})", task.title, task.id());
            }
        }
        Command::Delete { id } => {
            let id = resolve_id(store, &id)?;
            let task = store
                .delete_task(&id)
                .ok_or_else(|| AppError::invalid_input("task not found"))?;
            if json {
                print_task_json(&task);
            } else {
                println!("Deleted task: {} ({})", task.title, task.id());
            }
        }
        Command::Category { category } => match category {
            CategoryCommand::Add { name } => {
                let name = category_name(&name)?;
                let added = store.add_category(&name);
                if json {
                    println!("{}", serde_json::json!({ "category": name, "added": added }));
                } else if added {
                    println!("Added category: {name}");
                } else {
                    println!("Category already exists: {name}");
                }
            }
            CategoryCommand::List => {
                let categories = store.categories();
                if json {
                    println!("{}", serde_json::json!(categories));
                } else {
                    for category in categories {
                        println!("{category}");
                    }
                }
            }
        },
        Command::List { search, category } => {
            if let Some(query) = search {
                store.set_search_query(query);
            }
            if let Some(category) = category {
                store.set_selected_category(category.trim());
            }
            print_view(store, json);
        }
        Command::Search { query } => {
            store.set_search_query(query.unwrap_or_default());
            print_view(store, json);
        }
        Command::Filter { category } => {
            store.set_selected_category(category.trim());
            print_view(store, json);
        }
        Command::Stats => {
            let stats = store.task_statistics();
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "total": stats.total,
                        "completed": stats.completed,
                        "pending": stats.pending,
                    })
                );
            } else {
                println!(
                    "Total: {} | Completed: {} | Pending: {}",
                    stats.total, stats.completed, stats.pending
                );
            }
        }
    }

    Ok(())
}

fn open_session(config: &Config) -> Result<Session, AppError> {
    let adapter = JsonFileStore::new(config.resolve_store_path()?);
    tracing::debug!(path = %adapter.path().display(), "opening task store");

    let mut store = TaskStore::open(adapter, config.store_options())?;
    store.wait_until_loaded();
    let default_category = store.options().default_category.clone();

    Ok(Session {
        store,
        default_category,
    })
}

fn start(raw_overrides: &[String]) -> Result<Session, AppError> {
    let loaded = config::load_config_with_fallback();
    let overrides = collect_config_overrides(raw_overrides)?;
    let config = config::merge_overrides(&loaded.config, &overrides);

    init_logging(config.log_filter());
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "ignoring unreadable config");
    }

    open_session(&config)
}

fn interactive_loop(session: &mut Session) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskdeck".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                print!("{err}");
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!(
                "ERROR: {}",
                AppError::invalid_input(format!(
                    "{CONFIG_OVERRIDE_FLAG} is only accepted when starting taskdeck"
                ))
            );
            continue;
        }

        if let Err(err) = run_command(session, cli.command, cli.json) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let mut session = start(&[])?;
    let result = interactive_loop(&mut session);
    session.store.shutdown();
    result
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let mut session = match start(&cli.config_override) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    };

    let result = run_command(&mut session, cli.command, cli.json);
    session.store.shutdown();

    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
