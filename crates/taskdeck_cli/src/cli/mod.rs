use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdeck_core::config::ConfigOverrides;
use taskdeck_core::error::AppError;
use taskdeck_core::model::PriorityEncoding;

#[derive(Parser, Debug)]
#[command(name = "taskdeck", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskdeck add "Buy milk" --priority high --due 2026-01-05 --category Errands
    Add {
        title: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long, value_name = "YYYY-MM-DD")]
        due: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Edit a task; only the given fields change
    ///
    /// Example: taskdeck edit 3f2a --title "Buy oat milk" --priority low
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long, value_name = "YYYY-MM-DD")]
        due: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Flip a task between pending and completed
    ///
    /// Example: taskdeck toggle 3f2a
    Toggle { id: String },
    /// Delete a task
    ///
    /// Example: taskdeck delete 3f2a
    Delete { id: String },
    /// Manage categories
    ///
    /// Example: taskdeck category add Work
    Category {
        #[command(subcommand)]
        category: CategoryCommand,
    },
    /// List tasks, optionally filtered
    ///
    /// Example: taskdeck list --search milk --category Errands
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Set the search filter for this session and list matches
    ///
    /// Example: taskdeck search lau
    Search { query: Option<String> },
    /// Set the category filter for this session and list matches
    ///
    /// Example: taskdeck filter Work
    /// Example: taskdeck filter All
    Filter { category: String },
    /// Show totals of completed and pending tasks
    ///
    /// Example: taskdeck stats
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Register a category
    ///
    /// Example: taskdeck category add Work
    Add { name: String },
    /// List known categories
    ///
    /// Example: taskdeck category list
    List,
}

/// Flag name used to identify config override arguments by the runtime.
pub const CONFIG_OVERRIDE_FLAG: &str = "--config-override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DefaultCategory,
    PriorityEncoding,
    StorePath,
    LogFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let canonical_field = canonicalize_flag_name(key_raw)
        .ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match canonical_field.as_str() {
        "default_category" | "category" => ConfigOverrideTarget::DefaultCategory,
        "priority_encoding" | "encoding" => ConfigOverrideTarget::PriorityEncoding,
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        "log_filter" | "log" => ConfigOverrideTarget::LogFilter,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override '{canonical_field}' requires a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Fold every `--config-override` value into one set of overrides.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::DefaultCategory => {
                overrides.default_category = Some(parsed.value)
            }
            ConfigOverrideTarget::PriorityEncoding => {
                overrides.priority_encoding = Some(parsed.value.parse::<PriorityEncoding>()?)
            }
            ConfigOverrideTarget::StorePath => {
                overrides.store_path = Some(PathBuf::from(parsed.value))
            }
            ConfigOverrideTarget::LogFilter => overrides.log_filter = Some(parsed.value),
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
