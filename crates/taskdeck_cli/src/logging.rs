use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "TASKDECK_LOG";

/// Install the stderr subscriber. `TASKDECK_LOG` beats the configured filter.
pub fn init_logging(configured_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(configured_filter));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
