use anyhow::{Context, Result, anyhow, bail};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use taskdesk_application::{AppContext, AppServices};
use taskdesk_core::config::TaskdeskConfig;
use taskdesk_core::identity::Navigator;
use taskdesk_infrastructure::TaskdeskPaths;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`/`-q`.
pub fn init_tracing(verbose: u8, quiet: u8) -> Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        tracing::debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

/// Prints interactive identity URLs for the user to open.
pub struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        println!("🔗 Open this URL in your browser:\n  {url}");
    }
}

pub fn load_config(path: Option<&Path>) -> Result<TaskdeskConfig> {
    let default_path = match path {
        Some(_) => None,
        None => TaskdeskPaths::config_file().ok(),
    };
    let path = path.or(default_path.as_deref());
    TaskdeskConfig::load(path).context("Failed to load configuration")
}

pub async fn build_context(config_path: Option<&Path>) -> Result<AppContext> {
    let config = load_config(config_path)?;
    let services = AppServices::production(&config, Arc::new(ConsoleNavigator))
        .context("Failed to set up client services")?;
    Ok(AppContext::bootstrap(config, services).await)
}

pub async fn require_login(context: &AppContext) -> Result<()> {
    if !context.session().is_authenticated().await {
        bail!("Not logged in. Run `taskdesk login` first.");
    }
    Ok(())
}

pub fn format_millis(millis: Option<i64>) -> String {
    millis
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}
