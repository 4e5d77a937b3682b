//! notion-sync: publish a Notion database as markdown files.
//!
//! # Usage
//!
//! ```text
//! notion-sync --config notion-sync.yml [--log-level debug] [--json] [--annotations]
//! ```
//!
//! `NOTION_SECRET` and `NOTION_DATABASE_ID` override the values in the file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use core_runtime::config::{parse_log_level, AppConfig};
use core_runtime::logging::init_logging;
use core_service::{desktop_dependencies, CiAnnotationSink, CoreService};

#[derive(Parser, Debug)]
#[command(
    name = "notion-sync",
    version,
    about = "Sync published Notion pages into a static-site source tree",
    long_about = None,
)]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, default_value = "notion-sync.yml")]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the pass summary as JSON
    #[arg(long)]
    json: bool,

    /// Also emit warnings and errors as CI workflow annotations on stdout
    #[arg(long)]
    annotations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.apply_env_overrides();

    let mut deps = desktop_dependencies()?;
    if cli.annotations {
        deps = deps.with_logger_sink(Arc::new(CiAnnotationSink::stdout()));
    }

    let mut logging = deps.logging_config(&config)?;
    if let Some(level) = &cli.log_level {
        logging = logging.with_level(parse_log_level(level)?);
    }
    init_logging(logging)?;

    let service = CoreService::new(&config, deps)?;
    let outcome = service.run_once().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!(
            "queried {} records, converted {}, deleted {} local files",
            outcome.queried, outcome.handled, outcome.deleted
        );
    }

    Ok(())
}
