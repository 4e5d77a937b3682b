//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem)
//! and the providers built on them into a [`SyncCoordinator`]. Desktop and CI
//! hosts enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`desktop_dependencies`]; other hosts build a
//! [`CoreDependencies`] bundle themselves.

pub mod annotations;
pub mod error;

pub use annotations::CiAnnotationSink;
pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{http::HttpClient, logging::LoggerSink, storage::FileSystemAccess};
use core_markdown::MarkdownConverter;
use core_runtime::config::{AppConfig, SyncSettings};
use core_runtime::logging::LoggingConfig;
use core_sync::{SyncCoordinator, SyncOutcome};
use provider_notion::NotionConnector;
use provider_picgo::PicGoUploader;
use tracing::{info, warn};

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    /// Host log stream that receives a copy of engine events.
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(http_client: Arc<dyn HttpClient>, filesystem: Arc<dyn FileSystemAccess>) -> Self {
        Self {
            http_client,
            filesystem,
            logger_sink: None,
        }
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Logging settings from `config`, forwarding to the host sink if one is set.
    pub fn logging_config(&self, config: &AppConfig) -> Result<LoggingConfig> {
        let logging = config.logging.to_logging_config()?;
        Ok(match &self.logger_sink {
            Some(sink) => logging.with_logger_sink(Arc::clone(sink)),
            None => logging,
        })
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    coordinator: Arc<SyncCoordinator>,
}

impl CoreService {
    /// Validate `config` and assemble the pipeline on top of `deps`.
    pub fn new(config: &AppConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;
        let settings = config.sync_settings()?;

        let notion = Arc::new(NotionConnector::new(
            Arc::clone(&deps.http_client),
            config.notion_secret.clone(),
        ));
        let converter = Arc::new(MarkdownConverter::new(notion.clone()));

        let mut coordinator =
            SyncCoordinator::new(settings, notion, converter, Arc::clone(&deps.filesystem));

        match (&config.picgo, config.migrate_image) {
            (Some(picgo), true) => {
                info!(server = %picgo.server_url, "Image migration enabled");
                let uploader = PicGoUploader::new(Arc::clone(&deps.http_client), &picgo.server_url);
                coordinator = coordinator.with_uploader(Arc::new(uploader));
            }
            (Some(_), false) => warn!("picgo is configured but migrate_image is off"),
            (None, _) => {}
        }

        Ok(Self {
            coordinator: Arc::new(coordinator),
        })
    }

    /// Run one reconciliation pass.
    pub async fn run_once(&self) -> Result<SyncOutcome> {
        Ok(self.coordinator.sync().await?)
    }

    /// Settings the pipeline was built with.
    pub fn settings(&self) -> &SyncSettings {
        self.coordinator.settings()
    }
}

/// `reqwest` and `tokio::fs` collaborators for desktop and CI hosts.
///
/// ```ignore
/// let deps = core_service::desktop_dependencies()?;
/// init_logging(deps.logging_config(&config)?)?;
/// let outcome = CoreService::new(&config, deps)?.run_once().await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub fn desktop_dependencies() -> Result<CoreDependencies> {
    use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
    use std::time::Duration;

    let http = ReqwestHttpClient::try_with_timeout(Duration::from_secs(60))
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;

    Ok(CoreDependencies::new(
        Arc::new(http),
        Arc::new(TokioFileSystem::new()),
    ))
}
