//! Dashboard assembly.
//!
//! Wires a manager to an in-memory navigation log, the sync backend chosen in
//! the configuration and a summary widget.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use hicc_core::{ConfigError, DashboardConfig, ParameterStore, SetupError, SyncMode};
use hicc_sync::{
    DetachedSync, HashSync, HistorySync, MemoryNavigationLog, NavigationLog, StateSync,
};
use hicc_widget_api::widgets::TextWidget;
use hicc_widget_api::{Manager, RequestOutcome, Transport, WidgetContext};

use crate::summary::{Summary, SummaryWidget};

/// Errors that stop the runner.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// The sync backend for a configured mode.
pub fn build_sync(mode: SyncMode, log: Arc<dyn NavigationLog>) -> Arc<dyn StateSync> {
    match mode {
        SyncMode::Hash => Arc::new(HashSync::new(log)),
        SyncMode::History => Arc::new(HistorySync::new(log)),
        SyncMode::None => Arc::new(DetachedSync::new()),
    }
}

/// A headless dashboard: a query box and a summary.
pub struct Dashboard {
    manager: Arc<Manager>,
    log: Arc<MemoryNavigationLog>,
    text: Arc<TextWidget>,
    text_ctx: WidgetContext,
    summary: Arc<SummaryWidget>,
}

impl Dashboard {
    pub fn new(
        config: &DashboardConfig,
        url: &str,
        transport: Arc<dyn Transport>,
        facet_fields: Vec<String>,
    ) -> Result<Self, AppError> {
        let log = Arc::new(MemoryNavigationLog::new(url));
        let sync = build_sync(config.sync.mode, log.clone());

        let manager = Manager::builder(config.manager.clone())
            .transport(transport)
            .sync(sync)
            .sync_interval(config.sync.interval())
            .store(ParameterStore::with_exposed(config.sync.exposed.iter().cloned()))
            .build();

        let text = Arc::new(TextWidget::new("query"));
        let text_ctx = manager.add_widget(text.clone())?;
        let summary = Arc::new(SummaryWidget::new("summary", facet_fields));
        manager.add_widget(summary.clone())?;

        Ok(Self {
            manager,
            log,
            text,
            text_ctx,
            summary,
        })
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn log(&self) -> &Arc<MemoryNavigationLog> {
        &self.log
    }

    /// Set the main query without running a request.
    pub fn set_query(&self, q: &str) -> bool {
        self.text.set(&self.text_ctx, q)
    }

    /// Initialize and run one cycle.
    pub async fn refresh(&self) -> Result<RequestOutcome, AppError> {
        self.manager.init()?;
        Ok(self.manager.do_request(None, None).await)
    }

    pub fn summary(&self) -> Option<Summary> {
        self.summary.latest()
    }

    /// Follow external state changes for `duration`.
    pub async fn watch_for(&self, duration: Duration) {
        let watcher = self.manager.watch_external();
        tracing::info!("Watching for external changes for {:?}", duration);
        tokio::time::sleep(duration).await;
        watcher.stop().await;
    }
}
