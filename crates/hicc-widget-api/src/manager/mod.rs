//! Request Manager
//!
//! The manager owns the parameter store, the widgets and the last response,
//! and runs the request cycle:
//!
//! ```text
//!  do_request(start, servlet)
//!        │
//!        ▼
//!  ┌─────────────┐
//!  │ BeforeHooks │  every widget, registration order
//!  └──────┬──────┘
//!         │  serialize store, save exposed state
//!         ▼
//!  ┌─────────────┐
//!  │    Sent     │  exactly one transport call
//!  └──────┬──────┘
//!     ┌───┴────┐
//!     │        │
//!     ▼        ▼
//!  success   failure ──► error hooks ──► Idle
//!     │
//!     ▼
//!  ┌──────────────────┐
//!  │ HandlingResponse │  store response (response policy)
//!  └────────┬─────────┘
//!           ▼
//!  ┌─────────────┐
//!  │ AfterHooks  │  every widget, registration order
//!  └──────┬──────┘
//!         ▼
//!       Idle
//! ```
//!
//! ## External State
//!
//! Exposed parameters are mirrored into a [`StateSync`] backend on every
//! cycle. `check_external()` reloads the store when the backend drifted and
//! runs one cycle for it; `watch_external()` calls it on every change signal.
//! While one reload is running further checks are skipped.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use hicc_core::{
    ManagerConfig, ParameterStore, RequestError, RequestPolicy, Response, SetupError,
    SyncConfig,
};
use hicc_sync::{DetachedSync, StateSync, SyncWatcher};

use crate::hooks::{ErrorHookFn, ErrorHooks};
use crate::registry::WidgetRegistry;
use crate::transport::{HttpTransport, SearchRequest, Transport};
use crate::widget::{Widget, WidgetContext};

mod response_slot;

use response_slot::ResponseSlot;

// =============================================================================
// Cycle Types
// =============================================================================

/// Where the request cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    BeforeHooks,
    Sent,
    HandlingResponse,
    AfterHooks,
}

/// How a request cycle ended.
///
/// Failures are reported to the error hooks; the outcome only says that it
/// happened.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The response was stored and every `after_request` hook ran.
    Completed { seq: u64 },
    /// The request failed; error hooks were called.
    Failed { seq: u64, error: RequestError },
    /// A newer response was already stored; hooks did not run.
    Stale { seq: u64 },
    /// Another request was in flight under `RequestPolicy::SkipInFlight`.
    Skipped { seq: u64 },
}

impl RequestOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Completed { seq }
            | Self::Failed { seq, .. }
            | Self::Stale { seq }
            | Self::Skipped { seq } => *seq,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A request cycle running in the background.
pub struct RequestHandle {
    seq: u64,
    handle: JoinHandle<RequestOutcome>,
}

impl RequestHandle {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Cancel the cycle. Hooks that already ran are not undone.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the cycle. `None` if it was aborted.
    pub async fn join(self) -> Option<RequestOutcome> {
        match self.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                if !e.is_cancelled() {
                    tracing::error!("Request cycle #{} panicked: {}", self.seq, e);
                }
                None
            }
        }
    }
}

/// Result of looking for external state changes.
#[derive(Debug, Clone)]
pub enum SyncCheck {
    /// The external state matches the snapshot.
    Unchanged,
    /// A previous reload is still running.
    Busy,
    /// The store was reloaded and one cycle ran.
    Reloaded(RequestOutcome),
    /// Initialization failed; the error hooks were called.
    Failed(RequestError),
}

// =============================================================================
// Shared State
// =============================================================================

/// State reachable from widget contexts.
///
/// Holds no widgets, so contexts stored inside widgets do not form cycles.
pub(crate) struct Shared {
    pub(crate) store: RwLock<ParameterStore>,
    pub(crate) responses: ResponseSlot,
}

// =============================================================================
// Manager
// =============================================================================

/// Coordinates widgets, the parameter store and the search backend.
pub struct Manager {
    config: ManagerConfig,
    sync_interval: Duration,
    shared: Arc<Shared>,
    sync: Arc<dyn StateSync>,
    transport: Arc<dyn Transport>,
    widgets: WidgetRegistry,
    error_hooks: ErrorHooks,
    init_lock: Mutex<()>,
    initialized: AtomicBool,
    phase: Mutex<CyclePhase>,
    in_flight: AtomicUsize,
    sync_busy: AtomicBool,
}

impl Manager {
    pub fn builder(config: ManagerConfig) -> ManagerBuilder {
        ManagerBuilder::new(config)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // =========================================================================
    // Widgets
    // =========================================================================

    /// Register a widget and return its context.
    ///
    /// Widgets added after initialization are initialized right away.
    pub fn add_widget(
        self: &Arc<Self>,
        widget: Arc<dyn Widget>,
    ) -> Result<WidgetContext, SetupError> {
        let ctx = WidgetContext::new(
            widget.as_ref(),
            self.shared.clone(),
            Arc::downgrade(self),
        );
        self.widgets.add(widget.clone(), ctx.clone())?;
        if self.is_initialized() {
            widget.init(&ctx);
        }
        Ok(ctx)
    }

    /// The context of a registered widget.
    pub fn widget_context(&self, id: &str) -> Option<WidgetContext> {
        self.widgets.context(id)
    }

    /// Registered widget ids, in registration order.
    pub fn widget_ids(&self) -> Vec<String> {
        self.widgets.list()
    }

    // =========================================================================
    // Store and Response
    // =========================================================================

    pub fn with_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ParameterStore) -> R,
    {
        f(&mut *self.shared.store.write())
    }

    pub fn read_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ParameterStore) -> R,
    {
        f(&*self.shared.store.read())
    }

    /// The most recently stored response.
    pub fn response(&self) -> Option<Arc<Response>> {
        self.shared.responses.current()
    }

    /// Subscribe to stored responses.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Response>>> {
        self.shared.responses.subscribe()
    }

    /// Phase of the most recently advanced cycle; `Idle` when none is running.
    pub fn phase(&self) -> CyclePhase {
        *self.phase.lock()
    }

    // =========================================================================
    // Error Hooks
    // =========================================================================

    /// Register a hook called with every request failure.
    pub fn on_error<F>(&self, hook: F) -> String
    where
        F: Fn(&RequestError) + Send + Sync + 'static,
    {
        let hook: ErrorHookFn = Arc::new(hook);
        self.error_hooks.add(hook)
    }

    pub fn remove_error_hook(&self, id: &str) -> bool {
        self.error_hooks.remove(id)
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Seed the store from external state, initialize widgets, then the sync
    /// backend.
    ///
    /// Runs once; later calls are no-ops. Called lazily by the first request.
    /// External state is merged, so exposed defaults it does not mention
    /// survive.
    pub fn init(&self) -> Result<(), SetupError> {
        let _guard = self.init_lock.lock();
        if self.is_initialized() {
            return Ok(());
        }

        let stored = self.sync.stored_string();
        let (snapshot, has_exposed) = self.with_store(|store| {
            if !stored.is_empty() {
                store.merge(&stored);
            }
            (store.exposed_string(), !store.exposed().is_empty())
        });
        if stored.is_empty() {
            self.sync.remember(&snapshot);
        } else {
            tracing::debug!("Seeded store from external state '{}'", stored);
            self.sync.remember(&stored);
        }

        for (widget, ctx) in self.widgets.snapshot() {
            widget.init(&ctx);
        }

        if has_exposed {
            self.sync.init()?;
        }

        self.initialized.store(true, Ordering::Release);
        tracing::info!(
            "Manager initialized ({} widgets, sync: {})",
            self.widgets.count(),
            self.sync.name()
        );
        Ok(())
    }

    // =========================================================================
    // Request Cycle
    // =========================================================================

    /// Run one request cycle and wait for it.
    ///
    /// Never fails: errors go to the error hooks and show up in the outcome.
    pub async fn do_request(&self, start: Option<u64>, servlet: Option<&str>) -> RequestOutcome {
        let seq = self.shared.responses.next_seq();
        self.run_cycle(seq, start, servlet.map(str::to_string)).await
    }

    /// Run one request cycle on a new task.
    pub fn spawn_request(
        self: &Arc<Self>,
        start: Option<u64>,
        servlet: Option<String>,
    ) -> RequestHandle {
        let seq = self.shared.responses.next_seq();
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move { manager.run_cycle(seq, start, servlet).await });
        RequestHandle { seq, handle }
    }

    /// The request a cycle would send for the given servlet and parameters.
    pub fn build_request(&self, servlet: &str, params: &str) -> SearchRequest {
        match &self.config.proxy_url {
            Some(proxy) => SearchRequest::Post {
                url: proxy.clone(),
                query: params.to_string(),
            },
            None => {
                let separator = if params.is_empty() { "" } else { "&" };
                SearchRequest::Get {
                    url: format!(
                        "{}{}?{}{}wt=json",
                        self.config.solr_url, servlet, params, separator
                    ),
                }
            }
        }
    }

    async fn run_cycle(
        &self,
        seq: u64,
        start: Option<u64>,
        servlet: Option<String>,
    ) -> RequestOutcome {
        if let Err(error) = self.init_or_report() {
            return RequestOutcome::Failed { seq, error };
        }

        let Some(_flight) = self.begin_flight() else {
            tracing::debug!("Skipping request #{}: another request is in flight", seq);
            return RequestOutcome::Skipped { seq };
        };

        let cycle_id = uuid::Uuid::new_v4();
        let span = tracing::debug_span!("request_cycle", seq, %cycle_id);
        self.cycle(seq, start, servlet).instrument(span).await
    }

    async fn cycle(&self, seq: u64, start: Option<u64>, servlet: Option<String>) -> RequestOutcome {
        if let Some(start) = start {
            self.with_store(|store| store.get("start").set_val(start.to_string()));
        }

        self.enter(CyclePhase::BeforeHooks);
        let widgets = self.widgets.snapshot();
        for (widget, ctx) in &widgets {
            widget.before_request(ctx);
        }

        let (params, exposed) = self.read_store(|store| (store.string(), store.exposed_string()));
        self.sync.save(&exposed);

        let servlet = servlet.unwrap_or_else(|| self.config.servlet.clone());
        let request = self.build_request(&servlet, &params);
        tracing::debug!("Sending {}", request.url());

        self.enter(CyclePhase::Sent);
        let timeout = self.config.timeout();
        let result = match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout { duration: timeout }),
        };

        let body = match result {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!("Request #{} failed: {}", seq, error);
                self.error_hooks.dispatch(&error);
                return RequestOutcome::Failed { seq, error };
            }
        };

        self.enter(CyclePhase::HandlingResponse);
        if !self.shared.responses.accept(Arc::new(Response::new(seq, body))) {
            return RequestOutcome::Stale { seq };
        }

        self.enter(CyclePhase::AfterHooks);
        for (widget, ctx) in &widgets {
            widget.after_request(ctx);
        }

        tracing::debug!("Request #{} completed", seq);
        RequestOutcome::Completed { seq }
    }

    /// Lazy initialization; failures go to the error hooks.
    fn init_or_report(&self) -> Result<(), RequestError> {
        self.init().map_err(|e| {
            let error = RequestError::Setup(e.to_string());
            self.error_hooks.dispatch(&error);
            error
        })
    }

    fn enter(&self, phase: CyclePhase) {
        tracing::trace!("Cycle phase: {:?}", phase);
        *self.phase.lock() = phase;
    }

    /// Count this cycle as in flight, or refuse under `SkipInFlight`.
    fn begin_flight(&self) -> Option<FlightGuard<'_>> {
        let previous = self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = FlightGuard { manager: self };
        if previous > 0 && self.config.request_policy == RequestPolicy::SkipInFlight {
            return None;
        }
        Some(guard)
    }

    // =========================================================================
    // External State
    // =========================================================================

    /// Reload the store if the external state changed behind our back.
    ///
    /// Initializes the manager first, so state that was already there is
    /// merged rather than reported as drift. On drift the exposed parameters
    /// are replaced with the external ones and exactly one cycle runs.
    pub async fn check_external(&self) -> SyncCheck {
        if self.sync_busy.swap(true, Ordering::AcqRel) {
            tracing::trace!("Sync check skipped: reload in progress");
            return SyncCheck::Busy;
        }
        let _busy = BusyGuard(&self.sync_busy);

        if let Err(error) = self.init_or_report() {
            return SyncCheck::Failed(error);
        }

        let Some(stored) = self.sync.drift() else {
            return SyncCheck::Unchanged;
        };

        tracing::info!("External state changed, reloading '{}'", stored);
        self.with_store(|store| store.load(&stored));
        self.sync.remember(&stored);
        SyncCheck::Reloaded(self.do_request(None, None).await)
    }

    /// Start watching the external state.
    ///
    /// The watcher holds the manager weakly and stops when dropped.
    pub fn watch_external(self: &Arc<Self>) -> SyncWatcher {
        let source = self.sync.change_source(self.sync_interval);
        let manager = Arc::downgrade(self);
        SyncWatcher::spawn(source, move || {
            let manager = manager.clone();
            Box::pin(async move {
                if let Some(manager) = manager.upgrade() {
                    manager.check_external().await;
                }
            })
        })
    }
}

struct FlightGuard<'a> {
    manager: &'a Manager,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.manager.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            *self.manager.phase.lock() = CyclePhase::Idle;
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Manager`].
///
/// Defaults: HTTP transport, no state persistence, a store exposing the
/// default names.
pub struct ManagerBuilder {
    config: ManagerConfig,
    sync_interval: Duration,
    store: Option<ParameterStore>,
    sync: Option<Arc<dyn StateSync>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ManagerBuilder {
    fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            sync_interval: SyncConfig::default().interval(),
            store: None,
            sync: None,
            transport: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn sync(mut self, sync: Arc<dyn StateSync>) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Polling interval for backends without change notifications.
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn store(mut self, store: ParameterStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Start from an empty store exposing `names`.
    pub fn exposed<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.store(ParameterStore::with_exposed(names))
    }

    pub fn build(self) -> Arc<Manager> {
        let responses = ResponseSlot::new(self.config.response_policy);
        Arc::new(Manager {
            sync_interval: self.sync_interval,
            shared: Arc::new(Shared {
                store: RwLock::new(self.store.unwrap_or_default()),
                responses,
            }),
            sync: self.sync.unwrap_or_else(|| Arc::new(DetachedSync::new())),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new())),
            widgets: WidgetRegistry::new(),
            error_hooks: ErrorHooks::new(),
            init_lock: Mutex::new(()),
            initialized: AtomicBool::new(false),
            phase: Mutex::new(CyclePhase::Idle),
            in_flight: AtomicUsize::new(0),
            sync_busy: AtomicBool::new(false),
            config: self.config,
        })
    }
}
