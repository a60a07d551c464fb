use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use qmux_protocol::{
    CellRange, ExecutionPlanOptions, GridContentEvent, LifecycleEvent, QueryEvent, QueryInput,
    ResultSetSubset, TextRange,
};

use crate::config::ManagerConfig;
use crate::data_service::DataService;
use crate::dispatcher;
use crate::engine::{AdapterFactory, EngineAdapter, EngineEvents, SessionMode};
use crate::error::SessionError;
use crate::lifecycle::LifecycleBus;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::registry::SessionRegistry;
use crate::session::SessionRecord;

/// State reachable from both the manager and the engine event handles.
pub(crate) struct Shared {
    registry: Mutex<SessionRegistry>,
    pub(crate) lifecycle: LifecycleBus,
    pub(crate) config: ManagerConfig,
}

impl Shared {
    pub(crate) fn lock_registry(&self) -> MutexGuard<'_, SessionRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn dispatch(&self, uri: &str, event: QueryEvent) {
        dispatcher::fire_event(&mut self.lock_registry(), uri, event);
    }
}

/// What to hand the adapter once the session is acquired.
enum RunRequest {
    Range(TextRange, Option<ExecutionPlanOptions>),
    Statement(TextRange),
    Text(String),
}

/// Adapter to cancel: looked up by uri, or given directly.
pub enum CancelTarget {
    Uri(String),
    Adapter(Arc<dyn EngineAdapter>),
}

impl From<&str> for CancelTarget {
    fn from(uri: &str) -> Self {
        CancelTarget::Uri(uri.to_string())
    }
}

impl From<String> for CancelTarget {
    fn from(uri: String) -> Self {
        CancelTarget::Uri(uri)
    }
}

impl From<Arc<dyn EngineAdapter>> for CancelTarget {
    fn from(adapter: Arc<dyn EngineAdapter>) -> Self {
        CancelTarget::Adapter(adapter)
    }
}

/// Exclusive right to start one execution on a session.
///
/// Dropping the lease clears the record's launch flag, so a run whose future
/// is abandoned before the adapter answers does not wedge the session.
pub(crate) struct SessionLease {
    shared: Weak<Shared>,
    uri: String,
    session_id: Uuid,
    pub(crate) adapter: Arc<dyn EngineAdapter>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut registry = shared.lock_registry();
        if let Some(record) = registry.get_mut(&self.uri) {
            if record.id == self.session_id {
                record.launch_pending = false;
            }
        }
    }
}

/// Coordinates query and edit sessions for every open editor surface.
///
/// One session per uri, at most one execution in flight per session. Engine
/// events are buffered per session until the results consumer calls
/// [`SessionManager::on_loaded`], while coarse lifecycle events go out on a
/// separate broadcast bus immediately.
pub struct SessionManager {
    shared: Arc<Shared>,
    factory: Arc<dyn AdapterFactory>,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl SessionManager {
    pub fn new(factory: Arc<dyn AdapterFactory>) -> Self {
        Self::with_config(factory, Arc::new(TracingNotifier), ManagerConfig::default())
    }

    pub fn with_config(
        factory: Arc<dyn AdapterFactory>,
        notifier: Arc<dyn Notifier>,
        config: ManagerConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            registry: Mutex::new(SessionRegistry::new()),
            lifecycle: LifecycleBus::new(config.lifecycle_channel_capacity),
            config,
        });
        Self {
            shared,
            factory,
            notifier,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Coarse lifecycle events for all sessions.
    pub fn subscribe_lifecycle(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.shared.lifecycle.subscribe()
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    // Session lookups

    pub fn has_session(&self, uri: &str) -> bool {
        self.shared.lock_registry().has(uri)
    }

    pub fn session_count(&self) -> usize {
        self.shared.lock_registry().len()
    }

    pub fn session_mode(&self, uri: &str) -> Option<SessionMode> {
        self.shared.lock_registry().get(uri).map(|r| r.mode)
    }

    pub fn is_running_query(&self, uri: &str) -> bool {
        self.shared
            .lock_registry()
            .get(uri)
            .is_some_and(|r| r.adapter().is_executing())
    }

    /// Direct adapter access for collaborators that need more than the
    /// manager exposes.
    pub fn get_query_runner(&self, uri: &str) -> Option<Arc<dyn EngineAdapter>> {
        self.shared
            .lock_registry()
            .get(uri)
            .map(|r| Arc::clone(r.adapter()))
    }

    pub fn get_data_service(&self, uri: &str) -> Option<Arc<DataService>> {
        self.shared
            .lock_registry()
            .get(uri)
            .map(|r| Arc::clone(r.data_service()))
    }

    pub fn query_snippet(&self, uri: &str) -> Option<String> {
        self.shared
            .lock_registry()
            .get(uri)
            .and_then(|r| r.query_snippet().map(str::to_string))
    }

    pub fn accumulated_ranges(&self, uri: &str) -> Vec<TextRange> {
        self.shared
            .lock_registry()
            .get(uri)
            .map(|r| r.accumulated_ranges().to_vec())
            .unwrap_or_default()
    }

    /// Source range of the `index`-th batch of the current run.
    pub fn range_for_batch(&self, uri: &str, index: usize) -> Option<TextRange> {
        self.shared
            .lock_registry()
            .get(uri)
            .and_then(|r| r.accumulated_ranges().get(index).copied())
    }

    // Consumer side

    /// Called by the results consumer once it is listening. Replays every
    /// queued event in order and switches the session to live forwarding.
    pub fn on_loaded(&self, uri: &str) {
        dispatcher::on_consumer_attached(&mut self.shared.lock_registry(), uri);
    }

    /// Force the grids of `uri` to re-render.
    pub fn refresh_resultsets(&self, uri: &str) {
        self.send_grid_content_event(uri, GridContentEvent::RefreshContents);
    }

    /// Resize the grids of `uri` to the current viewport.
    pub fn resize_resultsets(&self, uri: &str) {
        self.send_grid_content_event(uri, GridContentEvent::ResizeContents);
    }

    pub fn send_grid_content_event(&self, uri: &str, event: GridContentEvent) {
        dispatcher::fire_grid_content(&self.shared.lock_registry(), uri, event);
    }

    // Query execution

    /// Run the text covered by `range`. A no-op while the session executes.
    pub async fn run_query(
        &self,
        uri: &str,
        range: TextRange,
        options: Option<ExecutionPlanOptions>,
    ) -> Result<(), SessionError> {
        self.do_run_query(uri, RunRequest::Range(range, options)).await
    }

    /// Run only the statement under the start of `range`.
    pub async fn run_query_statement(&self, uri: &str, range: TextRange) -> Result<(), SessionError> {
        self.do_run_query(uri, RunRequest::Statement(range)).await
    }

    /// Run a literal query string.
    pub async fn run_query_string(&self, uri: &str, text: &str) -> Result<(), SessionError> {
        self.do_run_query(uri, RunRequest::Text(text.to_string())).await
    }

    async fn do_run_query(&self, uri: &str, request: RunRequest) -> Result<(), SessionError> {
        let snippet_max_len = self.shared.config.snippet_max_len;
        let lease = self.acquire_session(uri, SessionMode::Query, |record, reused| {
            if reused {
                record.reset_for_run();
            }
            if let RunRequest::Text(text) = &request {
                record.set_snippet(text, snippet_max_len);
            }
        });
        let Some(lease) = lease else {
            debug!(uri = %uri, "query already executing, run request ignored");
            return Ok(());
        };

        let result = match request {
            RunRequest::Range(range, options) => {
                lease.adapter.run_query(QueryInput::Range(range), options).await
            }
            RunRequest::Statement(range) => lease.adapter.run_query_statement(range).await,
            RunRequest::Text(text) => lease.adapter.run_query(QueryInput::Text(text), None).await,
        };
        drop(lease);

        result.map_err(|e| {
            let err = SessionError::RunQueryFailed(e);
            warn!(uri = %uri, error = %err, "run query failed");
            self.notify_error(&err);
            err
        })
    }

    /// Find or create the session for `uri` and reserve it for one execution.
    ///
    /// Returns `None` when the session is already executing. An idle session
    /// keeps its adapter and DataService; `prepare` is told whether the record
    /// was reused so it can reset per-run state.
    pub(crate) fn acquire_session(
        &self,
        uri: &str,
        mode: SessionMode,
        prepare: impl FnOnce(&mut SessionRecord, bool),
    ) -> Option<SessionLease> {
        let mut registry = self.shared.lock_registry();

        let reused = match registry.get(uri) {
            Some(record) if record.is_busy() => return None,
            Some(_) => true,
            None => {
                let record = self.new_record(uri, mode);
                info!(uri = %uri, session_id = %record.id, mode = ?mode, "session created");
                registry.set(record);
                false
            }
        };

        let record = registry.get_mut(uri)?;
        prepare(record, reused);
        record.launch_pending = true;

        Some(SessionLease {
            shared: Arc::downgrade(&self.shared),
            uri: uri.to_string(),
            session_id: record.id,
            adapter: Arc::clone(record.adapter()),
        })
    }

    fn new_record(&self, uri: &str, mode: SessionMode) -> SessionRecord {
        let session_id = Uuid::new_v4();
        let events = EngineEvents::new(uri, session_id, Arc::downgrade(&self.shared));
        let adapter = self.factory.create(uri, mode, events);
        let data_service = Arc::new(DataService::new(
            uri,
            self.shared.config.grid_channel_capacity,
        ));
        SessionRecord::new(session_id, uri, mode, adapter, data_service)
    }

    /// Ask the adapter to stop. Cancellation is cooperative: the session
    /// stays executing until the adapter reports completion.
    ///
    /// If the adapter rejects the request the failure is notified and a
    /// `complete(0)` event is sent so the consumer does not stay stuck in a
    /// running state. The adapter may in fact still be executing then.
    pub async fn cancel_query(&self, target: impl Into<CancelTarget>) {
        let adapter = match target.into() {
            CancelTarget::Uri(uri) => self.get_query_runner(&uri),
            CancelTarget::Adapter(adapter) => Some(adapter),
        };
        let Some(adapter) = adapter.filter(|a| a.is_executing()) else {
            debug!("no running query to cancel");
            return;
        };

        if let Err(e) = adapter.cancel_query().await {
            let err = SessionError::CancelFailed(e);
            warn!(uri = %adapter.uri(), error = %err, "cancel failed");
            self.notify_error(&err);
            self.shared.dispatch(adapter.uri(), QueryEvent::Complete(0));
        }
    }

    /// Remove the session for `uri` and tear down its adapter, including any
    /// execution still in flight. The registry entry is gone even if the
    /// adapter fails to dispose.
    ///
    /// The entry is removed before teardown is awaited: `has_session` is
    /// already false while the adapter is still shutting down, and a run for
    /// the same uri in that window gets a fresh session.
    pub async fn dispose_query(&self, uri: &str) {
        let removed = self.shared.lock_registry().remove(uri);
        let Some(record) = removed else {
            return;
        };
        info!(uri = %uri, session_id = %record.id, "session disposed");

        if let Err(e) = record.adapter().dispose_query().await {
            warn!(uri = %uri, error = %e, "adapter dispose failed");
        }
    }

    // Result access

    pub async fn get_query_rows(
        &self,
        uri: &str,
        row_start: u64,
        row_count: u64,
        batch_id: u32,
        result_id: u32,
    ) -> Result<Option<ResultSetSubset>, SessionError> {
        let Some(adapter) = self.get_query_runner(uri) else {
            return Ok(None);
        };
        let rows = adapter
            .get_query_rows(row_start, row_count, batch_id, result_id)
            .await?;
        Ok(Some(rows))
    }

    pub async fn copy_results(
        &self,
        uri: &str,
        selection: Vec<CellRange>,
        batch_id: u32,
        result_id: u32,
        include_headers: bool,
    ) -> Result<(), SessionError> {
        let Some(adapter) = self.get_query_runner(uri) else {
            return Ok(());
        };
        adapter
            .copy_results(selection, batch_id, result_id, include_headers)
            .await?;
        Ok(())
    }

    pub(crate) fn notify_error(&self, err: &SessionError) {
        self.notifier.notify(Notification::error(err.to_string()));
    }
}
