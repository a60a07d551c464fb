//! The seam between the session manager and whatever actually runs queries.
//!
//! An [`EngineAdapter`] is created per session by an [`AdapterFactory`] and
//! reports progress through the [`EngineEvents`] handle it is given at
//! construction. The manager never looks inside an adapter beyond this trait.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use qmux_protocol::{
    BatchStartSummary, CellRange, EditCreateRowResult, EditInitParams, EditRevertCellResult,
    EditSessionReadyParams, EditSubsetResult, EditUpdateCellResult, ExecutionPlanOptions,
    QueryCancelResult, QueryInput, QueryMessage, QueryPlanInfo, ResultSetSubset,
    ResultSetSummary, SessionUri, TextRange,
};

use crate::manager::Shared;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The backend rejected or failed the request.
    #[error("{0}")]
    Request(String),

    #[error("engine does not support {0}")]
    Unsupported(&'static str),

    #[error("engine adapter has been disposed")]
    Disposed,
}

/// Which event choreography a session follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Free-form query execution.
    Query,
    /// Row-level editing of a table's result set.
    Edit,
}

/// Raw lifecycle events emitted by an engine adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ResultSet(ResultSetSummary),
    ResultSetUpdate(ResultSetSummary),
    BatchStart(BatchStartSummary),
    Message(QueryMessage),
    QueryStart,
    QueryEnd { elapsed_ms: u64 },
    QueryPlanAvailable(QueryPlanInfo),
    Visualize(ResultSetSummary),
    EditSessionReady(EditSessionReadyParams),
}

/// Handle an adapter uses to report events back to its session.
///
/// Events are routed synchronously, in call order. A handle outlives neither
/// its session nor the manager: once the session is disposed or replaced, or
/// the manager is dropped, emitted events are discarded.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    uri: SessionUri,
    session_id: Uuid,
    shared: Weak<Shared>,
}

impl EngineEvents {
    pub(crate) fn new(uri: &str, session_id: Uuid, shared: Weak<Shared>) -> Self {
        Self {
            uri: uri.to_string(),
            session_id,
            shared,
        }
    }

    /// A handle bound to no manager. Everything emitted through it is dropped.
    pub fn detached(uri: &str) -> Self {
        Self::new(uri, Uuid::nil(), Weak::new())
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn emit(&self, event: EngineEvent) {
        match self.shared.upgrade() {
            Some(shared) => shared.handle_engine_event(&self.uri, self.session_id, event),
            None => debug!(uri = %self.uri, "session manager gone, engine event dropped"),
        }
    }
}

/// Performs query and edit operations for exactly one session.
///
/// `is_executing` must stay true from the moment a run or edit initialization
/// is accepted until the adapter emits [`EngineEvent::QueryEnd`] (or the edit
/// session is ready). Adapters must not emit events from inside
/// [`AdapterFactory::create`] or from [`EngineAdapter::messages`].
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    fn uri(&self) -> &str;

    fn is_executing(&self) -> bool;

    /// Messages produced by the current or most recent execution.
    fn messages(&self) -> Vec<QueryMessage> {
        Vec::new()
    }

    /// Start executing `input`. Resolves once the backend has accepted the
    /// request; results and completion arrive as events.
    async fn run_query(
        &self,
        input: QueryInput,
        options: Option<ExecutionPlanOptions>,
    ) -> EngineResult<()>;

    /// Execute only the statement under the start of `range`.
    async fn run_query_statement(&self, range: TextRange) -> EngineResult<()>;

    async fn cancel_query(&self) -> EngineResult<QueryCancelResult>;

    async fn get_query_rows(
        &self,
        row_start: u64,
        row_count: u64,
        batch_id: u32,
        result_id: u32,
    ) -> EngineResult<ResultSetSubset>;

    async fn copy_results(
        &self,
        _selection: Vec<CellRange>,
        _batch_id: u32,
        _result_id: u32,
        _include_headers: bool,
    ) -> EngineResult<()> {
        Err(EngineError::Unsupported("copying results"))
    }

    /// Tear down any execution state, including work still in flight.
    async fn dispose_query(&self) -> EngineResult<()>;

    async fn initialize_edit(&self, _params: EditInitParams) -> EngineResult<()> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn get_edit_rows(&self, _row_start: u64, _row_count: u64) -> EngineResult<EditSubsetResult> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn update_cell(
        &self,
        _row_id: i64,
        _column_id: u32,
        _new_value: String,
    ) -> EngineResult<EditUpdateCellResult> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn commit_edit(&self) -> EngineResult<()> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn create_row(&self) -> EngineResult<EditCreateRowResult> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn delete_row(&self, _row_id: i64) -> EngineResult<()> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn revert_cell(&self, _row_id: i64, _column_id: u32) -> EngineResult<EditRevertCellResult> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    async fn revert_row(&self, _row_id: i64) -> EngineResult<()> {
        Err(EngineError::Unsupported("edit sessions"))
    }

    /// Release the server-side edit session (cursor, locks) for `owner_uri`.
    async fn dispose_edit(&self, _owner_uri: &str) -> EngineResult<()> {
        Err(EngineError::Unsupported("edit sessions"))
    }
}

/// Builds the adapter for a new session.
pub trait AdapterFactory: Send + Sync {
    fn create(&self, uri: &str, mode: SessionMode, events: EngineEvents) -> Arc<dyn EngineAdapter>;
}

impl<F> AdapterFactory for F
where
    F: Fn(&str, SessionMode, EngineEvents) -> Arc<dyn EngineAdapter> + Send + Sync,
{
    fn create(&self, uri: &str, mode: SessionMode, events: EngineEvents) -> Arc<dyn EngineAdapter> {
        self(uri, mode, events)
    }
}
