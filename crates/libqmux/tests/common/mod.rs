//! Shared fixtures: a scripted engine adapter and the factory that builds it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use libqmux::{
    AdapterFactory, EngineAdapter, EngineError, EngineEvent, EngineEvents, EngineResult,
    ManagerConfig, RecordingNotifier, SessionManager, SessionMode,
};
use qmux_protocol::{
    BatchStartSummary, DbCellValue, EditCell, EditCellResult, EditCreateRowResult,
    EditInitParams, EditRevertCellResult, EditSessionReadyParams, EditSubsetResult,
    EditUpdateCellResult, ExecutionPlanOptions, QueryCancelResult, QueryEvent, QueryInput,
    QueryMessage, ResultSetSubset, ResultSetSummary, TextRange,
};
use tokio::sync::{broadcast, mpsc};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine adapter whose progress is driven by the test.
///
/// Runs are accepted immediately and stay executing until the test calls
/// [`FakeEngine::finish`] or [`FakeEngine::edit_ready`].
pub struct FakeEngine {
    uri: String,
    pub mode: SessionMode,
    events: EngineEvents,
    executing: AtomicBool,
    calls: Mutex<Vec<String>>,
    inputs: Mutex<Vec<QueryInput>>,
    failures: Mutex<HashMap<&'static str, String>>,
    messages: Mutex<Vec<QueryMessage>>,
}

impl FakeEngine {
    fn new(uri: &str, mode: SessionMode, events: EngineEvents) -> Self {
        Self {
            uri: uri.to_string(),
            mode,
            events,
            executing: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn emit(&self, event: EngineEvent) {
        self.events.emit(event);
    }

    /// Make every later call to `operation` fail with `message`.
    pub fn fail(&self, operation: &'static str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation, message.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn finish(&self, elapsed_ms: u64) {
        self.executing.store(false, Ordering::SeqCst);
        self.emit(EngineEvent::QueryEnd { elapsed_ms });
    }

    pub fn edit_ready(&self) {
        self.executing.store(false, Ordering::SeqCst);
        self.emit(EngineEvent::EditSessionReady(EditSessionReadyParams {
            owner_uri: self.uri.clone(),
            success: true,
            message: String::new(),
        }));
    }

    pub fn set_executing(&self, executing: bool) {
        self.executing.store(executing, Ordering::SeqCst);
    }

    pub fn push_message(&self, message: QueryMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == operation).count()
    }

    pub fn inputs(&self) -> Vec<QueryInput> {
        self.inputs.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) -> EngineResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        match self.failures.lock().unwrap().get(operation) {
            Some(message) => Err(EngineError::Request(message.clone())),
            None => Ok(()),
        }
    }

    async fn start(&self, operation: &'static str) -> EngineResult<()> {
        self.record(operation)?;
        self.executing.store(true, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(())
    }
}

fn cell_result(value: &str) -> EditCellResult {
    EditCellResult {
        cell: EditCell {
            value: DbCellValue {
                display_value: value.to_string(),
                is_null: false,
                invariant_culture_display_value: None,
            },
            is_dirty: true,
        },
        is_row_dirty: true,
    }
}

#[async_trait]
impl EngineAdapter for FakeEngine {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn is_executing(&self) -> bool {
        self.executing.load(Ordering::SeqCst)
    }

    fn messages(&self) -> Vec<QueryMessage> {
        self.messages.lock().unwrap().clone()
    }

    async fn run_query(
        &self,
        input: QueryInput,
        _options: Option<ExecutionPlanOptions>,
    ) -> EngineResult<()> {
        self.inputs.lock().unwrap().push(input);
        self.start("run_query").await
    }

    async fn run_query_statement(&self, range: TextRange) -> EngineResult<()> {
        self.inputs.lock().unwrap().push(QueryInput::Range(range));
        self.start("run_query_statement").await
    }

    async fn cancel_query(&self) -> EngineResult<QueryCancelResult> {
        self.record("cancel_query")?;
        Ok(QueryCancelResult::default())
    }

    async fn get_query_rows(
        &self,
        _row_start: u64,
        row_count: u64,
        _batch_id: u32,
        _result_id: u32,
    ) -> EngineResult<ResultSetSubset> {
        self.record("get_query_rows")?;
        Ok(ResultSetSubset {
            row_count,
            rows: Vec::new(),
        })
    }

    async fn dispose_query(&self) -> EngineResult<()> {
        self.executing.store(false, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.record("dispose_query")
    }

    async fn initialize_edit(&self, _params: EditInitParams) -> EngineResult<()> {
        self.start("initialize_edit").await
    }

    async fn get_edit_rows(&self, _row_start: u64, row_count: u64) -> EngineResult<EditSubsetResult> {
        self.record("get_edit_rows")?;
        Ok(EditSubsetResult {
            row_count,
            subset: Vec::new(),
        })
    }

    async fn update_cell(
        &self,
        _row_id: i64,
        _column_id: u32,
        new_value: String,
    ) -> EngineResult<EditUpdateCellResult> {
        self.record("update_cell")?;
        Ok(cell_result(&new_value))
    }

    async fn commit_edit(&self) -> EngineResult<()> {
        self.record("commit_edit")
    }

    async fn create_row(&self) -> EngineResult<EditCreateRowResult> {
        self.record("create_row")?;
        Ok(EditCreateRowResult {
            new_row_id: 7,
            default_values: vec!["NULL".to_string()],
        })
    }

    async fn delete_row(&self, _row_id: i64) -> EngineResult<()> {
        self.record("delete_row")
    }

    async fn revert_cell(&self, _row_id: i64, _column_id: u32) -> EngineResult<EditRevertCellResult> {
        self.record("revert_cell")?;
        Ok(cell_result("original"))
    }

    async fn revert_row(&self, _row_id: i64) -> EngineResult<()> {
        self.record("revert_row")
    }

    async fn dispose_edit(&self, _owner_uri: &str) -> EngineResult<()> {
        tokio::task::yield_now().await;
        self.record("dispose_edit")
    }
}

/// Builds [`FakeEngine`]s and keeps every one it built.
#[derive(Default)]
pub struct FakeFactory {
    engines: Mutex<Vec<Arc<FakeEngine>>>,
}

impl FakeFactory {
    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> Arc<FakeEngine> {
        Arc::clone(&self.engines.lock().unwrap()[index])
    }

    pub fn last(&self) -> Arc<FakeEngine> {
        let engines = self.engines.lock().unwrap();
        Arc::clone(engines.last().expect("no engine created"))
    }
}

impl AdapterFactory for FakeFactory {
    fn create(&self, uri: &str, mode: SessionMode, events: EngineEvents) -> Arc<dyn EngineAdapter> {
        let engine = Arc::new(FakeEngine::new(uri, mode, events));
        self.engines.lock().unwrap().push(Arc::clone(&engine));
        engine
    }
}

pub struct Harness {
    pub manager: SessionManager,
    pub factory: Arc<FakeFactory>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn harness() -> Harness {
    harness_with(ManagerConfig::default())
}

pub fn harness_with(config: ManagerConfig) -> Harness {
    init_tracing();
    let factory = Arc::new(FakeFactory::default());
    let notifier = Arc::new(RecordingNotifier::new());
    let manager = SessionManager::with_config(factory.clone(), notifier.clone(), config);
    Harness {
        manager,
        factory,
        notifier,
    }
}

pub fn range(line: u32) -> TextRange {
    TextRange::new(line, 1, line, 20)
}

pub fn batch(id: u32, range: Option<TextRange>) -> EngineEvent {
    EngineEvent::BatchStart(BatchStartSummary { id, range })
}

pub fn result_set(id: u32) -> ResultSetSummary {
    ResultSetSummary {
        id,
        batch_id: 0,
        row_count: 3,
        column_info: Vec::new(),
        complete: true,
    }
}

pub fn message(text: &str) -> QueryMessage {
    QueryMessage {
        message: text.to_string(),
        batch_id: Some(0),
        is_error: false,
        time: "12:00:00".to_string(),
        link: None,
    }
}

/// A receiver that can be emptied without waiting.
pub trait Ready {
    type Item;

    fn try_next(&mut self) -> Option<Self::Item>;
}

impl<T: Clone> Ready for broadcast::Receiver<T> {
    type Item = T;

    fn try_next(&mut self) -> Option<T> {
        self.try_recv().ok()
    }
}

impl<T> Ready for mpsc::UnboundedReceiver<T> {
    type Item = T;

    fn try_next(&mut self) -> Option<T> {
        self.try_recv().ok()
    }
}

/// Everything currently waiting on `rx`.
pub fn drain<R: Ready>(rx: &mut R) -> Vec<R::Item> {
    let mut out = Vec::new();
    while let Some(event) = rx.try_next() {
        out.push(event);
    }
    out
}

pub fn names(events: &[QueryEvent]) -> Vec<&'static str> {
    events.iter().map(QueryEvent::name).collect()
}
