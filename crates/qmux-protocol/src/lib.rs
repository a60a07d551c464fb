pub mod edit;

use serde::{Deserialize, Serialize};

pub use edit::{
    DbCellValue, EditCell, EditCellResult, EditCreateRowResult, EditInitParams,
    EditRevertCellResult, EditRow, EditRowState, EditSessionReadyParams, EditSubsetResult,
    EditUpdateCellResult,
};

/// Opaque key identifying one editor surface and its session.
pub type SessionUri = String;

/// A span of editor text. Line and column numbers are 1-based; the zero
/// range stands in for batches the engine reported without a source span.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_line_number: u32,
    pub start_column: u32,
    pub end_line_number: u32,
    pub end_column: u32,
}

impl TextRange {
    pub fn new(
        start_line_number: u32,
        start_column: u32,
        end_line_number: u32,
        end_column: u32,
    ) -> Self {
        Self {
            start_line_number,
            start_column,
            end_line_number,
            end_column,
        }
    }
}

/// What an engine is asked to execute.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryInput {
    /// Pull the query text out of the document using this span.
    Range(TextRange),
    /// Execute a literal query string.
    Text(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlanOptions {
    #[serde(default)]
    pub display_estimated_query_plan: bool,
    #[serde(default)]
    pub display_actual_query_plan: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type_name: String,
    #[serde(default)]
    pub allow_db_null: Option<bool>,
    #[serde(default)]
    pub is_key: Option<bool>,
    #[serde(default)]
    pub is_read_only: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetSummary {
    pub id: u32,
    pub batch_id: u32,
    pub row_count: u64,
    pub column_info: Vec<ColumnInfo>,
    pub complete: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartSummary {
    pub id: u32,
    #[serde(default)]
    pub range: Option<TextRange>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    pub text: String,
}

/// A line in the messages pane.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryMessage {
    pub message: String,
    #[serde(default)]
    pub batch_id: Option<u32>,
    pub is_error: bool,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<MessageLink>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlanInfo {
    pub provider_id: String,
    pub file_uri: SessionUri,
    pub plan_xml: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetSubset {
    pub row_count: u64,
    pub rows: Vec<Vec<DbCellValue>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryCancelResult {
    #[serde(default)]
    pub messages: Option<String>,
}

/// Rectangular grid selection used for copy requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub from_row: u64,
    pub to_row: u64,
    pub from_cell: u32,
    pub to_cell: u32,
}

/// Fine-grained per-session event delivered to the results consumer.
///
/// These are buffered until the consumer attaches and then replayed in the
/// order the engine produced them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum QueryEvent {
    Start,
    ResultSet(ResultSetSummary),
    Update,
    Message(QueryMessage),
    /// Total elapsed milliseconds of the execution.
    Complete(u64),
    EditSessionReady,
}

impl QueryEvent {
    /// Raw event name as seen by consumers.
    pub fn name(&self) -> &'static str {
        match self {
            QueryEvent::Start => "start",
            QueryEvent::ResultSet(_) => "resultSet",
            QueryEvent::Update => "update",
            QueryEvent::Message(_) => "message",
            QueryEvent::Complete(_) => "complete",
            QueryEvent::EditSessionReady => "editSessionReady",
        }
    }
}

/// UI-only grid signals. Never buffered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridContentEvent {
    RefreshContents,
    ResizeContents,
    CopySelection,
    CopyWithHeaders,
    CopyMessagesSelection,
    SelectAll,
    SelectAllMessages,
    ToggleResultPane,
    ToggleMessagePane,
    SaveAsCsv,
    SaveAsJson,
    SaveAsExcel,
    SaveAsXml,
    ViewAsChart,
    GoToNextQueryOutputTab,
    GoToNextGrid,
}

impl GridContentEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridContentEvent::RefreshContents => "RefreshContents",
            GridContentEvent::ResizeContents => "ResizeContents",
            GridContentEvent::CopySelection => "CopySelection",
            GridContentEvent::CopyWithHeaders => "CopyWithHeaders",
            GridContentEvent::CopyMessagesSelection => "CopyMessagesSelection",
            GridContentEvent::SelectAll => "SelectAll",
            GridContentEvent::SelectAllMessages => "SelectAllMessages",
            GridContentEvent::ToggleResultPane => "ToggleResultPane",
            GridContentEvent::ToggleMessagePane => "ToggleMessagePane",
            GridContentEvent::SaveAsCsv => "SaveAsCsv",
            GridContentEvent::SaveAsJson => "SaveAsJson",
            GridContentEvent::SaveAsExcel => "SaveAsExcel",
            GridContentEvent::SaveAsXml => "SaveAsXml",
            GridContentEvent::ViewAsChart => "ViewAsChart",
            GridContentEvent::GoToNextQueryOutputTab => "GoToNextQueryOutputTab",
            GridContentEvent::GoToNextGrid => "GoToNextGrid",
        }
    }
}

/// Coarse lifecycle categories published to extensibility observers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleKind {
    QueryStart,
    QueryStop,
    QueryUpdate,
    ExecutionPlanAvailable,
    Visualize,
    EditSessionReady,
}

/// State of a session at the moment a lifecycle event was published.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryInfoSnapshot {
    pub ranges: Vec<TextRange>,
    pub messages: Vec<QueryMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum LifecycleParams {
    Plan(QueryPlanInfo),
    ResultSet(ResultSetSummary),
    EditSession(EditSessionReadyParams),
}

/// Broadcast-style event, never buffered per session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    #[serde(rename = "type")]
    pub kind: LifecycleKind,
    pub uri: SessionUri,
    pub query_info: QueryInfoSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<LifecycleParams>,
}
