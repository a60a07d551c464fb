//! Payloads for row-level edit sessions.

use serde::{Deserialize, Serialize};

use crate::SessionUri;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DbCellValue {
    pub display_value: String,
    pub is_null: bool,
    #[serde(default)]
    pub invariant_culture_display_value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EditRowState {
    Clean,
    DirtyInsert,
    DirtyDelete,
    DirtyUpdate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditRow {
    pub id: i64,
    pub cells: Vec<DbCellValue>,
    pub is_dirty: bool,
    pub state: EditRowState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditSubsetResult {
    pub row_count: u64,
    pub subset: Vec<EditRow>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditCell {
    #[serde(flatten)]
    pub value: DbCellValue,
    pub is_dirty: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditCellResult {
    pub cell: EditCell,
    pub is_row_dirty: bool,
}

pub type EditUpdateCellResult = EditCellResult;
pub type EditRevertCellResult = EditCellResult;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditCreateRowResult {
    pub new_row_id: i64,
    pub default_values: Vec<String>,
}

/// Everything an engine needs to open an edit session on a table or view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditInitParams {
    pub owner_uri: SessionUri,
    pub schema_name: String,
    pub object_name: String,
    pub object_type: String,
    pub row_limit: Option<u32>,
    #[serde(default)]
    pub query_string: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EditSessionReadyParams {
    pub owner_uri: SessionUri,
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
