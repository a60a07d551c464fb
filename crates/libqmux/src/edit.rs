//! Edit-session half of the manager: row-level mutation of a table's rows.
//!
//! Every row operation resolves to the empty result when the uri has no
//! session, or when its adapter is still busy initializing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use qmux_protocol::{
    EditCreateRowResult, EditInitParams, EditRevertCellResult, EditSubsetResult,
    EditUpdateCellResult,
};

use crate::engine::{EngineAdapter, SessionMode};
use crate::error::SessionError;
use crate::manager::SessionManager;
use crate::notify::Notification;

impl SessionManager {
    /// Open an edit session on `params.owner_uri`. A no-op while that
    /// session is executing.
    pub async fn initialize_edit(&self, params: EditInitParams) -> Result<(), SessionError> {
        let uri = params.owner_uri.clone();
        let snippet_max_len = self.config().snippet_max_len;
        let lease = self.acquire_session(&uri, SessionMode::Edit, |record, _reused| {
            if let Some(query) = params.query_string.as_deref().filter(|q| !q.is_empty()) {
                record.set_snippet(query, snippet_max_len);
            }
        });
        let Some(lease) = lease else {
            debug!(uri = %uri, "edit initialization already in progress");
            return Ok(());
        };

        let result = lease.adapter.initialize_edit(params).await;
        drop(lease);

        result.map_err(|e| {
            let err = SessionError::InitializeEditFailed(e);
            warn!(uri = %uri, error = %err, "edit initialization failed");
            self.notify_error(&err);
            err
        })
    }

    /// Tear down the edit session for `uri` and remove it from the registry.
    /// Resolves once the adapter has released its server-side state.
    ///
    /// As with [`SessionManager::dispose_query`], the entry is removed first,
    /// so `has_session` is false while the teardown is still awaited.
    pub async fn dispose_edit(&self, uri: &str) {
        let removed = self.shared().lock_registry().remove(uri);
        let Some(record) = removed else {
            return;
        };
        info!(uri = %uri, session_id = %record.id, "edit session disposed");

        if let Err(e) = record.adapter().dispose_edit(uri).await {
            warn!(uri = %uri, error = %e, "edit session dispose failed");
        }
    }

    pub async fn get_edit_rows(
        &self,
        uri: &str,
        row_start: u64,
        row_count: u64,
    ) -> Result<Option<EditSubsetResult>, SessionError> {
        let Some(adapter) = self.get_query_runner(uri) else {
            return Ok(None);
        };
        Ok(Some(adapter.get_edit_rows(row_start, row_count).await?))
    }

    /// Failures are notified and returned so the caller can keep the cell in
    /// edit mode.
    pub async fn update_cell(
        &self,
        uri: &str,
        row_id: i64,
        column_id: u32,
        new_value: &str,
    ) -> Result<Option<EditUpdateCellResult>, SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(None);
        };
        match adapter.update_cell(row_id, column_id, new_value.to_string()).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                let err = SessionError::UpdateCellFailed(e);
                self.notify_error(&err);
                Err(err)
            }
        }
    }

    pub async fn commit_edit(&self, uri: &str) -> Result<(), SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(());
        };
        adapter.commit_edit().await.map_err(|e| {
            let err = SessionError::CommitEditFailed(e);
            self.notify_error(&err);
            err
        })
    }

    pub async fn create_row(&self, uri: &str) -> Result<Option<EditCreateRowResult>, SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(None);
        };
        Ok(Some(adapter.create_row().await?))
    }

    pub async fn delete_row(&self, uri: &str, row_id: i64) -> Result<(), SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(());
        };
        Ok(adapter.delete_row(row_id).await?)
    }

    pub async fn revert_cell(
        &self,
        uri: &str,
        row_id: i64,
        column_id: u32,
    ) -> Result<Option<EditRevertCellResult>, SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(None);
        };
        Ok(Some(adapter.revert_cell(row_id, column_id).await?))
    }

    pub async fn revert_row(&self, uri: &str, row_id: i64) -> Result<(), SessionError> {
        let Some(adapter) = self.idle_adapter(uri) else {
            return Ok(());
        };
        Ok(adapter.revert_row(row_id).await?)
    }

    /// Surface a commit failure reported outside a `commit_edit` call.
    pub fn show_commit_error(&self, message: &str) {
        self.notifier
            .notify(Notification::error(format!("Commit row failed: {message}")));
    }

    fn idle_adapter(&self, uri: &str) -> Option<Arc<dyn EngineAdapter>> {
        self.shared()
            .lock_registry()
            .get(uri)
            .filter(|record| !record.is_busy())
            .map(|record| Arc::clone(record.adapter()))
    }
}
