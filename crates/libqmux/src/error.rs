use thiserror::Error;

use crate::engine::EngineError;

/// Failures surfaced by the session manager.
///
/// The operation variants render as `<operation> failed: <message>`, which is
/// also the text of the notification raised alongside them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Run query failed: {0}")]
    RunQueryFailed(EngineError),

    #[error("Canceling the query failed: {0}")]
    CancelFailed(EngineError),

    #[error("Initialize edit failed: {0}")]
    InitializeEditFailed(EngineError),

    #[error("Update cell failed: {0}")]
    UpdateCellFailed(EngineError),

    #[error("Commit row failed: {0}")]
    CommitEditFailed(EngineError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    /// The underlying engine failure.
    pub fn engine_error(&self) -> &EngineError {
        match self {
            SessionError::RunQueryFailed(e)
            | SessionError::CancelFailed(e)
            | SessionError::InitializeEditFailed(e)
            | SessionError::UpdateCellFailed(e)
            | SessionError::CommitEditFailed(e)
            | SessionError::Engine(e) => e,
        }
    }

    /// Whether this failure is also reported through the notification channel.
    pub fn is_notified(&self) -> bool {
        !matches!(self, SessionError::Engine(_))
    }
}
