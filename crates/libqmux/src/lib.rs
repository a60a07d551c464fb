pub mod config;
pub mod data_service;
mod dispatcher;
mod edit;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod notify;
pub mod registry;
mod routing;
pub mod session;

pub use config::ManagerConfig;
pub use data_service::DataService;
pub use engine::{
    AdapterFactory, EngineAdapter, EngineError, EngineEvent, EngineEvents, EngineResult,
    SessionMode,
};
pub use error::SessionError;
pub use lifecycle::LifecycleBus;
pub use manager::{CancelTarget, SessionManager};
pub use notify::{Notification, Notifier, NullNotifier, RecordingNotifier, Severity, TracingNotifier};
pub use session::{SessionRecord, snippet_preview};
