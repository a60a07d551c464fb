//! Translation of raw engine events into consumer and lifecycle events.

use chrono::Local;
use tracing::debug;
use uuid::Uuid;

use qmux_protocol::{
    BatchStartSummary, LifecycleEvent, LifecycleKind, LifecycleParams, MessageLink, QueryEvent,
    QueryMessage,
};

use crate::dispatcher;
use crate::engine::{EngineEvent, SessionMode};
use crate::manager::Shared;
use crate::registry::SessionRegistry;

impl Shared {
    /// Route one event from the adapter of session `session_id`.
    ///
    /// Events from an adapter whose session has since been disposed or
    /// replaced are dropped.
    pub(crate) fn handle_engine_event(&self, uri: &str, session_id: Uuid, event: EngineEvent) {
        let mut registry = self.lock_registry();
        let Some(record) = registry.get(uri) else {
            debug!(uri = %uri, "engine event for unknown session dropped");
            return;
        };
        if record.id != session_id {
            debug!(uri = %uri, session_id = %session_id, "stale engine event dropped");
            return;
        }

        let mode = record.mode;
        match mode {
            SessionMode::Query => self.route_query_event(&mut registry, uri, event),
            SessionMode::Edit => self.route_edit_event(&mut registry, uri, event),
        }
    }

    fn route_query_event(&self, registry: &mut SessionRegistry, uri: &str, event: EngineEvent) {
        match event {
            EngineEvent::QueryStart => {
                self.publish(registry, uri, LifecycleKind::QueryStart, None);
                dispatcher::fire_event(registry, uri, QueryEvent::Start);
            }
            EngineEvent::BatchStart(batch) => {
                let message = batch_start_message(&batch, query_snippet(registry, uri).as_deref());
                dispatcher::fire_event(registry, uri, QueryEvent::Message(message));
                if let Some(record) = registry.get_mut(uri) {
                    record.push_range(batch.range);
                }
            }
            EngineEvent::Message(message) => {
                dispatcher::fire_event(registry, uri, QueryEvent::Message(message));
            }
            EngineEvent::ResultSet(summary) => {
                dispatcher::fire_event(registry, uri, QueryEvent::ResultSet(summary));
            }
            EngineEvent::ResultSetUpdate(_) => {
                self.publish(registry, uri, LifecycleKind::QueryUpdate, None);
                dispatcher::fire_event(registry, uri, QueryEvent::Update);
            }
            EngineEvent::QueryEnd { elapsed_ms } => {
                self.publish(registry, uri, LifecycleKind::QueryStop, None);
                dispatcher::fire_event(registry, uri, QueryEvent::Complete(elapsed_ms));
            }
            EngineEvent::QueryPlanAvailable(plan) => {
                // Plans are reported against the document that produced them.
                let plan_uri = plan.file_uri.clone();
                let query_info = registry
                    .get(uri)
                    .map(|r| r.snapshot())
                    .unwrap_or_default();
                self.lifecycle.publish(LifecycleEvent {
                    kind: LifecycleKind::ExecutionPlanAvailable,
                    uri: plan_uri,
                    query_info,
                    params: Some(LifecycleParams::Plan(plan)),
                });
            }
            EngineEvent::Visualize(summary) => {
                self.publish(
                    registry,
                    uri,
                    LifecycleKind::Visualize,
                    Some(LifecycleParams::ResultSet(summary)),
                );
            }
            EngineEvent::EditSessionReady(_) => {
                debug!(uri = %uri, "edit session event ignored for query session");
            }
        }
    }

    fn route_edit_event(&self, registry: &mut SessionRegistry, uri: &str, event: EngineEvent) {
        match event {
            EngineEvent::ResultSet(summary) | EngineEvent::ResultSetUpdate(summary) => {
                dispatcher::fire_event(registry, uri, QueryEvent::ResultSet(summary));
            }
            EngineEvent::BatchStart(batch) => {
                let message = batch_start_message(&batch, query_snippet(registry, uri).as_deref());
                dispatcher::fire_event(registry, uri, QueryEvent::Message(message));
            }
            EngineEvent::Message(message) => {
                dispatcher::fire_event(registry, uri, QueryEvent::Message(message));
            }
            EngineEvent::QueryStart => {
                self.publish(registry, uri, LifecycleKind::QueryStart, None);
                dispatcher::fire_event(registry, uri, QueryEvent::Start);
            }
            EngineEvent::QueryEnd { elapsed_ms } => {
                self.publish(registry, uri, LifecycleKind::QueryStop, None);
                dispatcher::fire_event(registry, uri, QueryEvent::Complete(elapsed_ms));
            }
            EngineEvent::EditSessionReady(params) => {
                self.publish(
                    registry,
                    uri,
                    LifecycleKind::EditSessionReady,
                    Some(LifecycleParams::EditSession(params)),
                );
                dispatcher::fire_event(registry, uri, QueryEvent::EditSessionReady);
            }
            EngineEvent::QueryPlanAvailable(_) | EngineEvent::Visualize(_) => {
                debug!(uri = %uri, "plan and visualize events ignored for edit session");
            }
        }
    }

    fn publish(
        &self,
        registry: &SessionRegistry,
        uri: &str,
        kind: LifecycleKind,
        params: Option<LifecycleParams>,
    ) {
        let query_info = registry.get(uri).map(|r| r.snapshot()).unwrap_or_default();
        self.lifecycle.publish(LifecycleEvent {
            kind,
            uri: uri.to_string(),
            query_info,
            params,
        });
    }
}

fn query_snippet(registry: &SessionRegistry, uri: &str) -> Option<String> {
    registry
        .get(uri)
        .and_then(|r| r.query_snippet().map(str::to_string))
}

/// Message shown in the messages pane when a batch starts.
///
/// Runs started from a query string quote the snippet instead of pointing at
/// a line, since line numbers would not refer to the document.
fn batch_start_message(batch: &BatchStartSummary, snippet: Option<&str>) -> QueryMessage {
    let mut message = "Started executing query at ".to_string();
    let mut link = None;
    if let Some(range) = batch.range {
        match snippet {
            Some(snippet) => message = format!("Started executing query \"{snippet}\""),
            None => {
                link = Some(MessageLink {
                    text: format!("Line {}", range.start_line_number),
                })
            }
        }
    }

    QueryMessage {
        message,
        batch_id: Some(batch.id),
        is_error: false,
        time: Local::now().format("%H:%M:%S").to_string(),
        link,
    }
}
