//! Per-session event forwarding.
//!
//! Plain functions over the registry: an event either goes straight to the
//! session's [`DataService`](crate::data_service::DataService) or waits in the
//! record's pending queue until the consumer attaches.

use tracing::debug;

use qmux_protocol::{GridContentEvent, QueryEvent};

use crate::registry::SessionRegistry;

/// Forward `event` to the consumer of `uri`, or queue it if the consumer has
/// not attached yet. Events for unknown uris are dropped.
pub(crate) fn fire_event(registry: &mut SessionRegistry, uri: &str, event: QueryEvent) {
    let Some(record) = registry.get_mut(uri) else {
        debug!(uri = %uri, event = event.name(), "no session, query event dropped");
        return;
    };

    if record.consumer_ready {
        record.data_service().fire_query_event(event);
    } else {
        debug!(uri = %uri, event = event.name(), "consumer not ready, queueing event");
        record.pending_events.push_back(event);
    }
}

/// Mark the consumer of `uri` as attached and replay everything queued for it
/// in production order. Returns the number of replayed events.
pub(crate) fn on_consumer_attached(registry: &mut SessionRegistry, uri: &str) -> usize {
    let Some(record) = registry.get_mut(uri) else {
        return 0;
    };
    record.consumer_ready = true;

    let mut replayed = 0;
    while let Some(event) = registry
        .get_mut(uri)
        .and_then(|record| record.pending_events.pop_front())
    {
        fire_event(registry, uri, event);
        replayed += 1;
    }

    debug!(uri = %uri, replayed, "consumer attached");
    replayed
}

/// UI-only signals are never queued: without an attached grid there is
/// nothing to refresh.
pub(crate) fn fire_grid_content(registry: &SessionRegistry, uri: &str, event: GridContentEvent) {
    match registry.get(uri) {
        Some(record) if record.consumer_ready => record.data_service().fire_grid_content(event),
        _ => debug!(uri = %uri, event = event.as_str(), "consumer not ready, grid event dropped"),
    }
}
