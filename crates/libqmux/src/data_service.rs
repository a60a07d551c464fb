use std::sync::{Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use qmux_protocol::{GridContentEvent, QueryEvent, SessionUri};

/// Per-session sink the results grid binds to.
///
/// Created together with its session and shared by reference; the grid owns
/// the receivers it subscribes. Query events go to each subscriber over its
/// own unbounded channel, so a replay of any length arrives complete. Grid
/// content signals are fire-and-forget and use a bounded broadcast channel.
#[derive(Debug)]
pub struct DataService {
    uri: SessionUri,
    query_subscribers: Mutex<Vec<mpsc::UnboundedSender<QueryEvent>>>,
    grid_content: broadcast::Sender<GridContentEvent>,
}

impl DataService {
    pub fn new(uri: &str, grid_capacity: usize) -> Self {
        let (grid_content, _) = broadcast::channel(grid_capacity.max(1));
        Self {
            uri: uri.to_string(),
            query_subscribers: Mutex::new(Vec::new()),
            grid_content,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn subscribe_query_events(&self) -> mpsc::UnboundedReceiver<QueryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.query_subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn subscribe_grid_content(&self) -> broadcast::Receiver<GridContentEvent> {
        self.grid_content.subscribe()
    }

    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// was dropped are forgotten.
    pub fn fire_query_event(&self, event: QueryEvent) {
        let mut subscribers = self
            .query_subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.is_empty() {
            debug!(uri = %self.uri, event = event.name(), "no query event subscribers");
        }
    }

    pub fn fire_grid_content(&self, event: GridContentEvent) {
        if self.grid_content.send(event).is_err() {
            debug!(uri = %self.uri, event = event.as_str(), "no grid content subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DataService;
    use qmux_protocol::{GridContentEvent, QueryEvent};

    #[tokio::test]
    async fn fans_out_in_order() {
        let service = DataService::new("u1", 8);
        let mut first = service.subscribe_query_events();
        let mut second = service.subscribe_query_events();

        service.fire_query_event(QueryEvent::Start);
        service.fire_query_event(QueryEvent::Complete(7));

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.expect("recv"), QueryEvent::Start);
            assert_eq!(rx.recv().await.expect("recv"), QueryEvent::Complete(7));
        }
    }

    #[test]
    fn slow_subscriber_loses_nothing() {
        let service = DataService::new("u1", 1);
        let mut rx = service.subscribe_query_events();

        for i in 0..5_000 {
            service.fire_query_event(QueryEvent::Complete(i));
        }
        for i in 0..5_000 {
            assert_eq!(rx.try_recv().expect("event"), QueryEvent::Complete(i));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_is_forgotten() {
        let service = DataService::new("u1", 1);
        let rx = service.subscribe_query_events();
        let mut kept = service.subscribe_query_events();
        drop(rx);

        service.fire_query_event(QueryEvent::Update);
        assert_eq!(kept.try_recv().expect("event"), QueryEvent::Update);
        assert_eq!(service.query_subscribers.lock().expect("lock").len(), 1);
    }

    #[test]
    fn firing_without_subscribers_is_not_an_error() {
        let service = DataService::new("u1", 0);
        service.fire_query_event(QueryEvent::Update);
        service.fire_grid_content(GridContentEvent::RefreshContents);

        let mut rx = service.subscribe_grid_content();
        service.fire_grid_content(GridContentEvent::ResizeContents);
        assert_eq!(rx.try_recv().expect("grid event"), GridContentEvent::ResizeContents);
    }
}
