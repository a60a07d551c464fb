use std::collections::VecDeque;
use std::sync::Arc;

use uuid::Uuid;

use qmux_protocol::{QueryEvent, QueryInfoSnapshot, SessionUri, TextRange};

use crate::data_service::DataService;
use crate::engine::{EngineAdapter, SessionMode};

const ELLIPSIS: &str = "...";

/// Shorten `text` for status messages.
///
/// Strings shorter than `max_len` characters are returned unchanged; anything
/// longer keeps its first `max_len - 3` characters followed by `...`, so the
/// preview never exceeds `max_len` characters.
pub fn snippet_preview(text: &str, max_len: usize) -> String {
    if text.chars().count() < max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut preview: String = text.chars().take(keep).collect();
    preview.push_str(ELLIPSIS);
    preview
}

/// State bundle for one editor surface's execution session.
pub struct SessionRecord {
    pub id: Uuid,
    pub uri: SessionUri,
    pub mode: SessionMode,
    adapter: Arc<dyn EngineAdapter>,
    data_service: Arc<DataService>,
    pub(crate) pending_events: VecDeque<QueryEvent>,
    pub(crate) consumer_ready: bool,
    accumulated_ranges: Vec<TextRange>,
    query_snippet: Option<String>,
    /// Set between acquiring the session for a run and the adapter accepting it.
    pub(crate) launch_pending: bool,
}

impl SessionRecord {
    pub fn new(
        id: Uuid,
        uri: &str,
        mode: SessionMode,
        adapter: Arc<dyn EngineAdapter>,
        data_service: Arc<DataService>,
    ) -> Self {
        Self {
            id,
            uri: uri.to_string(),
            mode,
            adapter,
            data_service,
            pending_events: VecDeque::new(),
            consumer_ready: false,
            accumulated_ranges: Vec::new(),
            query_snippet: None,
            launch_pending: false,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn EngineAdapter> {
        &self.adapter
    }

    pub fn data_service(&self) -> &Arc<DataService> {
        &self.data_service
    }

    /// True while the adapter executes or a run request is being handed to it.
    pub fn is_busy(&self) -> bool {
        self.launch_pending || self.adapter.is_executing()
    }

    pub fn is_consumer_ready(&self) -> bool {
        self.consumer_ready
    }

    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len()
    }

    pub fn accumulated_ranges(&self) -> &[TextRange] {
        &self.accumulated_ranges
    }

    pub fn query_snippet(&self) -> Option<&str> {
        self.query_snippet.as_deref()
    }

    pub(crate) fn push_range(&mut self, range: Option<TextRange>) {
        self.accumulated_ranges.push(range.unwrap_or_default());
    }

    pub(crate) fn set_snippet(&mut self, text: &str, max_len: usize) {
        self.query_snippet = Some(snippet_preview(text, max_len));
    }

    /// Forget per-run bookkeeping before a new top-level run.
    pub(crate) fn reset_for_run(&mut self) {
        self.accumulated_ranges.clear();
        self.query_snippet = None;
    }

    pub(crate) fn snapshot(&self) -> QueryInfoSnapshot {
        QueryInfoSnapshot {
            ranges: self.accumulated_ranges.clone(),
            messages: self.adapter.messages(),
        }
    }
}

impl std::fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .field("mode", &self.mode)
            .field("consumer_ready", &self.consumer_ready)
            .field("pending_events", &self.pending_events.len())
            .field("accumulated_ranges", &self.accumulated_ranges)
            .field("query_snippet", &self.query_snippet)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;

    #[test]
    fn long_snippet_is_truncated_to_limit() {
        let text = "x".repeat(150);
        let preview = snippet_preview(&text, 100);
        assert_eq!(preview.chars().count(), 100);
        assert!(preview.ends_with("..."));
        assert_eq!(&preview[..97], &text[..97]);
    }

    #[test]
    fn short_snippet_is_unchanged() {
        let text = "select 1 ".repeat(5);
        assert_eq!(text.len(), 45);
        assert_eq!(snippet_preview(&text, 100), text);
    }

    #[test]
    fn snippet_at_limit_is_truncated() {
        let text = "y".repeat(100);
        let preview = snippet_preview(&text, 100);
        assert_eq!(preview, format!("{}...", "y".repeat(97)));
    }

    #[test]
    fn snippet_counts_characters_not_bytes() {
        let text = "é".repeat(120);
        let preview = snippet_preview(&text, 100);
        assert_eq!(preview.chars().count(), 100);
    }

    #[test]
    fn reset_clears_ranges_and_snippet() {
        let (mut record, _adapter) = testing::record("u1");
        record.push_range(Some(TextRange::new(1, 1, 2, 5)));
        record.push_range(None);
        record.set_snippet("select 1", 100);
        assert_eq!(record.accumulated_ranges().len(), 2);
        assert_eq!(record.accumulated_ranges()[1], TextRange::default());

        record.reset_for_run();
        assert!(record.accumulated_ranges().is_empty());
        assert!(record.query_snippet().is_none());
    }

    #[test]
    fn busy_tracks_launch_and_adapter() {
        let (mut record, adapter) = testing::record("u1");
        assert!(!record.is_busy());

        record.launch_pending = true;
        assert!(record.is_busy());
        record.launch_pending = false;

        adapter.executing.store(true, Ordering::SeqCst);
        assert!(record.is_busy());
    }
}
