use std::collections::HashMap;

use qmux_protocol::SessionUri;

use crate::session::SessionRecord;

/// Keyed store of live sessions, at most one per uri.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionUri, SessionRecord>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &str) -> Option<&SessionRecord> {
        self.sessions.get(uri)
    }

    pub fn get_mut(&mut self, uri: &str) -> Option<&mut SessionRecord> {
        self.sessions.get_mut(uri)
    }

    /// Insert `record` under its uri, returning any record it replaced.
    pub fn set(&mut self, record: SessionRecord) -> Option<SessionRecord> {
        self.sessions.insert(record.uri.clone(), record)
    }

    pub fn remove(&mut self, uri: &str) -> Option<SessionRecord> {
        self.sessions.remove(uri)
    }

    pub fn has(&self, uri: &str) -> bool {
        self.sessions.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }
}
