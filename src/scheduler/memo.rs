//! Request memoization: coalesces duplicate GETs onto one transport call.
//!
//! A key is either pending (a primary queued or in flight, plus followers
//! waiting on it) or answered (the primary finished during the current run).

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::{Request, Response};

enum MemoEntry {
    Pending {
        primary: Arc<Request>,
        followers: Vec<Arc<Request>>,
    },
    Answered(Arc<Response>),
}

/// Result of offering a request to the memo table.
pub(crate) enum MemoLookup {
    /// No entry; the caller should dispatch and register as primary.
    Miss,
    /// Attached as a follower of the pending primary.
    Followed,
    /// The key was answered earlier in this run.
    Answered(Arc<Response>),
}

/// Map from cache key to the request representing it.
#[derive(Default)]
pub struct MemoTable {
    entries: HashMap<String, MemoEntry>,
}

impl MemoTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lookup_or_follow(&mut self, request: &Arc<Request>) -> MemoLookup {
        match self.entries.get_mut(request.cache_key()) {
            None => MemoLookup::Miss,
            Some(MemoEntry::Pending { followers, .. }) => {
                followers.push(Arc::clone(request));
                MemoLookup::Followed
            }
            Some(MemoEntry::Answered(response)) => MemoLookup::Answered(Arc::clone(response)),
        }
    }

    pub(crate) fn register_primary(&mut self, request: &Arc<Request>) {
        self.entries.insert(
            request.cache_key().to_string(),
            MemoEntry::Pending { primary: Arc::clone(request), followers: Vec::new() },
        );
    }

    pub fn is_primary(&self, request: &Arc<Request>) -> bool {
        matches!(
            self.entries.get(request.cache_key()),
            Some(MemoEntry::Pending { primary, .. }) if Arc::ptr_eq(primary, request)
        )
    }

    /// Mark `request`'s key answered and hand back its followers in
    /// attachment order. Empty when `request` is not a pending primary.
    pub(crate) fn resolve(&mut self, request: &Arc<Request>, response: &Arc<Response>) -> Vec<Arc<Request>> {
        if !self.is_primary(request) {
            return Vec::new();
        }
        match self
            .entries
            .insert(request.cache_key().to_string(), MemoEntry::Answered(Arc::clone(response)))
        {
            Some(MemoEntry::Pending { followers, .. }) => followers,
            _ => Vec::new(),
        }
    }

    /// Drop the pending entry led by `request`, returning its followers.
    pub(crate) fn forget(&mut self, request: &Arc<Request>) -> Vec<Arc<Request>> {
        if !self.is_primary(request) {
            return Vec::new();
        }
        match self.entries.remove(request.cache_key()) {
            Some(MemoEntry::Pending { followers, .. }) => followers,
            _ => Vec::new(),
        }
    }

    /// Forget answered keys; pending entries stay.
    pub fn clear_answered(&mut self) {
        self.entries.retain(|_, entry| matches!(entry, MemoEntry::Pending { .. }));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of followers waiting on pending primaries.
    pub fn follower_count(&self) -> usize {
        self.entries
            .values()
            .map(|entry| match entry {
                MemoEntry::Pending { followers, .. } => followers.len(),
                MemoEntry::Answered(_) => 0,
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
