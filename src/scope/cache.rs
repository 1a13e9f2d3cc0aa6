//! Per-scope cache of ready and in-flight values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::DiResult;
use crate::internal::Map;
use crate::registration::AnyArc;
use crate::token::Token;

use super::resolved::{Pending, Resolved};

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

/// Identifies one in-flight factory call.
///
/// Settlement only touches the entry carrying its own ticket, so a future
/// that settles after `clear_cache` (and possibly a fresh request) cannot
/// overwrite or evict the newer entry.
pub(crate) fn next_ticket() -> u64 {
    NEXT_TICKET.fetch_add(1, Ordering::Relaxed)
}

pub(crate) enum CacheEntry {
    Ready(AnyArc),
    InFlight { ticket: u64, pending: Pending },
}

type Entries = Mutex<Map<Token, CacheEntry>>;

/// Cache owned by one scope.
#[derive(Clone, Default)]
pub(crate) struct ScopeCache {
    entries: Arc<Entries>,
}

/// Handle held by the continuation of an in-flight future.
///
/// The cache owns that future, so the continuation must not own the cache.
pub(crate) struct WeakScopeCache {
    entries: Weak<Entries>,
}

impl WeakScopeCache {
    /// Settles through the cache if it is still alive.
    pub(crate) fn settle(&self, token: &Token, ticket: u64, outcome: &DiResult<AnyArc>) -> bool {
        match self.entries.upgrade() {
            Some(entries) => ScopeCache { entries }.settle(token, ticket, outcome),
            None => false,
        }
    }
}

impl ScopeCache {
    pub(crate) fn downgrade(&self) -> WeakScopeCache {
        WeakScopeCache {
            entries: Arc::downgrade(&self.entries),
        }
    }

    pub(crate) fn lookup(&self, token: &Token) -> Option<Resolved> {
        self.entries.lock().get(token).map(|entry| match entry {
            CacheEntry::Ready(value) => Resolved::Ready(value.clone()),
            CacheEntry::InFlight { pending, .. } => Resolved::Pending(pending.clone()),
        })
    }

    pub(crate) fn insert_ready(&self, token: Token, value: AnyArc) {
        self.entries.lock().insert(token, CacheEntry::Ready(value));
    }

    pub(crate) fn insert_in_flight(&self, token: Token, ticket: u64, pending: Pending) {
        self.entries
            .lock()
            .insert(token, CacheEntry::InFlight { ticket, pending });
    }

    /// Replaces the in-flight entry with its value, or removes it on failure.
    ///
    /// Returns false when the entry is gone or belongs to another ticket.
    pub(crate) fn settle(&self, token: &Token, ticket: u64, outcome: &DiResult<AnyArc>) -> bool {
        let mut entries = self.entries.lock();
        let ours = matches!(
            entries.get(token),
            Some(CacheEntry::InFlight { ticket: current, .. }) if *current == ticket
        );
        if !ours {
            return false;
        }
        match outcome {
            Ok(value) => {
                entries.insert(token.clone(), CacheEntry::Ready(value.clone()));
            }
            Err(_) => {
                entries.remove(token);
            }
        }
        true
    }

    pub(crate) fn remove(&self, token: &Token) -> bool {
        self.entries.lock().remove(token).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn contains(&self, token: &Token) -> bool {
        self.entries.lock().contains_key(token)
    }
}
