//! Record of the GraphQL queries a client sent.
//!
//! Recording is off unless switched on through
//! [`DiscoveryClientBuilder::record_queries`](super::builder::DiscoveryClientBuilder::record_queries)
//! or [`QueryLog::set_enabled`]. Clones share one log, so every facade built
//! from the same client reads and toggles the same entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::query::BuiltQuery;

/// Queries sent by a [`DiscoveryClient`](super::DiscoveryClient), oldest first.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    enabled: Arc<AtomicBool>,
    entries: Arc<Mutex<Vec<BuiltQuery>>>,
}

impl QueryLog {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            entries: Arc::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Start or stop recording. Entries already recorded are kept.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, query: &BuiltQuery) {
        if self.is_enabled() {
            self.lock().push(query.clone());
        }
    }

    /// Every recorded query.
    pub fn queries(&self) -> Vec<BuiltQuery> {
        self.lock().clone()
    }

    /// The most recently sent query.
    pub fn last(&self) -> Option<BuiltQuery> {
        self.lock().last().cloned()
    }

    /// Remove and return every recorded query.
    pub fn take(&self) -> Vec<BuiltQuery> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while pushing cannot leave the Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<BuiltQuery>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{self, EnvironmentId};

    fn query() -> BuiltQuery {
        query::environment_metadata(EnvironmentId::new(7).unwrap())
    }

    #[test]
    fn test_disabled_log_records_nothing() {
        let log = QueryLog::default();
        log.record(&query());
        assert!(log.is_empty());
    }

    #[test]
    fn test_clones_share_entries_and_switch() {
        let log = QueryLog::new(false);
        let shared = log.clone();
        shared.set_enabled(true);

        log.record(&query());
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.last().unwrap().operation_name, "EnvironmentMetadata");

        assert_eq!(log.take().len(), 1);
        assert!(shared.is_empty());
    }
}
