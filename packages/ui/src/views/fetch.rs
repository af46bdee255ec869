use std::cell::{Cell, RefCell};
use std::fmt::Debug;

use api::ApiError;
use thiserror::Error;
use tracing::debug;

/// Load status of a list or detail view.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(LoadError),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            LoadState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U>(&self, f: impl FnOnce(&T) -> U) -> LoadState<U> {
        match self {
            LoadState::Loading => LoadState::Loading,
            LoadState::Ready(value) => LoadState::Ready(f(value)),
            LoadState::Failed(e) => LoadState::Failed(e.clone()),
        }
    }
}

/// Why a view has nothing to show. Every variant offers a retry.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("not found")]
    NotFound,
    #[error("{message}")]
    Failed { message: String, transient: bool },
}

impl From<&ApiError> for LoadError {
    fn from(e: &ApiError) -> Self {
        match e {
            ApiError::NotFound => LoadError::NotFound,
            other => LoadError::Failed {
                message: other.user_message(),
                transient: other.is_transient(),
            },
        }
    }
}

impl LoadError {
    pub fn user_message(&self) -> String {
        match self {
            LoadError::NotFound => "Nothing here. It may have been removed.".to_string(),
            LoadError::Failed { message, .. } => message.clone(),
        }
    }
}

/// Proof that a fetch was issued, and for which key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket<K> {
    generation: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }
}

/// Orders fetches for one view. Only the most recently issued ticket may
/// write results, and nothing may after [`FetchTracker::unmount`].
#[derive(Debug)]
pub struct FetchTracker<K> {
    generation: Cell<u64>,
    key: RefCell<Option<K>>,
    mounted: Cell<bool>,
}

impl<K> Default for FetchTracker<K> {
    fn default() -> Self {
        Self {
            generation: Cell::new(0),
            key: RefCell::new(None),
            mounted: Cell::new(true),
        }
    }
}

impl<K: Clone + Debug> FetchTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `key`, superseding every earlier one. Returns
    /// `None` once the view is unmounted.
    pub fn begin(&self, key: K) -> Option<Ticket<K>> {
        if !self.mounted.get() {
            debug!(?key, "fetch skipped, view unmounted");
            return None;
        }
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        *self.key.borrow_mut() = Some(key.clone());
        debug!(?key, generation, "fetch issued");
        Some(Ticket { generation, key })
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        self.mounted.get() && ticket.generation == self.generation.get()
    }

    /// Key of the latest fetch, for retries.
    pub fn key(&self) -> Option<K> {
        self.key.borrow().clone()
    }

    pub fn unmount(&self) {
        self.mounted.set(false);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Write a fetch result into `slot` if its ticket is still current.
    /// Returns whether the result was kept.
    pub fn settle<T>(
        &self,
        ticket: &Ticket<K>,
        slot: &RefCell<LoadState<T>>,
        result: Result<T, ApiError>,
    ) -> bool {
        if !self.is_current(ticket) {
            debug!(key = ?ticket.key, generation = ticket.generation, "discarding stale fetch");
            return false;
        }
        *slot.borrow_mut() = match result {
            Ok(value) => LoadState::Ready(value),
            Err(e) => LoadState::Failed(LoadError::from(&e)),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_wins() {
        let tracker = FetchTracker::new();
        let slot = RefCell::new(LoadState::Loading);

        let first = tracker.begin(1).unwrap();
        let second = tracker.begin(2).unwrap();

        assert!(tracker.settle(&second, &slot, Ok("two")));
        assert!(!tracker.settle(&first, &slot, Ok("one")));
        assert_eq!(*slot.borrow(), LoadState::Ready("two"));
        assert_eq!(tracker.key(), Some(2));
    }

    #[test]
    fn test_unmount_discards_results() {
        let tracker = FetchTracker::new();
        let slot: RefCell<LoadState<u8>> = RefCell::new(LoadState::Loading);
        let ticket = tracker.begin(()).unwrap();

        tracker.unmount();
        assert!(!tracker.settle(&ticket, &slot, Ok(1)));
        assert!(slot.borrow().is_loading());
        assert!(tracker.begin(()).is_none());
    }

    #[test]
    fn test_failures_become_load_errors() {
        let tracker = FetchTracker::new();
        let slot: RefCell<LoadState<u8>> = RefCell::new(LoadState::Loading);

        let ticket = tracker.begin(()).unwrap();
        tracker.settle(&ticket, &slot, Err(ApiError::NotFound));
        assert_eq!(slot.borrow().error(), Some(&LoadError::NotFound));

        let ticket = tracker.begin(()).unwrap();
        tracker.settle(&ticket, &slot, Err(ApiError::Transport("reset".into())));
        assert!(matches!(
            slot.borrow().error(),
            Some(LoadError::Failed { transient: true, .. })
        ));
    }
}
