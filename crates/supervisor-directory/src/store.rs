//! The directory store.
//!
//! [`DirectoryStore`] is the single owner of every record and of the active
//! search term. Records are only mutated through the two [`BadgeActions`]
//! operations, and a mutation replaces the named record's allocation while
//! leaving every other `Arc` untouched, so observers can detect changes by
//! pointer comparison.
//!
//! Observers subscribe to a revision counter that is bumped on every change.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{BadgeId, Palette, Supervisor};
use crate::search;

/// The two badge callbacks a card receives.
///
/// Both return `true` when the record actually changed. Lookup misses are
/// silent no-ops.
pub trait BadgeActions {
    /// Append a palette badge to a record unless it already has it.
    fn assign_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool;

    /// Remove a badge from a record if present.
    fn remove_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool;
}

/// Owns all records, the palette and the search term.
#[derive(Debug)]
pub struct DirectoryStore {
    records: Vec<Arc<Supervisor>>,
    palette: Palette,
    search_term: String,
    revision: watch::Sender<u64>,
}

impl DirectoryStore {
    /// Create a store from loaded records.
    ///
    /// Repeated badge identifiers within a record are collapsed, keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if two records share an email.
    pub fn new(records: Vec<Supervisor>, palette: Palette) -> Result<Self> {
        let mut keys = HashSet::new();
        let mut owned = Vec::with_capacity(records.len());

        for mut record in records {
            if !keys.insert(record.email.clone()) {
                return Err(Error::data_validation(format!(
                    "duplicate supervisor email: {}",
                    record.email
                )));
            }
            let dropped = record.dedupe_badges();
            if dropped > 0 {
                warn!(email = %record.email, dropped, "Dropped repeated badges from record");
            }
            owned.push(Arc::new(record));
        }

        info!(
            records = owned.len(),
            palette = palette.len(),
            "Directory store ready"
        );
        let (revision, _) = watch::channel(0);
        Ok(Self {
            records: owned,
            palette,
            search_term: String::new(),
            revision,
        })
    }

    /// All records in source order.
    #[must_use]
    pub fn records(&self) -> &[Arc<Supervisor>] {
        &self.records
    }

    /// Look up a record by key.
    #[must_use]
    pub fn record(&self, record_key: &str) -> Option<&Arc<Supervisor>> {
        self.records.iter().find(|record| record.key() == record_key)
    }

    /// The badge palette.
    #[must_use]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// The active search term.
    #[must_use]
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Replace the active search term.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if term == self.search_term {
            return;
        }
        debug!(term = %term, "Search term changed");
        self.search_term = term;
        self.notify();
    }

    /// The filtered, sorted records for the active search term.
    #[must_use]
    pub fn view(&self) -> Vec<Arc<Supervisor>> {
        search::filter_and_sort(&self.records, &self.search_term)
    }

    /// Subscribe to change notifications.
    ///
    /// The received value is the store revision; it increases on every
    /// search term change and every badge mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// The current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn position(&self, record_key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.key() == record_key)
    }

    fn notify(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl BadgeActions for DirectoryStore {
    fn assign_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool {
        let Some(index) = self.position(record_key) else {
            debug!(email = %record_key, badge = %badge_id, "Assign ignored: unknown record");
            return false;
        };
        let Some(badge) = self.palette.get(badge_id).cloned() else {
            debug!(email = %record_key, badge = %badge_id, "Assign ignored: unknown badge");
            return false;
        };
        if self.records[index].has_badge(badge_id) {
            debug!(email = %record_key, badge = %badge_id, "Assign ignored: already assigned");
            return false;
        }

        Arc::make_mut(&mut self.records[index]).badges.push(badge);
        debug!(email = %record_key, badge = %badge_id, "Badge assigned");
        self.notify();
        true
    }

    fn remove_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool {
        let Some(index) = self.position(record_key) else {
            debug!(email = %record_key, badge = %badge_id, "Remove ignored: unknown record");
            return false;
        };
        if !self.records[index].has_badge(badge_id) {
            debug!(email = %record_key, badge = %badge_id, "Remove ignored: not assigned");
            return false;
        }

        Arc::make_mut(&mut self.records[index])
            .badges
            .retain(|badge| &badge.id != badge_id);
        debug!(email = %record_key, badge = %badge_id, "Badge removed");
        self.notify();
        true
    }
}
