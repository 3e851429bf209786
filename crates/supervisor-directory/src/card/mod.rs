//! Cards: per-record UI state, badge interaction and rendering.
//!
//! A [`CardHandle`] is the mounted card for one record. It owns the card's
//! transient UI flags (bio expanded, export running) and its
//! [`CardInteraction`] state machine, and exposes them to the export routine
//! through [`CardSurface`].

mod drag_source;
mod interaction;
mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

pub use drag_source::PaletteEntry;
pub use interaction::{
    CardInteraction, ClickOutcome, DragPayload, DragResponse, InteractionState,
};
pub use view::{
    BadgeView, BioView, CardFlags, CardView, ExportButton, EXPORT_BUSY_LABEL, EXPORT_LABEL,
    NO_BADGES_HINT, READ_MORE, REMOVAL_NOTICE, SHOW_LESS,
};

use crate::export::CardSurface;
use crate::model::{BadgeId, Supervisor};
use crate::store::BadgeActions;

#[derive(Debug)]
struct CardCell {
    record: Option<Arc<Supervisor>>,
    show_bio: bool,
    exporting: bool,
    interaction: CardInteraction,
}

/// A mounted card.
///
/// Cloning yields another handle to the same card.
#[derive(Debug, Clone)]
pub struct CardHandle {
    key: String,
    cell: Arc<Mutex<CardCell>>,
}

impl CardHandle {
    /// Mount a card for a record.
    #[must_use]
    pub fn new(record: Arc<Supervisor>, removal_delay: Option<Duration>) -> Self {
        let key = record.key().to_string();
        let cell = CardCell {
            record: Some(record),
            show_bio: false,
            exporting: false,
            interaction: CardInteraction::new(key.clone(), removal_delay),
        };
        Self {
            key,
            cell: Arc::new(Mutex::new(cell)),
        }
    }

    /// The record key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the rendered record after a store change.
    pub fn update(&self, record: Arc<Supervisor>) {
        self.lock().record = Some(record);
    }

    /// The rendered record, or `None` if unmounted.
    #[must_use]
    pub fn record(&self) -> Option<Arc<Supervisor>> {
        self.lock().record.clone()
    }

    /// Unmount the card; later snapshots return `None`.
    pub fn unmount(&self) {
        self.lock().record = None;
    }

    /// Check if the card is mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.lock().record.is_some()
    }

    /// Toggle the bio section.
    pub fn toggle_bio(&self) {
        let mut cell = self.lock();
        cell.show_bio = !cell.show_bio;
    }

    /// Check if the bio section is expanded.
    #[must_use]
    pub fn show_bio(&self) -> bool {
        self.lock().show_bio
    }

    /// The interaction state.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.lock().interaction.state()
    }

    /// Handle drag-enter or drag-over.
    pub fn drag_over(&self, payload: &DragPayload) -> DragResponse {
        self.lock().interaction.drag_over(payload)
    }

    /// Handle drag-leave.
    pub fn drag_leave(&self) {
        self.lock().interaction.drag_leave();
    }

    /// Handle a drop; returns `true` if the record changed.
    pub fn drop_badge(&self, payload: &DragPayload, actions: &mut impl BadgeActions) -> bool {
        self.lock().interaction.drop_badge(payload, actions)
    }

    /// Handle a click on an assigned badge.
    pub fn click_badge(
        &self,
        badge_id: &BadgeId,
        now: Instant,
        actions: &mut impl BadgeActions,
    ) -> ClickOutcome {
        self.lock().interaction.click_badge(badge_id, now, actions)
    }

    /// Apply due timed removals.
    pub fn settle(&self, now: Instant, actions: &mut impl BadgeActions) -> usize {
        self.lock().interaction.settle(now, actions)
    }

    /// The earliest pending removal deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock().interaction.next_deadline()
    }

    /// Render the card, or `None` if unmounted.
    #[must_use]
    pub fn view(&self) -> Option<CardView> {
        let cell = self.lock();
        let record = cell.record.as_ref()?;
        let flags = CardFlags {
            show_bio: cell.show_bio,
            drag_over: cell.interaction.is_drag_hover(),
            removal_notice: cell.interaction.shows_removal_notice(),
            exporting: cell.exporting,
        };
        Some(CardView::render(record, &flags))
    }

    fn lock(&self) -> MutexGuard<'_, CardCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CardSurface for CardHandle {
    fn snapshot(&self) -> Option<CardView> {
        self.view()
    }

    fn bio_expanded(&self) -> bool {
        self.show_bio()
    }

    fn set_bio_expanded(&self, expanded: bool) {
        self.lock().show_bio = expanded;
    }

    fn set_exporting(&self, exporting: bool) {
        self.lock().exporting = exporting;
    }
}
