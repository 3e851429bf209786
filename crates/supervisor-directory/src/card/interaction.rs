//! Per-card badge interaction state machine.
//!
//! A card is `Idle` until a drag carrying a badge hovers over it. Dropping
//! assigns the badge through [`BadgeActions`] and returns the card to `Idle`
//! whether or not anything changed. Clicking an assigned badge removes it,
//! either at once or after a fixed, cancel-free delay during which the card
//! shows a removal notice.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::model::BadgeId;
use crate::store::BadgeActions;

/// Data carried by a drag operation.
///
/// Mirrors a drag data store holding at most one `text/plain` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragPayload {
    text: Option<String>,
}

impl DragPayload {
    /// A payload carrying a badge identifier.
    #[must_use]
    pub fn badge(id: &BadgeId) -> Self {
        Self {
            text: Some(id.to_string()),
        }
    }

    /// A payload carrying arbitrary text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// A payload with no data.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The badge identifier carried, if any.
    #[must_use]
    pub fn badge_id(&self) -> Option<BadgeId> {
        self.text
            .as_deref()
            .filter(|text| !text.is_empty())
            .map(BadgeId::new)
    }
}

/// How the host should treat a drag event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragResponse {
    /// Suppress the default "reject drop" behaviour.
    AcceptDrop,
    /// Leave the default behaviour alone.
    Ignore,
}

/// Visible state of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    /// Nothing in progress.
    Idle,
    /// A badge is being dragged over the card.
    DragHover,
    /// A timed removal is pending.
    Removing,
}

/// Result of clicking an assigned badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The badge was removed immediately; `true` if the record changed.
    Removed(bool),
    /// The removal takes effect at the deadline.
    Scheduled(Instant),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingRemoval {
    badge_id: BadgeId,
    deadline: Instant,
}

/// Drag-over, drop and click-to-remove handling for one card.
#[derive(Debug, Clone)]
pub struct CardInteraction {
    record_key: String,
    drag_hover: bool,
    removal_delay: Option<Duration>,
    pending: VecDeque<PendingRemoval>,
}

impl CardInteraction {
    /// Create the interaction state for a record.
    ///
    /// `removal_delay` of `None` removes badges on click.
    #[must_use]
    pub fn new(record_key: impl Into<String>, removal_delay: Option<Duration>) -> Self {
        Self {
            record_key: record_key.into(),
            drag_hover: false,
            removal_delay,
            pending: VecDeque::new(),
        }
    }

    /// The record this card belongs to.
    #[must_use]
    pub fn record_key(&self) -> &str {
        &self.record_key
    }

    /// The current state.
    ///
    /// A pending removal takes precedence over a hovering drag.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        if !self.pending.is_empty() {
            InteractionState::Removing
        } else if self.drag_hover {
            InteractionState::DragHover
        } else {
            InteractionState::Idle
        }
    }

    /// Check if the drag-over highlight is shown.
    #[must_use]
    pub fn is_drag_hover(&self) -> bool {
        self.drag_hover
    }

    /// Check if the "Badge removed!" notice is shown.
    #[must_use]
    pub fn shows_removal_notice(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Handle drag-enter or drag-over.
    pub fn drag_over(&mut self, payload: &DragPayload) -> DragResponse {
        if payload.badge_id().is_none() {
            trace!(email = %self.record_key, "Drag without badge payload ignored");
            return DragResponse::Ignore;
        }
        self.drag_hover = true;
        DragResponse::AcceptDrop
    }

    /// Handle drag-leave without a drop.
    pub fn drag_leave(&mut self) {
        self.drag_hover = false;
    }

    /// Handle a drop.
    ///
    /// Returns `true` if the record changed.
    pub fn drop_badge(&mut self, payload: &DragPayload, actions: &mut impl BadgeActions) -> bool {
        self.drag_hover = false;

        let Some(badge_id) = payload.badge_id() else {
            debug!(email = %self.record_key, "Drop without badge payload");
            return false;
        };
        actions.assign_badge(&self.record_key, &badge_id)
    }

    /// Handle a click on an assigned badge.
    pub fn click_badge(
        &mut self,
        badge_id: &BadgeId,
        now: Instant,
        actions: &mut impl BadgeActions,
    ) -> ClickOutcome {
        match self.removal_delay {
            None => ClickOutcome::Removed(actions.remove_badge(&self.record_key, badge_id)),
            Some(delay) => {
                let deadline = now + delay;
                debug!(email = %self.record_key, badge = %badge_id, "Badge removal scheduled");
                self.pending.push_back(PendingRemoval {
                    badge_id: badge_id.clone(),
                    deadline,
                });
                ClickOutcome::Scheduled(deadline)
            }
        }
    }

    /// The earliest pending removal deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|pending| pending.deadline).min()
    }

    /// Apply every removal whose deadline has passed.
    ///
    /// Returns the number of removals applied.
    pub fn settle(&mut self, now: Instant, actions: &mut impl BadgeActions) -> usize {
        let mut applied = 0;
        let mut remaining = VecDeque::with_capacity(self.pending.len());

        for pending in self.pending.drain(..) {
            if pending.deadline <= now {
                actions.remove_badge(&self.record_key, &pending.badge_id);
                applied += 1;
            } else {
                remaining.push_back(pending);
            }
        }

        self.pending = remaining;
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Palette, Supervisor};
    use crate::store::DirectoryStore;

    #[derive(Debug, Default)]
    struct RecordingActions {
        assigned: Vec<(String, String)>,
        removed: Vec<(String, String)>,
    }

    impl BadgeActions for RecordingActions {
        fn assign_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool {
            self.assigned
                .push((record_key.to_string(), badge_id.to_string()));
            true
        }

        fn remove_badge(&mut self, record_key: &str, badge_id: &BadgeId) -> bool {
            self.removed
                .push((record_key.to_string(), badge_id.to_string()));
            true
        }
    }

    fn sushi() -> BadgeId {
        BadgeId::from("sushi")
    }

    #[test]
    fn test_drag_over_with_badge_accepts() {
        let mut card = CardInteraction::new("a@x.com", None);
        assert_eq!(card.state(), InteractionState::Idle);

        let response = card.drag_over(&DragPayload::badge(&sushi()));
        assert_eq!(response, DragResponse::AcceptDrop);
        assert_eq!(card.state(), InteractionState::DragHover);
    }

    #[test]
    fn test_drag_over_without_badge_is_ignored() {
        let mut card = CardInteraction::new("a@x.com", None);
        assert_eq!(card.drag_over(&DragPayload::empty()), DragResponse::Ignore);
        assert_eq!(card.drag_over(&DragPayload::text("")), DragResponse::Ignore);
        assert_eq!(card.state(), InteractionState::Idle);
    }

    #[test]
    fn test_drag_leave_returns_to_idle() {
        let mut card = CardInteraction::new("a@x.com", None);
        card.drag_over(&DragPayload::badge(&sushi()));
        card.drag_leave();
        assert_eq!(card.state(), InteractionState::Idle);
    }

    #[test]
    fn test_drop_assigns_to_this_record() {
        let mut card = CardInteraction::new("a@x.com", None);
        let mut actions = RecordingActions::default();

        card.drag_over(&DragPayload::badge(&sushi()));
        assert!(card.drop_badge(&DragPayload::badge(&sushi()), &mut actions));

        assert_eq!(
            actions.assigned,
            vec![("a@x.com".to_string(), "sushi".to_string())]
        );
        assert_eq!(card.state(), InteractionState::Idle);
    }

    #[test]
    fn test_drop_without_payload_returns_to_idle() {
        let mut card = CardInteraction::new("a@x.com", None);
        let mut actions = RecordingActions::default();

        card.drag_over(&DragPayload::badge(&sushi()));
        assert!(!card.drop_badge(&DragPayload::empty(), &mut actions));
        assert!(actions.assigned.is_empty());
        assert_eq!(card.state(), InteractionState::Idle);
    }

    #[test]
    fn test_repeated_drop_is_idle_even_without_change() {
        let records = vec![Supervisor::new("Amy", "Counselor", "a@x.com")];
        let mut store = DirectoryStore::new(records, Palette::builtin()).unwrap();
        let mut card = CardInteraction::new("a@x.com", None);

        assert!(card.drop_badge(&DragPayload::badge(&sushi()), &mut store));
        card.drag_over(&DragPayload::badge(&sushi()));
        assert!(!card.drop_badge(&DragPayload::badge(&sushi()), &mut store));

        assert_eq!(card.state(), InteractionState::Idle);
        assert_eq!(store.record("a@x.com").unwrap().badges.len(), 1);
    }

    #[test]
    fn test_immediate_click_removes() {
        let mut card = CardInteraction::new("a@x.com", None);
        let mut actions = RecordingActions::default();

        let outcome = card.click_badge(&sushi(), Instant::now(), &mut actions);
        assert_eq!(outcome, ClickOutcome::Removed(true));
        assert_eq!(actions.removed.len(), 1);
        assert_eq!(card.state(), InteractionState::Idle);
    }

    #[test]
    fn test_timed_click_waits_for_deadline() {
        let delay = Duration::from_millis(500);
        let mut card = CardInteraction::new("a@x.com", Some(delay));
        let mut actions = RecordingActions::default();
        let start = Instant::now();

        let outcome = card.click_badge(&sushi(), start, &mut actions);
        assert_eq!(outcome, ClickOutcome::Scheduled(start + delay));
        assert_eq!(card.state(), InteractionState::Removing);
        assert!(card.shows_removal_notice());
        assert!(actions.removed.is_empty());

        assert_eq!(card.settle(start + Duration::from_millis(499), &mut actions), 0);
        assert!(actions.removed.is_empty());

        assert_eq!(card.settle(start + delay, &mut actions), 1);
        assert_eq!(actions.removed.len(), 1);
        assert_eq!(card.state(), InteractionState::Idle);
        assert!(card.next_deadline().is_none());
    }

    #[test]
    fn test_timed_clicks_settle_in_deadline_order() {
        let mut card = CardInteraction::new("a@x.com", Some(Duration::from_millis(500)));
        let mut actions = RecordingActions::default();
        let start = Instant::now();

        card.click_badge(&sushi(), start, &mut actions);
        card.click_badge(
            &BadgeId::from("star"),
            start + Duration::from_millis(200),
            &mut actions,
        );
        assert_eq!(card.next_deadline(), Some(start + Duration::from_millis(500)));

        assert_eq!(card.settle(start + Duration::from_millis(600), &mut actions), 1);
        assert_eq!(card.state(), InteractionState::Removing);
        assert_eq!(card.settle(start + Duration::from_millis(700), &mut actions), 1);

        let removed: Vec<&str> = actions.removed.iter().map(|(_, b)| b.as_str()).collect();
        assert_eq!(removed, vec!["sushi", "star"]);
    }

    #[test]
    fn test_payload_badge_id() {
        assert_eq!(DragPayload::badge(&sushi()).badge_id(), Some(sushi()));
        assert_eq!(DragPayload::empty().badge_id(), None);
    }
}
