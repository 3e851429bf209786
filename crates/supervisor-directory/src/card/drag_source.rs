//! Palette entries as drag sources.

use crate::card::interaction::DragPayload;
use crate::model::{Badge, Palette};

/// One draggable palette badge.
///
/// The only state is the transient "being dragged" flag, which drag-end
/// clears whether or not the drop landed anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    badge: Badge,
    dragging: bool,
}

impl PaletteEntry {
    /// Create a drag source for a badge.
    #[must_use]
    pub fn new(badge: Badge) -> Self {
        Self {
            badge,
            dragging: false,
        }
    }

    /// Drag sources for every palette badge, in palette order.
    #[must_use]
    pub fn from_palette(palette: &Palette) -> Vec<Self> {
        palette.iter().cloned().map(Self::new).collect()
    }

    /// The badge this entry carries.
    #[must_use]
    pub fn badge(&self) -> &Badge {
        &self.badge
    }

    /// Check if a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a drag, returning the payload to carry.
    pub fn drag_start(&mut self) -> DragPayload {
        self.dragging = true;
        DragPayload::badge(&self.badge.id)
    }

    /// End a drag.
    pub fn drag_end(&mut self) {
        self.dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BadgeId;

    #[test]
    fn test_drag_start_carries_identifier() {
        let mut entry = PaletteEntry::new(Badge::new("sushi", "/badges/sushi.png", "Sushi"));
        let payload = entry.drag_start();

        assert!(entry.is_dragging());
        assert_eq!(payload.badge_id(), Some(BadgeId::from("sushi")));
    }

    #[test]
    fn test_drag_end_clears_flag() {
        let mut entry = PaletteEntry::new(Badge::new("sushi", "/badges/sushi.png", "Sushi"));
        entry.drag_start();
        entry.drag_end();
        assert!(!entry.is_dragging());
    }

    #[test]
    fn test_from_palette_keeps_order() {
        let palette = Palette::builtin();
        let entries = PaletteEntry::from_palette(&palette);
        let ids: Vec<&str> = entries.iter().map(|e| e.badge().id.as_str()).collect();
        let expected: Vec<&str> = palette.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, expected);
    }
}
