//! Core directory types.
//!
//! A [`Supervisor`] is one personnel record rendered as one card. Badges are
//! drawn from a fixed [`Palette`] and a record never holds two badges with
//! the same [`BadgeId`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stable identifier of a badge within the palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeId(String);

impl BadgeId {
    /// Create a badge identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BadgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BadgeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A small image/label unit that can be assigned to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    /// Identifier, unique within the palette.
    pub id: BadgeId,
    /// Image reference.
    pub src: String,
    /// Alt/display text.
    pub alt: String,
}

impl Badge {
    /// Create a badge.
    #[must_use]
    pub fn new(id: impl Into<String>, src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            id: BadgeId::new(id),
            src: src.into(),
            alt: alt.into(),
        }
    }
}

/// A biography, either one block of text or ordered paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bio {
    /// A single block of text.
    Text(String),
    /// Ordered paragraphs.
    Paragraphs(Vec<String>),
}

impl Bio {
    /// The paragraphs to render, one per entry.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<&str> {
        match self {
            Self::Text(text) => vec![text.as_str()],
            Self::Paragraphs(paragraphs) => paragraphs.iter().map(String::as_str).collect(),
        }
    }
}

/// A personnel record.
///
/// The contact email is the record's unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supervisor {
    /// Display name, also used for export file names.
    pub name: String,
    /// Job title.
    pub title: String,
    /// Contact email and unique key.
    pub email: String,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Specialisation text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialisation: Option<String>,
    /// Biography.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<Bio>,
    /// Photo reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Assigned badges in assignment order.
    #[serde(default)]
    pub badges: Vec<Badge>,
}

impl Supervisor {
    /// Create a record with only the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            email: email.into(),
            phone: None,
            specialisation: None,
            bio: None,
            photo_url: None,
            badges: Vec::new(),
        }
    }

    /// The record's unique key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.email
    }

    /// Check if a badge with this identifier is assigned.
    #[must_use]
    pub fn has_badge(&self, id: &BadgeId) -> bool {
        self.badges.iter().any(|badge| &badge.id == id)
    }

    /// Drop repeated badge identifiers, keeping the first occurrence.
    ///
    /// Returns the number of badges removed.
    pub fn dedupe_badges(&mut self) -> usize {
        let before = self.badges.len();
        let mut seen = HashSet::new();
        self.badges.retain(|badge| seen.insert(badge.id.clone()));
        before - self.badges.len()
    }
}

/// The fixed, ordered set of badges available for assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    badges: Vec<Badge>,
}

impl Palette {
    /// Create a palette.
    ///
    /// # Errors
    ///
    /// Returns an error if two badges share an identifier.
    pub fn new(badges: Vec<Badge>) -> Result<Self> {
        let mut seen = HashSet::new();
        for badge in &badges {
            if !seen.insert(&badge.id) {
                return Err(Error::data_validation(format!(
                    "duplicate palette badge id: {}",
                    badge.id
                )));
            }
        }
        Ok(Self { badges })
    }

    /// The palette shipped with the directory.
    #[must_use]
    pub fn builtin() -> Self {
        let badges = [
            ("sushi", "Sushi lover"),
            ("coffee", "Runs on coffee"),
            ("star", "Star supervisor"),
            ("heart", "Kind heart"),
            ("rainbow", "Inclusive practice"),
            ("leaf", "Mindfulness"),
        ]
        .into_iter()
        .map(|(id, alt)| Badge::new(id, format!("/badges/{id}.png"), alt))
        .collect();
        Self { badges }
    }

    /// Look up a badge by identifier.
    #[must_use]
    pub fn get(&self, id: &BadgeId) -> Option<&Badge> {
        self.badges.iter().find(|badge| &badge.id == id)
    }

    /// Iterate the badges in palette order.
    pub fn iter(&self) -> impl Iterator<Item = &Badge> {
        self.badges.iter()
    }

    /// Number of badges in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.badges.len()
    }

    /// Check if the palette has no badges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.badges.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::builtin()
    }
}
