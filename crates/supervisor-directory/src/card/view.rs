//! Rendered card description.
//!
//! [`CardView`] is a pure function of one record and the card's UI flags.
//! It is what the text renderer prints and what the rasterizer captures.

use std::fmt;

use serde::Serialize;

use crate::model::{BadgeId, Supervisor};

/// Export button label while idle.
pub const EXPORT_LABEL: &str = "📸";
/// Export button label while an export runs.
pub const EXPORT_BUSY_LABEL: &str = "...";
/// Export button tooltip.
pub const EXPORT_TITLE: &str = "Download Profile as PNG";
/// Placeholder shown when a record has no badges.
pub const NO_BADGES_HINT: &str = "Drag badges here to add!";
/// Notice shown while a timed removal is pending.
pub const REMOVAL_NOTICE: &str = "Badge removed!";
/// Bio toggle label while collapsed.
pub const READ_MORE: &str = "Read more ▼";
/// Bio toggle label while expanded.
pub const SHOW_LESS: &str = "Show less ▲";

/// UI flags that affect rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFlags {
    /// Bio section expanded.
    pub show_bio: bool,
    /// A badge drag hovers over the card.
    pub drag_over: bool,
    /// A timed removal is pending.
    pub removal_notice: bool,
    /// An export is running.
    pub exporting: bool,
}

/// An assigned badge as rendered on the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeView {
    /// Badge identifier, passed back on click.
    pub id: BadgeId,
    /// Image reference.
    pub src: String,
    /// Alt text.
    pub alt: String,
    /// Tooltip.
    pub title: String,
}

/// The biography section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BioView {
    /// Whether the full text is visible.
    pub expanded: bool,
    /// One entry per paragraph.
    pub paragraphs: Vec<String>,
    /// Toggle label.
    pub toggle_label: &'static str,
}

/// The export trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportButton {
    /// Button label.
    pub label: &'static str,
    /// Tooltip.
    pub title: &'static str,
    /// Disabled while an export runs.
    pub disabled: bool,
}

/// Everything a card shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    /// Record key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Job title.
    pub title: String,
    /// Specialisation, if any.
    pub specialisation: Option<String>,
    /// Photo reference, if any.
    pub photo_url: Option<String>,
    /// Assigned badges.
    pub badges: Vec<BadgeView>,
    /// Contact email.
    pub email: String,
    /// `mailto:` link for the email.
    pub mailto: String,
    /// Contact phone, if any.
    pub phone: Option<String>,
    /// Bio section, if the record has a bio.
    pub bio: Option<BioView>,
    /// Drag-over highlight.
    pub drag_over: bool,
    /// Removal notice.
    pub removal_notice: bool,
    /// Export trigger.
    pub export_button: ExportButton,
}

impl CardView {
    /// Render a record with the given flags.
    #[must_use]
    pub fn render(record: &Supervisor, flags: &CardFlags) -> Self {
        let badges = record
            .badges
            .iter()
            .map(|badge| BadgeView {
                id: badge.id.clone(),
                src: badge.src.clone(),
                alt: badge.alt.clone(),
                title: format!("Click to remove {}", badge.alt),
            })
            .collect();

        let bio = record.bio.as_ref().map(|bio| BioView {
            expanded: flags.show_bio,
            paragraphs: bio.paragraphs().into_iter().map(str::to_string).collect(),
            toggle_label: if flags.show_bio { SHOW_LESS } else { READ_MORE },
        });

        Self {
            key: record.key().to_string(),
            name: record.name.clone(),
            title: record.title.clone(),
            specialisation: record.specialisation.clone(),
            photo_url: record.photo_url.clone(),
            badges,
            email: record.email.clone(),
            mailto: format!("mailto:{}", record.email),
            phone: record.phone.clone(),
            bio,
            drag_over: flags.drag_over,
            removal_notice: flags.removal_notice,
            export_button: ExportButton {
                label: if flags.exporting {
                    EXPORT_BUSY_LABEL
                } else {
                    EXPORT_LABEL
                },
                title: EXPORT_TITLE,
                disabled: flags.exporting,
            },
        }
    }

    /// Every image the card references, photo first.
    #[must_use]
    pub fn image_refs(&self) -> Vec<&str> {
        self.photo_url
            .iter()
            .map(String::as_str)
            .chain(self.badges.iter().map(|badge| badge.src.as_str()))
            .collect()
    }

    /// Check if a collapsed bio hides part of the card.
    #[must_use]
    pub fn bio_truncated(&self) -> bool {
        self.bio.as_ref().is_some_and(|bio| !bio.expanded)
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.drag_over { "»" } else { " " };
        writeln!(
            f,
            "{marker} {} [{}{}]",
            self.name,
            self.export_button.label,
            if self.export_button.disabled {
                " disabled"
            } else {
                ""
            }
        )?;
        writeln!(f, "  {}", self.title)?;
        if let Some(specialisation) = &self.specialisation {
            writeln!(f, "  {specialisation}")?;
        }

        if self.badges.is_empty() {
            writeln!(f, "  Badges: {NO_BADGES_HINT}")?;
        } else {
            let ids: Vec<&str> = self.badges.iter().map(|badge| badge.id.as_str()).collect();
            writeln!(f, "  Badges: {}", ids.join(", "))?;
        }

        writeln!(f, "  Email: {}", self.email)?;
        if let Some(phone) = &self.phone {
            writeln!(f, "  Phone: {phone}")?;
        }

        if let Some(bio) = &self.bio {
            if bio.expanded {
                for paragraph in &bio.paragraphs {
                    writeln!(f, "    {paragraph}")?;
                }
            }
            writeln!(f, "  {}", bio.toggle_label)?;
        }

        if self.removal_notice {
            writeln!(f, "  ({REMOVAL_NOTICE})")?;
        }
        Ok(())
    }
}
