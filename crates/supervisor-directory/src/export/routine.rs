//! The card export sequence.
//!
//! 1. Bail out if the card is not rendered.
//! 2. Mark the card busy; a second export on the same card is rejected.
//! 3. Collapse an expanded side panel and wait for its transition; expand a
//!    collapsed bio and wait one rendering cycle.
//! 4. Rasterize the card.
//! 5. Put the panel and bio back, on success and on failure.
//! 6. Offer the PNG as a download, or raise a transient failure notice.
//! 7. Clear the busy mark.
//!
//! Steps 5 and 7 are drop guards so they also run on early returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{
    export_file_name, CardSurface, DownloadLink, DownloadSink, FrameScheduler, LayoutHost,
    Notice, Notifier, RasterOptions, Rasterizer,
};
use crate::config::Config;
use crate::error::{Error, Result};

/// Message shown when a capture fails.
pub const CAPTURE_FAILED_MESSAGE: &str = "Failed to capture profile image. Please try again.";

/// Export tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    /// Options passed to the rasterizer.
    pub options: RasterOptions,
    /// Side panel collapse transition.
    pub panel_transition: Duration,
    /// Failure notice lifetime.
    pub notice_lifetime: Duration,
    /// Replacement for whitespace runs in file names.
    pub file_separator: String,
    /// Suffix appended to file names.
    pub file_suffix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ExportSettings {
    fn from(config: &Config) -> Self {
        Self {
            options: RasterOptions::from(&config.export),
            panel_transition: config.panel_transition(),
            notice_lifetime: config.notice_lifetime(),
            file_separator: config.export.file_separator.clone(),
            file_suffix: config.export.file_suffix.clone(),
        }
    }
}

/// How an export ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The image was offered for download.
    Downloaded {
        /// Name of the offered file.
        file_name: String,
    },
    /// Another export on this card was still running.
    Busy,
    /// Capture failed; the user was notified.
    CaptureFailed,
    /// The card was not rendered; nothing was shown to the user.
    MissingTarget,
}

/// Host capabilities shared by every card's exporter.
#[derive(Clone)]
pub struct ExportHost {
    /// The side panel.
    pub layout: Arc<dyn LayoutHost>,
    /// Delays and rendering cycles.
    pub scheduler: Arc<dyn FrameScheduler>,
    /// The rasterization primitive.
    pub rasterizer: Arc<dyn Rasterizer>,
    /// The download affordance.
    pub downloads: Arc<dyn DownloadSink>,
    /// Transient notices.
    pub notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for ExportHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportHost")
            .field("side_panel_expanded", &self.layout.side_panel_expanded())
            .finish_non_exhaustive()
    }
}

/// Exports one card.
pub struct CardExporter {
    card: Arc<dyn CardSurface>,
    host: ExportHost,
    settings: ExportSettings,
    busy: AtomicBool,
}

impl std::fmt::Debug for CardExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardExporter")
            .field("settings", &self.settings)
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl CardExporter {
    /// Create an exporter for a card.
    #[must_use]
    pub fn new(card: Arc<dyn CardSurface>, host: ExportHost, settings: ExportSettings) -> Self {
        Self {
            card,
            host,
            settings,
            busy: AtomicBool::new(false),
        }
    }

    /// Check if an export is running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Run the export sequence.
    ///
    /// Failures are handled here: capture failures raise a user notice,
    /// a missing card is only logged.
    pub async fn export(&self) -> ExportOutcome {
        let Some(initial) = self.card.snapshot() else {
            error!("Card is not rendered; export aborted");
            return ExportOutcome::MissingTarget;
        };

        let Some(_busy) = BusyGuard::acquire(&self.busy, self.card.as_ref()) else {
            debug!("Export already running for this card");
            return ExportOutcome::Busy;
        };

        match self.capture_and_download(&initial.key).await {
            Ok(file_name) => {
                info!(file = %file_name, "Card exported");
                ExportOutcome::Downloaded { file_name }
            }
            Err(err) if err.is_missing_target() => {
                error!(error = %err, "Card disappeared during export");
                ExportOutcome::MissingTarget
            }
            Err(err) => {
                warn!(error = %err, "Card export failed");
                self.host.notifier.notify(Notice::new(
                    CAPTURE_FAILED_MESSAGE,
                    self.settings.notice_lifetime,
                ));
                ExportOutcome::CaptureFailed
            }
        }
    }

    async fn capture_and_download(&self, key: &str) -> Result<String> {
        let mut transient = TransientUi::new(self.host.layout.as_ref(), self.card.as_ref());

        if transient.collapse_side_panel() {
            self.host
                .scheduler
                .delay(self.settings.panel_transition)
                .await;
        }
        if transient.expand_bio() {
            self.host.scheduler.next_frame().await;
        }

        // Other events may have run while we were suspended.
        let view = self
            .card
            .snapshot()
            .ok_or_else(|| Error::MissingCaptureTarget {
                email: key.to_string(),
            })?;

        let captured = self
            .host
            .rasterizer
            .rasterize(&view, &self.settings.options)
            .await;
        transient.restore();
        let image = captured?;

        let link = DownloadLink {
            file_name: export_file_name(
                &view.name,
                &self.settings.file_separator,
                &self.settings.file_suffix,
            ),
            href: image.to_data_uri(),
        };
        debug!(
            file = %link.file_name,
            width = image.width,
            height = image.height,
            "Offering download"
        );
        self.host.downloads.activate(&link)?;
        Ok(link.file_name)
    }
}

/// Marks the card busy for the lifetime of the guard.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
    card: &'a dyn CardSurface,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, card: &'a dyn CardSurface) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            return None;
        }
        card.set_exporting(true);
        Some(Self { flag, card })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.card.set_exporting(false);
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// UI state changed for the capture, restored on `restore` or drop.
struct TransientUi<'a> {
    layout: &'a dyn LayoutHost,
    card: &'a dyn CardSurface,
    collapsed_panel: bool,
    expanded_bio: bool,
}

impl<'a> TransientUi<'a> {
    fn new(layout: &'a dyn LayoutHost, card: &'a dyn CardSurface) -> Self {
        Self {
            layout,
            card,
            collapsed_panel: false,
            expanded_bio: false,
        }
    }

    /// Collapse the side panel if expanded; returns `true` if it changed.
    fn collapse_side_panel(&mut self) -> bool {
        if self.layout.side_panel_expanded() {
            self.layout.set_side_panel_expanded(false);
            self.collapsed_panel = true;
        }
        self.collapsed_panel
    }

    /// Expand a truncating bio; returns `true` if it changed.
    fn expand_bio(&mut self) -> bool {
        let truncated = self
            .card
            .snapshot()
            .is_some_and(|view| view.bio_truncated());
        if truncated {
            self.card.set_bio_expanded(true);
            self.expanded_bio = true;
        }
        self.expanded_bio
    }

    fn restore(&mut self) {
        if std::mem::take(&mut self.expanded_bio) {
            self.card.set_bio_expanded(false);
        }
        if std::mem::take(&mut self.collapsed_panel) {
            self.layout.set_side_panel_expanded(true);
        }
    }
}

impl Drop for TransientUi<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
