//! Card export: capture a rendered card as a PNG and offer it for download.
//!
//! The export routine never touches the page directly. It talks to the host
//! through small injected capabilities:
//!
//! - [`LayoutHost`]: the companion side panel.
//! - [`CardSurface`]: the card being captured (snapshot, bio flag, busy flag).
//! - [`FrameScheduler`]: layout transition delays and rendering cycles.
//! - [`Rasterizer`]: turns a card snapshot into an image.
//! - [`DownloadSink`]: the "save this file" affordance.
//! - [`Notifier`]: transient, non-blocking user notices.
//!
//! See [`CardExporter`] for the capture sequence.

mod host;
mod raster;
mod routine;

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use regex::Regex;
use thiserror::Error;
use tokio::time::Instant;

pub use host::{FileDownloadSink, SidePanel, TokioScheduler, TracingNotifier};
pub use raster::CardRasterizer;
pub use routine::{
    CardExporter, ExportHost, ExportOutcome, ExportSettings, CAPTURE_FAILED_MESSAGE,
};

use crate::card::CardView;
use crate::config::ExportConfig;
use crate::error::Result;

/// Errors raised by a rasterizer.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A cross-origin image could not be read.
    #[error("cross-origin image taints the capture: {src}")]
    TaintedImage {
        /// The offending image reference.
        src: String,
    },

    /// The card contains something the rasterizer cannot draw.
    #[error("unsupported content: {0}")]
    Unsupported(String),

    /// Encoding the captured pixels failed.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Options passed to the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Honor cross-origin images.
    pub use_cors: bool,
    /// Resolution multiplier.
    pub scale: f32,
    /// Leave the background transparent instead of opaque.
    pub transparent_background: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            use_cors: true,
            scale: 2.0,
            transparent_background: true,
        }
    }
}

impl From<&ExportConfig> for RasterOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            use_cors: config.use_cors,
            scale: config.scale,
            transparent_background: config.transparent_background,
        }
    }
}

/// A captured, PNG-encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
}

impl RasterImage {
    /// Encode the image as a `data:` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", B64.encode(&self.png))
    }
}

/// A transient download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// Suggested file name.
    pub file_name: String,
    /// Link target (a `data:` URI).
    pub href: String,
}

impl DownloadLink {
    /// Decode the payload of a base64 `data:` URI.
    ///
    /// Returns `None` if `href` is not a base64 data URI.
    #[must_use]
    pub fn payload(&self) -> Option<Vec<u8>> {
        let (_, encoded) = self.href.strip_prefix("data:")?.split_once(";base64,")?;
        B64.decode(encoded).ok()
    }
}

/// A non-blocking user notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Message text.
    pub message: String,
    /// How long the notice stays visible.
    pub lifetime: Duration,
    /// When the notice was raised.
    pub raised_at: Instant,
}

impl Notice {
    /// Create a notice raised now.
    #[must_use]
    pub fn new(message: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            message: message.into(),
            lifetime,
            raised_at: Instant::now(),
        }
    }

    /// Check if the notice has dismissed itself by `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.raised_at
            .checked_add(self.lifetime)
            .is_some_and(|deadline| now >= deadline)
    }
}

/// The companion side panel.
pub trait LayoutHost: Send + Sync {
    /// Check if the panel is expanded.
    fn side_panel_expanded(&self) -> bool;

    /// Expand or collapse the panel.
    fn set_side_panel_expanded(&self, expanded: bool);
}

/// The card being captured.
pub trait CardSurface: Send + Sync {
    /// Render the card as it currently looks, or `None` if not mounted.
    fn snapshot(&self) -> Option<CardView>;

    /// Check if the bio section is expanded.
    fn bio_expanded(&self) -> bool;

    /// Expand or collapse the bio section.
    fn set_bio_expanded(&self, expanded: bool);

    /// Mark the export trigger busy or idle.
    fn set_exporting(&self, exporting: bool);
}

/// Suspension points of the export routine.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    /// Wait for a fixed delay, such as a layout transition.
    async fn delay(&self, duration: Duration);

    /// Wait for one rendering cycle.
    async fn next_frame(&self);
}

/// The rasterization primitive.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Capture a card snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the card cannot be captured.
    async fn rasterize(
        &self,
        view: &CardView,
        options: &RasterOptions,
    ) -> std::result::Result<RasterImage, CaptureError>;
}

/// The host's download affordance.
pub trait DownloadSink: Send + Sync {
    /// Activate a download link.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses the download.
    fn activate(&self, link: &DownloadLink) -> Result<()>;
}

/// Transient user notices.
pub trait Notifier: Send + Sync {
    /// Show a notice; it dismisses itself after its lifetime.
    fn notify(&self, notice: Notice);
}

/// Derive the export file name for a record name.
///
/// Every whitespace run becomes `separator`, then `suffix` is appended.
/// The stem is made safe to use as a single path component: path separators,
/// reserved characters and `..` become `_`, and leading dots or underscores
/// are trimmed. A stem with nothing left falls back to `card`.
///
/// # Panics
///
/// Never in practice; the whitespace pattern is a valid literal.
#[must_use]
pub fn export_file_name(name: &str, separator: &str, suffix: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace =
        WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

    let stem = whitespace.replace_all(name, regex::NoExpand(separator));
    format!("{}{suffix}", path_safe_stem(&stem))
}

fn path_safe_stem(stem: &str) -> String {
    let mut out: String = stem
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    while out.contains("..") {
        out = out.replace("..", "_");
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches('_');
    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("Amy Lee", "-", "-profile.png"),
            "Amy-Lee-profile.png"
        );
        assert_eq!(
            export_file_name("Dr  Amy\tLee", "-", "-profile.png"),
            "Dr-Amy-Lee-profile.png"
        );
        assert_eq!(export_file_name("Bob", "_", ".png"), "Bob.png");
    }

    #[test]
    fn test_export_file_name_stays_in_one_component() {
        assert_eq!(export_file_name("../x", "-", ".png"), "x.png");
        assert_eq!(export_file_name("/abs", "-", ".png"), "abs.png");
        assert_eq!(export_file_name("A/B", "-", ".png"), "A_B.png");
        assert_eq!(export_file_name("C:\\Users\\amy", "-", ".png"), "C__Users_amy.png");
        assert_eq!(export_file_name("a..b", "-", ".png"), "a_b.png");
        assert_eq!(export_file_name("..", "-", "-profile.png"), "card-profile.png");
        assert_eq!(export_file_name("Ángela Ruiz", "-", ".png"), "Ángela-Ruiz.png");
    }

    #[test]
    fn test_export_file_name_separator_is_literal() {
        assert_eq!(export_file_name("A B", "$1", ".png"), "A$1B.png");
    }

    #[test]
    fn test_data_uri_round_trips_through_link() {
        let image = RasterImage {
            width: 1,
            height: 1,
            png: vec![0x89, b'P', b'N', b'G'],
        };
        let href = image.to_data_uri();
        assert!(href.starts_with("data:image/png;base64,"));

        let link = DownloadLink {
            file_name: "a.png".to_string(),
            href,
        };
        assert_eq!(link.payload(), Some(image.png));
    }

    #[test]
    fn test_link_payload_rejects_plain_urls() {
        let link = DownloadLink {
            file_name: "a.png".to_string(),
            href: "https://example.org/a.png".to_string(),
        };
        assert!(link.payload().is_none());
    }

    #[test]
    fn test_raster_options_from_config() {
        let mut config = ExportConfig::default();
        config.use_cors = false;
        config.scale = 1.5;

        let options = RasterOptions::from(&config);
        assert!(!options.use_cors);
        assert!((options.scale - 1.5).abs() < f32::EPSILON);
        assert!(options.transparent_background);
    }

    #[test]
    fn test_default_raster_options() {
        let options = RasterOptions::default();
        assert!(options.use_cors);
        assert!((options.scale - 2.0).abs() < f32::EPSILON);
        assert!(options.transparent_background);
    }

    #[test]
    fn test_notice_expiry() {
        let notice = Notice::new("oops", Duration::from_secs(3));
        assert!(!notice.is_expired(notice.raised_at));
        assert!(!notice.is_expired(notice.raised_at + Duration::from_millis(2999)));
        assert!(notice.is_expired(notice.raised_at + Duration::from_secs(3)));

        let lasting = Notice::new("stays", Duration::MAX);
        assert!(!lasting.is_expired(lasting.raised_at + Duration::from_secs(3600)));
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::TaintedImage {
            src: "https://cdn.example.org/a.png".to_string(),
        };
        assert!(err.to_string().contains("cdn.example.org"));
        assert!(CaptureError::Unsupported("svg".to_string())
            .to_string()
            .contains("svg"));
    }
}
