//! Host capabilities for running exports from the command line.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{DownloadLink, DownloadSink, FrameScheduler, LayoutHost, Notice, Notifier};
use crate::error::{Error, Result};

/// The side panel's expanded flag.
///
/// Clones share the flag.
#[derive(Debug, Clone)]
pub struct SidePanel {
    expanded: Arc<AtomicBool>,
}

impl SidePanel {
    /// Create a side panel.
    #[must_use]
    pub fn new(expanded: bool) -> Self {
        Self {
            expanded: Arc::new(AtomicBool::new(expanded)),
        }
    }

    /// Flip the panel, returning the new state.
    pub fn toggle(&self) -> bool {
        !self.expanded.fetch_xor(true, Ordering::SeqCst)
    }
}

impl LayoutHost for SidePanel {
    fn side_panel_expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    fn set_side_panel_expanded(&self, expanded: bool) {
        debug!(expanded, "Side panel");
        self.expanded.store(expanded, Ordering::SeqCst);
    }
}

/// Waits on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct TokioScheduler {
    render_cycle: Duration,
}

impl TokioScheduler {
    /// Create a scheduler where one rendering cycle lasts `render_cycle`.
    #[must_use]
    pub fn new(render_cycle: Duration) -> Self {
        Self { render_cycle }
    }
}

#[async_trait]
impl FrameScheduler for TokioScheduler {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn next_frame(&self) {
        tokio::time::sleep(self.render_cycle).await;
    }
}

/// Saves downloads into a directory.
#[derive(Debug, Clone)]
pub struct FileDownloadSink {
    output_dir: PathBuf,
}

impl FileDownloadSink {
    /// Create a sink writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// The directory receiving downloads.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl DownloadSink for FileDownloadSink {
    fn activate(&self, link: &DownloadLink) -> Result<()> {
        let payload = link
            .payload()
            .ok_or_else(|| Error::download(&link.file_name, "link is not a data URI"))?;

        let path = self.output_dir.join(&link.file_name);
        if path.parent() != Some(self.output_dir.as_path())
            || !matches!(
                Path::new(&link.file_name).components().next(),
                Some(Component::Normal(_))
            )
        {
            return Err(Error::download(
                &link.file_name,
                "file name must not leave the output directory",
            ));
        }

        if !self.output_dir.exists() {
            std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::DirectoryCreate {
                path: self.output_dir.clone(),
                source: e,
            })?;
        }

        std::fs::write(&path, payload)
            .map_err(|e| Error::download(&link.file_name, e.to_string()))?;
        debug!(path = %path.display(), "Download saved");
        Ok(())
    }
}

/// Logs notices and keeps the ones still visible.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl TracingNotifier {
    /// Create a notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices that have not dismissed themselves yet.
    #[must_use]
    pub fn visible(&self) -> Vec<Notice> {
        let now = tokio::time::Instant::now();
        let mut notices = self.notices.lock().unwrap_or_else(PoisonError::into_inner);
        notices.retain(|notice| !notice.is_expired(now));
        notices.clone()
    }
}

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        warn!(lifetime_ms = notice.lifetime.as_millis(), "{}", notice.message);
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_side_panel_shared_between_clones() {
        let panel = SidePanel::new(true);
        let other = panel.clone();
        other.set_side_panel_expanded(false);
        assert!(!panel.side_panel_expanded());
        assert!(panel.toggle());
        assert!(other.side_panel_expanded());
    }

    #[test]
    fn test_file_sink_writes_payload() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("exports");
        let sink = FileDownloadSink::new(&out);
        let link = DownloadLink {
            file_name: "Amy-Lee-profile.png".to_string(),
            href: "data:image/png;base64,AQID".to_string(),
        };

        sink.activate(&link).unwrap();

        let written = std::fs::read(out.join("Amy-Lee-profile.png")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }

    #[test]
    fn test_file_sink_refuses_names_outside_output_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("exports");
        let sink = FileDownloadSink::new(&out);

        for file_name in ["../x.png", "/abs.png", "A/B.png", "..", "."] {
            let link = DownloadLink {
                file_name: file_name.to_string(),
                href: "data:image/png;base64,AQID".to_string(),
            };
            let err = sink.activate(&link).unwrap_err();
            assert!(err.is_capture_failure(), "{file_name}");
        }
        assert!(!dir.path().join("x.png").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_file_sink_rejects_plain_links() {
        let dir = TempDir::new().unwrap();
        let sink = FileDownloadSink::new(dir.path());
        let link = DownloadLink {
            file_name: "a.png".to_string(),
            href: "https://example.org/a.png".to_string(),
        };

        let err = sink.activate(&link).unwrap_err();
        assert!(err.is_capture_failure());
    }

    #[test]
    fn test_notifier_drops_expired_notices() {
        let notifier = TracingNotifier::new();
        notifier.notify(Notice::new("kept", Duration::from_secs(60)));
        notifier.notify(Notice::new("gone", Duration::ZERO));

        let visible = notifier.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "kept");
    }

    #[tokio::test(start_paused = true)]
    async fn test_notices_expire_on_the_tokio_clock() {
        let notifier = TracingNotifier::new();
        notifier.notify(Notice::new("short", Duration::from_secs(3)));
        notifier.notify(Notice::new("long", Duration::from_secs(10)));

        tokio::time::advance(Duration::from_secs(3)).await;
        let visible = notifier.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].message, "long");

        tokio::time::advance(Duration::from_secs(7)).await;
        assert!(notifier.visible().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_sleeps_for_render_cycle() {
        let scheduler = TokioScheduler::new(Duration::from_millis(100));
        let start = tokio::time::Instant::now();
        scheduler.next_frame().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        scheduler.delay(Duration::from_millis(350)).await;
        assert!(start.elapsed() >= Duration::from_millis(450));
    }
}
