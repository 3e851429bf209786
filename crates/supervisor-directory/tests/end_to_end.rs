//! End-to-end tests against the public API.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use supervisor_directory::card::CardView;
use supervisor_directory::cli::{render, Session};
use supervisor_directory::export::{
    CaptureError, DownloadLink, DownloadSink, ExportHost, ExportSettings, FileDownloadSink,
    FrameScheduler, LayoutHost, Notice, Notifier, RasterImage, RasterOptions, Rasterizer,
    SidePanel,
};
use supervisor_directory::{
    load_directory, BadgeActions, BadgeId, CardExporter, CardHandle, Config, DirectoryStore,
    ExportOutcome, Result,
};

const RECORDS: &str = r#"[
  {"name": "Bob", "email": "b@x.com", "title": "Therapist"},
  {"name": "Amy", "email": "a@x.com", "title": "Counselor",
   "bio": ["Twenty years in practice.", "Supervises trainees."],
   "photoUrl": "/photos/amy.jpg"}
]"#;

fn write_records(dir: &Path) -> Config {
    let path = dir.join("supervisors.json");
    std::fs::write(&path, RECORDS).unwrap();
    let mut config = Config::default();
    config.data.records_path = Some(path);
    config.export.output_dir = Some(dir.join("exports"));
    config
}

fn load(dir: &TempDir) -> DirectoryStore {
    load_directory(&write_records(dir.path())).unwrap()
}

fn names(store: &DirectoryStore) -> Vec<String> {
    store.view().iter().map(|r| r.name.clone()).collect()
}

fn badge_ids(store: &DirectoryStore, key: &str) -> Vec<String> {
    store
        .record(key)
        .unwrap()
        .badges
        .iter()
        .map(|b| b.id.as_str().to_string())
        .collect()
}

#[test]
fn test_empty_search_sorts_by_name() {
    let dir = TempDir::new().unwrap();
    let store = load(&dir);
    assert_eq!(names(&store), vec!["Amy", "Bob"]);
}

#[test]
fn test_search_filters_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let mut store = load(&dir);

    store.set_search_term("bob");
    assert_eq!(names(&store), vec!["Bob"]);

    store.set_search_term("COUNSEL");
    assert_eq!(names(&store), vec!["Amy"]);

    store.set_search_term("x.com");
    assert_eq!(names(&store), vec!["Amy", "Bob"]);
}

#[test]
fn test_assign_twice_then_remove() {
    let dir = TempDir::new().unwrap();
    let mut store = load(&dir);
    let sushi = BadgeId::from("sushi");
    let bob_before = Arc::clone(store.record("b@x.com").unwrap());

    assert!(store.assign_badge("a@x.com", &sushi));
    assert_eq!(badge_ids(&store, "a@x.com"), vec!["sushi"]);

    assert!(!store.assign_badge("a@x.com", &sushi));
    assert_eq!(badge_ids(&store, "a@x.com"), vec!["sushi"]);

    assert!(store.remove_badge("a@x.com", &sushi));
    assert!(badge_ids(&store, "a@x.com").is_empty());

    assert!(!store.remove_badge("a@x.com", &sushi));
    assert!(Arc::ptr_eq(&bob_before, store.record("b@x.com").unwrap()));
}

#[test]
fn test_duplicate_emails_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dupes.json");
    std::fs::write(
        &path,
        r#"[{"name": "A", "email": "a@x.com", "title": "T"},
            {"name": "B", "email": "a@x.com", "title": "T"}]"#,
    )
    .unwrap();
    let mut config = Config::default();
    config.data.records_path = Some(path);

    let err = load_directory(&config).unwrap_err();
    assert!(err.to_string().contains("duplicate supervisor email"));
}

struct InstantScheduler;

#[async_trait]
impl FrameScheduler for InstantScheduler {
    async fn delay(&self, _duration: Duration) {}
    async fn next_frame(&self) {}
}

struct FailingRasterizer;

#[async_trait]
impl Rasterizer for FailingRasterizer {
    async fn rasterize(
        &self,
        view: &CardView,
        _options: &RasterOptions,
    ) -> std::result::Result<RasterImage, CaptureError> {
        Err(CaptureError::Unsupported(view.key.clone()))
    }
}

#[derive(Default)]
struct CountingDownloads(Mutex<usize>);

impl DownloadSink for CountingDownloads {
    fn activate(&self, _link: &DownloadLink) -> Result<()> {
        *self.0.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
struct Notices(Mutex<Vec<String>>);

impl Notifier for Notices {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice.message);
    }
}

#[tokio::test]
async fn test_failed_export_rolls_back_ui() {
    let dir = TempDir::new().unwrap();
    let store = load(&dir);
    let card = CardHandle::new(Arc::clone(store.record("a@x.com").unwrap()), None);
    let panel = Arc::new(SidePanel::new(true));
    let downloads = Arc::new(CountingDownloads::default());
    let notices = Arc::new(Notices::default());

    let exporter = CardExporter::new(
        Arc::new(card.clone()),
        ExportHost {
            layout: panel.clone(),
            scheduler: Arc::new(InstantScheduler),
            rasterizer: Arc::new(FailingRasterizer),
            downloads: downloads.clone(),
            notifier: notices.clone(),
        },
        ExportSettings::default(),
    );

    assert_eq!(exporter.export().await, ExportOutcome::CaptureFailed);
    assert!(panel.side_panel_expanded());
    assert!(!card.show_bio());
    assert_eq!(*downloads.0.lock().unwrap(), 0);
    assert_eq!(notices.0.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_scripted_session_exports_card() {
    let dir = TempDir::new().unwrap();
    let config = write_records(dir.path());
    let store = load_directory(&config).unwrap();
    let mut session = Session::new(&config, store);

    let script = "\
# badge Amy, then save her card
drag sushi a@x.com
search amy
export a@x.com
";
    let mut out = Vec::new();
    session
        .run(script.as_bytes(), &mut out, true)
        .await
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("> drag sushi a@x.com"));
    assert!(text.contains("Badges: sushi"));
    assert!(!text.contains(render::EMPTY_MESSAGE));

    let saved = dir.path().join("exports").join("Amy-profile.png");
    let png = std::fs::read(&saved).unwrap();
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

    // Saving through the sink again overwrites in place.
    let sink = FileDownloadSink::new(dir.path().join("exports"));
    let again = DownloadLink {
        file_name: "Amy-profile.png".to_string(),
        href: "data:image/png;base64,AQID".to_string(),
    };
    sink.activate(&again).unwrap();
    assert_eq!(std::fs::read(&saved).unwrap(), vec![1, 2, 3]);
}
