//! Line-driven directory session.
//!
//! A session plays the role of the page: it mounts a card for every record
//! in the current view, routes drag, click and export events to them, and
//! re-syncs the mounted cards whenever the store revision moves.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::render;
use crate::card::{CardHandle, ClickOutcome, DragResponse, PaletteEntry};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{
    CardExporter, CardRasterizer, ExportHost, ExportOutcome, ExportSettings, FileDownloadSink,
    LayoutHost, SidePanel, TokioScheduler, TracingNotifier,
};
use crate::model::BadgeId;
use crate::store::DirectoryStore;

const HELP: &str = "\
Commands:
  search [TERM]          set the search term (empty clears it)
  list                   show the directory
  palette                show the badge palette
  hover <badge> <email>  drag a badge over a card
  leave <email>          drag out of a card
  drag <badge> <email>   drag a badge onto a card and drop it
  click <email> <badge>  click an assigned badge to remove it
  bio <email>            toggle a card's bio
  panel                  toggle the side panel
  export <email>         save a card as PNG
  wait <ms>              let time pass
  help                   show this help
  quit                   end the session";

/// One session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Set the search term.
    Search(String),
    /// Show the directory.
    List,
    /// Show the palette.
    Palette,
    /// Drag a badge over a card without dropping.
    Hover {
        /// Dragged badge.
        badge: BadgeId,
        /// Target card.
        email: String,
    },
    /// Drag out of a card.
    Leave {
        /// Target card.
        email: String,
    },
    /// Drag a badge onto a card and drop it.
    Drag {
        /// Dragged badge.
        badge: BadgeId,
        /// Target card.
        email: String,
    },
    /// Click an assigned badge.
    Click {
        /// Target card.
        email: String,
        /// Clicked badge.
        badge: BadgeId,
    },
    /// Toggle a card's bio.
    Bio {
        /// Target card.
        email: String,
    },
    /// Toggle the side panel.
    Panel,
    /// Export a card.
    Export {
        /// Target card.
        email: String,
    },
    /// Let time pass.
    Wait(Duration),
    /// Show help.
    Help,
    /// End the session.
    Quit,
}

impl FromStr for SessionCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match (word.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("search", _) => Self::Search(rest.to_string()),
            ("list", []) => Self::List,
            ("palette", []) => Self::Palette,
            ("hover", [badge, email]) => Self::Hover {
                badge: BadgeId::from(*badge),
                email: (*email).to_string(),
            },
            ("leave", [email]) => Self::Leave {
                email: (*email).to_string(),
            },
            ("drag", [badge, email]) => Self::Drag {
                badge: BadgeId::from(*badge),
                email: (*email).to_string(),
            },
            ("click", [email, badge]) => Self::Click {
                email: (*email).to_string(),
                badge: BadgeId::from(*badge),
            },
            ("bio", [email]) => Self::Bio {
                email: (*email).to_string(),
            },
            ("panel", []) => Self::Panel,
            ("export", [email]) => Self::Export {
                email: (*email).to_string(),
            },
            ("wait", [ms]) => {
                let ms = ms
                    .parse()
                    .map_err(|_| Error::invalid_command(format!("not a duration: {ms}")))?;
                Self::Wait(Duration::from_millis(ms))
            }
            ("help" | "?", []) => Self::Help,
            ("quit" | "exit", []) => Self::Quit,
            _ => return Err(Error::invalid_command(format!("{line} (try 'help')"))),
        };
        Ok(command)
    }
}

/// Whether the session continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// Stop.
    Quit,
}

struct MountedCard {
    handle: CardHandle,
    exporter: CardExporter,
}

impl fmt::Debug for MountedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedCard")
            .field("key", &self.handle.key())
            .field("exporter", &self.exporter)
            .finish()
    }
}

/// An interactive directory session.
#[derive(Debug)]
pub struct Session {
    store: DirectoryStore,
    revision: watch::Receiver<u64>,
    cards: BTreeMap<String, MountedCard>,
    palette: Vec<PaletteEntry>,
    panel: SidePanel,
    notifier: TracingNotifier,
    host: ExportHost,
    settings: ExportSettings,
    removal_delay: Option<Duration>,
    last_updated: String,
    output_dir: std::path::PathBuf,
}

impl Session {
    /// Create a session with command-line host capabilities.
    #[must_use]
    pub fn new(config: &Config, store: DirectoryStore) -> Self {
        let panel = SidePanel::new(config.layout.side_panel_expanded);
        let notifier = TracingNotifier::new();
        let output_dir = config.output_dir();
        let host = ExportHost {
            layout: Arc::new(panel.clone()),
            scheduler: Arc::new(TokioScheduler::new(config.render_cycle())),
            rasterizer: Arc::new(CardRasterizer::from(&config.raster)),
            downloads: Arc::new(FileDownloadSink::new(&output_dir)),
            notifier: Arc::new(notifier.clone()),
        };

        let mut session = Self {
            revision: store.subscribe(),
            palette: PaletteEntry::from_palette(store.palette()),
            store,
            cards: BTreeMap::new(),
            panel,
            notifier,
            host,
            settings: ExportSettings::from(config),
            removal_delay: config.removal_delay(),
            last_updated: config.data.last_updated.clone(),
            output_dir,
        };
        session.remount();
        session
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &DirectoryStore {
        &self.store
    }

    /// The mounted card for a record, if it is in view.
    #[must_use]
    pub fn card(&self, email: &str) -> Option<&CardHandle> {
        self.cards.get(email).map(|card| &card.handle)
    }

    /// Check if the side panel is expanded.
    #[must_use]
    pub fn side_panel_expanded(&self) -> bool {
        self.panel.side_panel_expanded()
    }

    /// Render the directory page.
    #[must_use]
    pub fn render(&self) -> String {
        let views: Vec<_> = self
            .store
            .view()
            .iter()
            .filter_map(|record| self.card(record.key()).and_then(CardHandle::view))
            .collect();
        render::directory(&views, self.store.search_term(), &self.last_updated)
    }

    /// Read commands until input ends or `quit`.
    ///
    /// With `echo`, each command is printed before its output, which suits
    /// scripts; otherwise a prompt is printed.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails. Invalid
    /// commands are reported and skipped.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W, echo: bool) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            if !echo {
                write!(out, "supdir> ")?;
                out.flush()?;
            }
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if echo {
                writeln!(out, "> {line}")?;
            }

            match line.parse::<SessionCommand>() {
                Ok(command) => {
                    if self.execute(command, out).await? == Flow::Quit {
                        break;
                    }
                }
                Err(err) => writeln!(out, "{err}")?,
            }
        }
        Ok(())
    }

    /// Execute one command.
    ///
    /// # Errors
    ///
    /// Returns an error if writing output fails.
    pub async fn execute<W: Write>(&mut self, command: SessionCommand, out: &mut W) -> Result<Flow> {
        self.settle(Instant::now());
        trace!(?command, "Executing");

        match command {
            SessionCommand::Search(term) => {
                self.store.set_search_term(term);
                self.sync_cards();
                writeln!(out, "{}", self.render())?;
            }
            SessionCommand::List => {
                writeln!(out, "{}", self.render())?;
                let state = if self.panel.side_panel_expanded() {
                    "expanded"
                } else {
                    "collapsed"
                };
                writeln!(out, "Side panel: {state}")?;
            }
            SessionCommand::Palette => {
                writeln!(out, "{}", render::palette(self.store.palette()))?;
            }
            SessionCommand::Hover { badge, email } => self.hover(&badge, &email, out)?,
            SessionCommand::Leave { email } => {
                if let Some(card) = self.card(&email) {
                    card.drag_leave();
                }
                self.print_card(&email, out)?;
            }
            SessionCommand::Drag { badge, email } => self.drag(&badge, &email, out)?,
            SessionCommand::Click { email, badge } => self.click(&email, &badge, out)?,
            SessionCommand::Bio { email } => {
                if let Some(card) = self.card(&email) {
                    card.toggle_bio();
                }
                self.print_card(&email, out)?;
            }
            SessionCommand::Panel => {
                let expanded = self.panel.toggle();
                writeln!(
                    out,
                    "Side panel {}",
                    if expanded { "expanded" } else { "collapsed" }
                )?;
            }
            SessionCommand::Export { email } => self.export(&email, out).await?,
            SessionCommand::Wait(duration) => {
                tokio::time::sleep(duration).await;
                let applied = self.settle(Instant::now());
                writeln!(out, "Waited {}ms ({applied} removals applied)", duration.as_millis())?;
            }
            SessionCommand::Help => writeln!(out, "{HELP}")?,
            SessionCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn hover<W: Write>(&mut self, badge: &BadgeId, email: &str, out: &mut W) -> Result<()> {
        let Some(entry) = self.palette.iter_mut().find(|e| &e.badge().id == badge) else {
            writeln!(out, "Unknown badge: {badge}")?;
            return Ok(());
        };
        let payload = entry.drag_start();
        let response = self
            .cards
            .get(email)
            .map_or(DragResponse::Ignore, |card| card.handle.drag_over(&payload));
        entry.drag_end();

        match response {
            DragResponse::AcceptDrop => self.print_card(email, out),
            DragResponse::Ignore => {
                writeln!(out, "No card for {email}")?;
                Ok(())
            }
        }
    }

    fn drag<W: Write>(&mut self, badge: &BadgeId, email: &str, out: &mut W) -> Result<()> {
        let Some(entry) = self.palette.iter_mut().find(|e| &e.badge().id == badge) else {
            writeln!(out, "Unknown badge: {badge}")?;
            return Ok(());
        };
        let payload = entry.drag_start();
        let changed = match self.cards.get(email) {
            Some(card) => {
                card.handle.drag_over(&payload);
                card.handle.drop_badge(&payload, &mut self.store)
            }
            None => false,
        };
        entry.drag_end();

        self.sync_cards();
        if !changed {
            writeln!(out, "No change")?;
        }
        self.print_card(email, out)
    }

    fn click<W: Write>(&mut self, email: &str, badge: &BadgeId, out: &mut W) -> Result<()> {
        let Some(card) = self.cards.get(email) else {
            writeln!(out, "No card for {email}")?;
            return Ok(());
        };
        match card.handle.click_badge(badge, Instant::now(), &mut self.store) {
            ClickOutcome::Removed(false) => writeln!(out, "No change")?,
            ClickOutcome::Removed(true) => {}
            ClickOutcome::Scheduled(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                writeln!(out, "Removing in {}ms", remaining.as_millis())?;
            }
        }
        self.sync_cards();
        self.print_card(email, out)
    }

    async fn export<W: Write>(&self, email: &str, out: &mut W) -> Result<()> {
        let Some(card) = self.cards.get(email) else {
            writeln!(out, "No card for {email}")?;
            return Ok(());
        };

        match card.exporter.export().await {
            ExportOutcome::Downloaded { file_name } => {
                writeln!(out, "Saved {}", self.output_dir.join(file_name).display())?;
            }
            ExportOutcome::Busy => {
                let err = Error::ExportInProgress {
                    email: email.to_string(),
                };
                writeln!(out, "{err}")?;
            }
            ExportOutcome::CaptureFailed => {
                for notice in self.notifier.visible() {
                    writeln!(out, "{}", notice.message)?;
                }
            }
            ExportOutcome::MissingTarget => writeln!(out, "Card for {email} is not rendered")?,
        }
        Ok(())
    }

    fn print_card<W: Write>(&self, email: &str, out: &mut W) -> Result<()> {
        match self.card(email).and_then(CardHandle::view) {
            Some(view) => write!(out, "{view}")?,
            None => writeln!(out, "No card for {email}")?,
        }
        Ok(())
    }

    /// Apply due timed removals on every card.
    fn settle(&mut self, now: Instant) -> usize {
        let applied: usize = self
            .cards
            .values()
            .map(|card| card.handle.settle(now, &mut self.store))
            .sum();
        if applied > 0 {
            self.sync_cards();
        }
        applied
    }

    /// Re-sync mounted cards if the store moved.
    fn sync_cards(&mut self) {
        if self.revision.has_changed().unwrap_or(false) {
            self.revision.borrow_and_update();
            self.remount();
        }
    }

    /// Mount cards for the current view, update changed records and unmount
    /// cards that left the view.
    fn remount(&mut self) {
        let view = self.store.view();
        let visible: HashSet<&str> = view.iter().map(|record| record.key()).collect();

        self.cards.retain(|key, card| {
            let keep = visible.contains(key.as_str());
            if !keep {
                card.handle.unmount();
            }
            keep
        });

        for record in &view {
            match self.cards.get(record.key()) {
                Some(card) => {
                    let unchanged = card
                        .handle
                        .record()
                        .is_some_and(|current| Arc::ptr_eq(&current, record));
                    if !unchanged {
                        trace!(email = %record.key(), "Card updated");
                        card.handle.update(Arc::clone(record));
                    }
                }
                None => {
                    let handle = CardHandle::new(Arc::clone(record), self.removal_delay);
                    let exporter = CardExporter::new(
                        Arc::new(handle.clone()),
                        self.host.clone(),
                        self.settings.clone(),
                    );
                    debug!(email = %record.key(), "Card mounted");
                    self.cards
                        .insert(record.key().to_string(), MountedCard { handle, exporter });
                }
            }
        }
    }
}
