//! `supervisor-directory` - A searchable directory of clinical supervisors
//!
//! This library provides the directory store, the per-card badge interaction
//! state machine, and the card export routine that captures a rendered card
//! as a PNG and offers it for download.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod card;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod search;
pub mod store;

pub use card::{CardHandle, CardInteraction, CardView, DragPayload};
pub use config::Config;
pub use data::load_directory;
pub use error::{Error, Result};
pub use export::{CardExporter, CaptureError, ExportOutcome};
pub use logging::init_logging;
pub use model::{Badge, BadgeId, Bio, Palette, Supervisor};
pub use store::{BadgeActions, DirectoryStore};
