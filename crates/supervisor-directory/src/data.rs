//! Startup data loading.
//!
//! Records and the optional palette are read once, as JSON arrays, before
//! the store is built. Nothing is ever written back.

use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{Badge, Palette, Supervisor};
use crate::store::DirectoryStore;

/// Parse a JSON array of records.
///
/// # Errors
///
/// Returns an error if the text is not a valid record array.
pub fn parse_records(json: &str) -> serde_json::Result<Vec<Supervisor>> {
    serde_json::from_str(json)
}

/// Read a JSON array of records from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_records(path: &Path) -> Result<Vec<Supervisor>> {
    let text = read(path)?;
    let records = parse_records(&text).map_err(|source| Error::DataParse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), count = records.len(), "Loaded records");
    Ok(records)
}

/// Read a palette from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if badge ids
/// repeat.
pub fn load_palette(path: &Path) -> Result<Palette> {
    let text = read(path)?;
    let badges: Vec<Badge> = serde_json::from_str(&text).map_err(|source| Error::DataParse {
        path: path.to_path_buf(),
        source,
    })?;
    Palette::new(badges)
}

/// Build the store from the configured data sources.
///
/// # Errors
///
/// Returns an error if any data file is unreadable or invalid.
pub fn load_directory(config: &Config) -> Result<DirectoryStore> {
    let records_path = config.records_path();
    let records = load_records(&records_path)?;

    let palette = match &config.data.palette_path {
        Some(path) => load_palette(path)?,
        None => Palette::builtin(),
    };

    info!(path = %records_path.display(), "Directory data loaded");
    DirectoryStore::new(records, palette)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| Error::DataRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const RECORDS: &str = r#"[
        {"name": "Bob", "email": "b@x.com", "title": "Therapist"},
        {
            "name": "Amy", "email": "a@x.com", "title": "Counselor",
            "bio": ["First", "Second"],
            "badges": [{"id": "sushi", "src": "/badges/sushi.png", "alt": "Sushi"}]
        }
    ]"#;

    #[test]
    fn test_parse_records() {
        let records = parse_records(RECORDS).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].badges.is_empty());
        assert_eq!(records[1].badges.len(), 1);
    }

    #[test]
    fn test_parse_records_rejects_missing_email() {
        assert!(parse_records(r#"[{"name": "Amy", "title": "Counselor"}]"#).is_err());
    }

    #[test]
    fn test_load_records_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisors.json");
        std::fs::write(&path, RECORDS).unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records[1].name, "Amy");
    }

    #[test]
    fn test_load_records_missing_file() {
        let err = load_records(&PathBuf::from("/nonexistent/supervisors.json")).unwrap_err();
        assert!(matches!(err, Error::DataRead { .. }));
    }

    #[test]
    fn test_load_records_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisors.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_records(&path).unwrap_err();
        assert!(matches!(err, Error::DataParse { .. }));
    }

    #[test]
    fn test_load_palette_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "src": "/a.png", "alt": "A"}, {"id": "a", "src": "/b.png", "alt": "B"}]"#,
        )
        .unwrap();

        assert!(matches!(
            load_palette(&path).unwrap_err(),
            Error::DataValidation { .. }
        ));
    }

    #[test]
    fn test_load_directory_uses_builtin_palette() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("supervisors.json");
        std::fs::write(&path, RECORDS).unwrap();

        let mut config = Config::default();
        config.data.records_path = Some(path);

        let store = load_directory(&config).unwrap();
        assert_eq!(store.records().len(), 2);
        assert_eq!(store.palette(), &Palette::builtin());
    }
}
