use crate::cursor::Cursor;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LIST_FILENAME: &str = "gen_new_list_processed.txt";
pub const TIMESTAMP_FILENAME: &str = "gen_new_list_timestamp.txt";

/// The cursor and seen-set files kept in the local directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn cursor_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMP_FILENAME)
    }

    pub fn seen_path(&self) -> PathBuf {
        self.dir.join(LIST_FILENAME)
    }

    /// Missing, empty and unreadable files all mean there is no cursor.
    pub fn read_cursor(&self) -> Option<Cursor> {
        let path = self.cursor_path();
        if !path.is_file() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => Cursor::from_stored(&content),
            Err(e) => {
                warn!("Unable to read timestamp file {}: {e}", path.display());
                None
            }
        }
    }

    pub fn load_seen(&self) -> Vec<String> {
        let path = self.seen_path();
        if !path.exists() {
            return vec![];
        }
        match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) => {
                warn!("Unable to read product list {}: {e}", path.display());
                vec![]
            }
        }
    }

    pub fn store_cursor(&self, cursor: &Cursor) -> Result<()> {
        write_replacing(&self.cursor_path(), cursor.as_str())
    }

    pub fn store_seen(&self, ids: &[String]) -> Result<()> {
        write_replacing(&self.seen_path(), &ids.join("\n"))
    }
}

/// Replaces `dst` through a `.partial` sibling and a rename, creating parents as needed.
pub fn write_replacing(dst: &Path, content: &str) -> Result<()> {
    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let partial = PathBuf::from(format!("{}.partial", dst.display()));
    fs::write(&partial, content).with_context(|| format!("writing {}", partial.display()))?;
    fs::rename(&partial, dst).with_context(|| format!("replacing {}", dst.display()))?;
    debug!("Wrote {}", dst.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_seen_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.store_seen(&ids(&["X", "Y", "Z"])).unwrap();
        assert_eq!(store.load_seen(), ids(&["X", "Y", "Z"]));
        assert_eq!(fs::read_to_string(store.seen_path()).unwrap(), "X\nY\nZ");
    }

    #[test]
    fn test_missing_files_are_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(store.read_cursor().is_none());
        assert!(store.load_seen().is_empty());
    }

    #[test]
    fn test_empty_cursor_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        fs::write(store.cursor_path(), "").unwrap();
        assert!(store.read_cursor().is_none());
    }

    #[test]
    fn test_load_seen_ignores_blank_lines_and_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        fs::write(store.seen_path(), "A\r\nB\n\nC\n").unwrap();
        assert_eq!(store.load_seen(), ids(&["A", "B", "C"]));
    }

    #[test]
    fn test_store_creates_directory_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested/state"));
        store.store_seen(&ids(&["A", "B"])).unwrap();
        store.store_seen(&ids(&["C"])).unwrap();
        assert_eq!(store.load_seen(), ids(&["C"]));

        let cursor = Cursor::from_stored("2024-07-02T12:28:54.123456").unwrap();
        store.store_cursor(&cursor).unwrap();
        assert_eq!(store.read_cursor(), Some(cursor));
        assert!(!PathBuf::from(format!("{}.partial", store.cursor_path().display())).exists());
    }
}
