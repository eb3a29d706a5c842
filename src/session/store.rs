//! Filesystem-backed session persistence.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Session;

const PRDLOOP_DIR_NAME: &str = ".prdloop";
const SESSIONS_DIR_NAME: &str = "sessions";

/// Errors that can occur during session storage operations.
#[derive(Error, Debug)]
pub enum SessionStoreError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Empty or whitespace-only project name.
    #[error("Invalid project name")]
    InvalidProject,
}

/// Result type for session storage operations.
pub type SessionResult<T> = Result<T, SessionStoreError>;

/// Session store backed by the local filesystem.
///
/// Sessions live under `<base>/.prdloop/sessions/`, one JSON file per
/// project. Writes go through a temp file and rename so a crash mid-save
/// never leaves a truncated session behind.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root_dir: PathBuf,
}

impl SessionStore {
    /// Create a session store rooted at the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> SessionResult<Self> {
        let root_dir = base_dir
            .into()
            .join(PRDLOOP_DIR_NAME)
            .join(SESSIONS_DIR_NAME);
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Load the session for a project.
    ///
    /// A missing file means no session. A file that fails to parse also
    /// means no session: a corrupt session is unrecoverable scheduling
    /// history, so it is reported with a warning and the caller starts
    /// fresh.
    pub fn load(&self, project: &str) -> SessionResult<Option<Session>> {
        let path = self.session_path(project)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionStoreError::Io(err)),
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(
                    "discarding corrupt session file {}: {}",
                    path.display(),
                    err
                );
                Ok(None)
            }
        }
    }

    /// Persist the session for its project.
    pub fn save(&self, session: &Session) -> SessionResult<()> {
        let path = self.session_path(&session.project)?;
        let json = serde_json::to_string_pretty(session)?;

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    /// Delete the session for a project. Deleting a session that does
    /// not exist is not an error.
    pub fn delete(&self, project: &str) -> SessionResult<()> {
        let path = self.session_path(project)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionStoreError::Io(err)),
        }
    }

    /// Root directory of the session files.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn session_path(&self, project: &str) -> SessionResult<PathBuf> {
        if project.trim().is_empty() {
            return Err(SessionStoreError::InvalidProject);
        }
        Ok(self.root_dir.join(format!("{}.json", slug(project))))
    }
}

/// Filesystem-safe form of a project name.
fn slug(project: &str) -> String {
    project
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transitions;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        let session = transitions::enable_parallel_mode(Session::new("Demo Project"), 4);
        store.save(&session).expect("save");

        let loaded = store.load("Demo Project").expect("load").expect("session");
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_load_missing_session_is_none() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        assert!(store.load("Nothing").expect("load").is_none());
    }

    #[test]
    fn test_load_corrupt_session_is_none() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        let path = store.root_dir().join("Broken.json");
        fs::write(&path, "{definitely not json").expect("write");

        assert!(store.load("Broken").expect("load").is_none());
    }

    #[test]
    fn test_delete_session() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        store.save(&Session::new("Doomed")).expect("save");
        store.delete("Doomed").expect("delete");
        assert!(store.load("Doomed").expect("load").is_none());

        // Deleting again is fine.
        store.delete("Doomed").expect("delete");
    }

    #[test]
    fn test_empty_project_name_rejected() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        assert!(matches!(
            store.load("   "),
            Err(SessionStoreError::InvalidProject)
        ));
    }

    #[test]
    fn test_project_names_are_slugged() {
        let temp_dir = TempDir::new().expect("temp dir");
        let store = SessionStore::new(temp_dir.path()).expect("store");

        store.save(&Session::new("My App / v2")).expect("save");
        assert!(store.root_dir().join("My-App---v2.json").exists());
    }
}
