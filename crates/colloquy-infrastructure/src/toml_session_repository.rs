//! TOML-based SessionRepository implementation.

use crate::dto::{SESSION_ENTITY, create_session_migrator};
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use colloquy_core::session::{ChatSession, SessionRepository};
use colloquy_core::{ChatError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use version_migrate::Migrator;

/// Stores each session as its own TOML file.
///
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.toml
///     └── <session-id-2>.toml
/// ```
///
/// Files are read and written as flat versioned documents through the
/// session [`Migrator`]. Writes go through [`AtomicTomlFile`] and are
/// complete (fsynced and renamed into place) before the returned future
/// resolves.
pub struct TomlSessionRepository {
    sessions_dir: PathBuf,
    migrator: Arc<Migrator>,
}

impl TomlSessionRepository {
    /// Creates a repository rooted at `base_dir`, creating `sessions/` if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory structure cannot be created.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = base_dir.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir)?;

        tracing::debug!("[TomlSessionRepository] Using {:?}", sessions_dir);
        Ok(Self {
            sessions_dir,
            migrator: Arc::new(create_session_migrator()?),
        })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_file(&self, session_id: &str) -> Result<AtomicTomlFile<toml::Value>> {
        // Ids become file names; refuse anything that could escape the directory.
        if session_id.is_empty()
            || session_id.starts_with('.')
            || session_id.contains(['/', '\\'])
        {
            return Err(ChatError::validation(format!(
                "Invalid session id '{}'",
                session_id
            )));
        }

        Ok(AtomicTomlFile::new(
            self.sessions_dir.join(format!("{}.toml", session_id)),
        ))
    }

    fn load_from(
        file: &AtomicTomlFile<toml::Value>,
        migrator: &Migrator,
    ) -> Result<Option<ChatSession>> {
        match file.load()? {
            Some(toml_value) => {
                let session: ChatSession = migrator.load_flat_from(SESSION_ENTITY, toml_value)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn save_to(
        file: &AtomicTomlFile<toml::Value>,
        migrator: &Migrator,
        session: &ChatSession,
    ) -> Result<()> {
        // The migrator emits JSON; re-read it as a TOML value for the file.
        let json = migrator.save_domain_flat(SESSION_ENTITY, session)?;
        let toml_value: toml::Value = serde_json::from_str(&json)?;
        file.save(&toml_value)?;
        Ok(())
    }

    fn load_all(sessions_dir: &Path, migrator: &Migrator) -> Result<Vec<ChatSession>> {
        let mut sessions = Vec::new();

        for entry in fs::read_dir(sessions_dir)? {
            let path = entry?.path();
            let is_session_file = path.extension().is_some_and(|ext| ext == "toml")
                && !path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with('.'));
            if !is_session_file {
                continue;
            }

            let file = AtomicTomlFile::<toml::Value>::new(&path);
            match Self::load_from(&file, migrator) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(e) => {
                    // One corrupt file must not hide the rest of the history.
                    tracing::warn!("[TomlSessionRepository] Skipping {:?}: {}", path, e);
                }
            }
        }

        Ok(sessions)
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ChatError::internal(format!("Failed to join storage task: {}", e)))?
}

#[async_trait]
impl SessionRepository for TomlSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ChatSession>> {
        let file = self.session_file(session_id)?;
        let migrator = Arc::clone(&self.migrator);
        run_blocking(move || Self::load_from(&file, &migrator)).await
    }

    async fn save(&self, session: &ChatSession) -> Result<()> {
        let file = self.session_file(&session.id)?;
        let migrator = Arc::clone(&self.migrator);
        let session = session.clone();
        run_blocking(move || Self::save_to(&file, &migrator, &session)).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let file = self.session_file(session_id)?;
        let removed = run_blocking(move || file.remove().map_err(ChatError::from)).await?;
        if !removed {
            tracing::debug!(
                "[TomlSessionRepository] Delete of absent session '{}' ignored",
                session_id
            );
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ChatSession>> {
        let sessions_dir = self.sessions_dir.clone();
        let migrator = Arc::clone(&self.migrator);
        run_blocking(move || Self::load_all(&sessions_dir, &migrator)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use colloquy_core::session::{Message, SourceCitation};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn create_test_session(id: &str) -> ChatSession {
        let start = Utc::now();
        let mut session = ChatSession {
            id: id.to_string(),
            title: format!("Test Session {}", id),
            messages: Vec::new(),
            file_ids: BTreeSet::from(["file-1".to_string()]),
            prompt_ids: BTreeSet::new(),
            created_at: start,
            updated_at: start,
        };
        session.push_message(Message::user("Hello", start)).unwrap();
        session
            .push_message(Message::assistant(
                "Hi there!",
                start + Duration::seconds(1),
                vec![SourceCitation::new("file-1", 3)],
            ))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();
        let session = create_test_session("test-session-1");

        repository.save(&session).await.unwrap();
        let loaded = repository.find_by_id("test-session-1").await.unwrap();

        assert_eq!(loaded, Some(session));
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();

        assert!(repository.find_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_all_skips_corrupt_files() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();

        repository.save(&create_test_session("session-1")).await.unwrap();
        repository.save(&create_test_session("session-2")).await.unwrap();
        fs::write(repository.sessions_dir().join("broken.toml"), "id = ").unwrap();
        fs::write(repository.sessions_dir().join("notes.txt"), "ignored").unwrap();

        let mut ids: Vec<String> = repository
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["session-1", "session-2"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repository.save(&create_test_session("to-delete")).await.unwrap();

        repository.delete("to-delete").await.unwrap();
        repository.delete("to-delete").await.unwrap();

        assert!(repository.find_by_id("to-delete").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_file_carries_schema_version() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repository.save(&create_test_session("versioned")).await.unwrap();

        let content =
            fs::read_to_string(repository.sessions_dir().join("versioned.toml")).unwrap();

        assert!(content.contains("version = \"1.0.0\""));
    }

    #[tokio::test]
    async fn test_unknown_schema_version_fails_to_load() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();
        repository.save(&create_test_session("future")).await.unwrap();
        let path = repository.sessions_dir().join("future.toml");
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("1.0.0", "9.0.0")).unwrap();

        assert!(repository.find_by_id("future").await.is_err());
        assert!(repository.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let repository = TomlSessionRepository::new(temp_dir.path()).unwrap();

        let err = repository.find_by_id("../escape").await.unwrap_err();
        assert!(err.is_validation());
    }
}
