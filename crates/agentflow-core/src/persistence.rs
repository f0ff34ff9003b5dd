use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

use super::archive::Conversation;
use super::error::PersistenceError;
use super::events::ExecutionEvent;
use super::policy::Disclosure;
use super::state::AppState;
use super::state::ChatMessage;
use super::state::ExecutionGraphState;
use super::state::Language;
use super::state::ModalityMode;
use super::state::TaskPlan;
use super::state::ThemeMode;
use super::state::TransparencyLevel;
use super::state::SNAPSHOT_VERSION;

pub const SESSION_FILE: &str = "session.json";
pub const CONVERSATIONS_FILE: &str = "conversations.json";
pub const LAST_RUN_FILE: &str = "last-run.sse";

/// Live session as written after every state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default = "default_version")]
    pub version: u8,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub current_plan: Option<TaskPlan>,
    #[serde(default)]
    pub graph_state: Option<ExecutionGraphState>,
    /// Gate decision captured when `current_plan` was proposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_disclosure: Option<Disclosure>,
    #[serde(default)]
    pub transparency_level: TransparencyLevel,
    #[serde(default)]
    pub modality_mode: ModalityMode,
    #[serde(default)]
    pub theme_mode: ThemeMode,
    #[serde(default)]
    pub language: Language,
}

fn default_version() -> u8 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn conversations_path(&self) -> PathBuf {
        self.dir.join(CONVERSATIONS_FILE)
    }

    pub fn last_run_path(&self) -> PathBuf {
        self.dir.join(LAST_RUN_FILE)
    }

    pub fn save_session(&self, session: &PersistedSession) -> Result<(), PersistenceError> {
        write_json(&self.session_path(), session)
    }

    pub fn load_session(&self) -> Result<Option<PersistedSession>, PersistenceError> {
        read_json(&self.session_path())
    }

    pub fn save_conversations(&self, conversations: &[Conversation]) -> Result<(), PersistenceError> {
        write_json(&self.conversations_path(), &conversations)
    }

    pub fn load_conversations(&self) -> Result<Vec<Conversation>, PersistenceError> {
        Ok(read_json(&self.conversations_path())?.unwrap_or_default())
    }

    /// Loads both snapshots into a fresh state.
    pub fn restore(&self) -> Result<AppState, PersistenceError> {
        let session = self.load_session()?;
        let conversations = self.load_conversations()?;
        Ok(AppState::restore(session, conversations))
    }

    /// Truncates the recording of the previous run.
    pub fn begin_run_recording(&self) -> Result<(), PersistenceError> {
        let path = self.last_run_path();
        write_private(&path, b"", false)
    }

    /// Appends one record in event-stream framing so the file can be fed back
    /// through the stream decoder.
    pub fn record_event(&self, event: &ExecutionEvent) -> Result<(), PersistenceError> {
        let path = self.last_run_path();
        let json = serde_json::to_string(event).map_err(|source| PersistenceError::Encode {
            path: path.clone(),
            source,
        })?;
        write_private(&path, format!("data: {json}\n\n").as_bytes(), true)
    }
}

/// Store listener that writes the session on every change and the archive
/// whenever its revision moves.
pub struct SnapshotWriter {
    store: SessionStore,
    last_session: Option<PersistedSession>,
    archive_revision: u64,
}

impl SnapshotWriter {
    pub fn new(store: SessionStore, initial: &AppState) -> Self {
        Self {
            store,
            last_session: Some(initial.snapshot()),
            archive_revision: initial.history.revision(),
        }
    }

    pub fn observe(&mut self, state: &AppState) {
        let session = state.snapshot();
        if self.last_session.as_ref() != Some(&session) {
            match self.store.save_session(&session) {
                Ok(()) => {
                    debug!(target: "agentflow.persistence", messages = session.messages.len(), "session saved");
                    self.last_session = Some(session);
                }
                Err(err) => {
                    warn!(target: "agentflow.persistence", error = %err, "session not saved");
                }
            }
        }

        let revision = state.history.revision();
        if revision != self.archive_revision {
            match self.store.save_conversations(state.history.entries()) {
                Ok(()) => {
                    debug!(target: "agentflow.persistence", entries = state.history.len(), "archive saved");
                    self.archive_revision = revision;
                }
                Err(err) => {
                    warn!(target: "agentflow.persistence", error = %err, "archive not saved");
                }
            }
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let encoded = serde_json::to_vec_pretty(value).map_err(|source| PersistenceError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    write_private(path, &encoded, false)
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| PersistenceError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn write_private(path: &Path, bytes: &[u8], append: bool) -> Result<(), PersistenceError> {
    let io_err = |source: std::io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut opts = OpenOptions::new();
    opts.create(true);
    if append {
        opts.append(true);
    } else {
        opts.write(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path).map_err(io_err)?;
    file.write_all(bytes).map_err(io_err)?;
    file.flush().map_err(io_err)
}
