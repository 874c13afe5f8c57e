// SPDX-License-Identifier: MIT

//! Session checkpoints
//!
//! A [`CheckpointStore`] is an opaque key-value store of JSON snapshots keyed
//! by session id. [`SessionSnapshot`] is the typed shape the orchestrator
//! keeps in it, and [`SessionLocks`] serializes runs on the same session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::adk::error::Result;
use crate::tutor::intent::Intent;
use crate::tutor::state::RunState;

pub const DEFAULT_CHECKPOINT_DIR: &str = "data/checkpoints";

/// Opaque snapshot storage keyed by session id
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Value>>;
    async fn put(&self, session_id: &str, snapshot: Value) -> Result<()>;
}

/// One finished exchange in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub steps: Vec<String>,
}

/// Everything persisted for a session after a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: Intent")]
pub struct SessionSnapshot<I: Intent> {
    pub session_id: String,
    pub turns: Vec<Turn>,
    /// Final state of the latest run
    pub state: RunState<I>,
    pub updated_at: DateTime<Utc>,
}

impl<I: Intent> SessionSnapshot<I> {
    /// Start or extend a session with a finished run
    pub fn record(previous: Option<Self>, session_id: &str, state: RunState<I>) -> Self {
        let mut turns = previous.map(|p| p.turns).unwrap_or_default();
        turns.push(Turn {
            question: state.question.clone(),
            answer: state.answer.clone().unwrap_or_default(),
            steps: state.steps.clone(),
        });
        Self {
            session_id: session_id.to_string(),
            turns,
            state,
            updated_at: Utc::now(),
        }
    }
}

/// Load and decode a session snapshot
pub async fn load_snapshot<I: Intent>(
    store: &dyn CheckpointStore,
    session_id: &str,
) -> Result<Option<SessionSnapshot<I>>> {
    match store.get(session_id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and store a session snapshot
pub async fn save_snapshot<I: Intent>(
    store: &dyn CheckpointStore,
    snapshot: &SessionSnapshot<I>,
) -> Result<()> {
    store
        .put(&snapshot.session_id, serde_json::to_value(snapshot)?)
        .await
}

/// One JSON file per session in a directory
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(session_id)))
    }
}

#[async_trait]
impl CheckpointStore for JsonCheckpointStore {
    async fn get(&self, session_id: &str) -> Result<Option<Value>> {
        let path = self.path_for(session_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, session_id: &str, snapshot: Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(session_id);
        tokio::fs::write(&path, serde_json::to_string_pretty(&snapshot)?).await?;
        log::debug!("Checkpointed session {} to {}", session_id, path.display());
        Ok(())
    }
}

/// Reversible file stem for a session id. Lowercase ASCII letters, digits and
/// '-' pass through; every other byte becomes '_' and two uppercase hex
/// digits, so distinct ids never share a file, even on case-insensitive
/// filesystems.
fn file_stem(session_id: &str) -> String {
    let mut stem = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        if byte.is_ascii_lowercase() || byte.is_ascii_digit() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

/// Process-local checkpoints
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    snapshots: RwLock<HashMap<String, Value>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn get(&self, session_id: &str) -> Result<Option<Value>> {
        Ok(self.snapshots.read().await.get(session_id).cloned())
    }

    async fn put(&self, session_id: &str, snapshot: Value) -> Result<()> {
        self.snapshots
            .write()
            .await
            .insert(session_id.to_string(), snapshot);
        Ok(())
    }
}

type LockMap = HashMap<String, Arc<Mutex<()>>>;

/// One lock per session id, held for a whole run. An id's entry lives only
/// while some run holds or awaits its lock.
#[derive(Default)]
pub struct SessionLocks {
    locks: StdMutex<LockMap>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = Arc::clone(self.map().entry(session_id.to_string()).or_default());
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            session_id: session_id.to_string(),
            locks: self,
        }
    }

    /// Sessions currently locked or awaited
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        // The map stays consistent even if a holder panicked
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a session's lock; dropping it releases the lock and forgets the
/// session once nobody else is waiting on it
pub struct SessionGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    session_id: String,
    locks: &'a SessionLocks,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.map();
        // Waiters clone the Arc under the map lock, so a count of one means idle
        if map
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.session_id);
        }
    }
}
