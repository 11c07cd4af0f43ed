//! Memory backend
//!
//! Row and object storage kept in process. Will be destroyed on shutdown.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{NoteStore, ObjectStore, ProfileStore};
use crate::config::DEFAULT_AVATAR_BUCKET;
use crate::models::{Note, NoteDraft, NoteId, Profile};
use crate::{Error, Result};

/// An object held by the memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    notes: Vec<Note>,
    profiles: HashMap<String, Profile>,
    objects: BTreeMap<String, StoredObject>,
    last_created_at: Option<DateTime<Utc>>,
    row_failure: Option<String>,
    upload_failure: Option<String>,
    note_writes: usize,
}

impl MemoryState {
    fn check_rows(&self) -> Result<()> {
        match &self.row_failure {
            Some(message) => Err(Error::Remote {
                code: None,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Strictly increasing creation timestamps so newest-first order is stable.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }
}

/// An in-memory stand-in for the row and object stores.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
    bucket: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            bucket: DEFAULT_AVATAR_BUCKET.to_string(),
        }
    }

    /// Make every row request fail with `message`; `None` restores service.
    pub async fn fail_rows(&self, message: Option<&str>) {
        self.state.lock().await.row_failure = message.map(ToString::to_string);
    }

    /// Make every upload fail with `message`; `None` restores service.
    pub async fn fail_uploads(&self, message: Option<&str>) {
        self.state.lock().await.upload_failure = message.map(ToString::to_string);
    }

    /// Number of note inserts, updates and deletes accepted so far.
    pub async fn note_writes(&self) -> usize {
        self.state.lock().await.note_writes
    }

    /// Stored profile row, bypassing failure injection.
    pub async fn stored_profile(&self, user_id: &str) -> Option<Profile> {
        self.state.lock().await.profiles.get(user_id).cloned()
    }

    /// Stored object, bypassing failure injection.
    pub async fn object(&self, path: &str) -> Option<StoredObject> {
        self.state.lock().await.objects.get(path).cloned()
    }

    /// All object paths, sorted.
    pub async fn object_paths(&self) -> Vec<String> {
        self.state.lock().await.objects.keys().cloned().collect()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore for MemoryBackend {
    async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        let state = self.state.lock().await;
        state.check_rows()?;
        let mut notes: Vec<Note> = state
            .notes
            .iter()
            .filter(|note| note.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn insert_note(&self, user_id: &str, draft: &NoteDraft) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.check_rows()?;
        let note = Note {
            id: NoteId::new(),
            user_id: user_id.to_string(),
            title: draft.title.clone(),
            content: draft.content.clone(),
            created_at: state.next_created_at(),
        };
        state.notes.push(note.clone());
        state.note_writes += 1;
        Ok(note)
    }

    async fn update_note(&self, user_id: &str, id: &NoteId, draft: &NoteDraft) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.check_rows()?;
        let note = state
            .notes
            .iter_mut()
            .find(|note| note.id == *id && note.user_id == user_id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        note.title.clone_from(&draft.title);
        note.content.clone_from(&draft.content);
        let updated = note.clone();
        state.note_writes += 1;
        Ok(updated)
    }

    async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check_rows()?;
        let before = state.notes.len();
        state
            .notes
            .retain(|note| !(note.id == *id && note.user_id == user_id));
        if state.notes.len() == before {
            return Err(Error::NotFound(id.to_string()));
        }
        state.note_writes += 1;
        Ok(())
    }
}

impl ProfileStore for MemoryBackend {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let state = self.state.lock().await;
        state.check_rows()?;
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut state = self.state.lock().await;
        state.check_rows()?;
        if state.profiles.contains_key(&profile.id) {
            return Err(Error::Remote {
                code: Some("23505".to_string()),
                message: "duplicate key value violates unique constraint \"profiles_pkey\""
                    .to_string(),
            });
        }
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        let mut state = self.state.lock().await;
        state.check_rows()?;
        state.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile.clone())
    }
}

impl ObjectStore for MemoryBackend {
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some(message) = &state.upload_failure {
            return Err(Error::Storage(message.clone()));
        }
        if !upsert && state.objects.contains_key(path) {
            return Err(Error::Storage("The resource already exists".to_string()));
        }
        state.objects.insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://{}/{path}", self.bucket)
    }
}
