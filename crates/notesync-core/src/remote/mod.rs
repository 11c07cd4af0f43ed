//! Remote row and object storage.
//!
//! The view-models only talk to these traits. `SupabaseRestClient` and
//! `SupabaseStorageClient` reach the hosted services; `MemoryBackend` keeps
//! everything in process for tests and demos.

mod memory;
mod postgrest;
mod storage;

use crate::models::{Note, NoteDraft, NoteId, Profile};
use crate::Result;

pub use memory::{MemoryBackend, StoredObject};
pub use postgrest::{SupabaseRestClient, NO_ROWS_CODE};
pub use storage::SupabaseStorageClient;

/// Operations on the `notes` table. Every query is filtered by owner.
#[allow(async_fn_in_trait)]
pub trait NoteStore {
    /// All notes owned by `user_id`, newest first.
    async fn list_notes(&self, user_id: &str) -> Result<Vec<Note>>;

    /// Insert a note and return the stored row.
    async fn insert_note(&self, user_id: &str, draft: &NoteDraft) -> Result<Note>;

    /// Replace title and content; `NotFound` when no owned row matched.
    async fn update_note(&self, user_id: &str, id: &NoteId, draft: &NoteDraft) -> Result<Note>;

    /// Delete a note; `NotFound` when no owned row matched.
    async fn delete_note(&self, user_id: &str, id: &NoteId) -> Result<()>;
}

/// Operations on the `profiles` table.
#[allow(async_fn_in_trait)]
pub trait ProfileStore {
    /// Single-row lookup; `None` when the user has no profile yet.
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Insert a new row; fails when one already exists.
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile>;

    /// Insert or update on conflict with the id, in one request.
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile>;
}

/// Operations on the object store.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Store bytes at `path`; with `upsert` an existing object is replaced.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str, upsert: bool)
        -> Result<()>;

    /// Public URL for an object path.
    fn public_url(&self, path: &str) -> String;
}
