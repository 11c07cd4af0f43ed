//! Owner-scoped note list with create, edit and delete flows.

use super::note_form::NoteForm;
use crate::auth::AuthUser;
use crate::models::{Note, NoteDraft, NoteId};
use crate::remote::NoteStore;
use crate::routes::Route;
use crate::session::{SessionContext, SessionGate};
use crate::{Error, Result};

/// State behind the notes list view.
#[derive(Debug)]
pub struct NotesViewModel<S> {
    store: S,
    gate: SessionGate,
    /// Id of the user the loaded state belongs to.
    owner: String,
    notes: Vec<Note>,
    create_form: Option<NoteForm>,
    edit_form: Option<NoteForm>,
    pending_delete: Option<NoteId>,
    last_error: Option<String>,
}

impl<S: NoteStore> NotesViewModel<S> {
    /// Mount the view; anonymous visitors get the sign-in route instead.
    pub fn mount(store: S, context: &SessionContext) -> std::result::Result<Self, Route> {
        let gate = SessionGate::mount(context);
        let owner = gate.check()?.id;
        Ok(Self {
            store,
            gate,
            owner,
            notes: Vec::new(),
            create_form: None,
            edit_form: None,
            pending_delete: None,
            last_error: None,
        })
    }

    /// Apply auth changes and return where to go next.
    ///
    /// A sign-out drops every loaded note and leads to sign-in. When a
    /// different user is now signed in, the previous owner's state is
    /// dropped and `Route::Notes` asks the caller to load again.
    pub fn sync_session(&mut self) -> Option<Route> {
        let event = self.gate.sync();
        match self.gate.user().map(|user| user.id.clone()) {
            None => {
                self.reset();
                Some(Route::SignIn { message: None })
            }
            Some(id) if id != self.owner => {
                tracing::debug!("Signed-in user changed ({:?}), dropping loaded notes", event);
                self.reset();
                self.owner = id;
                Some(Route::Notes)
            }
            Some(_) => None,
        }
    }

    fn reset(&mut self) {
        self.notes.clear();
        self.create_form = None;
        self.edit_form = None;
        self.pending_delete = None;
        self.last_error = None;
    }

    /// The signed-in user. Refused when the session changed since the
    /// state was loaded; the stale state is dropped first.
    fn user(&mut self) -> Result<AuthUser> {
        if self.sync_session().is_some() {
            return Err(Error::NotAuthenticated);
        }
        self.gate.check().map_err(|_| Error::NotAuthenticated)
    }

    fn record<T>(&mut self, operation: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(error) => {
                tracing::error!("Failed to {}: {}", operation, error);
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Fetch the owner's notes, newest first. On failure the list is empty.
    pub async fn load(&mut self) -> Result<()> {
        let result = match self.user() {
            Ok(user) => self.store.list_notes(&user.id).await,
            Err(error) => Err(error),
        };
        match self.record("load notes", result) {
            Ok(notes) => {
                self.notes = notes;
                Ok(())
            }
            Err(error) => {
                self.notes.clear();
                Err(error)
            }
        }
    }

    pub async fn create(&mut self, draft: NoteDraft) -> Result<Note> {
        let result = match self.user() {
            Ok(user) => self.store.insert_note(&user.id, &draft).await,
            Err(error) => Err(error),
        };
        let note = self.record("create note", result)?;
        self.notes.insert(0, note.clone());
        self.create_form = None;
        Ok(note)
    }

    pub async fn update(&mut self, id: NoteId, draft: NoteDraft) -> Result<Note> {
        let result = match self.user() {
            Ok(user) => self.store.update_note(&user.id, &id, &draft).await,
            Err(error) => Err(error),
        };
        let note = self.record("update note", result)?;
        if let Some(existing) = self.notes.iter_mut().find(|existing| existing.id == id) {
            *existing = note.clone();
        }
        self.edit_form = None;
        Ok(note)
    }

    /// Remove a note once the remote delete succeeded.
    pub async fn delete(&mut self, id: NoteId) -> Result<()> {
        let result = match self.user() {
            Ok(user) => self.store.delete_note(&user.id, &id).await,
            Err(error) => Err(error),
        };
        self.record("delete note", result)?;
        self.notes.retain(|note| note.id != id);
        if self.pending_delete == Some(id) {
            self.pending_delete = None;
        }
        Ok(())
    }

    pub fn toggle_create_form(&mut self) {
        self.create_form = match self.create_form {
            Some(_) => None,
            None => Some(NoteForm::create()),
        };
    }

    /// Open the edit form for a loaded note. Returns false for unknown ids.
    pub fn start_editing(&mut self, id: NoteId) -> bool {
        match self.notes.iter().find(|note| note.id == id) {
            Some(note) => {
                self.edit_form = Some(NoteForm::edit(note));
                true
            }
            None => false,
        }
    }

    pub fn cancel_editing(&mut self) {
        self.edit_form = None;
    }

    pub const fn create_form(&self) -> Option<&NoteForm> {
        self.create_form.as_ref()
    }

    pub fn create_form_mut(&mut self) -> Option<&mut NoteForm> {
        self.create_form.as_mut()
    }

    pub const fn edit_form(&self) -> Option<&NoteForm> {
        self.edit_form.as_ref()
    }

    pub fn edit_form_mut(&mut self) -> Option<&mut NoteForm> {
        self.edit_form.as_mut()
    }

    /// Submit the creation form. Blank fields are ignored: `Ok(None)`.
    pub async fn submit_create_form(&mut self) -> Result<Option<Note>> {
        let Some(draft) = self.create_form.as_ref().and_then(NoteForm::submit) else {
            return Ok(None);
        };
        self.create(draft).await.map(Some)
    }

    /// Submit the edit form. Blank fields are ignored: `Ok(None)`.
    pub async fn submit_edit_form(&mut self) -> Result<Option<Note>> {
        let Some(form) = self.edit_form.as_ref() else {
            return Ok(None);
        };
        let (Some(id), Some(draft)) = (form.editing_id(), form.submit()) else {
            return Ok(None);
        };
        self.update(id, draft).await.map(Some)
    }

    /// Ask for confirmation before deleting.
    pub fn request_delete(&mut self, id: NoteId) {
        self.pending_delete = Some(id);
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub const fn pending_delete(&self) -> Option<NoteId> {
        self.pending_delete
    }

    /// Delete the note awaiting confirmation. `Ok(false)` when none was.
    pub async fn confirm_delete(&mut self) -> Result<bool> {
        let Some(id) = self.pending_delete else {
            return Ok(false);
        };
        self.delete(id).await?;
        Ok(true)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// "1 note" or "N notes".
    pub fn count_label(&self) -> String {
        match self.notes.len() {
            1 => "1 note".to_string(),
            count => format!("{count} notes"),
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Resolve a full id or a unique prefix among the loaded notes.
    pub fn resolve(&self, id_or_prefix: &str) -> Result<NoteId> {
        let needle = id_or_prefix.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Err(Error::InvalidInput("Note id cannot be empty".into()));
        }
        if let Ok(id) = needle.parse::<NoteId>() {
            return Ok(id);
        }

        let mut matches = self
            .notes
            .iter()
            .filter(|note| note.id.as_str().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(note), None) => Ok(note.id),
            (None, _) => Err(Error::NotFound(id_or_prefix.to_string())),
            (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
                "Note id prefix '{id_or_prefix}' is ambiguous"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::{AuthProvider, MemoryAuthProvider};
    use crate::remote::MemoryBackend;

    async fn signed_in(email: &str) -> (MemoryAuthProvider, SessionContext) {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up(email, "secret123").await.unwrap();
        let context = SessionContext::initialize(&auth).await;
        (auth, context)
    }

    async fn view(backend: &MemoryBackend, context: &SessionContext) -> NotesViewModel<MemoryBackend> {
        let mut view = NotesViewModel::mount(backend.clone(), context).unwrap();
        view.load().await.unwrap();
        view
    }

    fn draft(title: &str, content: &str) -> NoteDraft {
        NoteDraft::new(title, content).unwrap()
    }

    #[tokio::test]
    async fn mount_without_session_redirects() {
        let result = NotesViewModel::mount(MemoryBackend::new(), &SessionContext::signed_out());
        assert_eq!(result.err(), Some(Route::SignIn { message: None }));
    }

    #[tokio::test]
    async fn create_prepends_server_row_and_closes_form() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;

        notes.create(draft("Older", "x")).await.unwrap();
        notes.toggle_create_form();
        let created = notes.create(draft("Newer", "y")).await.unwrap();

        assert_eq!(notes.notes()[0].id, created.id);
        assert_eq!(notes.notes()[1].title, "Older");
        assert!(notes.create_form().is_none());

        let reloaded = view(&backend, &context).await;
        assert_eq!(reloaded.notes()[0].title, "Newer");
    }

    #[tokio::test]
    async fn other_users_never_see_the_note() {
        let backend = MemoryBackend::new();
        let (_, alice) = signed_in("alice@example.com").await;
        let (_, bob) = signed_in("bob@example.com").await;

        let mut alice_notes = view(&backend, &alice).await;
        let note = alice_notes.create(draft("Private", "secret")).await.unwrap();

        let mut bob_notes = view(&backend, &bob).await;
        assert!(bob_notes.is_empty());
        assert!(bob_notes.delete(note.id).await.is_err());
        assert_eq!(view(&backend, &alice).await.notes().len(), 1);
    }

    #[tokio::test]
    async fn update_changes_only_title_and_content() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let original = notes.create(draft("Groceries", "Milk")).await.unwrap();
        let other = notes.create(draft("Work", "Report")).await.unwrap();

        assert!(notes.start_editing(original.id));
        let form = notes.edit_form_mut().unwrap();
        form.set_content("Milk, bread");
        let updated = notes.submit_edit_form().await.unwrap().unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.user_id, original.user_id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.content, "Milk, bread");
        assert!(notes.edit_form().is_none());

        let reloaded = view(&backend, &context).await;
        let untouched = reloaded.notes().iter().find(|n| n.id == other.id).unwrap();
        assert_eq!(untouched, &other);
    }

    #[tokio::test]
    async fn blank_submission_makes_no_remote_call() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;

        notes.toggle_create_form();
        notes.create_form_mut().unwrap().set_content("non-empty");
        assert_eq!(notes.submit_create_form().await.unwrap(), None);

        let form = notes.create_form_mut().unwrap();
        form.set_title("Title");
        form.set_content("");
        assert_eq!(notes.submit_create_form().await.unwrap(), None);

        assert_eq!(backend.note_writes().await, 0);
        assert!(notes.is_empty());
        assert!(notes.create_form().is_some());
    }

    #[tokio::test]
    async fn delete_waits_for_confirmation() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let note = notes.create(draft("Groceries", "Milk")).await.unwrap();

        notes.request_delete(note.id);
        notes.cancel_delete();
        assert!(!notes.confirm_delete().await.unwrap());
        assert_eq!(notes.notes().len(), 1);

        notes.request_delete(note.id);
        assert!(notes.confirm_delete().await.unwrap());
        assert!(notes.is_empty());
        assert!(view(&backend, &context).await.is_empty());
    }

    #[tokio::test]
    async fn failures_are_surfaced_and_state_kept() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let note = notes.create(draft("Groceries", "Milk")).await.unwrap();

        backend.fail_rows(Some("network down")).await;
        assert!(notes.delete(note.id).await.is_err());
        assert_eq!(notes.notes().len(), 1);
        assert_eq!(notes.last_error(), Some("network down"));

        assert!(notes.update(note.id, draft("X", "Y")).await.is_err());
        assert_eq!(notes.notes()[0].title, "Groceries");

        assert!(notes.load().await.is_err());
        assert!(notes.is_empty());

        backend.fail_rows(None).await;
        notes.load().await.unwrap();
        assert_eq!(notes.last_error(), None);
        assert_eq!(notes.count_label(), "1 note");
    }

    #[tokio::test]
    async fn sign_out_clears_loaded_notes() {
        let (auth, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        notes.create(draft("Groceries", "Milk")).await.unwrap();

        context.sign_out(&auth).await.unwrap();
        assert_eq!(notes.sync_session(), Some(Route::SignIn { message: None }));
        assert!(notes.is_empty());
        assert!(matches!(notes.load().await, Err(Error::NotAuthenticated)));
    }

    async fn switch_to_bob(auth: &MemoryAuthProvider, context: &SessionContext) -> AuthUser {
        auth.sign_up("bob@example.com", "secret123").await.unwrap();
        context.sign_out(auth).await.unwrap();
        context
            .sign_in(auth, "bob@example.com", "secret123")
            .await
            .unwrap()
            .user
    }

    #[tokio::test]
    async fn switching_user_drops_previous_owner_state() {
        let (auth, context) = signed_in("alice@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let private = notes.create(draft("A private", "secret")).await.unwrap();
        notes.request_delete(private.id);
        notes.toggle_create_form();

        let bob = switch_to_bob(&auth, &context).await;

        assert_eq!(notes.sync_session(), Some(Route::Notes));
        assert!(notes.is_empty());
        assert_eq!(notes.pending_delete(), None);
        assert!(notes.create_form().is_none());

        notes.load().await.unwrap();
        assert!(notes.is_empty());
        let own = notes.create(draft("B note", "mine")).await.unwrap();
        assert_eq!(own.user_id, bob.id);
        assert_eq!(notes.sync_session(), None);
    }

    #[tokio::test]
    async fn stale_view_refuses_writes_after_user_switch() {
        let (auth, context) = signed_in("alice@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let private = notes.create(draft("A private", "secret")).await.unwrap();
        let writes = backend.note_writes().await;

        let bob = switch_to_bob(&auth, &context).await;

        assert!(matches!(
            notes.create(draft("Meant for Alice", "x")).await,
            Err(Error::NotAuthenticated)
        ));
        assert!(notes.delete(private.id).await.is_err());
        assert_eq!(backend.note_writes().await, writes);
        assert!(notes.is_empty());

        let own = notes.create(draft("B note", "mine")).await.unwrap();
        assert_eq!(own.user_id, bob.id);
        assert_eq!(notes.notes().len(), 1);
    }

    #[tokio::test]
    async fn resolve_accepts_unique_prefix() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        let note = notes.create(draft("Groceries", "Milk")).await.unwrap();

        assert_eq!(notes.resolve(&note.id.as_str()).unwrap(), note.id);
        assert_eq!(notes.resolve(&note.id.as_str()[..13]).unwrap(), note.id);
        assert!(matches!(notes.resolve("zzzz"), Err(Error::NotFound(_))));
        assert!(notes.resolve(" ").is_err());
    }

    #[tokio::test]
    async fn count_label_pluralizes() {
        let (_, context) = signed_in("a@example.com").await;
        let backend = MemoryBackend::new();
        let mut notes = view(&backend, &context).await;
        assert_eq!(notes.count_label(), "0 notes");
        notes.create(draft("A", "a")).await.unwrap();
        notes.create(draft("B", "b")).await.unwrap();
        assert_eq!(notes.count_label(), "2 notes");
    }
}
