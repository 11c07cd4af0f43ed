//! Note create/edit form state.

use crate::models::{Note, NoteDraft, NoteId};

/// Whether the form creates a new note or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFormMode {
    Create,
    Edit(NoteId),
}

/// Title/content inputs for a single note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteForm {
    mode: NoteFormMode,
    pub title: String,
    pub content: String,
}

impl NoteForm {
    /// Empty form for a new note.
    pub const fn create() -> Self {
        Self {
            mode: NoteFormMode::Create,
            title: String::new(),
            content: String::new(),
        }
    }

    /// Form pre-filled from an existing note.
    pub fn edit(note: &Note) -> Self {
        Self {
            mode: NoteFormMode::Edit(note.id),
            title: note.title.clone(),
            content: note.content.clone(),
        }
    }

    pub const fn mode(&self) -> NoteFormMode {
        self.mode
    }

    /// Id of the note being edited.
    pub const fn editing_id(&self) -> Option<NoteId> {
        match self.mode {
            NoteFormMode::Edit(id) => Some(id),
            NoteFormMode::Create => None,
        }
    }

    /// Only edit mode offers a cancel action.
    pub const fn can_cancel(&self) -> bool {
        matches!(self.mode, NoteFormMode::Edit(_))
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Trimmed draft, or `None` when either field is blank.
    pub fn submit(&self) -> Option<NoteDraft> {
        NoteDraft::new(&self.title, &self.content).ok()
    }
}

impl Default for NoteForm {
    fn default() -> Self {
        Self::create()
    }
}
