//! Data models for NoteSync

mod note;
mod profile;

pub use note::{card_color_for_title, card_palette_index, CardColor, Note, NoteDraft, NoteId};
pub use profile::{Profile, ProfileSummary};
