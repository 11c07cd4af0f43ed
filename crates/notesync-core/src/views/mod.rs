//! View-models behind each screen.
//!
//! Presentation layers own rendering only; state and remote calls live here.
//! Every view-model is generic over the store traits so the same logic runs
//! against the hosted backend or `MemoryBackend`.

pub mod auth_forms;
pub mod nav;
pub mod note_form;
pub mod notes;
pub mod profile;

pub use auth_forms::{
    PasswordResetForm, SignInForm, SignUpForm, CONFIRM_EMAIL_MESSAGE, PASSWORD_MISMATCH_MESSAGE,
    RESET_EMAIL_MESSAGE,
};
pub use nav::{AvatarDisplay, NavShell};
pub use note_form::{NoteForm, NoteFormMode};
pub use notes::NotesViewModel;
pub use profile::{ProfileEntry, ProfilePhase, ProfileViewModel, PROFILE_SAVED_MESSAGE};
