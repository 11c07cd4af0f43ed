use std::io::{self, IsTerminal};

use crate::commands::common::{confirm, normalize_note_identifier, Backend};
use crate::error::CliError;

pub async fn run_delete(
    id: &str,
    skip_confirmation: bool,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let backend = Backend::connect(global_profile).await?;
    let mut view = backend.notes_view().await?;
    let note_id = view.resolve(&normalized_id)?;
    let title = view
        .notes()
        .iter()
        .find(|note| note.id == note_id)
        .map(|note| note.title.clone())
        .ok_or_else(|| notesync_core::Error::NotFound(normalized_id.clone()))?;

    view.request_delete(note_id);
    if !skip_confirmation && io::stdin().is_terminal() && !confirm(&format!("Delete \"{title}\"?"))? {
        view.cancel_delete();
        println!("Cancelled");
        return Ok(());
    }

    view.confirm_delete().await?;
    println!("{note_id}");
    Ok(())
}
