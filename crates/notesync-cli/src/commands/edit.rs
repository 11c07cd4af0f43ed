use crate::commands::common::{edit_in_editor, normalize_note_identifier, Backend};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<String>,
    content: Option<String>,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let normalized_id = normalize_note_identifier(id)?;
    let backend = Backend::connect(global_profile).await?;
    let mut view = backend.notes_view().await?;
    let note_id = view.resolve(&normalized_id)?;
    if !view.start_editing(note_id) {
        return Err(notesync_core::Error::NotFound(normalized_id).into());
    }

    let Some(form) = view.edit_form_mut() else {
        return Err(CliError::EmptyEditedContent);
    };
    let original = (form.title.clone(), form.content.clone());
    if title.is_none() && content.is_none() {
        let Some(edited) = edit_in_editor(&form.content)? else {
            return Err(CliError::EmptyEditedContent);
        };
        form.set_content(edited);
    } else {
        if let Some(title) = title {
            form.set_title(title);
        }
        if let Some(content) = content {
            form.set_content(content);
        }
    }

    if (form.title.trim(), form.content.trim()) == (original.0.as_str(), original.1.as_str()) {
        println!("{note_id}");
        return Ok(());
    }

    let Some(updated) = view.submit_edit_form().await? else {
        return Err(CliError::EmptyEditedContent);
    };
    println!("{}", updated.id);
    Ok(())
}
