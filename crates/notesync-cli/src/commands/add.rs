use crate::commands::common::{resolve_note_content, Backend};
use crate::error::CliError;

pub async fn run_add(
    title: &str,
    content_parts: &[String],
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;

    let backend = Backend::connect(global_profile).await?;
    let mut view = backend.notes_view().await?;
    view.toggle_create_form();
    if let Some(form) = view.create_form_mut() {
        form.set_title(title);
        form.set_content(content);
    }

    let Some(note) = view.submit_create_form().await? else {
        return Err(CliError::EmptyEditedContent);
    };
    println!("{}", note.id);
    Ok(())
}
