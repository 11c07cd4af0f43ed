use crate::commands::common::{format_note_lines, note_to_list_item, Backend, NoteListItem};
use crate::error::CliError;

pub async fn run_list(as_json: bool, global_profile: Option<&str>) -> Result<(), CliError> {
    let backend = Backend::connect(global_profile).await?;
    let view = backend.notes_view().await?;

    if as_json {
        let json_items = view
            .notes()
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if view.is_empty() {
        println!("No notes yet. Create one with `notesync add --title <title> <content>`.");
    } else {
        for line in format_note_lines(view.notes()) {
            println!("{line}");
        }
        println!("{}", view.count_label());
    }

    Ok(())
}
