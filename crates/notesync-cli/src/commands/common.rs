use std::env;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Duration, Utc};
use notesync_core::config::ClientConfig;
use notesync_core::remote::{SupabaseRestClient, SupabaseStorageClient};
use notesync_core::session::SessionContext;
use notesync_core::views::NotesViewModel;
use notesync_core::Note;
use serde::Serialize;

use crate::auth::{auth_client_for_profile, CliAuthClient};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Everything a command needs to talk to the backend for one profile.
pub struct Backend {
    pub profile_name: String,
    pub config: ClientConfig,
    pub auth: CliAuthClient,
    pub session: SessionContext,
}

impl Backend {
    /// Resolve the profile, build the clients and restore its session.
    pub async fn connect(global_profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(global_profile);
        let config = resolve_client_config(&profiles, &profile_name)?;
        let auth = auth_client_for_profile(&profile_name, &config)
            .map_err(|error| CliError::Auth(error.to_string()))?;
        let session = SessionContext::initialize(&auth).await;

        Ok(Self {
            profile_name,
            config,
            auth,
            session,
        })
    }

    pub fn rest(&self) -> Result<SupabaseRestClient, CliError> {
        Ok(SupabaseRestClient::new(&self.config, self.session.clone())?)
    }

    pub fn storage(&self) -> Result<SupabaseStorageClient, CliError> {
        Ok(SupabaseStorageClient::new(&self.config, self.session.clone())?)
    }

    /// Mounted and loaded notes view for the signed-in user.
    pub async fn notes_view(&self) -> Result<NotesViewModel<SupabaseRestClient>, CliError> {
        let mut view = NotesViewModel::mount(self.rest()?, &self.session).map_err(CliError::Redirect)?;
        view.load().await?;
        Ok(view)
    }
}

/// Profile settings first, then `SUPABASE_URL`/`SUPABASE_ANON_KEY`.
pub fn resolve_client_config(
    profiles: &CliProfilesConfig,
    profile_name: &str,
) -> Result<ClientConfig, CliError> {
    if let Some(config) = profiles
        .profile(profile_name)
        .map(|profile| profile.client_config())
        .transpose()?
        .flatten()
    {
        return Ok(config);
    }

    ClientConfig::from_env()?.ok_or_else(|| {
        CliError::Config(format!(
            "Profile '{profile_name}' is not configured. Run `notesync config init --profile {profile_name}` or set SUPABASE_URL and SUPABASE_ANON_KEY."
        ))
    })
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub color: &'static str,
    pub created_at: DateTime<Utc>,
    pub relative_time: String,
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now = Utc::now();
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let short_id = id.chars().take(13).collect::<String>();
            let title = truncate_chars(&note.title, 24);
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.created_at, now);
            format!("{short_id:<13}  {title:<24}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now = Utc::now();

    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        color: note.card_color().name(),
        created_at: note.created_at,
        relative_time: format_relative_time(note.created_at, now),
    }
}

pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.content.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_chars)
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = value.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// Coarse age label: "just now", then minutes, hours, days, weeks, months, years.
pub fn format_relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = (now - created_at).max(Duration::zero());
    let days = age.num_days();
    if age.num_minutes() < 1 {
        "just now".to_string()
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if days < 1 {
        format!("{}h ago", age.num_hours())
    } else if days < 7 {
        format!("{days}d ago")
    } else if days < 30 {
        format!("{}w ago", days / 7)
    } else if days < 365 {
        format!("{}mo ago", days / 30)
    } else {
        format!("{}y ago", days / 365)
    }
}

pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = edit_in_editor("")? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
pub fn confirm(prompt: &str) -> Result<bool, CliError> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Open `$VISUAL`/`$EDITOR` on a scratch file seeded with `initial`.
///
/// Returns the trimmed text, or `None` when the file was left blank.
pub fn edit_in_editor(initial: &str) -> Result<Option<String>, CliError> {
    let scratch = scratch_note_path();
    std::fs::write(&scratch, initial)?;

    let outcome = run_editor(&preferred_editor(), &scratch);
    let edited = std::fs::read_to_string(&scratch);
    let _ = std::fs::remove_file(&scratch);

    outcome?;
    Ok(normalize_content(&edited?))
}

/// Editor commands may carry arguments, e.g. `code --wait`.
fn run_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| CliError::EditorFailed("empty EDITOR command".into()))?;

    let status = Command::new(program).args(words).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

fn preferred_editor() -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .find_map(|key| env::var(key).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn scratch_note_path() -> PathBuf {
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    env::temp_dir().join(format!("notesync-note-{}-{stamp}.md", std::process::id()))
}
