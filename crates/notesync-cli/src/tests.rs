use chrono::{Duration, Utc};
use clap::Parser;
use notesync_core::models::Profile;
use notesync_core::routes::Route;
use notesync_core::{Note, NoteId};
use pretty_assertions::assert_eq;

use crate::cli::{AuthCommands, Cli, Commands, CompletionShell, ProfileCommands};
use crate::commands::common::{
    default_editor, format_note_lines, format_relative_time, is_affirmative, normalize_content,
    normalize_note_identifier, note_preview, note_to_list_item, resolve_client_config,
};
use crate::commands::completions::render_completions;
use crate::commands::profile::format_profile_lines;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::{redirect_message, CliError};

fn note(title: &str, content: &str) -> Note {
    Note {
        id: NoteId::new(),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        content: content.to_string(),
        created_at: Utc::now() - Duration::minutes(5),
    }
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn normalize_note_identifier_rejects_blank() {
    assert!(matches!(
        normalize_note_identifier("  "),
        Err(CliError::EmptyNoteId)
    ));
    assert_eq!(normalize_note_identifier(" 0190 ").unwrap(), "0190");
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_units() {
    let now = Utc::now();
    assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
    assert_eq!(format_relative_time(now - Duration::minutes(2), now), "2m ago");
    assert_eq!(format_relative_time(now - Duration::hours(2), now), "2h ago");
    assert_eq!(format_relative_time(now - Duration::days(3), now), "3d ago");
    assert_eq!(format_relative_time(now - Duration::days(400), now), "1y ago");
    assert_eq!(format_relative_time(now + Duration::minutes(5), now), "just now");
}

#[test]
fn note_preview_truncates_with_ellipsis() {
    let note = note(
        "Long",
        "This is a very long sentence that should be shortened",
    );
    assert_eq!(note_preview(&note, 20), "This is a very lo...");
}

#[test]
fn note_lines_show_short_id_title_and_age() {
    let note = note("Groceries", "Milk, eggs");
    let lines = format_note_lines(std::slice::from_ref(&note));
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with(&note.id.to_string()[..13]));
    assert!(lines[0].contains("Groceries"));
    assert!(lines[0].contains("Milk, eggs"));
    assert!(lines[0].ends_with("5m ago"));
}

#[test]
fn list_item_carries_card_color() {
    let item = note_to_list_item(&note("Groceries", "Milk, eggs"));
    assert_eq!(item.color, "red");
    assert_eq!(item.title, "Groceries");

    let json = serde_json::to_value(&item).unwrap();
    assert_eq!(json["content"], "Milk, eggs");
}

#[test]
fn affirmative_answers() {
    assert!(is_affirmative("y\n"));
    assert!(is_affirmative(" YES "));
    assert!(!is_affirmative(""));
    assert!(!is_affirmative("no"));
}

#[test]
fn redirect_messages_are_user_facing() {
    assert_eq!(
        redirect_message(&Route::sign_in_with_message(
            "Check your email to confirm your account"
        )),
        "Check your email to confirm your account"
    );
    assert!(redirect_message(&Route::SignIn { message: None }).contains("notesync auth login"));
    assert_eq!(
        CliError::Redirect(Route::Notes).to_string(),
        "Continue at /notes"
    );
}

#[test]
fn profile_lines_mark_unset_fields() {
    let lines = format_profile_lines(&Profile::empty("user-1"));
    assert_eq!(lines[0], "Name:    (not set)");
    assert_eq!(lines[1], "Avatar:  (none)");
}

#[test]
fn client_config_comes_from_profile() {
    let mut profiles = CliProfilesConfig::default();
    profiles.profiles.insert(
        "work".to_string(),
        CliProfile {
            supabase_url: Some("https://work.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            avatar_bucket: None,
        },
    );

    let config = resolve_client_config(&profiles, "work").unwrap();
    assert_eq!(config.rest_url(), "https://work.supabase.co/rest/v1");
}

#[test]
fn invalid_profile_url_is_a_config_error() {
    let mut profiles = CliProfilesConfig::default();
    profiles.profiles.insert(
        "broken".to_string(),
        CliProfile {
            supabase_url: Some("work.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            avatar_bucket: None,
        },
    );

    let error = resolve_client_config(&profiles, "broken").unwrap_err();
    assert!(matches!(
        error,
        CliError::Core(notesync_core::Error::Config(_))
    ));
    assert_eq!(
        error.config_message(),
        Some("Supabase URL must include http:// or https://")
    );
}

#[test]
fn config_message_covers_both_error_layers() {
    assert_eq!(
        CliError::Config("Profile 'work' is not configured".to_string()).config_message(),
        Some("Profile 'work' is not configured")
    );
    assert_eq!(
        CliError::Core(notesync_core::Error::Config("SUPABASE_ANON_KEY is missing".to_string()))
            .config_message(),
        Some("SUPABASE_ANON_KEY is missing")
    );
    assert_eq!(CliError::EmptyNoteId.config_message(), None);
}

#[test]
fn cli_parses_note_commands() {
    let cli = Cli::try_parse_from([
        "notesync", "add", "--title", "Groceries", "Milk,", "eggs",
    ])
    .unwrap();
    let Some(Commands::Add { title, content }) = cli.command else {
        panic!("expected add command");
    };
    assert_eq!(title, "Groceries");
    assert_eq!(content, vec!["Milk,".to_string(), "eggs".to_string()]);

    let cli = Cli::try_parse_from(["notesync", "--profile", "work", "delete", "0190", "--yes"])
        .unwrap();
    assert_eq!(cli.profile.as_deref(), Some("work"));
    assert!(matches!(
        cli.command,
        Some(Commands::Delete { ref id, yes: true }) if id == "0190"
    ));
}

#[test]
fn cli_parses_auth_and_profile_commands() {
    let cli = Cli::try_parse_from([
        "notesync",
        "auth",
        "signup",
        "--email",
        "a@example.com",
        "--password",
        "secret123",
        "--confirm-password",
        "secret123",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Auth {
            command: AuthCommands::Signup { .. }
        })
    ));

    let cli = Cli::try_parse_from(["notesync", "profile", "save", "--name", "Ada"]).unwrap();
    let Some(Commands::Profile {
        command: ProfileCommands::Save { name, avatar },
    }) = cli.command
    else {
        panic!("expected profile save");
    };
    assert_eq!(name.as_deref(), Some("Ada"));
    assert_eq!(avatar, None);

    assert!(Cli::try_parse_from(["notesync", "add", "no title"]).is_err());
}

#[test]
fn completions_accept_powershell_name() {
    let cli = Cli::try_parse_from(["notesync", "completions", "powershell"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Completions {
            shell: CompletionShell::PowerShell,
            output: None,
        })
    ));
}

#[test]
fn completions_mention_binary_name() {
    for shell in [
        CompletionShell::Bash,
        CompletionShell::Zsh,
        CompletionShell::Fish,
        CompletionShell::PowerShell,
    ] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("notesync"));
    }
}
