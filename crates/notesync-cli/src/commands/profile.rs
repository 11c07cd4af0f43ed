use std::path::Path;

use notesync_core::media::AvatarUpload;
use notesync_core::models::Profile;
use notesync_core::remote::{SupabaseRestClient, SupabaseStorageClient};
use notesync_core::routes::Route;
use notesync_core::views::{ProfileEntry, ProfileViewModel, PROFILE_SAVED_MESSAGE};

use crate::cli::ProfileCommands;
use crate::commands::common::Backend;
use crate::error::CliError;

type CliProfileView = ProfileViewModel<SupabaseRestClient, SupabaseStorageClient>;

pub async fn run_profile(
    command: ProfileCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let backend = Backend::connect(global_profile).await?;
    match command {
        ProfileCommands::Show { id, json } => {
            let (_, profile) = open_profile(&backend, id.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                for line in format_profile_lines(&profile) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        ProfileCommands::Save { name, avatar } => {
            run_profile_save(&backend, name.as_deref(), avatar.as_deref()).await
        }
    }
}

async fn run_profile_save(
    backend: &Backend,
    name: Option<&str>,
    avatar_path: Option<&Path>,
) -> Result<(), CliError> {
    let (mut view, current) = open_profile(backend, None).await?;

    if let Some(path) = avatar_path {
        let file = AvatarUpload::from_path(path)?;
        if !view.stage_avatar(file) {
            let reason = view.error().unwrap_or("Invalid avatar image").to_string();
            return Err(CliError::InvalidAvatar(reason));
        }
    }

    let full_name = name.unwrap_or(&current.full_name);
    let saved = view.save(full_name, None).await?;
    println!("{}", view.message().unwrap_or(PROFILE_SAVED_MESSAGE));
    for line in format_profile_lines(&saved) {
        println!("{line}");
    }
    Ok(())
}

/// Enter the profile route, following a redirect to the caller's own profile.
async fn open_profile(
    backend: &Backend,
    requested_id: Option<&str>,
) -> Result<(CliProfileView, Profile), CliError> {
    let own_id = backend
        .session
        .current_user()
        .map(|user| user.id)
        .ok_or_else(|| CliError::Redirect(Route::SignIn { message: None }))?;
    let mut view = ProfileViewModel::mount(backend.rest()?, backend.storage()?, &backend.session);

    let requested_id = requested_id.unwrap_or(&own_id).to_string();
    match view.enter(&requested_id).await? {
        ProfileEntry::Ready(profile) => Ok((view, profile)),
        ProfileEntry::Redirect(Route::Profile { id }) => {
            eprintln!("Profile {requested_id} is not yours; showing your own profile instead.");
            match view.enter(&id).await? {
                ProfileEntry::Ready(profile) => Ok((view, profile)),
                ProfileEntry::Redirect(route) => Err(CliError::Redirect(route)),
            }
        }
        ProfileEntry::Redirect(route) => Err(CliError::Redirect(route)),
    }
}

pub fn format_profile_lines(profile: &Profile) -> Vec<String> {
    let name = if profile.full_name.trim().is_empty() {
        "(not set)"
    } else {
        profile.full_name.as_str()
    };
    vec![
        format!("Name:    {name}"),
        format!(
            "Avatar:  {}",
            profile.avatar_url.as_deref().unwrap_or("(none)")
        ),
        format!(
            "Updated: {}",
            profile.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ]
}
