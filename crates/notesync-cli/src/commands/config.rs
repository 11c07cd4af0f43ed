use std::env;

use notesync_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfilesConfig, ProfileSetting};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            supabase_url,
            supabase_anon_key,
            avatar_bucket,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            supabase_url,
            supabase_anon_key,
            avatar_bucket,
            no_activate,
        ),
    }
}

/// Pick the first set value: explicit flag, then environment, then existing.
pub fn merge_setting(
    explicit: Option<String>,
    env_key: &str,
    existing: Option<String>,
) -> Option<String> {
    normalize_text_option(explicit)
        .or_else(|| normalize_text_option(env::var(env_key).ok()))
        .or_else(|| normalize_text_option(existing))
}

pub fn run_config_init(
    profile_name: Option<&str>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    avatar_bucket: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing_profile = config.profile(&profile_name).cloned().unwrap_or_default();

    let profile = config.profile_mut_or_default(&profile_name);
    for (setting, explicit) in [
        (ProfileSetting::SupabaseUrl, supabase_url),
        (ProfileSetting::SupabaseAnonKey, supabase_anon_key),
        (ProfileSetting::AvatarBucket, avatar_bucket),
    ] {
        let existing = existing_profile.get(setting).map(ToString::to_string);
        profile.set(setting, merge_setting(explicit, setting.env_key(), existing));
    }

    profile.client_config()?;
    let missing_fields = profile.missing_fields();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Profile '{profile_name}' initialized at {}", path.display());

    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `notesync auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}
