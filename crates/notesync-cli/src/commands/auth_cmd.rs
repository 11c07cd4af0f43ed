use notesync_core::routes::Route;
use notesync_core::views::{NavShell, PasswordResetForm, SignInForm, SignUpForm};

use crate::auth::clear_stored_session;
use crate::cli::AuthCommands;
use crate::commands::common::Backend;
use crate::config_profiles::CliProfilesConfig;
use crate::error::{redirect_message, CliError};

pub async fn run_auth(command: AuthCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        AuthCommands::Signup {
            email,
            password,
            confirm_password,
        } => {
            let backend = Backend::connect(global_profile).await?;
            let mut form = SignUpForm::new(email, password, confirm_password);
            match form.submit(&backend.auth, &backend.session).await {
                Some(Route::Notes) => println!(
                    "Signed up and signed in profile '{}' as {}",
                    backend.profile_name,
                    signed_in_label(&backend)
                ),
                Some(route) => println!("{}", redirect_message(&route)),
                None => return Err(form_error(form.error(), "Sign-up failed")),
            }
            Ok(())
        }
        AuthCommands::Login { email, password } => {
            let backend = Backend::connect(global_profile).await?;
            let mut form = SignInForm::default().with_credentials(email, password);
            if form.submit(&backend.auth, &backend.session).await.is_none() {
                return Err(form_error(form.error(), "Sign-in failed"));
            }
            println!(
                "Signed in profile '{}' as {}",
                backend.profile_name,
                signed_in_label(&backend)
            );
            Ok(())
        }
        AuthCommands::Status => {
            let backend = match Backend::connect(global_profile).await {
                Ok(backend) => backend,
                Err(error) => match error.config_message() {
                    Some(message) => {
                        println!("{message}");
                        return Ok(());
                    }
                    None => return Err(error),
                },
            };

            let Some(session) = backend.session.current_session() else {
                println!("Profile '{}' is not signed in.", backend.profile_name);
                return Ok(());
            };
            let mut nav = NavShell::mount(backend.rest()?, &backend.session);
            nav.refresh().await;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!(
                "Profile '{}' is signed in as {} <{}> (expires_at={})",
                backend.profile_name,
                nav.display_name(),
                email_label,
                session.expires_at
            );
            Ok(())
        }
        AuthCommands::Logout => {
            let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = profiles.resolve_profile_name(global_profile);

            match Backend::connect(Some(&profile_name)).await {
                Ok(backend) => {
                    let mut nav = NavShell::mount(backend.rest()?, &backend.session);
                    nav.sign_out(&backend.auth).await;
                }
                Err(error) => match error.config_message() {
                    Some(message) => tracing::debug!("Skipping remote sign-out: {}", message),
                    None => return Err(error),
                },
            }
            clear_stored_session(&profile_name).map_err(|error| CliError::Auth(error.to_string()))?;

            println!("Signed out profile '{profile_name}'");
            Ok(())
        }
        AuthCommands::ResetPassword { email } => {
            let backend = Backend::connect(global_profile).await?;
            let mut form = PasswordResetForm::new(email);
            if !form.submit(&backend.auth).await {
                return Err(form_error(form.error(), "Password reset failed"));
            }
            println!("{}", form.message().unwrap_or_default());
            Ok(())
        }
    }
}

fn signed_in_label(backend: &Backend) -> String {
    backend
        .session
        .current_user()
        .and_then(|user| user.email)
        .unwrap_or_else(|| "(no email)".to_string())
}

fn form_error(error: Option<&str>, fallback: &str) -> CliError {
    CliError::Auth(error.unwrap_or(fallback).to_string())
}
