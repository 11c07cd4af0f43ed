//! Navigation shell: who is signed in and how to show them.

use crate::auth::AuthProvider;
use crate::models::ProfileSummary;
use crate::remote::ProfileStore;
use crate::routes::Route;
use crate::session::{AuthEvent, SessionContext, SessionGate};

/// What to render in the avatar slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarDisplay {
    Image(String),
    /// Uppercase first letter of the email.
    Initial(char),
    Blank,
}

/// Navigation bar state following the session context.
#[derive(Debug)]
pub struct NavShell<P> {
    profiles: P,
    context: SessionContext,
    gate: SessionGate,
    summary: Option<ProfileSummary>,
}

impl<P: ProfileStore> NavShell<P> {
    pub fn mount(profiles: P, context: &SessionContext) -> Self {
        Self {
            profiles,
            context: context.clone(),
            gate: SessionGate::mount(context),
            summary: None,
        }
    }

    /// Reload the profile summary for the current user.
    pub async fn refresh(&mut self) {
        let Some(user_id) = self.gate.user().map(|user| user.id.clone()) else {
            self.summary = None;
            return;
        };
        self.summary = match self.profiles.fetch_profile(&user_id).await {
            Ok(Some(profile)) => Some(ProfileSummary::from(&profile)),
            Ok(None) => {
                tracing::debug!("No profile row yet for {}", user_id);
                None
            }
            Err(error) => {
                tracing::warn!("Failed to fetch profile summary: {}", error);
                None
            }
        };
    }

    /// Apply a pending auth change, refetching or clearing the summary.
    pub async fn sync(&mut self) -> Option<AuthEvent> {
        let event = self.gate.sync()?;
        match event {
            AuthEvent::SignedOut => self.summary = None,
            AuthEvent::InitialSession | AuthEvent::SignedIn | AuthEvent::TokenRefreshed => {
                self.refresh().await;
            }
        }
        Some(event)
    }

    pub fn is_signed_in(&self) -> bool {
        self.gate.user().is_some()
    }

    pub const fn summary(&self) -> Option<&ProfileSummary> {
        self.summary.as_ref()
    }

    /// Profile name, else the email's local part, else empty.
    pub fn display_name(&self) -> String {
        if let Some(summary) = &self.summary {
            let name = summary.full_name.trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
        self.gate
            .user()
            .and_then(|user| user.email_local_part())
            .unwrap_or_default()
            .to_string()
    }

    pub fn avatar(&self) -> AvatarDisplay {
        if let Some(url) = self
            .summary
            .as_ref()
            .and_then(|summary| summary.avatar_url.as_deref())
            .filter(|url| !url.trim().is_empty())
        {
            return AvatarDisplay::Image(url.to_string());
        }
        self.gate
            .user()
            .and_then(|user| user.email.as_deref())
            .and_then(|email| email.chars().next())
            .map_or(AvatarDisplay::Blank, |first| {
                AvatarDisplay::Initial(first.to_uppercase().next().unwrap_or(first))
            })
    }

    /// Sign out everywhere and go home. Remote failures are logged; local
    /// state is cleared regardless.
    pub async fn sign_out<A: AuthProvider>(&mut self, auth: &A) -> Route {
        if let Err(error) = self.context.sign_out(auth).await {
            tracing::warn!("Sign-out did not reach the auth service: {}", error);
        }
        self.gate.sync();
        self.summary = None;
        Route::Home
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::MemoryAuthProvider;
    use crate::models::Profile;
    use crate::remote::MemoryBackend;

    async fn signed_in(email: &str) -> (MemoryAuthProvider, SessionContext) {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up(email, "secret123").await.unwrap();
        let context = SessionContext::initialize(&auth).await;
        (auth, context)
    }

    #[tokio::test]
    async fn falls_back_to_email_without_profile() {
        let (_, context) = signed_in("ada@example.com").await;
        let mut nav = NavShell::mount(MemoryBackend::new(), &context);
        nav.refresh().await;

        assert!(nav.summary().is_none());
        assert_eq!(nav.display_name(), "ada");
        assert_eq!(nav.avatar(), AvatarDisplay::Initial('A'));
    }

    #[tokio::test]
    async fn prefers_profile_name_and_avatar() {
        let (_, context) = signed_in("ada@example.com").await;
        let user_id = context.current_user().unwrap().id;
        let backend = MemoryBackend::new();
        backend
            .upsert_profile(&Profile {
                full_name: "Ada Lovelace".to_string(),
                avatar_url: Some("https://cdn.example.com/a.png".to_string()),
                ..Profile::empty(user_id)
            })
            .await
            .unwrap();

        let mut nav = NavShell::mount(backend, &context);
        nav.refresh().await;
        assert_eq!(nav.display_name(), "Ada Lovelace");
        assert_eq!(
            nav.avatar(),
            AvatarDisplay::Image("https://cdn.example.com/a.png".to_string())
        );
    }

    #[tokio::test]
    async fn follows_sign_in_and_sign_out() {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up("bob@example.com", "secret123").await.unwrap();
        let context = SessionContext::signed_out();
        let mut nav = NavShell::mount(MemoryBackend::new(), &context);
        assert_eq!(nav.display_name(), "");
        assert_eq!(nav.avatar(), AvatarDisplay::Blank);

        context
            .sign_in(&auth, "bob@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(nav.sync().await, Some(AuthEvent::SignedIn));
        assert_eq!(nav.display_name(), "bob");

        assert_eq!(nav.sign_out(&auth).await, Route::Home);
        assert!(!nav.is_signed_in());
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn sign_out_elsewhere_clears_shell() {
        let (auth, context) = signed_in("ada@example.com").await;
        let mut nav = NavShell::mount(MemoryBackend::new(), &context);
        context.sign_out(&auth).await.unwrap();

        assert_eq!(nav.sync().await, Some(AuthEvent::SignedOut));
        assert_eq!(nav.display_name(), "");
    }
}
