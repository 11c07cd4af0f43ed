//! Profile view: lazy row creation, avatar upload and save.

use chrono::Utc;

use crate::auth::AuthUser;
use crate::media::{avatar_object_path, validate_image, AvatarUpload};
use crate::models::Profile;
use crate::remote::{ObjectStore, ProfileStore};
use crate::routes::Route;
use crate::session::{SessionContext, SessionGate};
use crate::util::unix_timestamp_millis_now;
use crate::{Error, Result};

/// Confirmation shown after a successful save.
pub const PROFILE_SAVED_MESSAGE: &str = "Profile updated successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilePhase {
    Loading,
    Ready,
    Saving,
}

/// Outcome of entering the profile route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEntry {
    Ready(Profile),
    Redirect(Route),
}

/// State behind the profile view.
#[derive(Debug)]
pub struct ProfileViewModel<P, O> {
    profiles: P,
    objects: O,
    gate: SessionGate,
    phase: ProfilePhase,
    profile: Option<Profile>,
    staged_avatar: Option<AvatarUpload>,
    error: Option<String>,
    message: Option<String>,
}

impl<P: ProfileStore, O: ObjectStore> ProfileViewModel<P, O> {
    pub fn mount(profiles: P, objects: O, context: &SessionContext) -> Self {
        Self {
            profiles,
            objects,
            gate: SessionGate::mount(context),
            phase: ProfilePhase::Loading,
            profile: None,
            staged_avatar: None,
            error: None,
            message: None,
        }
    }

    /// Enter `/profile/{requested_id}`.
    ///
    /// Anonymous visitors go to sign-in and a foreign id is swapped for the
    /// signed-in user's own.
    pub async fn enter(&mut self, requested_id: &str) -> Result<ProfileEntry> {
        self.sync_session();
        let user = match self.gate.check() {
            Ok(user) => user,
            Err(route) => return Ok(ProfileEntry::Redirect(route)),
        };
        if requested_id != user.id {
            tracing::debug!("Profile {} is not the signed-in user's, redirecting", requested_id);
            return Ok(ProfileEntry::Redirect(Route::Profile { id: user.id }));
        }

        self.phase = ProfilePhase::Loading;
        let result = self.fetch_profile(&user.id).await;
        self.phase = ProfilePhase::Ready;
        match result {
            Ok(profile) => {
                self.profile = Some(profile.clone());
                self.error = None;
                Ok(ProfileEntry::Ready(profile))
            }
            Err(error) => {
                tracing::error!("Failed to load profile: {}", error);
                self.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Apply auth changes. State loaded for another user, or for nobody,
    /// is dropped.
    fn sync_session(&mut self) {
        self.gate.sync();
        let current = self.gate.user().map(|user| user.id.as_str());
        let stale = self
            .profile
            .as_ref()
            .is_some_and(|profile| Some(profile.id.as_str()) != current);
        if stale || current.is_none() {
            if stale {
                tracing::debug!("Signed-in user changed, dropping loaded profile");
            }
            self.profile = None;
            self.staged_avatar = None;
            self.message = None;
        }
    }

    /// Look the profile up, creating an empty row on first visit.
    pub async fn fetch_profile(&self, user_id: &str) -> Result<Profile> {
        if let Some(profile) = self.profiles.fetch_profile(user_id).await? {
            return Ok(profile);
        }

        tracing::info!("Creating profile row for {}", user_id);
        self.create_profile(user_id).await?;
        self.profiles
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("profile {user_id}")))
    }

    /// Insert an empty profile: blank name, no avatar.
    pub async fn create_profile(&self, user_id: &str) -> Result<Profile> {
        self.profiles.insert_profile(&Profile::empty(user_id)).await
    }

    /// Validate and keep a picked file for the next save. A rejection becomes
    /// the visible error.
    pub fn stage_avatar(&mut self, file: AvatarUpload) -> bool {
        match validate_image(&file) {
            Ok(()) => {
                self.staged_avatar = Some(file);
                self.error = None;
                true
            }
            Err(rejection) => {
                self.staged_avatar = None;
                self.error = Some(rejection.to_string());
                false
            }
        }
    }

    /// Upload an avatar under a fresh timestamped name and return its public
    /// URL. Superseded avatars stay in the bucket.
    pub async fn upload_avatar(&self, user_id: &str, file: &AvatarUpload) -> Result<String> {
        validate_image(file)?;
        let path = avatar_object_path(user_id, file, unix_timestamp_millis_now());
        self.objects
            .upload(&path, &file.bytes, &file.content_type, true)
            .await?;
        Ok(self.objects.public_url(&path))
    }

    /// Save the name and, when given or staged, a new avatar.
    ///
    /// The avatar is uploaded before the row is written. On failure the error
    /// is shown and the previous profile is kept.
    pub async fn save(&mut self, full_name: &str, avatar: Option<AvatarUpload>) -> Result<Profile> {
        self.sync_session();
        let Ok(user) = self.gate.check() else {
            let error = Error::NotAuthenticated;
            tracing::error!("Failed to save profile: {}", error);
            self.error = Some(error.to_string());
            return Err(error);
        };
        let avatar = avatar.or_else(|| self.staged_avatar.clone());

        self.phase = ProfilePhase::Saving;
        self.message = None;
        let result = self.write_profile(&user, full_name, avatar.as_ref()).await;
        self.phase = ProfilePhase::Ready;

        match result {
            Ok(saved) => {
                self.staged_avatar = None;
                self.error = None;
                self.message = Some(PROFILE_SAVED_MESSAGE.to_string());
                self.profile = Some(saved.clone());
                match self.fetch_profile(&user.id).await {
                    Ok(fresh) => self.profile = Some(fresh),
                    Err(error) => tracing::warn!("Failed to refresh profile after save: {}", error),
                }
                Ok(self.profile.clone().unwrap_or(saved))
            }
            Err(error) => {
                tracing::error!("Failed to save profile: {}", error);
                self.error = Some(error.to_string());
                Err(error)
            }
        }
    }

    async fn write_profile(
        &self,
        user: &AuthUser,
        full_name: &str,
        avatar: Option<&AvatarUpload>,
    ) -> Result<Profile> {
        let avatar_url = match avatar {
            Some(file) => Some(self.upload_avatar(&user.id, file).await?),
            None => match self.profile.as_ref().filter(|profile| profile.id == user.id) {
                Some(profile) => profile.avatar_url.clone(),
                None => self.fetch_profile(&user.id).await?.avatar_url,
            },
        };
        let profile = Profile {
            id: user.id.clone(),
            full_name: full_name.trim().to_string(),
            avatar_url,
            updated_at: Utc::now(),
        };
        self.profiles.upsert_profile(&profile).await
    }

    pub const fn phase(&self) -> ProfilePhase {
        self.phase
    }

    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub const fn staged_avatar(&self) -> Option<&AvatarUpload> {
        self.staged_avatar.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::{AuthProvider, MemoryAuthProvider};
    use crate::remote::MemoryBackend;

    type View = ProfileViewModel<MemoryBackend, MemoryBackend>;

    async fn signed_in() -> (SessionContext, String) {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up("ada@example.com", "secret123").await.unwrap();
        let context = SessionContext::initialize(&auth).await;
        let user_id = context.current_user().unwrap().id;
        (context, user_id)
    }

    async fn alice_then_bob() -> (MemoryAuthProvider, SessionContext) {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up("bob@example.com", "secret123").await.unwrap();
        auth.sign_up("alice@example.com", "secret123").await.unwrap();
        let context = SessionContext::initialize(&auth).await;
        (auth, context)
    }

    fn view(backend: &MemoryBackend, context: &SessionContext) -> View {
        ProfileViewModel::mount(backend.clone(), backend.clone(), context)
    }

    fn png(size: usize) -> AvatarUpload {
        AvatarUpload::new("me.png", "image/png", vec![7; size])
    }

    #[tokio::test]
    async fn anonymous_visit_redirects_to_sign_in() {
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &SessionContext::signed_out());
        assert_eq!(
            profile.enter("anyone").await.unwrap(),
            ProfileEntry::Redirect(Route::SignIn { message: None })
        );
    }

    #[tokio::test]
    async fn foreign_id_redirects_to_own_profile() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        assert_eq!(
            profile.enter("someone-else").await.unwrap(),
            ProfileEntry::Redirect(Route::Profile { id: user_id })
        );
        assert!(backend.stored_profile("someone-else").await.is_none());
    }

    #[tokio::test]
    async fn first_visit_creates_exactly_one_empty_row() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);

        let ProfileEntry::Ready(loaded) = profile.enter(&user_id).await.unwrap() else {
            panic!("expected the profile to load");
        };
        assert_eq!(loaded.full_name, "");
        assert_eq!(loaded.avatar_url, None);
        assert_eq!(profile.phase(), ProfilePhase::Ready);
        assert_eq!(backend.stored_profile(&user_id).await, Some(loaded.clone()));

        let ProfileEntry::Ready(again) = profile.enter(&user_id).await.unwrap() else {
            panic!("expected the profile to load");
        };
        assert_eq!(again, loaded);
    }

    #[tokio::test]
    async fn rejected_avatar_is_shown_and_not_staged() {
        let (context, _) = signed_in().await;
        let mut profile = view(&MemoryBackend::new(), &context);

        assert!(!profile.stage_avatar(AvatarUpload::new("a.txt", "text/plain", vec![1])));
        assert_eq!(
            profile.error(),
            Some("File must be a valid image (JPEG, PNG, GIF, etc.)")
        );
        assert!(profile.staged_avatar().is_none());

        assert!(!profile.stage_avatar(png(6 * 1024 * 1024)));
        assert_eq!(profile.error(), Some("Image size must be less than 5MB"));

        assert!(profile.stage_avatar(png(2 * 1024 * 1024)));
        assert_eq!(profile.error(), None);
    }

    #[tokio::test]
    async fn save_uploads_avatar_then_upserts() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        profile.enter(&user_id).await.unwrap();

        assert!(profile.stage_avatar(png(16)));
        let saved = profile.save("  Ada Lovelace ", None).await.unwrap();

        assert_eq!(saved.full_name, "Ada Lovelace");
        assert_eq!(profile.message(), Some(PROFILE_SAVED_MESSAGE));
        assert!(profile.staged_avatar().is_none());

        let paths = backend.object_paths().await;
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with(&format!("avatars/{user_id}/")));
        assert!(paths[0].ends_with(".png"));
        assert_eq!(saved.avatar_url, Some(format!("memory://profile-images/{}", paths[0])));
        assert_eq!(backend.stored_profile(&user_id).await, Some(saved));

        let object = backend.object(&paths[0]).await.unwrap();
        assert_eq!(object.bytes, vec![7; 16]);
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn save_without_avatar_keeps_existing_url() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        profile.enter(&user_id).await.unwrap();
        let first = profile.save("Ada", Some(png(8))).await.unwrap();

        let second = profile.save("Ada L.", None).await.unwrap();
        assert_eq!(second.avatar_url, first.avatar_url);
        assert_eq!(second.full_name, "Ada L.");
    }

    #[tokio::test]
    async fn failed_upload_leaves_profile_untouched() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        profile.enter(&user_id).await.unwrap();
        let before = backend.stored_profile(&user_id).await;

        backend.fail_uploads(Some("Bucket not found")).await;
        let error = profile.save("Ada", Some(png(8))).await.unwrap_err();

        assert_eq!(profile.error(), Some(error.to_string().as_str()));
        assert_eq!(profile.message(), None);
        assert_eq!(profile.phase(), ProfilePhase::Ready);
        assert_eq!(backend.stored_profile(&user_id).await, before);
        assert_eq!(profile.profile().map(|p| p.full_name.as_str()), Some(""));
    }

    #[tokio::test]
    async fn save_after_user_switch_never_reuses_previous_avatar() {
        let (auth, context) = alice_then_bob().await;
        let alice_id = context.current_user().unwrap().id;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        profile.enter(&alice_id).await.unwrap();
        let alice = profile.save("Alice", Some(png(8))).await.unwrap();
        assert!(profile.stage_avatar(png(4)));

        context.sign_out(&auth).await.unwrap();
        let bob = context
            .sign_in(&auth, "bob@example.com", "secret123")
            .await
            .unwrap()
            .user;

        let saved = profile.save("Bob", None).await.unwrap();
        assert_eq!(saved.id, bob.id);
        assert_eq!(saved.avatar_url, None);
        assert_eq!(backend.stored_profile(&bob.id).await, Some(saved));
        assert_eq!(backend.stored_profile(&alice_id).await, Some(alice));
        assert_eq!(backend.object_paths().await.len(), 1);
    }

    #[tokio::test]
    async fn save_while_signed_out_shows_error() {
        let (auth, context) = alice_then_bob().await;
        let user_id = context.current_user().unwrap().id;
        let backend = MemoryBackend::new();
        let mut profile = view(&backend, &context);
        profile.enter(&user_id).await.unwrap();

        context.sign_out(&auth).await.unwrap();
        let error = profile.save("Alice", None).await.unwrap_err();

        assert!(matches!(error, Error::NotAuthenticated));
        assert_eq!(
            profile.error(),
            Some("User session not found. Please sign in again.")
        );
        assert!(profile.profile().is_none());
        assert_eq!(profile.phase(), ProfilePhase::Ready);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported() {
        let (context, user_id) = signed_in().await;
        let backend = MemoryBackend::new();
        backend.fail_rows(Some("permission denied for table profiles")).await;
        let mut profile = view(&backend, &context);

        assert!(profile.enter(&user_id).await.is_err());
        assert_eq!(profile.error(), Some("permission denied for table profiles"));
        assert!(profile.profile().is_none());
    }
}
