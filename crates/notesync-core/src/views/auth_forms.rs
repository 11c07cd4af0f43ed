//! Sign-up, sign-in and password reset forms.

use crate::auth::{AuthProvider, SignUpOutcome};
use crate::routes::Route;
use crate::session::{AuthEvent, SessionContext};

/// Banner shown on sign-in after a sign-up that needs confirmation.
pub const CONFIRM_EMAIL_MESSAGE: &str = "Check your email to confirm your account";
/// Reported once a recovery email was requested.
pub const RESET_EMAIL_MESSAGE: &str = "Check your email for a password reset link";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords don't match";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    error: Option<String>,
}

impl SignUpForm {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
            error: None,
        }
    }

    /// Register the account. Returns where to go, or `None` with an inline
    /// error.
    ///
    /// When the service confirms the account immediately, the new session is
    /// published and the route is `Notes` rather than the sign-in banner.
    pub async fn submit<A: AuthProvider>(
        &mut self,
        auth: &A,
        context: &SessionContext,
    ) -> Option<Route> {
        if self.password != self.confirm_password {
            self.error = Some(PASSWORD_MISMATCH_MESSAGE.to_string());
            return None;
        }

        match auth.sign_up(&self.email, &self.password).await {
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.error = None;
                Some(Route::sign_in_with_message(CONFIRM_EMAIL_MESSAGE))
            }
            Ok(SignUpOutcome::SignedIn(session)) => {
                self.error = None;
                context.publish(AuthEvent::SignedIn, Some(session));
                Some(Route::Notes)
            }
            Err(error) => {
                tracing::warn!("Sign-up failed: {}", error);
                self.error = Some(error.to_string());
                None
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    banner: Option<String>,
    error: Option<String>,
}

impl SignInForm {
    /// Form for a route, carrying its banner message when it has one.
    pub fn for_route(route: &Route) -> Self {
        let banner = match route {
            Route::SignIn { message } => message.clone(),
            _ => None,
        };
        Self {
            banner,
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.email = email.into();
        self.password = password.into();
        self
    }

    /// Sign in and publish the session. Returns `Notes` on success.
    pub async fn submit<A: AuthProvider>(
        &mut self,
        auth: &A,
        context: &SessionContext,
    ) -> Option<Route> {
        match context.sign_in(auth, &self.email, &self.password).await {
            Ok(_) => {
                self.error = None;
                self.banner = None;
                Some(Route::Notes)
            }
            Err(error) => {
                tracing::warn!("Sign-in failed: {}", error);
                self.error = Some(error.to_string());
                None
            }
        }
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordResetForm {
    pub email: String,
    message: Option<String>,
    error: Option<String>,
}

impl PasswordResetForm {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    /// Request a recovery email. Returns true once it was sent.
    pub async fn submit<A: AuthProvider>(&mut self, auth: &A) -> bool {
        match auth.request_password_reset(&self.email).await {
            Ok(()) => {
                self.error = None;
                self.message = Some(RESET_EMAIL_MESSAGE.to_string());
                true
            }
            Err(error) => {
                tracing::warn!("Password reset request failed: {}", error);
                self.message = None;
                self.error = Some(error.to_string());
                false
            }
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::MemoryAuthProvider;

    #[tokio::test]
    async fn mismatched_passwords_never_reach_the_service() {
        let auth = MemoryAuthProvider::new();
        let context = SessionContext::signed_out();
        let mut form = SignUpForm::new("a@example.com", "secret123", "secret124");

        assert_eq!(form.submit(&auth, &context).await, None);
        assert_eq!(form.error(), Some(PASSWORD_MISMATCH_MESSAGE));
        assert!(auth.sign_in("a@example.com", "secret123").await.is_err());
    }

    #[tokio::test]
    async fn sign_up_needing_confirmation_redirects_with_banner() {
        let auth = MemoryAuthProvider::new();
        let context = SessionContext::signed_out();
        let mut form = SignUpForm::new("a@example.com", "secret123", "secret123");

        let route = form.submit(&auth, &context).await.unwrap();
        assert_eq!(route, Route::sign_in_with_message(CONFIRM_EMAIL_MESSAGE));
        assert_eq!(SignInForm::for_route(&route).banner(), Some(CONFIRM_EMAIL_MESSAGE));
        assert!(!context.is_authenticated());
    }

    #[tokio::test]
    async fn auto_confirmed_sign_up_goes_to_notes() {
        let auth = MemoryAuthProvider::auto_confirm();
        let context = SessionContext::signed_out();
        let mut form = SignUpForm::new("a@example.com", "secret123", "secret123");

        assert_eq!(form.submit(&auth, &context).await, Some(Route::Notes));
        assert!(context.is_authenticated());
    }

    #[tokio::test]
    async fn sign_in_error_is_shown_inline() {
        let auth = MemoryAuthProvider::auto_confirm();
        auth.sign_up("a@example.com", "secret123").await.unwrap();
        let context = SessionContext::signed_out();

        let mut form = SignInForm::default().with_credentials("a@example.com", "nope");
        assert_eq!(form.submit(&auth, &context).await, None);
        assert!(form.error().unwrap().contains("Invalid login credentials"));

        form.password = "secret123".to_string();
        assert_eq!(form.submit(&auth, &context).await, Some(Route::Notes));
        assert_eq!(form.error(), None);
        assert!(context.is_authenticated());
    }

    #[tokio::test]
    async fn password_reset_reports_email_sent() {
        let auth = MemoryAuthProvider::new();
        let mut form = PasswordResetForm::new("a@example.com");
        assert!(form.submit(&auth).await);
        assert_eq!(form.message(), Some(RESET_EMAIL_MESSAGE));
        assert_eq!(auth.reset_requests().unwrap(), vec!["a@example.com".to_string()]);

        let mut invalid = PasswordResetForm::new("not-an-email");
        assert!(!invalid.submit(&auth).await);
        assert!(invalid.error().is_some());
    }
}
