//! Process-wide session context and the gate protected views mount.
//!
//! `SessionContext` is created once at startup and cloned into every view
//! that needs the signed-in user. It owns a `watch` channel holding the
//! latest [`AuthStateChange`]; the context is the only writer and every
//! subscriber sees the most recent value (last write wins).

use std::sync::Arc;

use tokio::sync::watch;

use crate::auth::{AuthProvider, AuthResult, AuthSession, AuthUser};
use crate::routes::Route;

/// Kind of auth state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// State restored at startup.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A published auth state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthEvent,
    pub session: Option<AuthSession>,
}

/// Shared, injectable session state.
#[derive(Clone, Debug)]
pub struct SessionContext {
    state: Arc<watch::Sender<AuthStateChange>>,
}

impl SessionContext {
    /// A context with no signed-in user.
    pub fn signed_out() -> Self {
        Self::with_session(None)
    }

    /// A context seeded with an already known session.
    pub fn with_session(session: Option<AuthSession>) -> Self {
        let (sender, _) = watch::channel(AuthStateChange {
            event: AuthEvent::InitialSession,
            session,
        });
        Self {
            state: Arc::new(sender),
        }
    }

    /// Restore the current session from the auth service.
    ///
    /// Fails closed: an error while restoring is logged and the context
    /// starts signed out.
    pub async fn initialize<A: AuthProvider>(auth: &A) -> Self {
        match auth.restore_session().await {
            Ok(session) => {
                tracing::debug!(
                    "Session restored (authenticated: {})",
                    session.is_some()
                );
                Self::with_session(session)
            }
            Err(error) => {
                tracing::warn!("Failed to restore session, continuing signed out: {}", error);
                Self::signed_out()
            }
        }
    }

    pub fn current_session(&self) -> Option<AuthSession> {
        self.state.borrow().session.clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Bearer token for row and object requests.
    pub fn access_token(&self) -> Option<String> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    /// Publish a transition to every subscriber.
    pub fn publish(&self, event: AuthEvent, session: Option<AuthSession>) {
        tracing::debug!("Auth state change: {:?}", event);
        self.state.send_replace(AuthStateChange { event, session });
    }

    /// Sign in and publish the new session.
    pub async fn sign_in<A: AuthProvider>(
        &self,
        auth: &A,
        email: &str,
        password: &str,
    ) -> AuthResult<AuthSession> {
        let session = auth.sign_in(email, password).await?;
        self.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Restore the session again and publish what changed: new tokens for
    /// the same user are `TokenRefreshed`.
    pub async fn refresh<A: AuthProvider>(&self, auth: &A) -> AuthResult<Option<AuthSession>> {
        let restored = auth.restore_session().await?;
        match (self.current_session(), &restored) {
            (None, None) => {}
            (Some(_), None) => self.publish(AuthEvent::SignedOut, None),
            (Some(previous), Some(next)) if previous.user.id == next.user.id => {
                if previous.access_token != next.access_token {
                    self.publish(AuthEvent::TokenRefreshed, restored.clone());
                }
            }
            (_, Some(_)) => self.publish(AuthEvent::SignedIn, restored.clone()),
        }
        Ok(restored)
    }

    /// Sign out. Local state is cleared even when the remote call fails;
    /// that failure is still returned.
    pub async fn sign_out<A: AuthProvider>(&self, auth: &A) -> AuthResult<()> {
        let Some(session) = self.current_session() else {
            self.publish(AuthEvent::SignedOut, None);
            return Ok(());
        };

        let result = auth.sign_out(&session).await;
        if let Err(error) = &result {
            tracing::warn!("Remote sign-out failed: {}", error);
        }
        self.publish(AuthEvent::SignedOut, None);
        result
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.state.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.receiver_count()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::signed_out()
    }
}

/// A live subscription to auth state changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    receiver: watch::Receiver<AuthStateChange>,
}

impl AuthSubscription {
    /// Latest state, marking it as seen.
    pub fn latest(&mut self) -> AuthStateChange {
        self.receiver.borrow_and_update().clone()
    }

    /// Unseen change, if one was published since the last look.
    pub fn poll_change(&mut self) -> Option<AuthStateChange> {
        if self.receiver.has_changed().unwrap_or(false) {
            Some(self.latest())
        } else {
            None
        }
    }

    /// Wait for the next change. `None` once the context is gone.
    pub async fn changed(&mut self) -> Option<AuthStateChange> {
        self.receiver.changed().await.ok()?;
        Some(self.latest())
    }

    pub fn unsubscribe(self) {}
}

/// Guard for views that need a signed-in user.
#[derive(Debug)]
pub struct SessionGate {
    subscription: AuthSubscription,
    user: Option<AuthUser>,
}

impl SessionGate {
    /// Subscribe to the context and take the current user.
    pub fn mount(context: &SessionContext) -> Self {
        let mut subscription = context.subscribe();
        let user = subscription.latest().session.map(|session| session.user);
        Self { subscription, user }
    }

    /// The signed-in user, or where to send an anonymous visitor.
    pub fn check(&self) -> Result<AuthUser, Route> {
        self.user
            .clone()
            .ok_or(Route::SignIn { message: None })
    }

    pub const fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    /// Apply a change published elsewhere. Returns the event when there was one.
    pub fn sync(&mut self) -> Option<AuthEvent> {
        let change = self.subscription.poll_change()?;
        self.user = change.session.map(|session| session.user);
        Some(change.event)
    }

    /// Wait for the next change and apply it.
    pub async fn changed(&mut self) -> Option<AuthEvent> {
        let change = self.subscription.changed().await?;
        self.user = change.session.map(|session| session.user);
        Some(change.event)
    }

    pub fn unmount(self) {}
}
