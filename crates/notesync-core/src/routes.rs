//! User-facing navigation targets.

use std::borrow::Cow;
use std::fmt;

/// A view the user can be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    /// Sign-in view with an optional transient banner.
    SignIn {
        message: Option<String>,
    },
    SignUp,
    ResetPassword,
    Notes,
    Profile {
        id: String,
    },
    Policy,
}

impl Route {
    /// Sign-in view carrying a banner message.
    pub fn sign_in_with_message(message: impl Into<String>) -> Self {
        Self::SignIn {
            message: Some(message.into()),
        }
    }

    /// Path with percent-encoded parameters.
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::SignIn { message: None } => "/sign-in".to_string(),
            Self::SignIn {
                message: Some(message),
            } => format!("/sign-in?message={}", urlencoding::encode(message)),
            Self::SignUp => "/sign-up".to_string(),
            Self::ResetPassword => "/reset-password".to_string(),
            Self::Notes => "/notes".to_string(),
            Self::Profile { id } => format!("/profile/{}", urlencoding::encode(id)),
            Self::Policy => "/policy".to_string(),
        }
    }

    /// Parse a path produced by [`Route::path`].
    pub fn parse(path: &str) -> Option<Self> {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        match path {
            "/" => Some(Self::Home),
            "/sign-in" => Some(Self::SignIn {
                message: query_param(query, "message"),
            }),
            "/sign-up" => Some(Self::SignUp),
            "/reset-password" => Some(Self::ResetPassword),
            "/notes" => Some(Self::Notes),
            "/policy" => Some(Self::Policy),
            other => {
                let id = other.strip_prefix("/profile/")?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                let id = urlencoding::decode(id).ok()?.into_owned();
                Some(Self::Profile { id })
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(Cow::into_owned)
        })
        .filter(|value| !value.trim().is_empty())
}
