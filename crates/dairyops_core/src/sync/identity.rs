//! Identity seam for gating document sync.
//!
//! Core only needs "an identity is present"; the identity itself is opaque
//! apart from being one document path segment.

use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserIdentity {
    user_id: String,
    anonymous: bool,
}

impl UserIdentity {
    pub fn new(user_id: impl Into<String>, anonymous: bool) -> Self {
        Self {
            user_id: user_id.into(),
            anonymous,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}

/// Identity establishment failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A custom token was supplied but is unusable.
    InvalidToken(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken(reason) => write!(f, "invalid custom token: {reason}"),
        }
    }
}

impl Error for AuthError {}

/// Establishes the user identity that scopes plan documents.
pub trait IdentityProvider {
    /// Signs in with `custom_token` when present, anonymously otherwise.
    fn establish(&self, custom_token: Option<&str>) -> Result<UserIdentity, AuthError>;
}

/// Provider for single-operator installs.
///
/// A custom token is used verbatim as the user id; without one, the
/// configured anonymous id is used so documents survive restarts.
#[derive(Debug, Clone)]
pub struct LocalIdentityProvider {
    anonymous_user_id: String,
}

impl LocalIdentityProvider {
    pub fn new(anonymous_user_id: impl Into<String>) -> Self {
        Self {
            anonymous_user_id: anonymous_user_id.into(),
        }
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn establish(&self, custom_token: Option<&str>) -> Result<UserIdentity, AuthError> {
        let identity = match custom_token {
            Some(token) => {
                let token = token.trim();
                if token.is_empty() {
                    error!("event=auth module=sync status=error error_code=blank_token");
                    return Err(AuthError::InvalidToken("token is blank".to_string()));
                }
                if token.contains('/') {
                    error!("event=auth module=sync status=error error_code=token_has_slash");
                    return Err(AuthError::InvalidToken(
                        "token must not contain `/`".to_string(),
                    ));
                }
                UserIdentity::new(token, false)
            }
            None => UserIdentity::new(self.anonymous_user_id.clone(), true),
        };

        info!(
            "event=auth module=sync status=ok anonymous={}",
            identity.is_anonymous()
        );
        Ok(identity)
    }
}
