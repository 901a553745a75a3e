//! Auth/session provider contract.
//!
//! The hosted identity service is an external collaborator; the controller
//! only asks it who is signed in. [`StaticAuth`] is a local stand-in whose
//! user id is the one forwarded to the server in the user header.

use std::fmt::Debug;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use strum::{Display, EnumString};
use tracing::info;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: AuthUser,
    pub access_token: Option<String>,
}

/// Third-party identity providers offered on the sign-in screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OAuthProvider {
    Google,
}

#[async_trait]
pub trait AuthProvider: Send + Sync + Debug {
    fn current_user(&self) -> Option<AuthUser>;

    fn session(&self) -> Option<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ClientError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, ClientError>;

    async fn sign_out(&self) -> Result<(), ClientError>;

    async fn reset_password(&self, email: &str) -> Result<(), ClientError>;

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<(), ClientError>;
}

/// Trusts whatever identity it is given. Suitable behind an auth proxy or
/// for local use; the email doubles as the user id.
#[derive(Debug, Default)]
pub struct StaticAuth {
    user: RwLock<Option<AuthUser>>,
}

impl StaticAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        let user = AuthUser { id: user_id.into(), email: None };
        Self { user: RwLock::new(Some(user)) }
    }

    fn set(&self, user: Option<AuthUser>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.user.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn session(&self) -> Option<AuthSession> {
        self.current_user().map(|user| AuthSession { user, access_token: None })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ClientError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::Auth("email and password are required".into()));
        }
        let user = AuthUser { id: email.to_owned(), email: Some(email.to_owned()) };
        self.set(Some(user.clone()));
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, ClientError> {
        self.sign_in(email, password).await
    }

    async fn sign_out(&self) -> Result<(), ClientError> {
        self.set(None);
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), ClientError> {
        info!(email, "password reset requested");
        Ok(())
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<(), ClientError> {
        Err(ClientError::Auth(format!("{provider} sign-in needs a hosted identity provider")))
    }
}
