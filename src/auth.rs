use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AuthError,
    guard::{LOGIN_PATH, Viewer},
    models::{AccessTier, Identity},
};

/// AuthUser Extractor Result
///
/// The authenticated viewer of a guarded page. Handlers take it as an argument to get the
/// user's id and tier without reading any ambient state.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub tier: AccessTier,
}

/// AuthUser Extractor Implementation
///
/// Reads the `Viewer` that `guard::route_guard` attached to the request. It performs no
/// lookups of its own: resolution happens exactly once per request, in the guard.
///
/// Rejection: redirects to the login page when the request carries no identity (a handler
/// mounted outside the guard, or a public page visited anonymously).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts
            .extensions
            .get::<Viewer>()
            .ok_or_else(|| Redirect::to(LOGIN_PATH))?;

        let identity = viewer
            .identity
            .as_ref()
            .ok_or_else(|| Redirect::to(LOGIN_PATH))?;

        Ok(AuthUser {
            id: identity.id,
            email: identity.email.clone(),
            tier: viewer.tier,
        })
    }
}

/// AuthSession
///
/// What a successful password sign-in hands back.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    // Lifetime of the access token, in seconds.
    pub expires_in: u64,
    pub identity: Identity,
}

/// AuthGateway
///
/// Account operations delegated to the external auth service. Separate from
/// `IdentityProvider` because a deployment may verify tokens locally while still
/// signing users in remotely.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Fails with `AuthError::InvalidCredentials` for a wrong email/password pair.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Creates the account; the service emails a confirmation link pointing at `redirect_to`.
    async fn sign_up(&self, email: &str, password: &str, redirect_to: &str)
    -> Result<(), AuthError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// GatewayState
///
/// Shared handle to the auth gateway.
pub type GatewayState = Arc<dyn AuthGateway>;
