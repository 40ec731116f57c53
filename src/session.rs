use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AuthError, GuardError},
    models::Identity,
};

/// IdentityProvider
///
/// The external credential check behind the session resolver: turns an opaque token into
/// an identity. `Ok(None)` means the token was looked at and refused (expired, forged,
/// revoked); `Err` means the check itself could not be carried out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_identity(&self, token: &str) -> Result<Option<Identity>, AuthError>;
}

/// IdentityState
///
/// Shared handle to the configured identity provider.
pub type IdentityState = Arc<dyn IdentityProvider>;

/// try_resolve
///
/// Session resolution with the failure kept visible. A missing or blank token resolves to
/// `Ok(None)` without calling out.
pub async fn try_resolve(
    provider: &dyn IdentityProvider,
    token: Option<&str>,
) -> Result<Option<Identity>, GuardError> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    Ok(provider.get_identity(token).await?)
}

/// resolve
///
/// `resolve(token) -> Identity | None`. Lookup errors are logged and read as "no identity";
/// this never fails the caller.
pub async fn resolve(provider: &dyn IdentityProvider, token: Option<&str>) -> Option<Identity> {
    match try_resolve(provider, token).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "treating request as unauthenticated");
            None
        }
    }
}

/// credential_token
///
/// Pulls the access token from the named session cookie, falling back to an
/// `Authorization: Bearer` header for API clients.
pub fn credential_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

/// session_cookie
///
/// `Set-Cookie` value storing a freshly issued access token.
pub fn session_cookie(name: &str, token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// cleared_cookie
///
/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn cleared_cookie(name: &str, secure: bool) -> String {
    session_cookie(name, "", 0, secure)
}

/// Claims
///
/// The part of a Supabase-issued access token the local check relies on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth.users id, also the key of public.profiles.
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    /// Audience: Supabase stamps signed-in sessions with "authenticated".
    pub aud: String,
    pub exp: usize,
    pub iat: usize,
}

/// Audience carried by tokens of signed-in Supabase users.
pub const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// JwtIdentityProvider
///
/// Verifies access tokens locally (HS256 signature, expiry, audience) with the project's
/// JWT secret instead of a round trip to GoTrue. It cannot see server-side revocation.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn get_identity(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(Some(Identity {
                id: data.claims.sub,
                email: data.claims.email.unwrap_or_default(),
            })),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("access token expired"),
                    other => tracing::debug!(reason = ?other, "access token rejected"),
                }
                Ok(None)
            }
        }
    }
}
