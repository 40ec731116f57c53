use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::{AuthGateway, AuthSession},
    error::AuthError,
    models::Identity,
    session::IdentityProvider,
};

/// SupabaseUser
///
/// Minimal view of a GoTrue user object.
#[derive(Deserialize)]
struct SupabaseUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<SupabaseUser> for Identity {
    fn from(user: SupabaseUser) -> Self {
        Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

/// SupabaseTokenResponse
///
/// Body of `/auth/v1/token?grant_type=password`.
#[derive(Deserialize)]
struct SupabaseTokenResponse {
    access_token: String,
    expires_in: u64,
    user: SupabaseUser,
}

/// SupabaseAuthClient
///
/// HTTP client for Supabase Auth (GoTrue). Every call carries the project's anon key in the
/// `apikey` header; calls made on behalf of a user add their bearer token.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn rejected(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        AuthError::Rejected { status, body }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    /// get_identity
    ///
    /// `GET /auth/v1/user`. 401/403 are the service saying "not a valid session" and map
    /// to `Ok(None)`; any other non-success status is a lookup failure.
    async fn get_identity(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user = response
                    .json::<SupabaseUser>()
                    .await
                    .map_err(|e| AuthError::Malformed(e.to_string()))?;
                Ok(Some(user.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(Self::rejected(response).await),
        }
    }
}

#[async_trait]
impl AuthGateway for SupabaseAuthClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let token = response
                    .json::<SupabaseTokenResponse>()
                    .await
                    .map_err(|e| AuthError::Malformed(e.to_string()))?;
                Ok(AuthSession {
                    access_token: token.access_token,
                    expires_in: token.expires_in,
                    identity: token.user.into(),
                })
            }
            // GoTrue answers a bad email/password pair with 400 invalid_grant.
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(AuthError::InvalidCredentials)
            }
            _ => Err(Self::rejected(response).await),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let url = format!(
            "{}?redirect_to={}",
            self.endpoint("signup"),
            urlencoding::encode(redirect_to)
        );

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejected(response).await)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::rejected(response).await)
        }
    }
}
