use thiserror::Error;

/// GuardError
///
/// The only two failures the request gate knows about. Neither is ever surfaced to the
/// client: the resolver and the tier lookup log them and the guard still lands on one of
/// its three outcomes (render, redirect to login, redirect to home).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The external credential check could not be completed.
    #[error("identity lookup failed: {0}")]
    AuthLookupFailed(String),
    /// The `profiles` row for a resolved identity could not be read.
    #[error("profile lookup failed: {0}")]
    ProfileLookupFailed(String),
}

/// AuthError
///
/// Failures talking to the external auth service (Supabase GoTrue) or decoding what it sent back.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a status we do not treat as a plain "no".
    #[error("auth service responded with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("malformed auth response: {0}")]
    Malformed(String),
}

/// RepoError
///
/// Wraps database failures so the repository contract stays independent of the driver.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for GuardError {
    fn from(err: AuthError) -> Self {
        GuardError::AuthLookupFailed(err.to_string())
    }
}

impl From<RepoError> for GuardError {
    fn from(err: RepoError) -> Self {
        GuardError::ProfileLookupFailed(err.to_string())
    }
}
