use crate::{
    config::ProfileFailurePolicy,
    error::GuardError,
    models::{AccessTier, Identity},
    repository::Repository,
};

/// tier_of
///
/// `admin` iff the identity's profile row says `role = admin`; `standard` for any other
/// role and when there is no row at all. A failed lookup is returned, not defaulted.
pub async fn tier_of(repo: &dyn Repository, identity: &Identity) -> Result<AccessTier, GuardError> {
    let profile = repo.get_profile(identity.id).await?;
    Ok(profile
        .map(|p| AccessTier::from_role(&p.role))
        .unwrap_or(AccessTier::Standard))
}

/// tier_with_policy
///
/// Applies the configured failure policy to `tier_of`. `None` means the identity is
/// denied outright and must be handled as unauthenticated.
pub async fn tier_with_policy(
    repo: &dyn Repository,
    identity: &Identity,
    policy: ProfileFailurePolicy,
) -> Option<AccessTier> {
    match tier_of(repo, identity).await {
        Ok(tier) => Some(tier),
        Err(e) => match policy {
            ProfileFailurePolicy::Open => {
                tracing::warn!(user_id = %identity.id, error = %e, "falling back to standard tier");
                Some(AccessTier::Standard)
            }
            ProfileFailurePolicy::Closed => {
                tracing::warn!(user_id = %identity.id, error = %e, "denying identity");
                None
            }
        },
    }
}
