//! Route guard: decides, per request, whether a page renders or the viewer is redirected.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    config::ProfileFailurePolicy,
    models::{AccessTier, Identity},
    repository::Repository,
    session::{self, IdentityProvider},
    tier,
};

pub const LOGIN_PATH: &str = "/login";
/// Home of standard-tier users.
pub const PORTAL_PATH: &str = "/portal";
/// Home of admin-tier users.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// RouteTier
///
/// Minimum access a page requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTier {
    Public,
    Standard,
    Admin,
}

/// Route
///
/// A requested logical path tagged with the tier it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub tier: RouteTier,
}

/// RouteTable
///
/// Prefix rules mapping paths to tiers. The longest matching prefix wins; prefixes only
/// match whole path segments, and unmatched paths are public.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<(String, RouteTier)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restrict(mut self, prefix: &str, tier: RouteTier) -> Self {
        self.rules.push((prefix.trim_end_matches('/').to_string(), tier));
        self
    }

    /// The clinic layout: staff dashboard is admin-only, the owner portal needs a login.
    pub fn clinic() -> Self {
        Self::new()
            .restrict(DASHBOARD_PATH, RouteTier::Admin)
            .restrict(PORTAL_PATH, RouteTier::Standard)
    }

    pub fn tier_for(&self, path: &str) -> RouteTier {
        self.rules
            .iter()
            .filter(|(prefix, _)| {
                path == prefix.as_str()
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, tier)| *tier)
            .unwrap_or(RouteTier::Public)
    }

    pub fn route(&self, path: &str) -> Route {
        Route {
            path: path.to_string(),
            tier: self.tier_for(path),
        }
    }
}

/// GuardState
///
/// Where the viewer stands when the request arrives. Computed fresh for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    AuthenticatedStandard,
    AuthenticatedAdmin,
}

/// Decision
///
/// Terminal outcome of the guard. Both variants end the guard's part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Render,
    Redirect(&'static str),
}

/// decide
///
/// The guard's transition table.
pub fn decide(state: GuardState, tier: RouteTier) -> Decision {
    match (state, tier) {
        (_, RouteTier::Public) => Decision::Render,
        (GuardState::Unauthenticated, _) => Decision::Redirect(LOGIN_PATH),
        (GuardState::AuthenticatedStandard, RouteTier::Standard) => Decision::Render,
        (GuardState::AuthenticatedStandard, RouteTier::Admin) => Decision::Redirect(PORTAL_PATH),
        (GuardState::AuthenticatedAdmin, _) => Decision::Render,
    }
}

/// Viewer
///
/// The resolved identity and tier of the current request. Inserted into the request
/// extensions when a page is rendered so handlers receive it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Viewer {
    pub identity: Option<Identity>,
    pub tier: AccessTier,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn member(identity: Identity, tier: AccessTier) -> Self {
        Self {
            identity: Some(identity),
            tier,
        }
    }

    pub fn state(&self) -> GuardState {
        match (&self.identity, self.tier) {
            (None, _) => GuardState::Unauthenticated,
            (Some(_), AccessTier::Standard) => GuardState::AuthenticatedStandard,
            (Some(_), AccessTier::Admin) => GuardState::AuthenticatedAdmin,
        }
    }

    /// Where "home" is for this viewer.
    pub fn home(&self) -> &'static str {
        match self.state() {
            GuardState::Unauthenticated => LOGIN_PATH,
            GuardState::AuthenticatedStandard => PORTAL_PATH,
            GuardState::AuthenticatedAdmin => DASHBOARD_PATH,
        }
    }
}

/// resolve_viewer
///
/// Session resolver, then tier lookup: at most two sequential external calls.
pub async fn resolve_viewer(
    provider: &dyn IdentityProvider,
    repo: &dyn Repository,
    token: Option<&str>,
    policy: ProfileFailurePolicy,
) -> Viewer {
    let Some(identity) = session::resolve(provider, token).await else {
        return Viewer::anonymous();
    };

    match tier::tier_with_policy(repo, &identity, policy).await {
        Some(tier) => Viewer::member(identity, tier),
        None => Viewer::anonymous(),
    }
}

/// route_guard
///
/// Middleware wrapping every page route. Resolves the viewer from the request's credential,
/// classifies the path and either hands the request (with the `Viewer` attached) to the
/// page handler or answers with a redirect.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = state.routes.route(request.uri().path());
    let token = session::credential_token(request.headers(), &state.config.session_cookie);

    let viewer = resolve_viewer(
        state.identity.as_ref(),
        state.repo.as_ref(),
        token.as_deref(),
        state.config.profile_failure_policy,
    )
    .await;

    match decide(viewer.state(), route.tier) {
        Decision::Render => {
            tracing::debug!(path = %route.path, state = ?viewer.state(), "render");
            request.extensions_mut().insert(viewer);
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(path = %route.path, state = ?viewer.state(), to = target, "redirect");
            Redirect::to(target).into_response()
        }
    }
}
