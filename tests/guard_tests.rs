mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use clinic_portal::{
    config::{AppConfig, ProfileFailurePolicy},
    create_router,
    guard::{
        self, DASHBOARD_PATH, Decision, GuardState, LOGIN_PATH, PORTAL_PATH, RouteTable,
        RouteTier, Viewer,
    },
    models::AccessTier,
};
use common::*;
use std::sync::Arc;
use tower::ServiceExt;

// --- Transition table ---

#[test]
fn test_public_routes_always_render() {
    for state in [
        GuardState::Unauthenticated,
        GuardState::AuthenticatedStandard,
        GuardState::AuthenticatedAdmin,
    ] {
        assert_eq!(guard::decide(state, RouteTier::Public), Decision::Render);
    }
}

#[test]
fn test_unauthenticated_is_sent_to_login() {
    assert_eq!(
        guard::decide(GuardState::Unauthenticated, RouteTier::Standard),
        Decision::Redirect(LOGIN_PATH)
    );
    assert_eq!(
        guard::decide(GuardState::Unauthenticated, RouteTier::Admin),
        Decision::Redirect(LOGIN_PATH)
    );
}

#[test]
fn test_standard_user_is_sent_home_from_admin_routes() {
    assert_eq!(
        guard::decide(GuardState::AuthenticatedStandard, RouteTier::Standard),
        Decision::Render
    );
    assert_eq!(
        guard::decide(GuardState::AuthenticatedStandard, RouteTier::Admin),
        Decision::Redirect(PORTAL_PATH)
    );
}

#[test]
fn test_admin_renders_everything() {
    for tier in [RouteTier::Public, RouteTier::Standard, RouteTier::Admin] {
        assert_eq!(
            guard::decide(GuardState::AuthenticatedAdmin, tier),
            Decision::Render
        );
    }
}

// --- Route table ---

#[test]
fn test_clinic_route_table() {
    let routes = RouteTable::clinic();

    assert_eq!(routes.tier_for("/dashboard"), RouteTier::Admin);
    assert_eq!(routes.tier_for("/dashboard/owners/add"), RouteTier::Admin);
    assert_eq!(routes.tier_for("/portal"), RouteTier::Standard);
    assert_eq!(routes.tier_for("/portal/book"), RouteTier::Standard);
    assert_eq!(routes.tier_for("/"), RouteTier::Public);
    assert_eq!(routes.tier_for("/login"), RouteTier::Public);
}

#[test]
fn test_prefixes_match_whole_segments_only() {
    let routes = RouteTable::clinic();

    assert_eq!(routes.tier_for("/dashboardx"), RouteTier::Public);
    assert_eq!(routes.tier_for("/portals"), RouteTier::Public);
}

#[test]
fn test_longest_prefix_wins() {
    let routes = RouteTable::new()
        .restrict("/portal", RouteTier::Standard)
        .restrict("/portal/staff/", RouteTier::Admin);

    assert_eq!(routes.tier_for("/portal/book"), RouteTier::Standard);
    assert_eq!(routes.tier_for("/portal/staff"), RouteTier::Admin);
    assert_eq!(routes.tier_for("/portal/staff/notes"), RouteTier::Admin);

    let route = routes.route("/portal/staff/notes");
    assert_eq!(route.path, "/portal/staff/notes");
    assert_eq!(route.tier, RouteTier::Admin);
}

// --- Viewer ---

#[test]
fn test_viewer_state_and_home() {
    let anonymous = Viewer::anonymous();
    assert_eq!(anonymous.state(), GuardState::Unauthenticated);
    assert_eq!(anonymous.home(), LOGIN_PATH);

    let owner = Viewer::member(standard_identity(), AccessTier::Standard);
    assert_eq!(owner.state(), GuardState::AuthenticatedStandard);
    assert_eq!(owner.home(), PORTAL_PATH);

    let staff = Viewer::member(admin_identity(), AccessTier::Admin);
    assert_eq!(staff.state(), GuardState::AuthenticatedAdmin);
    assert_eq!(staff.home(), DASHBOARD_PATH);
}

#[tokio::test]
async fn test_resolve_viewer_without_token_skips_all_lookups() {
    let identity = MockIdentityProvider::clinic();
    let repo = MockRepoControl::default();

    let viewer =
        guard::resolve_viewer(&identity, &repo, None, ProfileFailurePolicy::Open).await;

    assert_eq!(viewer, Viewer::anonymous());
    assert_eq!(identity.call_count(), 0);
    assert_eq!(repo.profile_call_count(), 0);
}

#[tokio::test]
async fn test_resolve_viewer_closed_policy_denies_on_profile_failure() {
    let identity = MockIdentityProvider::clinic();
    let repo = MockRepoControl {
        profile_fails: true,
        ..MockRepoControl::default()
    };

    let open =
        guard::resolve_viewer(&identity, &repo, Some(ADMIN_TOKEN), ProfileFailurePolicy::Open)
            .await;
    assert_eq!(open.state(), GuardState::AuthenticatedStandard);

    let closed =
        guard::resolve_viewer(&identity, &repo, Some(ADMIN_TOKEN), ProfileFailurePolicy::Closed)
            .await;
    assert_eq!(closed.state(), GuardState::Unauthenticated);
}

// --- Full router scenarios ---

fn page(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("theme=dark; sb-access-token={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_login() {
    let app = create_router(clinic_state());

    let response = app.oneshot(page("/dashboard", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_anonymous_portal_redirects_to_login() {
    let app = create_router(clinic_state());

    let response = app.oneshot(page("/portal/book", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_standard_user_on_dashboard_redirects_to_portal() {
    let app = create_router(clinic_state());

    let response = app
        .oneshot(page("/dashboard/owners", Some(STANDARD_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/portal");
}

#[tokio::test]
async fn test_standard_user_renders_portal() {
    let app = create_router(clinic_state());

    let response = app
        .oneshot(page("/portal", Some(STANDARD_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_renders_dashboard_and_portal() {
    let state = clinic_state();

    let dashboard = create_router(state.clone())
        .oneshot(page("/dashboard", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(dashboard.status(), StatusCode::OK);

    let portal = create_router(state)
        .oneshot(page("/portal/pets", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(portal.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let app = create_router(clinic_state());

    let request = Request::builder()
        .uri("/dashboard")
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let app = create_router(clinic_state());

    let response = app
        .oneshot(page("/portal", Some("forged-token")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_root_redirects_by_identity() {
    let state = clinic_state();

    let anonymous = create_router(state.clone())
        .oneshot(page("/", None))
        .await
        .unwrap();
    assert_eq!(location(&anonymous), "/login");

    let signed_in = create_router(state)
        .oneshot(page("/", Some(STANDARD_TOKEN)))
        .await
        .unwrap();
    assert_eq!(location(&signed_in), "/dashboard");
}

#[tokio::test]
async fn test_login_page_renders_for_everyone() {
    let state = clinic_state();

    for token in [None, Some(STANDARD_TOKEN), Some(ADMIN_TOKEN)] {
        let response = create_router(state.clone())
            .oneshot(page("/login?message=hello", token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_identity_service_outage_reads_as_unauthenticated() {
    let state = create_test_state(
        Arc::new(MockRepoControl::default()),
        Arc::new(MockIdentityProvider::failing()),
        Arc::new(MockGateway::clinic()),
    );

    let response = create_router(state)
        .oneshot(page("/portal", Some(STANDARD_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_profile_failure_open_policy_degrades_admin_to_standard() {
    let state = create_test_state(
        Arc::new(MockRepoControl {
            profile_fails: true,
            ..MockRepoControl::default()
        }),
        Arc::new(MockIdentityProvider::clinic()),
        Arc::new(MockGateway::clinic()),
    );

    let dashboard = create_router(state.clone())
        .oneshot(page("/dashboard", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(location(&dashboard), "/portal");

    let portal = create_router(state)
        .oneshot(page("/portal", Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(portal.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_failure_closed_policy_sends_to_login() {
    let config = AppConfig {
        profile_failure_policy: ProfileFailurePolicy::Closed,
        ..AppConfig::default()
    };
    let state = create_test_state_with_config(
        Arc::new(MockRepoControl {
            profile_fails: true,
            ..MockRepoControl::default()
        }),
        Arc::new(MockIdentityProvider::clinic()),
        Arc::new(MockGateway::clinic()),
        config,
    );

    let response = create_router(state)
        .oneshot(page("/portal", Some(ADMIN_TOKEN)))
        .await
        .unwrap();

    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_each_request_resolves_exactly_once() {
    let repo = Arc::new(MockRepoControl::default());
    let identity = Arc::new(MockIdentityProvider::clinic());
    let state = create_test_state(repo.clone(), identity.clone(), Arc::new(MockGateway::clinic()));

    let response = create_router(state)
        .oneshot(page("/dashboard", Some(ADMIN_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(identity.call_count(), 1);
    assert_eq!(repo.profile_call_count(), 1);
}

#[tokio::test]
async fn test_health_bypasses_the_guard() {
    let identity = Arc::new(MockIdentityProvider::failing());
    let state = create_test_state(
        Arc::new(MockRepoControl::default()),
        identity.clone(),
        Arc::new(MockGateway::clinic()),
    );

    let response = create_router(state)
        .oneshot(page("/health", Some(STANDARD_TOKEN)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(identity.call_count(), 0);
}
