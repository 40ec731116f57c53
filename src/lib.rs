use axum::{Router, extract::FromRef, http::HeaderName, middleware, routing::get};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control: session resolution, tier lookup and the per-request guard.
pub mod auth;
pub mod guard;
pub mod session;
pub mod supabase;
pub mod tier;

// Clinic data and page handlers.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Page routers (public, portal, dashboard).
pub mod routes;
use routes::{dashboard, portal, public};

// --- Public Re-exports ---

pub use auth::{AuthGateway, AuthUser, GatewayState};
pub use config::AppConfig;
pub use guard::{RouteTable, Viewer};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use session::{IdentityProvider, IdentityState, JwtIdentityProvider};
pub use supabase::SupabaseAuthClient;

/// ApiDoc
///
/// OpenAPI document for every page and form endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::login_page, handlers::login, handlers::register,
        handlers::logout, handlers::portal_home, handlers::booking_page,
        handlers::book_appointment, handlers::my_pets, handlers::dashboard,
        handlers::owners_page, handlers::owner_form, handlers::create_owner,
        handlers::pets_page, handlers::add_pet_page, handlers::create_pet,
        handlers::delete_pet, handlers::visits_page, handlers::add_visit_page,
        handlers::create_visit, handlers::appointments_page,
        handlers::add_appointment_page, handlers::create_appointment,
        handlers::update_appointment_status
    ),
    components(
        schemas(
            models::Identity, models::AccessTier, models::Owner, models::Pet,
            models::PetWithOwner, models::PetOption, models::Visit, models::VisitRecord,
            models::Appointment, models::AppointmentRecord, models::AppointmentStatus,
            models::CredentialsForm, models::CreateOwnerForm, models::CreatePetForm,
            models::DeletePetForm, models::CreateVisitForm, models::BookAppointmentForm,
            models::UpdateAppointmentStatusForm, models::LoginPage, models::PortalHome,
            models::BookingPage, models::MyPetsPage, models::DashboardSummary,
            models::OwnersPage, models::FormPage, models::PetsPage, models::AddPetPage,
            models::VisitsPage, models::AddVisitPage, models::AddAppointmentPage,
            models::AppointmentsPage,
        )
    ),
    tags(
        (name = "clinic-portal", description = "Veterinary clinic portal")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable services for every request. Each collaborator sits behind a trait
/// object so tests can swap in mocks.
#[derive(Clone)]
pub struct AppState {
    /// Clinic data and the `profiles` table.
    pub repo: RepositoryState,
    /// Turns a credential into an identity (remote lookup or local JWT check).
    pub identity: IdentityState,
    /// Sign-in, sign-up and sign-out against the auth service.
    pub gateway: GatewayState,
    pub config: AppConfig,
    /// Which paths need which tier.
    pub routes: Arc<RouteTable>,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for GatewayState {
    fn from_ref(app_state: &AppState) -> GatewayState {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routers, puts the route guard in front of every page and adds the
/// observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // Every page, public ones included, passes through the guard.
    let pages = Router::new()
        .merge(public::public_routes())
        .merge(portal::portal_routes())
        .merge(dashboard::dashboard_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::route_guard,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness probe; never touches the auth service.
        .route("/health", get(|| async { "ok" }))
        .merge(pages)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
