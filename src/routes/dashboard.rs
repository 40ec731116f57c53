use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Dashboard Router Module
///
/// Staff pages for managing owners, pets, visits and appointments. Form submissions
/// redirect back to a list page (Post/Redirect/Get), carrying failures as `?error=`.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // Counts plus the five latest visits.
        .route("/dashboard", get(handlers::dashboard))
        // --- Owners ---
        .route(
            "/dashboard/owners",
            get(handlers::owners_page).post(handlers::create_owner),
        )
        .route("/dashboard/owners/add", get(handlers::owner_form))
        // --- Pets ---
        .route(
            "/dashboard/pets",
            get(handlers::pets_page).post(handlers::create_pet),
        )
        .route("/dashboard/pets/add", get(handlers::add_pet_page))
        // POST /dashboard/pets/delete
        // Visits of the pet go with it (ON DELETE CASCADE).
        .route("/dashboard/pets/delete", post(handlers::delete_pet))
        // --- Visits ---
        .route(
            "/dashboard/visits",
            get(handlers::visits_page).post(handlers::create_visit),
        )
        .route("/dashboard/visits/add", get(handlers::add_visit_page))
        // --- Appointments ---
        .route(
            "/dashboard/appointments",
            get(handlers::appointments_page).post(handlers::create_appointment),
        )
        .route(
            "/dashboard/appointments/add",
            get(handlers::add_appointment_page),
        )
        .route(
            "/dashboard/appointments/status",
            post(handlers::update_appointment_status),
        )
}
