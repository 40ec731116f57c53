use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Portal Router Module
///
/// Pet owners' self-service pages. Every handler takes `AuthUser`, so data is always scoped
/// to the signed-in owner.
pub fn portal_routes() -> Router<AppState> {
    Router::new()
        // GET /portal?success=true
        // The owner's appointments in date order.
        .route("/portal", get(handlers::portal_home))
        // GET/POST /portal/book
        // Booking form and submission. New appointments start as `pending`.
        .route(
            "/portal/book",
            get(handlers::booking_page).post(handlers::book_appointment),
        )
        // GET /portal/pets
        .route("/portal/pets", get(handlers::my_pets))
}
