use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages any visitor may reach. The guard still runs in front of them so `/` can see
/// whether the viewer is signed in.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Sends signed-in viewers to the dashboard and everyone else to the login page.
        .route("/", get(handlers::index))
        // GET/POST /login
        // The form reads `?message=` for feedback; the POST sets the session cookie.
        .route("/login", get(handlers::login_page).post(handlers::login))
        // POST /register
        // Creates the account upstream; the user confirms by email.
        .route("/register", post(handlers::register))
        // POST /logout
        .route("/logout", post(handlers::logout))
}
