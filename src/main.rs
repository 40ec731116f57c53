use clinic_portal::{
    AppState, GatewayState, IdentityState, JwtIdentityProvider, RouteTable, SupabaseAuthClient,
    config::{AppConfig, Env, IdentityCheck},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, connects to Postgres, wires the auth service and
/// serves the router.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise crate-level debug.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clinic_portal=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 4. Auth service. Sign-in always goes to Supabase; token checks may stay local.
    let supabase = Arc::new(SupabaseAuthClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
    ));
    let gateway = supabase.clone() as GatewayState;
    let identity = match config.identity_check {
        IdentityCheck::Remote => supabase as IdentityState,
        IdentityCheck::Jwt => Arc::new(JwtIdentityProvider::new(&config.jwt_secret)) as IdentityState,
    };

    tracing::info!(
        identity_check = ?config.identity_check,
        profile_failure_policy = ?config.profile_failure_policy,
        "auth configured"
    );

    // 5. State, router and server
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        identity,
        gateway,
        config,
        routes: Arc::new(RouteTable::clinic()),
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
