use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use gatepass_server::config::Config;
use gatepass_server::credential::CredentialIssuer;
use gatepass_server::handlers::AppState;
use gatepass_server::redemption::GateVerifier;
use gatepass_server::routes::create_routes;
use gatepass_server::store::{GateStore, PgGateStore, TokenStore};

const PURGE_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store: Arc<dyn GateStore> = Arc::new(PgGateStore::new(pool));
    let secret = Arc::new(config.signing_secret);

    let state = AppState {
        issuer: CredentialIssuer::new(secret.clone(), store.clone()),
        verifier: GateVerifier::new(secret, store.clone()),
        token_ttl: config.token_ttl,
    };

    spawn_purge_loop(store);

    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3001));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}

/// Hourly token hygiene. Lookup already excludes expired rows, so this
/// only keeps the table small; a missed tick costs nothing.
fn spawn_purge_loop(store: Arc<dyn GateStore>) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match store.delete_expired().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "Purged expired tokens");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Token purge failed"),
            }
        }
    });
}
