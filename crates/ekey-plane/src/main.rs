//! E-Key Plane Server Binary
//!
//! Runs the issuance HTTP service and the delegated verification endpoint.

use std::env;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ekey_core::{LocalKeyProvider, SigningAlgorithm, SystemClock};
use ekey_plane::{
    create_router, AppState, Issuer, MemoryUsageStore, PlaneConfig, StaticCertExtractor,
    TracingAuditSink, Verifier,
};

#[tokio::main]
async fn main() {
    // Initialize logging
    let log_level = env::var("EKEY_LOG_LEVEL")
        .unwrap_or_else(|_| "info".into())
        .parse()
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Configuration
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()
        .expect("PORT must be a valid port number");

    let issuer_url =
        env::var("ISSUER_URL").unwrap_or_else(|_| format!("http://localhost:{}", port));

    let audience = env::var("EKEY_AUDIENCE").unwrap_or_else(|_| issuer_url.clone());

    let signing_alg: SigningAlgorithm = env::var("SIGNING_ALG")
        .unwrap_or_else(|_| "ES256".into())
        .parse()
        .expect("SIGNING_ALG must be ES256 or EdDSA");

    // Signing key
    // TODO: load key material from EKEY_SIGNING_KEY_PATH or a KMS provider
    let kid = format!("ekey-{}", uuid::Uuid::new_v4());
    let key_provider = Arc::new(LocalKeyProvider::generate(&kid, signing_alg));

    let config = PlaneConfig::new(&issuer_url, &audience).with_signing_alg(signing_alg);
    let clock = Arc::new(SystemClock);
    let usage = Arc::new(MemoryUsageStore::with_capacity(
        config.usage_store_capacity,
    ));

    info!(
        kid = %key_provider.kid(),
        issuer_url = %issuer_url,
        alg = %signing_alg,
        port = port,
        "Starting E-Key plane server"
    );

    // Create application state
    let state = Arc::new(AppState {
        issuer: Issuer::new(key_provider.clone(), clock.clone(), config.clone()),
        verifier: Verifier::new(
            key_provider,
            usage,
            clock,
            Arc::new(TracingAuditSink),
            Arc::new(StaticCertExtractor::none()),
            config,
        ),
        issuer_url,
        signing_alg: signing_alg.to_string(),
    });

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "E-Key plane listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
