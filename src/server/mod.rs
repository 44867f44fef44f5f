use std::future::Future;

use axum::{
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{
    config::Config,
    store::{Store, StoreDropGuard},
};

pub mod cmd;
pub mod extract;

/// One handler per method and path.
pub fn router(store: Store) -> Router {
    Router::new()
        .route("/health", get(cmd::health))
        .route("/session/:id", delete(cmd::delete_session))
        .route(
            "/session/:id/offer",
            get(cmd::get_offer).post(cmd::post_offer),
        )
        .route(
            "/session/:id/answer",
            get(cmd::get_answer).post(cmd::post_answer),
        )
        .route(
            "/session/:id/candidate/:role",
            get(cmd::get_candidates).post(cmd::post_candidate),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// Serve the relay on `listener` until `shutdown` completes.
///
/// When `shutdown` resolves the server stops accepting connections, lets
/// in-flight requests finish, and the session purge task is stopped.
pub async fn run(
    config: Config,
    listener: TcpListener,
    shutdown: impl Future + Send + 'static,
) {
    let db_holder = StoreDropGuard::new(&config);
    let app = router(db_holder.store());
    log_banner(&listener, &db_holder.store());

    let res = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutting down");
        })
        .await;
    if let Err(err) = res {
        error!(cause = %err, "server failed");
    }
    // Stops the purge task.
    drop(db_holder);
}

fn log_banner(listener: &TcpListener, store: &Store) {
    match listener.local_addr() {
        Ok(addr) => info!("Signaling relay listening on {}", addr),
        Err(err) => error!(cause = %err, "listener has no local address"),
    }
    match store.ttl() {
        Some(ttl) => info!("Idle sessions expire after {:?}", ttl),
        None => info!("Session expiry disabled"),
    }
    info!("Endpoints:");
    info!("  GET    /health");
    info!("  GET    /session/<id>/offer[?sdp=...]   - set or get the offer");
    info!("  POST   /session/<id>/offer             - set the offer");
    info!("  GET    /session/<id>/answer[?sdp=...]  - set or get the answer");
    info!("  POST   /session/<id>/answer            - set the answer");
    info!("  GET    /session/<id>/candidate/<role>  - list, or add with ?candidate=...&mid=...");
    info!("  POST   /session/<id>/candidate/<role>  - add a candidate");
    info!("  DELETE /session/<id>                   - delete the session");
}
