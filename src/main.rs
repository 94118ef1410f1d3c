mod api;
mod board;
mod gate;
mod live;
mod persist;
mod settings;

use api::{AppState, SharedState};
use axum::{
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use settings::Settings;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("prio_server=info,tower_http=warn")),
        )
        .init();

    let config = Settings::load();

    // ── Boot the Board ─────────────────────────────────────────
    let save_file = persist::SaveFile::open(&config.save_file)
        .expect("Failed to open save file");

    let mut board = save_file.load_board()
        .expect("Failed to load board from save file");

    // Seed demo tasks if this is a fresh save file
    let seeded = save_file.seed_demo_tasks(&mut board, Utc::now())
        .expect("Failed to seed demo tasks");
    if seeded > 0 {
        info!(count = seeded, "seeded demo tasks");
    }

    info!(
        academic = board.academic.len(),
        secondary = board.secondary.len(),
        revision = board.revision,
        "board loaded"
    );

    // ── Broadcast channel ──────────────────────────────────────
    let (events_tx, _) = broadcast::channel::<String>(256);

    // ── Shared state ───────────────────────────────────────────
    let state: SharedState = Arc::new(AppState {
        board: std::sync::RwLock::new(board),
        save_file,
        events_tx,
        week_start: config.week_start,
    });

    // ── Router ─────────────────────────────────────────────────
    let app = Router::new()
        // Task CRUD (REST, JSON)
        .route(
            "/api/academic-tasks",
            get(api::list_academic).post(api::create_academic),
        )
        .route(
            "/api/academic-tasks/:id",
            patch(api::update_academic).delete(api::delete_academic),
        )
        .route("/api/academic-tasks/:id/toggle", post(api::toggle_academic))
        .route(
            "/api/secondary-tasks",
            get(api::list_secondary).post(api::create_secondary),
        )
        .route(
            "/api/secondary-tasks/:id",
            patch(api::update_secondary).delete(api::delete_secondary),
        )
        .route("/api/secondary-tasks/:id/toggle", post(api::toggle_secondary))
        // Derived dashboard view
        .route("/api/dashboard", get(api::dashboard))
        // Live updates (JSON events — the dashboard's push path)
        .route("/api/events", get(live::ws_handler))
        // Static files
        .fallback_service(ServeDir::new("static").append_index_html_on_directories(true))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // ── Start ──────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .expect("invalid bind address");
    info!(%addr, "server running");
    info!("  Dashboard: GET http://localhost:{}/api/dashboard", config.port);
    info!("  Events WS: ws://localhost:{}/api/events", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
