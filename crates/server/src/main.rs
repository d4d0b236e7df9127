use server::config;
use server::db;
use server::routes;
use server::scheduler;

use axum::{routing::{get, post, put}, Extension, Router};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();

    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    scheduler::spawn_daily(
        pool.clone(),
        config.daily_plan_time,
        config.plan_sweep_concurrency,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        // Puzzles
        .route("/api/puzzles/next", get(routes::puzzles::next_puzzle))
        .route("/api/puzzles/grade-line", post(routes::puzzles::grade_line_handler))
        .route("/api/puzzles/grade", post(routes::puzzles::grade_handler))
        .route(
            "/api/puzzles/solution-text/{puzzle_id}",
            get(routes::puzzles::solution_text),
        )
        .route("/api/admin/puzzles/upload", post(routes::puzzles::upload_puzzles))
        // Progress and daily plan
        .route("/api/daily", get(routes::daily::get_daily))
        .route("/api/progress/today", get(routes::progress::get_stats))
        .route("/api/progress/{puzzle_id}", get(routes::progress::get_puzzle_progress))
        // Trainer
        .route(
            "/api/trainer/sets",
            get(routes::trainer::list_sets).post(routes::trainer::create_set),
        )
        .route("/api/trainer/sets/{set_id}/puzzles", get(routes::trainer::get_set_puzzles))
        .route("/api/trainer/cycles", post(routes::trainer::create_cycle))
        .route("/api/trainer/cycles/active", get(routes::trainer::get_active_cycle))
        .route("/api/trainer/cycles/{cycle_id}", put(routes::trainer::update_cycle))
        .route("/api/trainer/sessions", post(routes::trainer::create_session))
        .route("/api/trainer/sessions/{session_id}", put(routes::trainer::close_session))
        // Shared state
        .layer(Extension(pool))
        .layer(Extension(config.clone()))
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
