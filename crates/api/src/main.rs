//! Carbon Karma API Server

use axum::{
    routing::{get, post},
    Router,
};
use common::config::LogFormat;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = common::Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("carbon_karma=debug".parse()?)
        .add_directive("api=debug".parse()?)
        .add_directive("engine=debug".parse()?);
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("🌍 Starting Carbon Karma API");

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState::new(pool));
    let app = router(state).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
    );

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    info!("🚀 Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        // Reference data
        .route("/api/emission-factors", get(routes::factors::table))
        .route("/api/emission-factors/compare", get(routes::factors::compare))
        .route("/api/badges", get(routes::badges::list))
        .route("/api/badges/:badge_id", get(routes::badges::get))
        .route(
            "/api/challenges",
            get(routes::challenges::list).post(routes::challenges::create),
        )
        .route("/api/challenges/:challenge_id", get(routes::challenges::get))
        .route(
            "/api/challenges/:challenge_id/leaderboard",
            get(routes::challenges::leaderboard),
        )
        // Activities
        .route(
            "/api/users/:user_id/activities",
            get(routes::activities::list).post(routes::activities::create),
        )
        .route(
            "/api/users/:user_id/activities/quick-log",
            post(routes::activities::quick_log),
        )
        .route(
            "/api/users/:user_id/activities/weekly-summary",
            get(routes::activities::weekly_summary),
        )
        .route(
            "/api/users/:user_id/activities/monthly-summary",
            get(routes::activities::monthly_summary),
        )
        .route(
            "/api/users/:user_id/activities/stats",
            get(routes::activities::stats),
        )
        // Progression
        .route(
            "/api/users/:user_id/progression",
            get(routes::progression::summary),
        )
        .route("/api/users/:user_id/streak", get(routes::progression::streak))
        .route(
            "/api/users/:user_id/leaderboard",
            get(routes::leaderboard::global),
        )
        .route("/api/users/:user_id/badges", get(routes::badges::user_badges))
        .route("/api/users/:user_id/badges/check", post(routes::badges::check))
        .route(
            "/api/users/:user_id/badges/:badge_id/showcase",
            post(routes::badges::toggle_showcase),
        )
        .route(
            "/api/users/:user_id/achievements",
            get(routes::achievements::user_progress),
        )
        // Challenges
        .route(
            "/api/users/:user_id/challenges",
            get(routes::challenges::user_challenges),
        )
        .route(
            "/api/users/:user_id/challenges/stats",
            get(routes::challenges::stats),
        )
        .route(
            "/api/users/:user_id/challenges/:challenge_id/join",
            post(routes::challenges::join),
        )
        .route(
            "/api/users/:user_id/challenges/:challenge_id/leave",
            post(routes::challenges::leave),
        )
        .route(
            "/api/users/:user_id/challenges/:challenge_id/refresh",
            post(routes::challenges::refresh),
        )
        // Notifications
        .route(
            "/api/users/:user_id/notifications",
            get(routes::notifications::list),
        )
        .route(
            "/api/users/:user_id/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/users/:user_id/notifications/:notification_id/read",
            post(routes::notifications::mark_read),
        )
        .with_state(state)
}
