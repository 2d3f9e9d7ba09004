use axum::{
    routing::{any, get, post},
    Router,
};
use formation_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::cors::platform_cors,
    middleware::rate_limit,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // Point-in-time sheet generation, ten minutes ahead of each session.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                match state.sheet_generator.run_point_lookup(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(created) => info!(created = created, "Attendance sheets generated"),
                    Err(e) => tracing::error!(error = ?e, "Sheet generator error"),
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    // Signing-window sweep: open, close, backfill.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = state.window_manager.run(chrono::Utc::now()).await {
                    tracing::error!(error = ?e, "Attendance window sweep error");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    // Expired signature links.
    {
        let state = app_state.clone();
        tokio::spawn(async move {
            loop {
                let run = state
                    .expiry_reaper
                    .run(
                        chrono::Utc::now(),
                        &state.notification_service,
                        &state.email_service,
                    )
                    .await;
                if let Err(e) = run {
                    tracing::error!(error = ?e, "Signature link reaper error");
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    // Scheduler-facing endpoints answer any verb; OPTIONS is taken by the
    // CORS layer before it reaches the handler.
    let jobs_api = Router::new()
        .route(
            "/api/jobs/generate-attendance-sheets",
            any(routes::jobs::generate_attendance_sheets),
        )
        .route(
            "/api/jobs/attendance-window",
            any(routes::jobs::attendance_window),
        )
        .route(
            "/api/jobs/expire-signature-links",
            any(routes::jobs::expire_signature_links),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RpsLimit::new(config.jobs_rps),
            rate_limit::rps_middleware,
        ));

    let api = Router::new()
        .route(
            "/api/attendance-sheets",
            get(routes::attendance::list_sheets),
        )
        .route(
            "/api/attendance-sheets/signature-link",
            post(routes::attendance::create_signature_link),
        )
        .route(
            "/api/attendance-sheets/:id",
            get(routes::attendance::get_sheet),
        )
        .route(
            "/api/attendance-sheets/:id/validate",
            post(routes::attendance::validate_sheet),
        )
        .route(
            "/api/public/emargement/:token",
            get(routes::public::get_sheet_by_token),
        )
        .route(
            "/api/public/emargement/:token/sign",
            post(routes::public::sign_sheet),
        )
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::RpsLimit::new(config.api_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(jobs_api)
        .merge(api)
        .with_state(app_state)
        .layer(platform_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
