use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::HeaderValue;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod routes;
mod services;

use config::Config;
use db::repository::{
    EventRepository, NotificationRepository, PreferencesRepository, PushPermissionRepository,
    ReminderRepository,
};
use services::channels::{EmailChannel, InAppChannel, PushChannel};
use services::clock::{Clock, SystemClock};
use services::dispatcher::ChannelDispatcher;
use services::init;
use services::permissions::PermissionManager;
use services::poller::DueReminderPoller;
use services::scheduler::ReminderScheduler;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub events: Arc<EventRepository>,
    pub reminders: Arc<ReminderRepository>,
    pub preferences: Arc<PreferencesRepository>,
    pub notifications: Arc<NotificationRepository>,
    pub permissions: Arc<PermissionManager>,
    pub scheduler: Arc<ReminderScheduler>,
    pub poller: Arc<DueReminderPoller>,
    pub clock: Arc<dyn Clock>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "publish_reminders=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Publish Reminders Service");

    // Initialize database
    let pool = init::init_db(&config).await?;

    // Repositories
    let events = Arc::new(EventRepository::new(pool.clone()));
    let reminders = Arc::new(ReminderRepository::new(pool.clone()));
    let preferences = Arc::new(PreferencesRepository::new(pool.clone()));
    let notifications = Arc::new(NotificationRepository::new(pool.clone()));
    let push_permissions = Arc::new(PushPermissionRepository::new(pool.clone()));

    // Engine services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let permissions = Arc::new(PermissionManager::new(push_permissions.clone()));
    let dispatcher = Arc::new(
        ChannelDispatcher::new()
            .register(Arc::new(PushChannel::new(
                config.push.clone(),
                push_permissions.clone(),
            )))
            .register(Arc::new(InAppChannel::new(notifications.clone())))
            .register(Arc::new(EmailChannel::new(config.email.clone()))),
    );
    let scheduler = Arc::new(ReminderScheduler::new(reminders.clone(), clock.clone()));
    let poller = Arc::new(DueReminderPoller::new(
        reminders.clone(),
        events.clone(),
        preferences.clone(),
        dispatcher,
        clock.clone(),
        config.poller.clone(),
    ));

    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        events,
        reminders,
        preferences,
        notifications,
        permissions,
        scheduler,
        poller,
        clock,
    });

    // Create shutdown notifier for background workers
    let (shutdown_tx, _shutdown_rx) = tokio::sync::broadcast::channel::<()>(1);

    // Spawn background workers (returns JoinHandles so we can await shutdown)
    let bg_handles = init::spawn_background_workers(app_state.clone(), shutdown_tx.clone());

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // Event surface: create / reschedule / cancel
        .nest("/api/events", routes::events::router())
        // Reminder audit + backfill surface
        .nest("/api/reminders", routes::reminders::router())
        // In-app notification feed
        .nest("/api/notifications", routes::notifications::router())
        // Owner preference surface
        .nest("/api/preferences", routes::preferences::router())
        // Push permission state machine surface
        .nest("/api/push-permission", routes::push_permission::router())
        // Add shared state
        .with_state(app_state.clone())
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(
                    config
                        .server
                        .frontend_url
                        .parse::<HeaderValue>()
                        .expect("Invalid FRONTEND_URL for CORS"),
                )
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::DELETE,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE, http::header::ACCEPT]),
        );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let server_fut = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    let shutdown_tx_clone = shutdown_tx.clone();
    let signal_fut = async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut term =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to bind SIGTERM");
            tokio::select! {
                _ = ctrl_c => {},
                _ = term.recv() => {},
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("Failed to bind Ctrl+C");
        }

        tracing::info!("Shutdown signal received, notifying background workers");
        let _ = shutdown_tx_clone.send(());
    };

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = signal_fut => {
            tracing::info!("Signal handler completed; server future dropped to stop accepting new connections");
        }
    }

    // Give background workers some time to finish. The poller checks the
    // shutdown channel between reminders, so in-flight work either completes
    // its transition or stays pending for the next run.
    let shutdown_wait = Duration::from_secs(15);
    tracing::info!(
        "Waiting up to {}s for background workers to exit",
        shutdown_wait.as_secs()
    );

    let bg_wait = async {
        for h in bg_handles {
            let _ = h.await;
        }
    };
    let _ = tokio::time::timeout(shutdown_wait, bg_wait).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
