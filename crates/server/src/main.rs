//! murmur server entry point.

use std::sync::Arc;

use axum::Router;
use murmur_common::Config;
use murmur_core::{
    ActorService, CommentService, FanoutContext, FanoutWorker, MentionResolver,
    NotificationFanout, NotificationService, PostService,
};
use murmur_db::repositories::{
    ActorRepository, CommentRepository, NotificationRepository, PostRepository,
};
use murmur_federation::{
    ActorFetcher, ApClient, InboxProcessor, InboxState, WebfingerResolver, WebfingerState,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting murmur server...");

    let config = Config::load()?;
    let server_url = config.server_url();
    let local_domain = config.local_domain()?;

    let db = murmur_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    murmur_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Repositories
    let actor_repo = ActorRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));

    // Services
    let (fanout, fanout_rx) = NotificationFanout::channel();

    let actor_service = ActorService::new(
        actor_repo.clone(),
        fanout.clone(),
        server_url.clone(),
        local_domain.clone(),
    );
    let post_service = PostService::new(
        post_repo,
        actor_repo.clone(),
        fanout.clone(),
        server_url.clone(),
    );
    let comment_service = CommentService::new(
        comment_repo,
        actor_repo.clone(),
        post_service.clone(),
        fanout,
    );
    let notification_service = NotificationService::new(notification_repo, actor_repo.clone());

    // Notification fan-out
    let fanout_worker = FanoutWorker::new(
        fanout_rx,
        FanoutContext {
            notification_service,
            mention_resolver: MentionResolver::new(actor_service.clone()),
        },
        config.notifications.max_concurrent_jobs,
    )
    .start();

    let mut app = Router::new();

    if config.federation.enabled {
        let ap_client = if config.federation.fetch_remote_actors {
            match ApClient::new(&server_url) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "Failed to create HTTP client, remote actors will not be fetched");
                    None
                }
            }
        } else {
            None
        };

        let processor = InboxProcessor::new(
            actor_service.clone(),
            post_service,
            comment_service,
            ActorFetcher::new(actor_repo, ap_client),
        );

        app = app.merge(murmur_federation::router(
            InboxState::new(processor),
            WebfingerState::new(WebfingerResolver::new(actor_service, &server_url)),
        ));
        info!(domain = %local_domain, "Federation endpoints enabled");
    }

    let app = app.layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Queued notifications are best-effort
    fanout_worker.abort();

    info!("Server shutdown complete");
    Ok(())
}
