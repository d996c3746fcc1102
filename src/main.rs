//! Kasira billing service binary.
//!
//! Wiring order: configuration, tracing, database pool, adapters,
//! background workers, HTTP server with graceful shutdown.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{mpsc, watch};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use kasira::adapters::dispatch::WebhookDispatchShell;
use kasira::adapters::http::billing::{billing_routes, BillingAppState};
use kasira::adapters::http::webhook::{test_webhook_routes, webhook_routes, WebhookAppState};
use kasira::adapters::notify::{run_delivery_logger, QueueDispatcher, TracingAlertSink};
use kasira::adapters::postgres::{PostgresNotificationLedger, PostgresSubscriptionStore};
use kasira::adapters::scheduler::SweepScheduler;
use kasira::application::handlers::{
    CreateCheckoutHandler, ExpireSubscriptionsHandler, ProcessWebhookHandler,
    SweepStalePendingHandler,
};
use kasira::config::AppConfig;
use kasira::domain::billing::{BillingInterval, BillingPackage};
use kasira::domain::foundation::PackageId;
use kasira::domain::reconciliation::{ReconciliationProcessor, SignatureVerifier};
use kasira::ports::NotificationLedger;

/// How many interrupted notifications to re-drive at startup.
const STARTUP_REDRIVE_LIMIT: u32 = 500;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    // Persistence adapters
    let ledger = Arc::new(PostgresNotificationLedger::new(pool.clone()));
    let store = Arc::new(PostgresSubscriptionStore::new(pool.clone()));

    // Notification job queue; delivery is the notification service's
    // concern, here the jobs are drained into structured logs
    let (dispatcher, delivery_queue) = QueueDispatcher::channel(1024);
    let dispatcher = Arc::new(dispatcher);
    let alerts = Arc::new(TracingAlertSink::new());

    // Reconciliation pipeline
    let verifier = SignatureVerifier::new(config.payment.midtrans_server_key.clone());
    let processor = Arc::new(ReconciliationProcessor::new(
        verifier,
        ledger.clone(),
        store.clone(),
    ));
    let webhook_handler = Arc::new(ProcessWebhookHandler::new(processor, dispatcher.clone()));

    // Background workers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(run_delivery_logger(delivery_queue));

    let shell = WebhookDispatchShell::new(webhook_handler.clone(), ledger.clone(), alerts);
    let (redrive_tx, redrive_rx) = mpsc::channel(256);
    let shell_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        shell.run(redrive_rx, shell_shutdown).await;
    });
    redrive_interrupted(&*ledger, &redrive_tx).await;

    let scheduler = SweepScheduler::new(
        Arc::new(SweepStalePendingHandler::new(
            store.clone(),
            dispatcher.clone(),
        )),
        Arc::new(ExpireSubscriptionsHandler::new(
            store.clone(),
            dispatcher.clone(),
        )),
    );
    let scheduler_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    // HTTP surface
    let webhook_state = WebhookAppState::new(webhook_handler, &config.payment);
    let billing_state = BillingAppState {
        checkout: Arc::new(CreateCheckoutHandler::new(store)),
        packages: Arc::new(package_catalog()),
    };

    let mut app = Router::new()
        .nest("/webhooks", webhook_routes().with_state(webhook_state.clone()))
        .nest("/billing", billing_routes().with_state(billing_state));

    if !config.is_production() {
        app = app.nest(
            "/test/webhook",
            test_webhook_routes().with_state(webhook_state),
        );
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let addr = config.server.socket_addr();
    tracing::info!(%addr, production = config.is_production(), "kasira billing service listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    })
    .await?;

    shutdown_tx.send(true).ok();
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Enqueue notifications left unsettled by a previous run.
async fn redrive_interrupted(
    ledger: &dyn NotificationLedger,
    queue: &mpsc::Sender<serde_json::Value>,
) {
    match ledger.find_unsettled(STARTUP_REDRIVE_LIMIT).await {
        Ok(records) if records.is_empty() => {}
        Ok(records) => {
            tracing::info!(count = records.len(), "re-driving interrupted notifications");
            for record in records {
                if queue.send(record.payload).await.is_err() {
                    tracing::error!("re-drive queue closed during startup");
                    break;
                }
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "could not scan ledger for interrupted notifications");
        }
    }
}

/// Subscribable packages.
///
/// The platform owns the catalog; these mirror its current seed data.
fn package_catalog() -> HashMap<i64, BillingPackage> {
    let packages = [
        BillingPackage {
            id: PackageId::new(1),
            name: "Warung".to_string(),
            price: 49_000,
            interval: BillingInterval::Monthly,
        },
        BillingPackage {
            id: PackageId::new(2),
            name: "Usaha".to_string(),
            price: 129_000,
            interval: BillingInterval::Quarterly,
        },
        BillingPackage {
            id: PackageId::new(3),
            name: "Juragan".to_string(),
            price: 449_000,
            interval: BillingInterval::Yearly,
        },
    ];

    packages
        .into_iter()
        .map(|p| (p.id.as_i64(), p))
        .collect()
}
