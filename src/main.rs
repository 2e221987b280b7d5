use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use spa_storefront::{
    config::{CatalogSource, CheckoutSinkKind},
    handlers::{create_router, ApiState},
    init_observability,
    repositories::{
        DynamoDbServiceRepository, FileCartStorage, InMemoryServiceRepository, ServiceRepository,
    },
    services::{
        CatalogLoader, CheckoutHandoff, CheckoutScreen, EventBridgeHandoff, HandoffSink,
        SessionRegistry,
    },
    shutdown_observability, Config, Metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().context("failed to load configuration")?;

    init_observability(&config.observability)?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );

    let metrics = Arc::new(Metrics::new()?);

    let sdk_config = if config.needs_aws() {
        info!(region = %config.catalog.region, "Loading AWS configuration");
        Some(config.load_aws_config().await)
    } else {
        None
    };

    let repository: Arc<dyn ServiceRepository> = match (config.catalog.catalog_source, &sdk_config)
    {
        (CatalogSource::DynamoDb, Some(sdk_config)) => {
            info!(table = %config.catalog.services_table_name, "Reading catalog from DynamoDB");
            Arc::new(DynamoDbServiceRepository::new(
                Arc::new(aws_sdk_dynamodb::Client::new(sdk_config)),
                config.catalog.services_table_name.clone(),
                config.catalog.region.clone(),
            ))
        }
        _ => {
            let path = &config.catalog.catalog_seed_path;
            info!(path = %path.display(), "Reading catalog from seed file");
            Arc::new(
                InMemoryServiceRepository::from_json_file(path)
                    .await
                    .with_context(|| format!("failed to read catalog seed {}", path.display()))?,
            )
        }
    };

    let catalog = Arc::new(CatalogLoader::new(repository).with_metrics(metrics.clone()));

    let (sink, checkout_screen): (Arc<dyn HandoffSink>, Option<Arc<CheckoutScreen>>) =
        match (config.checkout.checkout_sink, &sdk_config) {
            (CheckoutSinkKind::EventBridge, Some(sdk_config)) => {
                let handoff = EventBridgeHandoff::new(
                    aws_sdk_eventbridge::Client::new(sdk_config),
                    config.checkout.event_config(),
                )?;
                info!(
                    bus = %config.checkout.event_bus_name,
                    source = %config.checkout.event_source_name,
                    "Checkouts are handed off to EventBridge"
                );
                (Arc::new(handoff), None)
            }
            _ => {
                let screen = Arc::new(CheckoutScreen::new());
                (screen.clone(), Some(screen))
            }
        };

    let checkout = Arc::new(
        CheckoutHandoff::new(sink)
            .with_toast_duration_ms(config.checkout.checkout_toast_duration_ms)
            .with_metrics(metrics.clone()),
    );

    let storage = Arc::new(FileCartStorage::new(config.storage.data_dir.clone()));
    info!(data_dir = %config.storage.data_dir.display(), "Carts persist to local storage");

    let registry = Arc::new(
        SessionRegistry::new(
            catalog.clone(),
            storage,
            checkout,
            config.storage.cart_key_prefix.clone(),
        )
        .with_expiry(config.server.session_expiry())
        .with_metrics(metrics.clone()),
    );

    // Warm the catalog so the first session does not wait on the fetch.
    // A failure here is retried by the next session that opens.
    catalog.load().await;

    let sweeper = registry.spawn_sweeper(config.server.session_sweep_interval());

    let app = create_router(
        ApiState {
            registry: registry.clone(),
            checkout_screen,
            metrics,
        },
        config.server.request_timeout(),
    );

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address()))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    registry.flush_all().await;
    shutdown_observability().await;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
