use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfigSettings, InMemoryAdoptionStore, InMemoryEventPublisher};
use crate::routes::with_adoption_routes;
use adopt_track::config::AppConfig;
use adopt_track::error::AppError;
use adopt_track::telemetry;
use adopt_track::workflows::adoption::{
    AdoptionWorkflowService, Animal, AnimalId, AnimalStatus,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryAdoptionStore::default());
    seed_demo_animals(&store)?;
    let events = Arc::new(InMemoryEventPublisher::default());
    let settings = Arc::new(ConfigSettings::from_config(&config.reports));
    let service = Arc::new(AdoptionWorkflowService::new(store, events, settings));

    let app = with_adoption_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "adoption lifecycle tracker ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// The in-memory store starts empty; give the service a small roster so
/// the workflow can be exercised right after boot.
fn seed_demo_animals(store: &InMemoryAdoptionStore) -> Result<(), AppError> {
    for (id, name) in [
        ("animal-001", "Biscuit"),
        ("animal-002", "Mishka"),
        ("animal-003", "Pirate"),
    ] {
        store.seed_animal(Animal {
            id: AnimalId(id.to_string()),
            name: name.to_string(),
            ready_for_adoption: false,
            status: AnimalStatus::Sheltered,
            version: 0,
        })?;
    }
    Ok(())
}
