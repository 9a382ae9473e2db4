use crate::cli::ServeArgs;
use crate::infra::{limits_provider, seed_demo_festival, AppState, TracingNotifier};
use crate::routes::with_festival_routes;
use arts_fest::config::AppConfig;
use arts_fest::error::AppError;
use arts_fest::festival::{
    AdmissionController, FestivalState, InMemoryFestivalStore, ResultService, ScoringService,
};
use arts_fest::telemetry;
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

    let store = Arc::new(InMemoryFestivalStore::new());
    if config.festival.seed_demo_data {
        seed_demo_festival(&store);
        info!("demo festival data seeded");
    }
    let limits = Arc::new(limits_provider(config.festival.seed_demo_data));

    let state = FestivalState {
        admission: Arc::new(AdmissionController::new(
            store.clone(),
            Arc::new(TracingNotifier),
            limits,
        )),
        results: Arc::new(ResultService::new(store.clone())),
        scoring: Arc::new(ScoringService::new(store)),
    };

    let app = with_festival_routes(state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "festival admission service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
