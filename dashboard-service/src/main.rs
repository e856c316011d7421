use std::sync::Arc;

use anyhow::Result;
use dashboard_service::{
    api::{self, AppState},
    config::AppConfig,
    metrics_server,
    narrative::HttpNarrativeAssessor,
    observability, HouseholdService,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let store = cfg.store.connect().await?;
    let mut service = HouseholdService::new(store, cfg.billing.snapshot_options());

    match &cfg.narrative {
        Some(narrative_cfg) => {
            let assessor = HttpNarrativeAssessor::new(narrative_cfg)?;
            service = service.with_narrative(Arc::new(assessor));
            tracing::info!(endpoint = %narrative_cfg.endpoint, "narrative assessment enabled");
        }
        None => tracing::info!("narrative assessment disabled"),
    }

    let state = AppState::new(Arc::new(service), cfg.http.auth_bearer_token.clone());
    api::serve(&cfg.http.bind_addr, state).await
}
