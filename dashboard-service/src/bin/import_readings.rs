use anyhow::{bail, Result};
use dashboard_service::{
    config::{AppConfig, StoreKind},
    import::{ImportPipeline, ReadingValidation, ReadingsCsvSource, StoreSink},
    observability,
};
use meter_client::domain::NewReading;
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("usage: import_readings <house_id> <csv_file_path>");
    }
    let house_id = &args[1];
    let file_path = &args[2];

    let cfg = AppConfig::load()?;
    if cfg.store.kind == StoreKind::Memory {
        bail!("import_readings needs a persistent store; set store.kind = \"postgres\"");
    }

    let store = cfg.store.connect().await?;
    if store.get_house(house_id).await?.is_none() {
        bail!("house '{house_id}' does not exist");
    }

    let sink = StoreSink::new(store, house_id.as_str(), cfg.import.batch_size);
    let stats = sink.stats();

    let pipeline: ImportPipeline<_, NewReading, _> = ImportPipeline {
        source: ReadingsCsvSource::new(file_path),
        transforms: vec![Arc::new(ReadingValidation)],
        sink,
    };
    pipeline.run().await?;

    tracing::info!(
        house_id = %house_id,
        inserted = stats.inserted(),
        duplicates = stats.duplicates(),
        rejected = stats.rejected(),
        "import finished"
    );
    Ok(())
}
