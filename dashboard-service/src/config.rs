use meter_client::{
    calc::{ScaleKind, SnapshotOptions, DEFAULT_CYCLE_LENGTH_DAYS},
    db::{HouseStore, MemoryStore, PgStore},
};
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;
use std::{fs, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StoreConfig {
    pub async fn connect(&self) -> anyhow::Result<Arc<dyn HouseStore>> {
        match self.kind {
            StoreKind::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(self.max_connections)
                    .connect(&self.uri)
                    .await?;
                tracing::info!(max_connections = self.max_connections, "connected to postgres store");
                Ok(Arc::new(PgStore::new(pool)))
            }
            StoreKind::Memory => {
                tracing::warn!("using in-memory store; data is lost on exit");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
    /// When set, every API request must carry `Authorization: Bearer <token>`.
    pub auth_bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default = "default_cycle_length_days")]
    pub cycle_length_days: u32,
    #[serde(default)]
    pub default_scale: ScaleKind,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cycle_length_days: DEFAULT_CYCLE_LENGTH_DAYS,
            default_scale: ScaleKind::default(),
        }
    }
}

impl BillingConfig {
    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            cycle_length_days: self.cycle_length_days.max(1),
            scale: self.default_scale,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NarrativeConfig {
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    #[serde(default = "default_narrative_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_import_batch_size")]
    pub batch_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_import_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    pub narrative: Option<NarrativeConfig>,
    #[serde(default)]
    pub import: ImportConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_cycle_length_days() -> u32 {
    DEFAULT_CYCLE_LENGTH_DAYS
}

fn default_import_batch_size() -> usize {
    500
}

fn default_narrative_timeout_ms() -> u64 {
    15_000
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        if cfg.store.kind == StoreKind::Postgres && cfg.store.uri.is_empty() {
            anyhow::bail!("store.uri is required when store.kind = \"postgres\"");
        }
        Ok(cfg)
    }
}
