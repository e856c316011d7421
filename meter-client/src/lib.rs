pub mod calc;
pub mod db;
pub mod domain;

pub use calc::{compute_snapshot, PaceScale, PaceStatus, ScaleKind, Snapshot, SnapshotOptions};
pub use db::{HouseStore, MemoryStore, PgStore, StoreError};
