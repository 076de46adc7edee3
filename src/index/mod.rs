pub mod client;
#[cfg(test)]
pub mod fake;
pub mod manager;
pub mod types;

pub use client::{HttpIndexClient, VectorIndexApi};
pub use manager::{delete_all_indexes, IndexManager};
pub use types::{
    IndexSpec, IndexState, IndexStats, Metric, QueryMatch, RerankOptions, VectorRecord,
};
