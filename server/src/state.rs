use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::warn;

use crate::dataset::DamageDataset;

/// Pre-serialized API payloads, built once when the dataset is loaded and
/// shared by every request via `Arc`.
#[derive(Debug, Clone)]
pub struct PreparedPayloads {
    pub summary_json: Bytes,
    /// Indexed like `DamageDataset::hexagons`.
    pub hexagon_json: Vec<Bytes>,
}

impl PreparedPayloads {
    fn build(dataset: &DamageDataset) -> Self {
        Self {
            summary_json: to_json_bytes(dataset.summary(), br#"{"total_buildings":0,"building_count":{}}"#),
            hexagon_json: dataset
                .hexagons()
                .iter()
                .map(|stats| to_json_bytes(stats, br#"{"total_buildings":0}"#))
                .collect(),
        }
    }
}

fn to_json_bytes<T: Serialize>(value: &T, fallback: &'static [u8]) -> Bytes {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to pre-serialize payload, serving fallback");
            Bytes::from_static(fallback)
        })
}

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<DamageDataset>,
    pub payloads: Arc<PreparedPayloads>,
}

impl AppState {
    pub fn new(dataset: DamageDataset) -> Self {
        let payloads = PreparedPayloads::build(&dataset);
        Self {
            dataset: Arc::new(dataset),
            payloads: Arc::new(payloads),
        }
    }
}
