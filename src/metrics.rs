use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

#[derive(Metrics, Clone)]
#[metrics(scope = "blob_indexer")]
pub struct IndexerMetrics {
    #[metric(describe = "Batch proposed events processed to completion")]
    pub events_indexed: Counter,

    #[metric(describe = "Blobs persisted to storage")]
    pub blobs_stored: Counter,

    #[metric(describe = "Chain reorganizations detected")]
    pub reorgs_detected: Counter,

    #[metric(describe = "Scan passes that ended in an error")]
    pub scan_errors: Counter,

    #[metric(describe = "Time taken to fetch, match and store one blob")]
    pub store_blob_duration: Histogram,
}
