pub mod bucket;
pub mod combination;
pub mod duration;
pub mod exclusion;
pub mod impression;
pub mod metrics;
pub mod orchestrator;
pub mod selector;

pub use bucket::{duration_wise_buckets, BidsBucket};
pub use combination::{CombinationSource, SequenceList};
pub use exclusion::ExclusionEvaluator;
pub use impression::{FixedRanges, ImpressionRangeGenerator};
pub use metrics::{MetricsSink, NoopMetricsSink, PrometheusMetricsSink};
pub use orchestrator::{ConcurrentOrchestrator, OrchestratorOutcome};
