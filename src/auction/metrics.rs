// src/auction/metrics.rs

use std::time::Duration;

pub const COMBINATION_GENERATOR_V1: &str = "combination_generator_v1";
pub const COMPETITIVE_EXCLUSION_V1: &str = "competitive_exclusion_v1";

/// 广告位算法指标标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodLabels {
    pub algorithm: &'static str,
    pub combinations: Option<usize>,
    pub response_bids: Option<usize>,
}

/// 指标上报接口，由外部注入
pub trait MetricsSink: Send + Sync {
    fn record_combination_generation(&self, labels: &PodLabels, elapsed: Duration);
    fn record_competitive_exclusion(&self, labels: &PodLabels, elapsed: Duration);
}

/// 通过 `metrics` facade 上报，具体 exporter 由进程安装
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetricsSink;

impl MetricsSink for PrometheusMetricsSink {
    fn record_combination_generation(&self, labels: &PodLabels, elapsed: Duration) {
        ::metrics::histogram!("adpod.combination_generation_us", "algorithm" => labels.algorithm)
            .record(elapsed.as_micros() as f64);
        if let Some(count) = labels.combinations {
            ::metrics::counter!("adpod.combinations", "algorithm" => labels.algorithm).increment(count as u64);
        }
    }

    fn record_competitive_exclusion(&self, labels: &PodLabels, elapsed: Duration) {
        ::metrics::histogram!("adpod.competitive_exclusion_us", "algorithm" => labels.algorithm)
            .record(elapsed.as_micros() as f64);
        if let Some(count) = labels.response_bids {
            ::metrics::histogram!("adpod.response_bids", "algorithm" => labels.algorithm).record(count as f64);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record_combination_generation(&self, _labels: &PodLabels, _elapsed: Duration) {}
    fn record_competitive_exclusion(&self, _labels: &PodLabels, _elapsed: Duration) {}
}
