// src/config/config_manager.rs

use serde::{Serialize, Deserialize};
use std::time::Duration;

use crate::auction::orchestrator::DEFAULT_WORKERS;
use crate::error::{AdPodError, AdPodResult};
use crate::model::slot::{DurationMatchingPolicy, ExclusionConfig};

/// 单个视频广告位（Ad Pod）的配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdPodConfig {
    /// 子广告位个数范围；min_ads 与整个广告位的时长范围供外部子广告位生成器使用，
    /// 内置的 `default_slot_ranges` 只用到 min_ads 和 max_pod_duration
    #[serde(default = "default_min_ads")]
    pub min_ads: u32,
    #[serde(default = "default_max_ads")]
    pub max_ads: u32,
    /// 单个子广告位的时长范围（秒）
    #[serde(default = "default_min_duration")]
    pub min_duration: i64,
    #[serde(default = "default_max_duration")]
    pub max_duration: i64,
    /// 整个广告位的时长范围（秒）
    #[serde(default = "default_min_duration")]
    pub min_pod_duration: i64,
    #[serde(default = "default_max_pod_duration")]
    pub max_pod_duration: i64,
    #[serde(default = "default_exclusion_percent")]
    pub iab_category_exclusion_percent: u32,
    #[serde(default = "default_exclusion_percent")]
    pub advertiser_exclusion_percent: u32,
    /// 广告服务器配置的素材时长；为空时使用生成的子广告位最大时长
    #[serde(default)]
    pub creative_durations: Vec<i64>,
    #[serde(default)]
    pub duration_matching_policy: DurationMatchingPolicy,
    #[serde(default = "default_evaluation_timeout_ms")]
    pub evaluation_timeout_ms: u64,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for AdPodConfig {
    fn default() -> Self {
        Self {
            min_ads: default_min_ads(),
            max_ads: default_max_ads(),
            min_duration: default_min_duration(),
            max_duration: default_max_duration(),
            min_pod_duration: default_min_duration(),
            max_pod_duration: default_max_pod_duration(),
            iab_category_exclusion_percent: default_exclusion_percent(),
            advertiser_exclusion_percent: default_exclusion_percent(),
            creative_durations: Vec::new(),
            duration_matching_policy: DurationMatchingPolicy::default(),
            evaluation_timeout_ms: default_evaluation_timeout_ms(),
            worker_count: default_worker_count(),
        }
    }
}

impl AdPodConfig {
    pub fn exclusion(&self) -> ExclusionConfig {
        ExclusionConfig::new(self.iab_category_exclusion_percent, self.advertiser_exclusion_percent)
    }

    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }

    /// 未提供子广告位时的默认划分：最多 max_ads 个 (min_duration, max_duration) 范围，
    /// 单个范围不超过 max_pod_duration；个数不低于 min_ads 的前提下，
    /// 减少到最短时长之和不超过 max_pod_duration。
    pub fn default_slot_ranges(&self) -> Vec<(i64, i64)> {
        let mut count = self.max_ads as i64;
        while count > self.min_ads as i64 && count * self.min_duration > self.max_pod_duration {
            count -= 1;
        }
        let max_duration = self.max_duration.min(self.max_pod_duration);
        vec![(self.min_duration, max_duration); count.max(0) as usize]
    }

    pub fn validate(&self) -> AdPodResult<()> {
        if self.iab_category_exclusion_percent > 100 || self.advertiser_exclusion_percent > 100 {
            return Err(AdPodError::Config("exclusion percent must be within 0..=100".to_string()));
        }
        if self.worker_count == 0 {
            return Err(AdPodError::Config("worker_count must be at least 1".to_string()));
        }
        if self.min_ads > self.max_ads {
            return Err(AdPodError::Config(format!(
                "min_ads ({}) greater than max_ads ({})",
                self.min_ads, self.max_ads
            )));
        }
        if self.min_duration > self.max_duration || self.min_pod_duration > self.max_pod_duration {
            return Err(AdPodError::Config("duration range is inverted".to_string()));
        }
        Ok(())
    }
}

// Default functions
fn default_min_ads() -> u32 {
    1
}
fn default_max_ads() -> u32 {
    3
}
fn default_min_duration() -> i64 {
    5
}
fn default_max_duration() -> i64 {
    30
}
fn default_max_pod_duration() -> i64 {
    90
}
fn default_exclusion_percent() -> u32 {
    100
}
fn default_evaluation_timeout_ms() -> u64 {
    10
}
fn default_worker_count() -> usize {
    DEFAULT_WORKERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: AdPodConfig = serde_json::from_str(r#"{"max_ads": 4, "duration_matching_policy": "roundup"}"#).unwrap();
        assert_eq!(cfg.max_ads, 4);
        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.evaluation_timeout(), Duration::from_millis(10));
        assert_eq!(cfg.duration_matching_policy, DurationMatchingPolicy::Roundup);
        assert_eq!(cfg.exclusion(), ExclusionConfig::new(100, 100));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_slot_ranges_fit_pod_duration() {
        assert_eq!(AdPodConfig::default().default_slot_ranges(), vec![(5, 30); 3]);

        let cfg = AdPodConfig {
            max_ads: 4,
            min_duration: 30,
            max_duration: 60,
            max_pod_duration: 70,
            ..Default::default()
        };
        assert_eq!(cfg.default_slot_ranges(), vec![(30, 60), (30, 60)]);

        let cfg = AdPodConfig { min_ads: 2, max_ads: 3, max_duration: 45, max_pod_duration: 8, ..Default::default() };
        assert_eq!(cfg.default_slot_ranges(), vec![(5, 8), (5, 8)]);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cfg = AdPodConfig { iab_category_exclusion_percent: 101, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = AdPodConfig { worker_count: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = AdPodConfig { min_ads: 4, max_ads: 2, ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = AdPodConfig { min_duration: 40, max_duration: 30, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
