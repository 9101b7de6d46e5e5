// src/model/slot.rs

use serde::{Serialize, Deserialize};

/// 生成的子广告位（slot）配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SlotConfig {
    pub imp_id: String,       // 子广告位 ID，形如 "{impId}_{seq}"
    pub min_duration: i64,    // 最小时长（秒）
    pub max_duration: i64,    // 最大时长（秒）
    pub sequence: u32,        // 从 1 开始
}

/// 素材时长匹配策略
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationMatchingPolicy {
    #[default]
    None,
    Exact,
    #[serde(alias = "round-up", alias = "round_up")]
    Roundup,
}

/// 品类 / 广告主域名排除配置（0 - 100 的百分比）
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionConfig {
    pub max_category_percent: u32,
    pub max_domain_percent: u32,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            max_category_percent: 100,
            max_domain_percent: 100,
        }
    }
}

/// 换算后的允许出现次数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatLimits {
    pub category: usize,
    pub domain: usize,
}

impl ExclusionConfig {
    pub fn new(max_category_percent: u32, max_domain_percent: u32) -> Self {
        Self { max_category_percent, max_domain_percent }
    }

    /// 把百分比换算成 `total_slots` 个位置中允许出现的最大次数。
    ///
    /// 第 `count` 次出现违规当且仅当 `count * 100 / total_slots > percent`（整数除法），
    /// 首次出现永远不违规。
    pub fn repeat_limits(&self, total_slots: usize) -> RepeatLimits {
        RepeatLimits {
            category: allowed_repeats(self.max_category_percent, total_slots),
            domain: allowed_repeats(self.max_domain_percent, total_slots),
        }
    }
}

fn allowed_repeats(percent: u32, total_slots: usize) -> usize {
    if total_slots == 0 {
        return 1;
    }
    let threshold = (percent as usize + 1) * total_slots;
    let first_violation = (threshold + 99) / 100;
    first_violation.saturating_sub(1).max(1)
}
