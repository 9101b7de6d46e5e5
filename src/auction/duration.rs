// src/auction/duration.rs

use crate::model::bid::BidStatus;
use crate::model::slot::DurationMatchingPolicy;

/// 根据匹配策略计算出价素材的生效时长
///
/// - `reported`: 竞价方上报的素材时长，缺失或 <= 0 时直接使用 `slot_max_duration`
/// - `configured`: 允许的素材时长列表
///
/// 返回 (生效时长, 状态)。匹配失败时保留上报值并标记 `DurationMismatch`。
pub fn match_duration(
    reported: Option<i64>,
    slot_max_duration: i64,
    configured: &[i64],
    policy: DurationMatchingPolicy,
) -> (i64, BidStatus) {
    let reported = match reported {
        Some(d) if d > 0 => d,
        _ => return (slot_max_duration, BidStatus::Ok),
    };

    match policy {
        DurationMatchingPolicy::None => (slot_max_duration, BidStatus::Ok),
        DurationMatchingPolicy::Exact => match nearest_duration(reported, configured) {
            Some(d) if d == reported => (reported, BidStatus::Ok),
            _ => (reported, BidStatus::DurationMismatch),
        },
        DurationMatchingPolicy::Roundup => match nearest_duration(reported, configured) {
            Some(d) => (d, BidStatus::Ok),
            None => (reported, BidStatus::DurationMismatch),
        },
    }
}

/// 最小的、不小于 `duration` 的配置时长
pub fn nearest_duration(duration: i64, configured: &[i64]) -> Option<i64> {
    configured.iter().copied().filter(|d| *d >= duration).min()
}
