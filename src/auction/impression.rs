// src/auction/impression.rs

use crate::error::{AdPodError, AdPodResult};
use crate::model::slot::SlotConfig;

const IMPRESSION_ID_SEPARATOR: char = '_';

/// 子广告位时长范围生成器（外部算法），返回 (min_duration, max_duration) 列表
pub trait ImpressionRangeGenerator {
    fn get(&mut self) -> Vec<(i64, i64)>;
}

/// 固定的时长范围
#[derive(Debug, Clone, Default)]
pub struct FixedRanges(pub Vec<(i64, i64)>);

impl ImpressionRangeGenerator for FixedRanges {
    fn get(&mut self) -> Vec<(i64, i64)> {
        self.0.clone()
    }
}

pub fn generate_impression_id(imp_id: &str, sequence: u32) -> String {
    format!("{}{}{}", imp_id, IMPRESSION_ID_SEPARATOR, sequence)
}

/// 把 "{impId}_{seq}" 拆回 (impId, seq)；原始 impId 本身可以包含下划线
pub fn decode_impression_id(id: &str) -> AdPodResult<(String, u32)> {
    let (imp_id, sequence) = id
        .rsplit_once(IMPRESSION_ID_SEPARATOR)
        .ok_or_else(|| AdPodError::InvalidImpressionId(id.to_string()))?;
    let sequence: u32 = sequence
        .parse()
        .map_err(|_| AdPodError::InvalidImpressionId(id.to_string()))?;
    if imp_id.is_empty() || sequence == 0 {
        return Err(AdPodError::InvalidImpressionId(id.to_string()));
    }
    Ok((imp_id.to_string(), sequence))
}

/// 根据生成器返回的时长范围构造子广告位配置
pub fn build_slot_configs(imp_id: &str, ranges: &[(i64, i64)]) -> Vec<SlotConfig> {
    ranges
        .iter()
        .enumerate()
        .map(|(i, (min_duration, max_duration))| {
            let sequence = i as u32 + 1;
            SlotConfig {
                imp_id: generate_impression_id(imp_id, sequence),
                min_duration: *min_duration,
                max_duration: *max_duration,
                sequence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impression_ids_round_trip_with_underscores() {
        let id = generate_impression_id("video_imp", 3);
        assert_eq!(id, "video_imp_3");
        assert_eq!(decode_impression_id(&id).unwrap(), ("video_imp".to_string(), 3));
    }

    #[test]
    fn bad_impression_ids_are_rejected() {
        for id in ["imp", "imp_x", "_2", "imp_0"] {
            assert!(decode_impression_id(id).is_err(), "{}", id);
        }
    }

    #[test]
    fn slot_configs_start_at_one() {
        let slots = build_slot_configs("imp1", &[(5, 15), (10, 30)]);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].imp_id, "imp1_1");
        assert_eq!(slots[1].sequence, 2);
        assert_eq!(slots[1].max_duration, 30);
    }
}
