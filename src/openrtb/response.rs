use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenRTB Bid Response
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BidResponse {
    pub id: String,
    #[serde(default)]
    pub seatbid: Vec<SeatBid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cur: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SeatBid {
    #[serde(default)]
    pub bid: Vec<Bid>,
    #[serde(default)]
    pub seat: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Bid {
    #[serde(default)]
    pub id: String,
    pub impid: String,
    pub price: f64,
    #[serde(default)]
    pub adm: String, // VAST XML 或者 VAST tag URL
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cat: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adomain: Vec<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub ext: Value,
}

impl Bid {
    /// 读取 `ext.prebid.video.duration`，缺失、非整数或 <= 0 时返回 None
    pub fn reported_duration(&self) -> Option<i64> {
        self.ext
            .pointer("/prebid/video/duration")
            .and_then(Value::as_i64)
            .filter(|d| *d > 0)
    }

    /// 读取 `ext.prebid.dealtiersatisfied`
    pub fn deal_tier_satisfied(&self) -> bool {
        self.ext
            .pointer("/prebid/dealtiersatisfied")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// 读取 `ext.prebid.bidid`（交易平台为该出价生成的 id）
    pub fn generated_bid_id(&self) -> Option<&str> {
        self.ext
            .pointer("/prebid/bidid")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_duration_and_deal_flag_from_ext() {
        let bid = Bid {
            ext: json!({"prebid": {"video": {"duration": 15}, "dealtiersatisfied": true}}),
            ..Default::default()
        };
        assert_eq!(bid.reported_duration(), Some(15));
        assert!(bid.deal_tier_satisfied());
    }

    #[test]
    fn non_positive_or_unparsable_duration_is_absent() {
        let zero = Bid { ext: json!({"prebid": {"video": {"duration": 0}}}), ..Default::default() };
        let text = Bid { ext: json!({"prebid": {"video": {"duration": "30"}}}), ..Default::default() };
        assert_eq!(zero.reported_duration(), None);
        assert_eq!(text.reported_duration(), None);
        assert!(!Bid::default().deal_tier_satisfied());
    }

    #[test]
    fn generated_bid_id_ignores_empty_values() {
        let bid = Bid { ext: json!({"prebid": {"bidid": "gen-1"}}), ..Default::default() };
        assert_eq!(bid.generated_bid_id(), Some("gen-1"));
        let empty = Bid { ext: json!({"prebid": {"bidid": ""}}), ..Default::default() };
        assert_eq!(empty.generated_bid_id(), None);
    }
}
