// src/model/bid.rs

use serde::{Serialize, Deserialize};
use std::collections::{BTreeSet, HashMap};
use std::convert::TryFrom;

/// 竞价状态（APRC），对外以整数编码输出
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum BidStatus {
    /// 正常参与竞价；竞价结束后仍为 Ok 表示输给了更高出价
    #[default]
    Ok = 0,
    Winning = 1,
    CategoryExclusion = 2,
    DomainExclusion = 3,
    DurationMismatch = 4,
}

impl TryFrom<u8> for BidStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BidStatus::Ok),
            1 => Ok(BidStatus::Winning),
            2 => Ok(BidStatus::CategoryExclusion),
            3 => Ok(BidStatus::DomainExclusion),
            4 => Ok(BidStatus::DurationMismatch),
            _ => Err(format!("Invalid value for BidStatus: {}", value)),
        }
    }
}

impl From<BidStatus> for u8 {
    fn from(status: BidStatus) -> Self {
        status as u8
    }
}

/// 参与广告位拼装的单个视频出价
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Bid {
    pub id: String,
    /// 竞价方返回的原始 bid id，与 `id` 不同时需要改写 tracking URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    pub imp_id: String,
    pub seat: String,
    pub price: f64,
    /// 生效时长（秒），经过 DurationMatcher 处理
    pub duration: i64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub deal_tier_satisfied: bool,
    #[serde(default)]
    pub status: BidStatus,
    /// 原始素材（VAST XML 或 VAST tag URL）
    #[serde(default)]
    pub adm: String,
}

impl Bid {
    /// tracking URL 中的 bidid 是否需要替换成广告位生成的 id
    pub fn needs_bid_id_rewrite(&self) -> bool {
        self.original_id
            .as_deref()
            .map_or(false, |original| original != self.id)
    }
}

/// 一个 DurationSequence 的评估结果
#[derive(Debug, Clone, Default)]
pub struct CandidateResult {
    pub bids: Vec<Bid>,
    pub durations: Vec<i64>,
    pub price: f64,
    pub category_score: HashMap<String, usize>,
    pub domain_score: HashMap<String, usize>,
    pub deal_bids: usize,
    /// 被排除的出价：bid id -> 排除原因
    pub excluded: HashMap<String, BidStatus>,
    /// 取出该序列耗费的时间（微秒）
    pub generation_us: u64,
    /// 评估该序列耗费的时间（微秒）
    pub evaluation_us: u64,
}

impl CandidateResult {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn bid_ids(&self) -> Vec<&str> {
        self.bids.iter().map(|b| b.id.as_str()).collect()
    }
}

/// **最终胜出的广告位**
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AdPodBid {
    pub bids: Vec<Bid>,
    pub price: f64,
    pub categories: Vec<String>,
    pub domains: Vec<String>,
    pub original_imp_id: String,
    pub seat_name: String,
}

impl AdPodBid {
    pub fn from_candidate(candidate: &CandidateResult, original_imp_id: &str, seat_name: &str) -> Self {
        let categories: BTreeSet<&String> = candidate.category_score.keys().collect();
        let domains: BTreeSet<&String> = candidate.domain_score.keys().collect();
        Self {
            bids: candidate.bids.clone(),
            price: candidate.price,
            categories: categories.into_iter().cloned().collect(),
            domains: domains.into_iter().cloned().collect(),
            original_imp_id: original_imp_id.to_string(),
            seat_name: seat_name.to_string(),
        }
    }
}
