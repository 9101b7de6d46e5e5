// src/logging/adpod_log.rs

use serde::{Serialize, Deserialize};
use chrono::Utc;
use tracing::info;

use crate::model::bid::{Bid, BidStatus};

/// **广告位竞价日志**，每次 pod 竞价输出一条
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AdPodLog {
    pub timestamp: String,          // 记录时间
    pub log_type: String,           // 日志类型，固定为 "adpod_auction"
    pub imp_id: String,             // 原始 impression id
    pub slots: usize,               // 生成的子广告位数
    pub bid_count: usize,           // 收集到的出价数
    pub combinations: usize,        // 评估过的时长组合数
    pub timed_out: bool,            // 是否因超时提前结束
    pub status: String,             // "success" or "failure"
    pub error: Option<String>,      // 失败原因
    pub winning_bid_ids: Vec<String>,
    pub winning_price: f64,
    pub bid_statuses: Vec<BidStatusLog>, // 每个出价的最终状态
}

/// **单个出价的竞价结果**
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BidStatusLog {
    pub bid_id: String,
    pub seat: String,
    pub price: f64,
    pub duration: i64,
    pub status: BidStatus,
}

impl AdPodLog {
    /// **创建广告位竞价日志**
    pub fn new(imp_id: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            log_type: "adpod_auction".to_string(),
            imp_id: imp_id.to_string(),
            slots: 0,
            bid_count: 0,
            combinations: 0,
            timed_out: false,
            status: "failure".to_string(),  // 默认失败，后续可更新
            error: None,
            winning_bid_ids: Vec::new(),
            winning_price: 0.0,
            bid_statuses: Vec::new(),
        }
    }

    /// **添加出价状态**
    pub fn add_bid_status(&mut self, bid: &Bid) {
        self.bid_statuses.push(BidStatusLog {
            bid_id: bid.id.clone(),
            seat: bid.seat.clone(),
            price: bid.price,
            duration: bid.duration,
            status: bid.status,
        });
        self.bid_count += 1;
    }

    /// **设置胜出的广告位**
    pub fn set_winner(&mut self, bid_ids: Vec<String>, price: f64) {
        self.status = "success".to_string();
        self.winning_bid_ids = bid_ids;
        self.winning_price = price;
    }

    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(payload) => info!(imp_id = %self.imp_id, adpod_log = %payload, "adpod auction finished"),
            Err(e) => info!(imp_id = %self.imp_id, error = %e, "adpod auction finished, log not serializable"),
        }
    }
}
