// src/auction/selector.rs

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::bid::{Bid, BidStatus, CandidateResult};

/// 把各候选组合中观察到的排除原因写回出价状态。
///
/// 只覆盖仍为 `Ok`（即"输给更高出价"）的出价；同一出价在不同组合中原因不同时
/// 取编码最小的原因，保证结果与候选到达顺序无关。
pub fn apply_exclusion_reasons(results: &[CandidateResult], bids: &mut [Bid]) {
    let mut reasons: HashMap<&str, BidStatus> = HashMap::new();
    for result in results {
        for (bid_id, status) in &result.excluded {
            reasons
                .entry(bid_id.as_str())
                .and_modify(|current| *current = (*current).min(*status))
                .or_insert(*status);
        }
    }

    for bid in bids.iter_mut().filter(|b| b.status == BidStatus::Ok) {
        if let Some(status) = reasons.get(bid.id.as_str()) {
            bid.status = *status;
        }
    }
}

/// 在所有非空候选中选出胜者：deal 出价数多者优先，其次总价高者，
/// 仍相同时按出价 id 列表字典序较小者胜出。
pub fn select_winner(results: &[CandidateResult]) -> Option<&CandidateResult> {
    results
        .iter()
        .filter(|r| !r.is_empty())
        .max_by(|a, b| rank(a, b))
}

fn rank(a: &CandidateResult, b: &CandidateResult) -> Ordering {
    a.deal_bids
        .cmp(&b.deal_bids)
        .then_with(|| a.price.total_cmp(&b.price))
        .then_with(|| b.bid_ids().cmp(&a.bid_ids()))
}
