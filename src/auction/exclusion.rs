// src/auction/exclusion.rs

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use tracing::trace;

use crate::auction::bucket::BidsBucket;
use crate::model::bid::{Bid, BidStatus, CandidateResult};
use crate::model::slot::{ExclusionConfig, RepeatLimits};

/// 时长序列压缩后的一组：某个时长需要多少个出价
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationGroup {
    pub duration: i64,
    pub count: usize,
}

/// 把时长序列压缩成 (时长, 个数)，按时长首次出现的顺序排列。
/// 相同时长总是归为一组，保证同一个出价不会在一个组合里出现两次。
pub fn compress_sequence(sequence: &[i64]) -> Vec<DurationGroup> {
    let mut groups: Vec<DurationGroup> = Vec::new();
    for &duration in sequence {
        match groups.iter_mut().find(|g| g.duration == duration) {
            Some(group) => group.count += 1,
            None => groups.push(DurationGroup { duration, count: 1 }),
        }
    }
    groups
}

/// 每个时长分组内选中的排名下标（严格递增）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankCursor {
    groups: Vec<Vec<usize>>,
}

impl RankCursor {
    /// 每组都取排名最靠前的几个出价
    pub fn first(counts: &[usize]) -> Self {
        Self {
            groups: counts.iter().map(|&count| (0..count).collect()).collect(),
        }
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// 按字典序前进到下一个组合，`depths[i]` 是第 i 组桶内的出价数。
    ///
    /// 从右往左找到还能后移的下标，加一，并把它右侧同组的下标重置为连续值、
    /// 之后各组重置为最靠前的排名。没有下一个组合时返回 None。
    pub fn advance(&self, depths: &[usize]) -> Option<RankCursor> {
        for i in (0..self.groups.len()).rev() {
            let ranks = &self.groups[i];
            let depth = depths.get(i).copied().unwrap_or(0);
            if depth < ranks.len() {
                return None;
            }
            let Some(j) = (0..ranks.len()).rev().find(|&j| ranks[j] < depth - ranks.len() + j) else {
                continue;
            };

            let mut next = self.groups.clone();
            next[i][j] += 1;
            for k in j + 1..next[i].len() {
                next[i][k] = next[i][k - 1] + 1;
            }
            for group in next.iter_mut().skip(i + 1) {
                for (k, rank) in group.iter_mut().enumerate() {
                    *rank = k;
                }
            }
            return Some(RankCursor { groups: next });
        }
        None
    }
}

/// 单个组合的评估结果
enum TupleOutcome {
    Valid(CandidateResult),
    /// 在第 `group` 组第 `slot` 个位置触发了排除
    Rejected { group: usize, slot: usize, reason: BidStatus },
}

/// **竞争排除评估器**
///
/// 对一个时长序列，在满足品类 / 域名重复上限的前提下寻找价值最高的出价组合。
pub struct ExclusionEvaluator<'a> {
    buckets: &'a BidsBucket,
    exclusion: ExclusionConfig,
}

impl<'a> ExclusionEvaluator<'a> {
    pub fn new(buckets: &'a BidsBucket, exclusion: ExclusionConfig) -> Self {
        Self { buckets, exclusion }
    }

    pub fn evaluate(&self, sequence: &[i64]) -> CandidateResult {
        let start = Instant::now();
        let groups = compress_sequence(sequence);
        let ranked: Vec<&[Bid]> = groups
            .iter()
            .map(|g| self.buckets.get(&g.duration).map(Vec::as_slice).unwrap_or(&[]))
            .collect();
        let counts: Vec<usize> = groups.iter().map(|g| g.count).collect();
        let depths: Vec<usize> = ranked.iter().map(|bids| bids.len()).collect();

        let mut result = if counts.iter().zip(&depths).any(|(count, depth)| count > depth) {
            trace!(?sequence, "not enough bids to fill duration sequence");
            CandidateResult::default()
        } else {
            self.best_combination(&ranked, &counts, &depths, sequence.len())
        };

        if !result.is_empty() {
            result.bids = follow_sequence(std::mem::take(&mut result.bids), sequence);
            result.price = result.bids.iter().map(|b| b.price).sum();
        }
        result.durations = sequence.to_vec();
        result.evaluation_us = start.elapsed().as_micros() as u64;
        result
    }

    fn best_combination(
        &self,
        ranked: &[&[Bid]],
        counts: &[usize],
        depths: &[usize],
        total_slots: usize,
    ) -> CandidateResult {
        let limits = self.exclusion.repeat_limits(total_slots);
        let mut excluded: HashMap<String, BidStatus> = HashMap::new();
        let mut best: Option<CandidateResult> = None;
        let mut cursor = RankCursor::first(counts);

        loop {
            match evaluate_tuple(ranked, &cursor, total_slots, limits) {
                TupleOutcome::Valid(candidate) => match &best {
                    Some(current) if !is_better(&candidate, current) => break,
                    _ => best = Some(candidate),
                },
                TupleOutcome::Rejected { group, slot, reason } => {
                    record_excluded(ranked, &cursor, group, slot, reason, &mut excluded);
                }
            }

            match cursor.advance(depths) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        let mut result = best.unwrap_or_default();
        result.excluded = excluded;
        result
    }
}

/// 把按时长分组选出的出价重新排成时长序列的原始顺序
fn follow_sequence(bids: Vec<Bid>, sequence: &[i64]) -> Vec<Bid> {
    let mut by_duration: HashMap<i64, VecDeque<Bid>> = HashMap::new();
    for bid in bids {
        by_duration.entry(bid.duration).or_default().push_back(bid);
    }
    sequence
        .iter()
        .filter_map(|duration| by_duration.get_mut(duration).and_then(VecDeque::pop_front))
        .collect()
}

fn is_better(candidate: &CandidateResult, current: &CandidateResult) -> bool {
    candidate.deal_bids > current.deal_bids
        || (candidate.deal_bids == current.deal_bids && candidate.price > current.price)
}

fn evaluate_tuple(ranked: &[&[Bid]], cursor: &RankCursor, total_slots: usize, limits: RepeatLimits) -> TupleOutcome {
    let mut candidate = CandidateResult {
        bids: Vec::with_capacity(total_slots),
        ..Default::default()
    };

    for (group, ranks) in cursor.groups().iter().enumerate() {
        for (slot, &rank) in ranks.iter().enumerate() {
            let bid = &ranked[group][rank];
            if bid.deal_tier_satisfied {
                candidate.deal_bids += 1;
            }
            candidate.price += bid.price;

            for cat in &bid.categories {
                let score = candidate.category_score.entry(cat.clone()).or_insert(0);
                *score += 1;
                if *score > limits.category {
                    return TupleOutcome::Rejected { group, slot, reason: BidStatus::CategoryExclusion };
                }
            }
            for domain in &bid.domains {
                let score = candidate.domain_score.entry(domain.clone()).or_insert(0);
                *score += 1;
                if *score > limits.domain {
                    return TupleOutcome::Rejected { group, slot, reason: BidStatus::DomainExclusion };
                }
            }
            candidate.bids.push(bid.clone());
        }
    }

    TupleOutcome::Valid(candidate)
}

/// 记录被拒组合中截至违规位置访问过的出价，先记录的原因保留
fn record_excluded(
    ranked: &[&[Bid]],
    cursor: &RankCursor,
    group: usize,
    slot: usize,
    reason: BidStatus,
    excluded: &mut HashMap<String, BidStatus>,
) {
    for (i, ranks) in cursor.groups().iter().enumerate().take(group + 1) {
        let visited = if i == group { &ranks[..=slot] } else { &ranks[..] };
        for &rank in visited {
            excluded.entry(ranked[i][rank].id.clone()).or_insert(reason);
        }
    }
}
