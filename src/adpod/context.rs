// src/adpod/context.rs

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auction::bucket::duration_wise_buckets;
use crate::auction::combination::CombinationSource;
use crate::auction::duration::match_duration;
use crate::auction::impression::{build_slot_configs, decode_impression_id, ImpressionRangeGenerator};
use crate::auction::metrics::MetricsSink;
use crate::auction::orchestrator::ConcurrentOrchestrator;
use crate::auction::selector::{apply_exclusion_reasons, select_winner};
use crate::config::AdPodConfig;
use crate::creative::vast::{CreativeAssembler, EMPTY_VAST};
use crate::error::{AdPodError, AdPodResult};
use crate::logging::adpod_log::AdPodLog;
use crate::model::bid::{AdPodBid, Bid, BidStatus};
use crate::model::slot::SlotConfig;
use crate::openrtb::response::{self, BidResponse};

/// 广告位胜出结果使用的 seat 名称
pub const ADPOD_SEAT_NAME: &str = "prebid_ctv";

/// **广告位（Ad Pod）竞价上下文**
///
/// 一次请求中单个视频 impression 的全部状态：生成的子广告位、收集到的出价、
/// 竞价结果和失败原因。生命周期为
/// `generate_impressions` -> `collect_bid`* -> `get_ad_pod_bids` -> `bid_statuses` / `vast_or_empty`。
pub struct AdPodContext {
    imp_id: String,
    config: AdPodConfig,
    metrics: Arc<dyn MetricsSink>,
    slots: Vec<SlotConfig>,
    bids: Vec<Bid>,
    winning: Option<AdPodBid>,
    error: Option<AdPodError>,
    combinations: usize,
    timed_out: bool,
}

impl AdPodContext {
    pub fn new(imp_id: &str, config: AdPodConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            imp_id: imp_id.to_string(),
            config,
            metrics,
            slots: Vec::new(),
            bids: Vec::new(),
            winning: None,
            error: None,
            combinations: 0,
            timed_out: false,
        }
    }

    pub fn imp_id(&self) -> &str {
        &self.imp_id
    }

    pub fn slots(&self) -> &[SlotConfig] {
        &self.slots
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn winning(&self) -> Option<&AdPodBid> {
        self.winning.as_ref()
    }

    /// 最近一次竞价失败的原因
    pub fn error(&self) -> Option<&AdPodError> {
        self.error.as_ref()
    }

    /// **生成子广告位**
    ///
    /// 每个时长范围对应一个子 impression，id 为 `"{impId}_{seq}"`，seq 从 1 开始。
    pub fn generate_impressions(&mut self, generator: &mut dyn ImpressionRangeGenerator) -> AdPodResult<&[SlotConfig]> {
        let ranges = generator.get();
        if ranges.is_empty() {
            return Err(AdPodError::ImpressionGeneration { imp_id: self.imp_id.clone() });
        }
        self.slots = build_slot_configs(&self.imp_id, &ranges);
        debug!(imp_id = %self.imp_id, slots = self.slots.len(), "adpod impressions generated");
        Ok(&self.slots)
    }

    /// **收集单个出价**
    ///
    /// 出价的 impid 必须是本广告位生成的子 impression。价格为 0 的出价直接丢弃。
    pub fn collect_bid(&mut self, bid: &response::Bid, seat: &str) -> AdPodResult<()> {
        let (original_imp_id, sequence) = decode_impression_id(&bid.impid)?;
        if original_imp_id != self.imp_id {
            return Err(AdPodError::InvalidImpressionId(bid.impid.clone()));
        }
        let slot = self
            .slots
            .get(sequence as usize - 1)
            .ok_or_else(|| AdPodError::InvalidImpressionId(bid.impid.clone()))?;

        if bid.price <= 0.0 {
            debug!(bid_id = %bid.id, imp_id = %bid.impid, "dropping zero price adpod bid");
            return Ok(());
        }

        let configured: Vec<i64> = if self.config.creative_durations.is_empty() {
            self.slots.iter().map(|s| s.max_duration).collect()
        } else {
            self.config.creative_durations.clone()
        };
        let (duration, status) = match_duration(
            bid.reported_duration(),
            slot.max_duration,
            &configured,
            self.config.duration_matching_policy,
        );
        if status == BidStatus::DurationMismatch {
            warn!(bid_id = %bid.id, seat, reported = ?bid.reported_duration(), "adpod bid duration mismatch");
        }

        let (id, original_id) = match (bid.generated_bid_id(), bid.id.is_empty()) {
            (Some(generated), _) => (generated.to_string(), Some(bid.id.clone())),
            (None, true) => (Uuid::new_v4().to_string(), None),
            (None, false) => (bid.id.clone(), None),
        };
        let (id, original_id) = if self.bids.iter().any(|b| b.id == id) {
            let replacement = Uuid::new_v4().to_string();
            warn!(bid_id = %id, seat, replacement = %replacement, "duplicate adpod bid id, assigning a new one");
            (replacement, original_id.or_else(|| Some(bid.id.clone())))
        } else {
            (id, original_id)
        };

        self.bids.push(Bid {
            id,
            original_id,
            imp_id: bid.impid.clone(),
            seat: seat.to_string(),
            price: bid.price,
            duration,
            categories: bid.cat.clone(),
            domains: bid.adomain.clone(),
            deal_tier_satisfied: bid.deal_tier_satisfied(),
            status,
            adm: bid.adm.clone(),
        });
        Ok(())
    }

    /// 收集整个 BidResponse 中的出价，无法识别的出价只记录日志
    pub fn collect_response(&mut self, response: &BidResponse) {
        for seat_bid in &response.seatbid {
            for bid in &seat_bid.bid {
                if let Err(e) = self.collect_bid(bid, &seat_bid.seat) {
                    warn!(bid_id = %bid.id, seat = %seat_bid.seat, error = %e, "skipping adpod bid");
                }
            }
        }
    }

    /// **广告位竞价入口**
    ///
    /// 失败时返回 None，原因可通过 `error()` 获取。
    pub async fn get_ad_pod_bids(&mut self, source: Box<dyn CombinationSource>) -> Option<AdPodBid> {
        match self.hold_auction(source).await {
            Ok(winning) => {
                self.error = None;
                Some(winning)
            }
            Err(e) => {
                info!(imp_id = %self.imp_id, error = %e, "adpod auction produced no pod");
                self.error = Some(e);
                None
            }
        }
    }

    async fn hold_auction(&mut self, source: Box<dyn CombinationSource>) -> AdPodResult<AdPodBid> {
        let start = Instant::now();
        self.winning = None;
        self.combinations = 0;
        self.timed_out = false;
        // 时长不匹配在收集阶段确定，其余状态由本次竞价重新决定
        for bid in self.bids.iter_mut().filter(|b| b.status != BidStatus::DurationMismatch) {
            bid.status = BidStatus::Ok;
        }
        if self.slots.is_empty() {
            return Err(AdPodError::ImpressionGeneration { imp_id: self.imp_id.clone() });
        }

        let buckets = duration_wise_buckets(&self.bids);
        if buckets.is_empty() {
            return Err(if self.bids.is_empty() {
                AdPodError::UnableToGenerateAdPod { imp_id: self.imp_id.clone() }
            } else {
                AdPodError::AllBidsFiltered { imp_id: self.imp_id.clone() }
            });
        }

        let orchestrator = ConcurrentOrchestrator::new(
            self.config.worker_count,
            self.config.evaluation_timeout(),
            self.config.exclusion(),
            Arc::clone(&self.metrics),
        );
        let outcome = orchestrator.run(Arc::new(buckets), source).await;
        self.combinations = outcome.combinations();
        self.timed_out = outcome.timed_out;

        if outcome.results.is_empty() {
            return Err(AdPodError::ImpressionGeneration { imp_id: self.imp_id.clone() });
        }

        apply_exclusion_reasons(&outcome.results, &mut self.bids);
        let candidate = select_winner(&outcome.results)
            .ok_or_else(|| AdPodError::UnableToGenerateAdPod { imp_id: self.imp_id.clone() })?;

        let mut winning = AdPodBid::from_candidate(candidate, &self.imp_id, ADPOD_SEAT_NAME);
        for bid in winning.bids.iter_mut() {
            bid.status = BidStatus::Winning;
        }
        for bid in self.bids.iter_mut() {
            if winning.bids.iter().any(|w| w.id == bid.id) {
                bid.status = BidStatus::Winning;
            }
        }

        info!(
            imp_id = %self.imp_id,
            combinations = self.combinations,
            timed_out = self.timed_out,
            winners = winning.bids.len(),
            price = winning.price,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "adpod auction completed"
        );
        self.winning = Some(winning.clone());
        Ok(winning)
    }

    /// **出价状态（APRC）**：bid id -> 状态
    pub fn bid_statuses(&self) -> BTreeMap<String, BidStatus> {
        self.bids.iter().map(|b| (b.id.clone(), b.status)).collect()
    }

    /// 胜出且带素材的出价 id，按广告位顺序
    pub fn winning_bid_ids(&self) -> Vec<&str> {
        self.winning
            .iter()
            .flat_map(|w| w.bids.iter())
            .filter(|b| !b.adm.is_empty())
            .map(|b| b.id.as_str())
            .collect()
    }

    /// 合并胜出出价的 VAST 素材
    pub fn creative(&self) -> Option<String> {
        let winning = self.winning.as_ref()?;
        CreativeAssembler::assemble(&winning.bids)
    }

    pub fn vast_or_empty(&self) -> String {
        self.creative().unwrap_or_else(|| EMPTY_VAST.to_string())
    }

    /// 生成本次竞价的汇总日志
    pub fn log_record(&self) -> AdPodLog {
        let mut log = AdPodLog::new(&self.imp_id);
        log.slots = self.slots.len();
        log.combinations = self.combinations;
        log.timed_out = self.timed_out;
        log.error = self.error.as_ref().map(ToString::to_string);
        for bid in &self.bids {
            log.add_bid_status(bid);
        }
        if let Some(winning) = &self.winning {
            let ids = self.winning_bid_ids().into_iter().map(String::from).collect();
            log.set_winner(ids, winning.price);
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::combination::SequenceList;
    use crate::auction::impression::FixedRanges;
    use crate::auction::metrics::NoopMetricsSink;
    use crate::model::slot::DurationMatchingPolicy;
    use serde_json::json;

    fn context(config: AdPodConfig) -> AdPodContext {
        let config = AdPodConfig { evaluation_timeout_ms: 1_000, ..config };
        let mut ctx = AdPodContext::new("imp1", config, Arc::new(NoopMetricsSink));
        ctx.generate_impressions(&mut FixedRanges(vec![(5, 30), (5, 30)])).unwrap();
        ctx
    }

    fn rtb_bid(id: &str, impid: &str, price: f64, duration: i64) -> response::Bid {
        response::Bid {
            id: id.to_string(),
            impid: impid.to_string(),
            price,
            adm: format!("<VAST><Ad>{}</Ad></VAST>", id),
            ext: json!({"prebid": {"video": {"duration": duration}}}),
            ..Default::default()
        }
    }

    #[test]
    fn no_ranges_is_an_impression_generation_error() {
        let mut ctx = AdPodContext::new("imp1", AdPodConfig::default(), Arc::new(NoopMetricsSink));
        let err = ctx.generate_impressions(&mut FixedRanges::default()).unwrap_err();
        assert!(matches!(err, AdPodError::ImpressionGeneration { .. }));
        assert_eq!(err.to_string(), "unable to generate impressions for adpod for impression: imp1");
    }

    #[test]
    fn collect_bid_annotates_duration_and_ids() {
        let config = AdPodConfig {
            creative_durations: vec![15, 30],
            duration_matching_policy: DurationMatchingPolicy::Roundup,
            ..Default::default()
        };
        let mut ctx = context(config);

        ctx.collect_bid(&rtb_bid("a", "imp1_1", 2.0, 12), "seat1").unwrap();
        ctx.collect_bid(&rtb_bid("b", "imp1_2", 1.0, 45), "seat1").unwrap();
        ctx.collect_bid(&rtb_bid("zero", "imp1_1", 0.0, 15), "seat1").unwrap();
        ctx.collect_bid(&rtb_bid("", "imp1_2", 1.5, 30), "seat2").unwrap();

        let bids = ctx.bids();
        assert_eq!(bids.len(), 3);
        assert_eq!((bids[0].duration, bids[0].status), (15, BidStatus::Ok));
        assert_eq!((bids[1].duration, bids[1].status), (45, BidStatus::DurationMismatch));
        assert!(Uuid::parse_str(&bids[2].id).is_ok());
        assert_eq!(bids[2].seat, "seat2");
    }

    #[test]
    fn generated_bid_id_keeps_bidder_id_as_original() {
        let mut ctx = context(AdPodConfig::default());
        let mut bid = rtb_bid("bidder-1", "imp1_1", 1.0, 30);
        bid.ext = json!({"prebid": {"bidid": "pod-1"}});
        ctx.collect_bid(&bid, "seat").unwrap();

        assert_eq!(ctx.bids()[0].id, "pod-1");
        assert_eq!(ctx.bids()[0].original_id.as_deref(), Some("bidder-1"));
        assert!(ctx.bids()[0].needs_bid_id_rewrite());
    }

    #[test]
    fn duplicate_bid_ids_across_seats_are_kept_apart() {
        let mut ctx = context(AdPodConfig::default());
        ctx.collect_bid(&rtb_bid("1", "imp1_1", 2.0, 30), "seat1").unwrap();
        ctx.collect_bid(&rtb_bid("1", "imp1_2", 1.0, 30), "seat2").unwrap();

        let bids = ctx.bids();
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].id, "1");
        assert_ne!(bids[1].id, "1");
        assert!(Uuid::parse_str(&bids[1].id).is_ok());
        assert_eq!(bids[1].original_id.as_deref(), Some("1"));
        assert_eq!(ctx.bid_statuses().len(), 2);
    }

    #[test]
    fn foreign_impressions_are_rejected() {
        let mut ctx = context(AdPodConfig::default());
        assert!(ctx.collect_bid(&rtb_bid("a", "other_1", 1.0, 30), "s").is_err());
        assert!(ctx.collect_bid(&rtb_bid("a", "imp1_3", 1.0, 30), "s").is_err());
        assert!(ctx.collect_bid(&rtb_bid("a", "imp1", 1.0, 30), "s").is_err());
        assert!(ctx.bids().is_empty());
    }

    #[tokio::test]
    async fn empty_buckets_give_no_pod() {
        let mut ctx = context(AdPodConfig::default());
        let pod = ctx.get_ad_pod_bids(Box::new(SequenceList::new(vec![vec![30, 30]]))).await;
        assert!(pod.is_none());
        assert!(matches!(ctx.error(), Some(AdPodError::UnableToGenerateAdPod { .. })));
        assert_eq!(ctx.vast_or_empty(), EMPTY_VAST);
    }

    #[tokio::test]
    async fn all_mismatched_bids_are_reported_as_filtered() {
        let config = AdPodConfig {
            creative_durations: vec![15],
            duration_matching_policy: DurationMatchingPolicy::Exact,
            ..Default::default()
        };
        let mut ctx = context(config);
        ctx.collect_bid(&rtb_bid("a", "imp1_1", 2.0, 20), "s").unwrap();

        let pod = ctx.get_ad_pod_bids(Box::new(SequenceList::new(vec![vec![15]]))).await;
        assert!(pod.is_none());
        assert!(matches!(ctx.error(), Some(AdPodError::AllBidsFiltered { .. })));
        assert_eq!(ctx.bid_statuses()["a"], BidStatus::DurationMismatch);
    }

    #[tokio::test]
    async fn exhausted_source_is_a_generation_failure() {
        let mut ctx = context(AdPodConfig::default());
        ctx.collect_bid(&rtb_bid("a", "imp1_1", 2.0, 30), "s").unwrap();
        let pod = ctx.get_ad_pod_bids(Box::new(SequenceList::default())).await;
        assert!(pod.is_none());
        assert!(matches!(ctx.error(), Some(AdPodError::ImpressionGeneration { .. })));
    }

    #[tokio::test]
    async fn winners_are_marked_and_merged() {
        let mut ctx = context(AdPodConfig::default());
        ctx.collect_bid(&rtb_bid("a", "imp1_1", 3.0, 30), "s").unwrap();
        ctx.collect_bid(&rtb_bid("b", "imp1_2", 2.0, 30), "s").unwrap();
        ctx.collect_bid(&rtb_bid("c", "imp1_2", 1.0, 30), "s").unwrap();

        let pod = ctx
            .get_ad_pod_bids(Box::new(SequenceList::new(vec![vec![30, 30], vec![30]])))
            .await
            .unwrap();

        assert_eq!(pod.price, 5.0);
        assert_eq!(pod.original_imp_id, "imp1");
        assert_eq!(pod.seat_name, ADPOD_SEAT_NAME);
        assert_eq!(ctx.winning_bid_ids(), vec!["a", "b"]);

        let statuses = ctx.bid_statuses();
        assert_eq!(statuses["a"], BidStatus::Winning);
        assert_eq!(statuses["b"], BidStatus::Winning);
        assert_eq!(statuses["c"], BidStatus::Ok);

        assert_eq!(
            ctx.vast_or_empty(),
            r#"<VAST version="2.0"><Ad sequence="1">a</Ad><Ad sequence="2">b</Ad></VAST>"#
        );

        let log = ctx.log_record();
        assert_eq!(log.status, "success");
        assert_eq!(log.combinations, 2);
        assert_eq!(log.bid_count, 3);
    }

    #[tokio::test]
    async fn auction_can_be_held_again_on_the_same_context() {
        let mut ctx = context(AdPodConfig::default());
        ctx.collect_bid(&rtb_bid("a", "imp1_1", 3.0, 30), "s").unwrap();
        ctx.collect_bid(&rtb_bid("b", "imp1_2", 2.0, 30), "s").unwrap();
        ctx.collect_bid(&rtb_bid("c", "imp1_2", 1.0, 30), "s").unwrap();

        let first = ctx
            .get_ad_pod_bids(Box::new(SequenceList::new(vec![vec![30, 30]])))
            .await
            .unwrap();
        let second = ctx
            .get_ad_pod_bids(Box::new(SequenceList::new(vec![vec![30, 30]])))
            .await
            .expect("winners from the first run stay eligible");

        let ids = |pod: &AdPodBid| pod.bids.iter().map(|b| b.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(second.price, 5.0);
        assert!(ctx.error().is_none());
        assert_eq!(ctx.winning_bid_ids(), vec!["a", "b"]);
        assert_eq!(ctx.bid_statuses()["c"], BidStatus::Ok);
        assert_eq!(ctx.log_record().combinations, 1);
    }
}
