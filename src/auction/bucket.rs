// src/auction/bucket.rs

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::bid::{Bid, BidStatus};

/// 时长 -> 排好序的出价列表（deal 优先，然后价格降序）
pub type BidsBucket = BTreeMap<i64, Vec<Bid>>;

/// 按生效时长分桶，只有状态为 Ok 的出价参与
pub fn duration_wise_buckets(bids: &[Bid]) -> BidsBucket {
    let mut buckets = BidsBucket::new();
    for bid in bids.iter().filter(|b| b.status == BidStatus::Ok) {
        buckets.entry(bid.duration).or_default().push(bid.clone());
    }
    for ranked in buckets.values_mut() {
        sort_bids(ranked);
    }
    buckets
}

/// 稳定排序：deal 出价在前，其次价格降序
pub fn sort_bids(bids: &mut [Bid]) {
    bids.sort_by(|a, b| {
        b.deal_tier_satisfied
            .cmp(&a.deal_tier_satisfied)
            .then_with(|| b.price.partial_cmp(&a.price).unwrap_or(Ordering::Equal))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bid(id: &str, duration: i64, price: f64, deal: bool) -> Bid {
        Bid {
            id: id.to_string(),
            duration,
            price,
            deal_tier_satisfied: deal,
            ..Default::default()
        }
    }

    #[test]
    fn empty_input_gives_empty_buckets() {
        assert!(duration_wise_buckets(&[]).is_empty());
    }

    #[test]
    fn deal_bids_rank_before_higher_prices() {
        let bids = vec![
            bid("a", 30, 5.0, false),
            bid("b", 30, 1.0, true),
            bid("c", 30, 9.0, false),
            bid("d", 15, 2.0, false),
        ];
        let buckets = duration_wise_buckets(&bids);
        let ids: Vec<&str> = buckets[&30].iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(buckets[&15].len(), 1);
    }

    #[test]
    fn non_ok_bids_are_left_out() {
        let mut mismatched = bid("x", 45, 10.0, false);
        mismatched.status = BidStatus::DurationMismatch;
        let buckets = duration_wise_buckets(&[mismatched, bid("y", 30, 1.0, false)]);
        assert!(!buckets.contains_key(&45));
        assert_eq!(buckets.len(), 1);
    }

    proptest! {
        #[test]
        fn every_bucket_holds_only_its_duration(
            raw in prop::collection::vec((0i64..4, 0u32..1000, any::<bool>()), 0..40)
        ) {
            let bids: Vec<Bid> = raw
                .iter()
                .enumerate()
                .map(|(i, (d, p, deal))| bid(&i.to_string(), d * 15, *p as f64 / 10.0, *deal))
                .collect();
            let buckets = duration_wise_buckets(&bids);
            let total: usize = buckets.values().map(Vec::len).sum();
            prop_assert_eq!(total, bids.len());
            for (duration, ranked) in &buckets {
                for pair in ranked.windows(2) {
                    prop_assert!(pair[0].deal_tier_satisfied >= pair[1].deal_tier_satisfied);
                    if pair[0].deal_tier_satisfied == pair[1].deal_tier_satisfied {
                        prop_assert!(pair[0].price >= pair[1].price);
                    }
                }
                prop_assert!(ranked.iter().all(|b| b.duration == *duration));
            }
        }
    }
}
