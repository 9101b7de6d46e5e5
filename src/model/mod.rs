pub mod bid;
pub mod slot;

pub use bid::{AdPodBid, Bid, BidStatus, CandidateResult};
pub use slot::{DurationMatchingPolicy, ExclusionConfig, SlotConfig};
