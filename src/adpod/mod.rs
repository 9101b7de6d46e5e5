pub mod context;

pub use context::{AdPodContext, ADPOD_SEAT_NAME};
