pub mod adpod_log;
pub mod logger;

pub use adpod_log::AdPodLog;
pub use logger::init_tracing;
