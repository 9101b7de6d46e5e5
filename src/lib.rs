// src/lib.rs

pub mod adpod;
pub mod auction;
pub mod config;
pub mod creative;
pub mod error;
pub mod logging;
pub mod model;
pub mod openrtb;

pub use adpod::AdPodContext;
pub use error::{AdPodError, AdPodResult};
