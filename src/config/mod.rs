pub mod config_manager;
pub mod repository;

pub use config_manager::AdPodConfig;
pub use repository::{ConfigRepository, FileConfigRepository, InMemoryConfigRepository};
