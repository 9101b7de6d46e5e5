// src/config/repository.rs

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::config::config_manager::AdPodConfig;
use crate::error::AdPodResult;

/// 广告位配置仓库，显式构造后注入到调用方
pub trait ConfigRepository: Send + Sync {
    fn adpod_config(&self, profile_id: &str) -> AdPodResult<Option<AdPodConfig>>;
}

/// 从 JSON 文件读取配置，文件内容为 `{ "<profile_id>": AdPodConfig, ... }`
pub struct FileConfigRepository {
    pub path: PathBuf,
}

impl FileConfigRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigRepository for FileConfigRepository {
    fn adpod_config(&self, profile_id: &str) -> AdPodResult<Option<AdPodConfig>> {
        let content = fs::read_to_string(&self.path)?;
        let mut profiles: HashMap<String, AdPodConfig> = serde_json::from_str(&content)?;
        let config = profiles.remove(profile_id);
        if let Some(cfg) = &config {
            cfg.validate()?;
        }
        debug!(profile_id, found = config.is_some(), path = %self.path.display(), "adpod config lookup");
        Ok(config)
    }
}

#[derive(Default)]
pub struct InMemoryConfigRepository {
    profiles: HashMap<String, AdPodConfig>,
}

impl InMemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile_id: &str, config: AdPodConfig) {
        self.profiles.insert(profile_id.to_string(), config);
    }
}

impl ConfigRepository for InMemoryConfigRepository {
    fn adpod_config(&self, profile_id: &str) -> AdPodResult<Option<AdPodConfig>> {
        Ok(self.profiles.get(profile_id).cloned())
    }
}
