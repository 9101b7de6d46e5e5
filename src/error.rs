// src/error.rs

use thiserror::Error;

pub type AdPodResult<T> = Result<T, AdPodError>;

/// 广告位（Ad Pod）竞价流程中的错误
#[derive(Error, Debug)]
pub enum AdPodError {
    #[error("unable to generate impressions for adpod for impression: {imp_id}")]
    ImpressionGeneration { imp_id: String },

    #[error("all bids filtered while matching lineitem duration for impression: {imp_id}")]
    AllBidsFiltered { imp_id: String },

    #[error("unable to generate adpod from bids combinations for impression: {imp_id}")]
    UnableToGenerateAdPod { imp_id: String },

    #[error("invalid impression id: {0}")]
    InvalidImpressionId(String),

    #[error("creative error: {0}")]
    Creative(#[from] CreativeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 单个 VAST 素材解析 / 合并失败的原因
#[derive(Error, Debug)]
pub enum CreativeError {
    #[error("malformed VAST xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("VAST root element not found")]
    MissingVastRoot,

    #[error("VAST document ended with {0} unclosed element(s)")]
    Unclosed(usize),

    #[error("merged VAST is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
