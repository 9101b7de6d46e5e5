// src/main.rs

use clap::Parser;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tracing::info;

use adpod::auction::combination::SequenceList;
use adpod::auction::impression::FixedRanges;
use adpod::auction::metrics::PrometheusMetricsSink;
use adpod::config::{AdPodConfig, ConfigRepository, FileConfigRepository};
use adpod::logging::init_tracing;
use adpod::model::{AdPodBid, BidStatus};
use adpod::openrtb::response::BidResponse;
use adpod::{AdPodContext, AdPodError, AdPodResult};

#[derive(Parser, Debug)]
#[command(author = "whiteCcinn", version = "1.0", about = "Runs one video ad pod auction from a JSON fixture")]
struct CliArgs {
    /// 竞价数据（impression、子广告位、BidResponse、候选时长序列）
    #[arg(short, long)]
    fixture: String,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    /// 配置文件中的 profile id
    #[arg(long, default_value = "default")]
    profile: String,
    /// 广告位配置文件，内容为 `{ "<profile>": AdPodConfig }`
    #[arg(long)]
    config: Option<String>,
}

/// **竞价数据文件**
#[derive(Deserialize, Debug)]
struct AuctionFixture {
    imp_id: String,
    /// 子广告位时长范围；缺省时使用 `AdPodConfig::default_slot_ranges`
    #[serde(default)]
    slots: Option<Vec<(i64, i64)>>,
    response: BidResponse,
    #[serde(default)]
    sequences: Vec<Vec<i64>>,
    #[serde(default)]
    config: Option<AdPodConfig>,
}

#[derive(Serialize, Debug)]
struct AuctionSummary<'a> {
    imp_id: &'a str,
    winning: Option<&'a AdPodBid>,
    winning_bid_ids: Vec<&'a str>,
    bid_statuses: BTreeMap<String, BidStatus>,
    error: Option<String>,
    vast: String,
}

fn resolve_config(args: &CliArgs, fixture: &AuctionFixture) -> AdPodResult<AdPodConfig> {
    let config = match &args.config {
        Some(path) => FileConfigRepository::new(path)
            .adpod_config(&args.profile)?
            .ok_or_else(|| AdPodError::Config(format!("profile {} not found in {}", args.profile, path)))?,
        None => fixture.config.clone().unwrap_or_default(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> AdPodResult<()> {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志，guard 需要保持到进程退出
    let _guard = init_tracing(&args.log_dir)?;

    let fixture: AuctionFixture = serde_json::from_str(&fs::read_to_string(&args.fixture)?)?;
    let config = resolve_config(&args, &fixture)?;
    info!(fixture = %args.fixture, imp_id = %fixture.imp_id, profile = %args.profile, "adpod auction starting");

    let ranges = fixture
        .slots
        .clone()
        .unwrap_or_else(|| config.default_slot_ranges());

    let mut context = AdPodContext::new(&fixture.imp_id, config, Arc::new(PrometheusMetricsSink));
    context.generate_impressions(&mut FixedRanges(ranges))?;
    context.collect_response(&fixture.response);

    let winning = context
        .get_ad_pod_bids(Box::new(SequenceList::new(fixture.sequences)))
        .await;
    context.log_record().emit();

    let summary = AuctionSummary {
        imp_id: context.imp_id(),
        winning: winning.as_ref(),
        winning_bid_ids: context.winning_bid_ids(),
        bid_statuses: context.bid_statuses(),
        error: context.error().map(ToString::to_string),
        vast: context.vast_or_empty(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
