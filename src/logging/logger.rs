// src/logging/logger.rs

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::error::{AdPodError, AdPodResult};

pub const LOG_FILE_NAME: &str = "adpod_log.json";
const DEFAULT_DIRECTIVE: &str = "info";

/// **初始化全局 tracing 日志**
///
/// - JSON 格式，按小时滚动写入 `<log_dir>/adpod_log.json`（非阻塞）
/// - 同时以紧凑格式输出到 stderr
///
/// 返回的 `WorkerGuard` 必须在进程退出前保持存活，否则缓冲中的日志会丢失。
pub fn init_tracing(log_dir: &str) -> AdPodResult<WorkerGuard> {
    let log_file = rolling::hourly(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().json().with_writer(non_blocking))
        .with(fmt::layer().compact().with_writer(std::io::stderr));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AdPodError::Config(format!("unable to set global tracing subscriber: {}", e)))?;
    Ok(guard)
}
