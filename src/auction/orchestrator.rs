// src/auction/orchestrator.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::task::{self, JoinHandle};
use tokio::time;
use tracing::{debug, warn};

use crate::auction::bucket::BidsBucket;
use crate::auction::combination::CombinationSource;
use crate::auction::exclusion::ExclusionEvaluator;
use crate::auction::metrics::{MetricsSink, PodLabels, COMBINATION_GENERATOR_V1, COMPETITIVE_EXCLUSION_V1};
use crate::model::bid::CandidateResult;
use crate::model::slot::ExclusionConfig;

pub const DEFAULT_WORKERS: usize = 2;

type SharedSource = Arc<Mutex<Box<dyn CombinationSource>>>;

/// 一次编排的结果
#[derive(Debug, Default)]
pub struct OrchestratorOutcome {
    pub results: Vec<CandidateResult>,
    pub timed_out: bool,
    pub generation_time: Duration,
    pub evaluation_time: Duration,
}

impl OrchestratorOutcome {
    pub fn combinations(&self) -> usize {
        self.results.len()
    }
}

/// **并发编排器**
///
/// 固定数量的 worker 在互斥锁保护下从 CombinationSource 取时长序列并评估，
/// 结果通过有界通道回传；消费方在超时或全部完成时停止。
pub struct ConcurrentOrchestrator {
    workers: usize,
    timeout: Duration,
    exclusion: ExclusionConfig,
    metrics: Arc<dyn MetricsSink>,
}

impl ConcurrentOrchestrator {
    pub fn new(workers: usize, timeout: Duration, exclusion: ExclusionConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            workers: workers.max(1),
            timeout,
            exclusion,
            metrics,
        }
    }

    pub async fn run(&self, buckets: Arc<BidsBucket>, source: Box<dyn CombinationSource>) -> OrchestratorOutcome {
        let source: SharedSource = Arc::new(Mutex::new(source));
        let stopped = Arc::new(AtomicBool::new(false));
        let (sender, mut receiver) = mpsc::channel::<CandidateResult>(self.workers);

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker_id| {
                let source = Arc::clone(&source);
                let buckets = Arc::clone(&buckets);
                let stopped = Arc::clone(&stopped);
                let sender = sender.clone();
                let exclusion = self.exclusion;
                task::spawn_blocking(move || worker_loop(worker_id, source, buckets, exclusion, stopped, sender))
            })
            .collect();

        // 所有 worker 结束后才关闭结果通道
        tokio::spawn(supervise(handles, sender));

        let mut outcome = OrchestratorOutcome::default();
        let deadline = time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(result) => {
                        outcome.generation_time += Duration::from_micros(result.generation_us);
                        outcome.evaluation_time += Duration::from_micros(result.evaluation_us);
                        outcome.results.push(result);
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    outcome.timed_out = true;
                    break;
                }
            }
        }

        if outcome.timed_out {
            stopped.store(true, Ordering::Release);
            debug!(timeout_ms = self.timeout.as_millis() as u64, collected = outcome.results.len(), "adpod evaluation timeout reached");
            tokio::spawn(drain(receiver));
        }

        self.record_metrics(&buckets, &outcome);
        outcome
    }

    fn record_metrics(&self, buckets: &BidsBucket, outcome: &OrchestratorOutcome) {
        let generation_labels = PodLabels {
            algorithm: COMBINATION_GENERATOR_V1,
            combinations: Some(outcome.combinations()),
            response_bids: None,
        };
        self.metrics.record_combination_generation(&generation_labels, outcome.generation_time);

        let exclusion_labels = PodLabels {
            algorithm: COMPETITIVE_EXCLUSION_V1,
            combinations: None,
            response_bids: Some(buckets.values().map(Vec::len).sum()),
        };
        self.metrics.record_competitive_exclusion(&exclusion_labels, outcome.evaluation_time);
    }
}

fn worker_loop(
    worker_id: usize,
    source: SharedSource,
    buckets: Arc<BidsBucket>,
    exclusion: ExclusionConfig,
    stopped: Arc<AtomicBool>,
    sender: Sender<CandidateResult>,
) {
    let evaluator = ExclusionEvaluator::new(&buckets, exclusion);
    let mut evaluated = 0usize;

    while !stopped.load(Ordering::Acquire) {
        let start = Instant::now();
        let sequence = source.lock().get();
        let generation_us = start.elapsed().as_micros() as u64;
        if sequence.is_empty() {
            break;
        }

        let mut result = evaluator.evaluate(&sequence);
        result.generation_us = generation_us;
        evaluated += 1;
        if sender.blocking_send(result).is_err() {
            break;
        }
    }

    debug!(worker_id, evaluated, "adpod worker finished");
}

async fn supervise(handles: Vec<JoinHandle<()>>, sender: Sender<CandidateResult>) {
    for joined in join_all(handles).await {
        if let Err(e) = joined {
            warn!(error = %e, "adpod worker panicked");
        }
    }
    drop(sender);
}

/// 超时后继续消费迟到的结果，避免 worker 阻塞在已满的通道上
async fn drain(mut receiver: Receiver<CandidateResult>) {
    let mut late = 0usize;
    while let Some(result) = receiver.recv().await {
        late += 1;
        debug!(durations = ?result.durations, "discarding late adpod combination");
    }
    debug!(late, "adpod result channel drained");
}
