//! Work distribution: file blocks, the shared block queue and the worker pool.

use crate::core::error::{Error, Result};
use crate::scanner::context::RunContext;
use crate::scanner::results::{FileResult, ResultAggregator, ScanReport};
use crate::scanner::worker::ScanWorker;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Capacity of the worker-to-collector channel.
const RESULT_CHANNEL_CAPACITY: usize = 1000;

/// Upper bound on files per block once the task count passes the last threshold.
const MAX_BLOCK_FILES: usize = 1000;

/// Message from a worker to the collector.
#[derive(Debug)]
pub enum WorkerEvent {
    /// A file was scanned to completion
    Scanned(FileResult),
    /// A file could not be opened or read
    Failed { path: PathBuf, reason: String },
}

/// A batch of whole files owned by one worker until drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    paths: Vec<PathBuf>,
}

impl FileBlock {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Multiple-consumer queue of file blocks.
///
/// Filled once before workers start; each `pop` hands a block to exactly one
/// caller.
#[derive(Debug, Default)]
pub struct BlockQueue {
    blocks: Mutex<VecDeque<FileBlock>>,
}

impl BlockQueue {
    /// Split `tasks` into blocks of at most `block_size` files.
    pub fn from_tasks(tasks: Vec<PathBuf>, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        let mut blocks = VecDeque::new();
        let mut tasks = tasks.into_iter().peekable();

        while tasks.peek().is_some() {
            blocks.push_back(FileBlock::new(tasks.by_ref().take(block_size).collect()));
        }

        Self {
            blocks: Mutex::new(blocks),
        }
    }

    /// Take the next block, or `None` once the queue is drained.
    pub fn pop(&self) -> Result<Option<FileBlock>> {
        let mut blocks = self
            .blocks
            .lock()
            .map_err(|_| Error::lock_poisoned("block queue (pop)"))?;
        Ok(blocks.pop_front())
    }

    /// Number of blocks still queued.
    pub fn len(&self) -> Result<usize> {
        let blocks = self
            .blocks
            .lock()
            .map_err(|_| Error::lock_poisoned("block queue (len)"))?;
        Ok(blocks.len())
    }
}

/// How a task list is split across the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPlan {
    /// Files per block
    pub block_size: usize,
    /// Number of blocks produced
    pub blocks: usize,
    /// Number of workers to spawn
    pub workers: usize,
}

impl BlockPlan {
    /// Compute the block plan for `tasks` files and a requested worker count.
    ///
    /// Small runs get a single block and a single worker; larger runs get a
    /// fixed block count per threshold, and past 10000 files no block holds
    /// more than 1000 files.
    pub fn for_tasks(tasks: usize, workers: usize) -> Self {
        if tasks == 0 {
            return Self {
                block_size: 0,
                blocks: 0,
                workers: 0,
            };
        }

        let target_blocks = match tasks {
            0..=9 => 1,
            10..=99 => 4,
            100..=999 => 8,
            1000..=9999 => 10,
            _ => tasks.div_ceil(MAX_BLOCK_FILES),
        };

        let block_size = tasks.div_ceil(target_blocks);
        let blocks = tasks.div_ceil(block_size);
        let workers = if target_blocks == 1 {
            1
        } else {
            workers.max(1).min(blocks)
        };

        Self {
            block_size,
            blocks,
            workers,
        }
    }
}

/// Runs one worker pool over a task list and collects the results.
pub struct Dispatcher {
    worker: ScanWorker,
    context: Arc<RunContext>,
    workers: usize,
}

impl Dispatcher {
    /// `worker` is cloned into every spawned task.
    pub fn new(worker: ScanWorker, context: Arc<RunContext>, workers: usize) -> Self {
        Self {
            worker,
            context,
            workers,
        }
    }

    /// Scan every task and block until all workers have terminated.
    ///
    /// Returns `Error::ScanCancelled` without any results if the run was
    /// cancelled while scanning.
    pub async fn run(&self, tasks: Vec<PathBuf>) -> Result<ScanReport> {
        if tasks.is_empty() {
            return Err(Error::EmptyInput);
        }

        let started_at = Utc::now();
        let plan = BlockPlan::for_tasks(tasks.len(), self.workers);
        log::info!(
            "Dispatching {} file(s) in {} block(s) of up to {} across {} worker(s)",
            tasks.len(),
            plan.blocks,
            plan.block_size,
            plan.workers
        );

        let queue = Arc::new(BlockQueue::from_tasks(tasks, plan.block_size));

        // Set up channels for results
        let (tx, mut rx) = mpsc::channel::<WorkerEvent>(RESULT_CHANNEL_CAPACITY);

        let mut handles = Vec::with_capacity(plan.workers);
        for id in 0..plan.workers {
            let queue = Arc::clone(&queue);
            let worker = self.worker.clone();
            let tx = tx.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                log::debug!("Worker {} started", id);
                let outcome = worker.drain(&queue, &tx);
                log::debug!("Worker {} finished", id);
                outcome
            }));
        }

        // Drop the sender so the channel closes when workers finish
        drop(tx);

        let mut aggregator = ResultAggregator::new();
        while let Some(event) = rx.recv().await {
            match event {
                WorkerEvent::Scanned(result) => aggregator.add(result),
                WorkerEvent::Failed { path, reason } => aggregator.add_failure(path, reason),
            }
        }

        let mut failure = None;
        for handle in handles {
            let outcome = handle
                .await
                .map_err(|e| Error::WorkerFailed(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = outcome {
                log::error!("{}", e);
                failure.get_or_insert(e);
            }
        }

        if self.context.is_cancelled() {
            log::info!("Scan cancelled; discarding {} partial result(s)", aggregator.len());
            return Err(Error::ScanCancelled);
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let report = aggregator.finish(&self.context, started_at);
        log::info!(
            "Scan completed: {} files scanned, {} failed, {} matches",
            report.summary.files_scanned,
            report.summary.files_failed,
            report.summary.total_matches()
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PatternConfig;
    use crate::core::types::IocCategory;
    use crate::detection::{PatternSet, WhitelistIndex};
    use crate::scanner::worker::ChunkOptions;
    use std::collections::HashSet;

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/t/{i}"))).collect()
    }

    #[test]
    fn test_block_plan_thresholds() {
        assert_eq!(
            BlockPlan::for_tasks(7, 4),
            BlockPlan { block_size: 7, blocks: 1, workers: 1 }
        );
        assert_eq!(
            BlockPlan::for_tasks(40, 4),
            BlockPlan { block_size: 10, blocks: 4, workers: 4 }
        );
        assert_eq!(
            BlockPlan::for_tasks(800, 16),
            BlockPlan { block_size: 100, blocks: 8, workers: 8 }
        );
        assert_eq!(
            BlockPlan::for_tasks(5000, 4),
            BlockPlan { block_size: 500, blocks: 10, workers: 4 }
        );
    }

    #[test]
    fn test_block_plan_large_inputs_are_bounded() {
        for n in [10_000, 10_001, 123_456, 2_000_000] {
            let plan = BlockPlan::for_tasks(n, 8);
            assert!(plan.block_size <= MAX_BLOCK_FILES, "n = {n}");
            assert!(plan.block_size * plan.blocks >= n);
            assert_eq!(plan.workers, 8);
        }
    }

    #[test]
    fn test_block_plan_covers_every_task() {
        for n in 1..500 {
            let plan = BlockPlan::for_tasks(n, 4);
            let queue = BlockQueue::from_tasks(paths(n), plan.block_size);
            assert_eq!(queue.len().unwrap(), plan.blocks, "n = {n}");
            assert!(plan.workers <= plan.blocks);
        }
    }

    #[test]
    fn test_queue_delivers_each_block_once() {
        let queue = Arc::new(BlockQueue::from_tasks(paths(1000), 7));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Some(block) = queue.pop().unwrap() {
                        seen.extend(block.paths().to_vec());
                    }
                    seen
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 1000);
        assert_eq!(unique.len(), 1000);
    }

    fn dispatcher(context: Arc<RunContext>) -> Dispatcher {
        let patterns =
            Arc::new(PatternSet::compile(&PatternConfig::default(), &IocCategory::ALL).unwrap());
        let worker = ScanWorker::new(
            patterns,
            Arc::new(WhitelistIndex::empty()),
            ChunkOptions::default(),
            Arc::clone(&context),
        );
        Dispatcher::new(worker, context, 4)
    }

    #[tokio::test]
    async fn test_run_rejects_empty_input() {
        let ctx = Arc::new(RunContext::new());
        let err = dispatcher(ctx).run(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
    }

    #[tokio::test]
    async fn test_run_collects_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tasks = Vec::new();
        for i in 0..25 {
            let path = dir.path().join(format!("f{i}.txt"));
            std::fs::write(&path, format!("beacon to 10.0.{i}.1\n")).unwrap();
            tasks.push(path);
        }
        tasks.push(dir.path().join("vanished.txt"));

        let ctx = Arc::new(RunContext::new());
        ctx.set_total_files(tasks.len() as u64);
        let report = dispatcher(Arc::clone(&ctx)).run(tasks).await.unwrap();

        assert_eq!(report.results.len(), 25);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.summary.category_total(IocCategory::Ip), 25);
        assert_eq!(ctx.files_processed(), 26);
    }

    #[tokio::test]
    async fn test_cancelled_run_produces_no_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "1.2.3.4").unwrap();

        let ctx = Arc::new(RunContext::new());
        ctx.cancel();
        let err = dispatcher(ctx).run(vec![path]).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
