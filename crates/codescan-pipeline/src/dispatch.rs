// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document dispatcher: runs the page pipeline over every page image of a
// document on a bounded set of blocking workers and merges the results.
//
// Each worker holds one pooled decoder handle for the whole of a page run.
// The worker limit equals the pool capacity, so in steady state every
// handle is reused rather than rebuilt. The first page failure cancels the
// remaining work; results that completed before it are kept.

use std::collections::BTreeMap;
use std::sync::Arc;

use codescan_core::error::{CodescanError, PartialScan, Result};
use codescan_core::{PageCodes, PageIndex, ScanConfig, append_codes};
use codescan_document::{PageImage, extract_pages};
use codescan_engine::{DecodeEngine, HandlePool, RxingEngine};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::pipeline::{PageOutcome, PagePipeline};

/// Scans whole documents.
pub struct Scanner<E: DecodeEngine> {
    pool: Arc<HandlePool<E>>,
    pipeline: Arc<PagePipeline>,
    parallelism: usize,
}

impl Scanner<RxingEngine> {
    /// Scanner backed by the `rxing` engine, configured from `config`.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        let engine = config.engine.clone();
        let pool = HandlePool::new(config.parallelism, move || Ok(RxingEngine::new(&engine)));
        Ok(Self::new(Arc::new(pool), PagePipeline::from_config(config)))
    }
}

impl<E: DecodeEngine> Scanner<E> {
    /// Scanner running at most `pool.capacity()` pages at once.
    pub fn new(pool: Arc<HandlePool<E>>, pipeline: PagePipeline) -> Self {
        let parallelism = pool.capacity().max(1);
        Self {
            pool,
            pipeline: Arc::new(pipeline),
            parallelism,
        }
    }

    pub fn pool(&self) -> &HandlePool<E> {
        &self.pool
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Close every idle decoder handle. Call once when done scanning.
    pub fn shutdown(&self) -> usize {
        let closed = self.pool.drain();
        info!(
            closed,
            created = self.pool.created(),
            destroyed = self.pool.destroyed(),
            "Scanner shut down"
        );
        closed
    }

    /// Scan one document (a PDF or a standalone image) held in `data`.
    ///
    /// Returns the codes found per page. A page with several images lists
    /// their codes in extraction order. On failure the pages that completed
    /// before it are returned alongside the error. After cancellation
    /// those partial results may be incomplete.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub async fn process(
        &self,
        data: Vec<u8>,
        cancel: &CancellationToken,
    ) -> std::result::Result<PageCodes, PartialScan> {
        let run = cancel.child_token();
        let pages = extract(data, &run).await.map_err(PartialScan::empty)?;
        info!(images = pages.len(), "Page images extracted");

        let permits = Arc::new(Semaphore::new(self.parallelism));
        let mut workers = JoinSet::new();
        for (seq, page) in pages.into_iter().enumerate() {
            let pool = Arc::clone(&self.pool);
            let pipeline = Arc::clone(&self.pipeline);
            let permits = Arc::clone(&permits);
            let token = run.clone();
            workers.spawn(async move {
                let index = page.page;
                let result = scan_page(pool, pipeline, permits, page, token).await;
                (seq, index, result)
            });
        }

        // Keyed by extraction sequence so merging is independent of
        // completion order.
        let mut finished: BTreeMap<usize, (PageIndex, Vec<String>)> = BTreeMap::new();
        let mut failure: Option<CodescanError> = None;
        while let Some(joined) = workers.join_next().await {
            let (seq, page, result) = match joined {
                Ok(done) => done,
                Err(err) => {
                    let err = CodescanError::Worker(format!("page task failed: {}", err));
                    stop(&mut failure, err, &run);
                    continue;
                }
            };
            match result {
                Ok(outcome) => {
                    debug!(page, seq, codes = outcome.codes.len(), "Page image merged");
                    finished.insert(seq, (page, outcome.codes));
                }
                Err(err) => {
                    if !err.is_cancelled() {
                        warn!(page, error = %err, "Page failed, stopping document");
                    }
                    stop(&mut failure, err, &run);
                }
            }
        }

        let mut codes = PageCodes::new();
        for (page, found) in finished.into_values() {
            append_codes(&mut codes, page, found);
        }

        match failure {
            None => {
                info!(pages = codes.len(), "Document scanned");
                Ok(codes)
            }
            Some(err) => Err(PartialScan::new(codes, err)),
        }
    }
}

impl<E: DecodeEngine> std::fmt::Debug for Scanner<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("pool", &self.pool)
            .field("pipeline", &self.pipeline)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}

/// Record the first failure and cancel the rest of the run.
fn stop(failure: &mut Option<CodescanError>, err: CodescanError, run: &CancellationToken) {
    if failure.is_none() {
        *failure = Some(err);
    }
    run.cancel();
}

async fn extract(data: Vec<u8>, cancel: &CancellationToken) -> Result<Vec<PageImage>> {
    let task = tokio::task::spawn_blocking(move || extract_pages(data));
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CodescanError::Cancelled),
        joined = task => joined
            .map_err(|err| CodescanError::Worker(format!("extraction task failed: {}", err)))?,
    }
}

/// Wait for a worker slot, then run the pipeline on a blocking thread with a
/// leased decoder handle.
async fn scan_page<E: DecodeEngine>(
    pool: Arc<HandlePool<E>>,
    pipeline: Arc<PagePipeline>,
    permits: Arc<Semaphore>,
    page: PageImage,
    cancel: CancellationToken,
) -> Result<PageOutcome> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CodescanError::Cancelled),
        permit = permits.acquire_owned() => permit
            .map_err(|err| CodescanError::Worker(format!("worker limit closed: {}", err)))?,
    };

    tokio::task::spawn_blocking(move || {
        let mut engine = pool.lease()?;
        pipeline.run(&page, &mut *engine, &cancel)
    })
    .await
    .map_err(|err| CodescanError::Worker(format!("page task failed: {}", err)))?
}
