//! Morsel-driven parallel runtime.
//!
//! Work is distributed in contiguous row ranges ("morsels", 65,536 rows by
//! default). A fixed pool of workers pulls morsels off a lock-free cursor,
//! produces a shard per morsel tagged with its starting row, and the shards
//! are merged back in row order. Cancellation is observed at morsel
//! boundaries; an in-flight morsel always runs to completion.

use crate::GalleonError;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Default rows per morsel. Matches the engine's benchmark envelope; changing
/// it shifts the cancellation latency bound.
pub const DEFAULT_MORSEL_SIZE: usize = 65_536;

/// Sizing knobs for the worker pool.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    pub num_workers: usize,
    pub morsel_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            num_workers: workers,
            morsel_size: DEFAULT_MORSEL_SIZE,
        }
    }
}

impl ParallelConfig {
    pub fn with_workers(mut self, n: usize) -> Self {
        self.num_workers = n.max(1);
        self
    }

    pub fn with_morsel_size(mut self, n: usize) -> Self {
        self.morsel_size = n.max(1);
        self
    }
}

/// Cloneable cancellation token shared between a caller and the runtime.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Errors with [`GalleonError::Cancelled`] once the token has fired.
    pub fn check(&self) -> Result<(), GalleonError> {
        if self.is_cancelled() {
            Err(GalleonError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Chunks `0..len` into contiguous morsels behind an atomic cursor, so
/// multiple workers can pull without locking.
pub struct MorselIterator {
    cursor: AtomicUsize,
    len: usize,
    morsel_size: usize,
}

impl MorselIterator {
    pub fn new(len: usize, morsel_size: usize) -> Self {
        Self {
            cursor: AtomicUsize::new(0),
            len,
            morsel_size: morsel_size.max(1),
        }
    }

    /// Claims the next morsel, or `None` once the input is exhausted.
    pub fn next_morsel(&self) -> Option<Range<usize>> {
        let start = self.cursor.fetch_add(self.morsel_size, Ordering::Relaxed);
        if start >= self.len {
            return None;
        }
        let end = (start + self.morsel_size).min(self.len);
        Some(start..end)
    }

    pub fn morsel_count(&self) -> usize {
        self.len.div_ceil(self.morsel_size)
    }
}

/// Fixed pool of scoped workers over a shared morsel queue.
pub struct WorkerPool;

impl WorkerPool {
    /// Runs `f` over every morsel of `0..len` and returns the per-morsel
    /// shards sorted by their starting row.
    ///
    /// Workers stop claiming morsels once the token fires or any worker
    /// errors; the first error (cancellation included) is propagated.
    pub fn scatter<R, F>(
        config: &ParallelConfig,
        len: usize,
        token: &CancelToken,
        f: F,
    ) -> Result<Vec<(usize, R)>, GalleonError>
    where
        R: Send,
        F: Fn(Range<usize>) -> Result<R, GalleonError> + Sync,
    {
        let morsels = MorselIterator::new(len, config.morsel_size);
        let workers = config.num_workers.min(morsels.morsel_count()).max(1);

        if workers == 1 {
            let mut shards = Vec::with_capacity(morsels.morsel_count());
            while let Some(range) = morsels.next_morsel() {
                token.check()?;
                let start = range.start;
                shards.push((start, f(range)?));
            }
            return Ok(shards);
        }

        let failed = AtomicBool::new(false);
        let results: Vec<Result<Vec<(usize, R)>, GalleonError>> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| {
                        scope.spawn(|| {
                            let mut local = Vec::new();
                            while let Some(range) = morsels.next_morsel() {
                                if failed.load(Ordering::Acquire) {
                                    break;
                                }
                                if token.is_cancelled() {
                                    failed.store(true, Ordering::Release);
                                    return Err(GalleonError::Cancelled);
                                }
                                let start = range.start;
                                match f(range) {
                                    Ok(shard) => local.push((start, shard)),
                                    Err(e) => {
                                        failed.store(true, Ordering::Release);
                                        return Err(e);
                                    }
                                }
                            }
                            Ok(local)
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or(Err(GalleonError::Cancelled)))
                    .collect()
            });

        let mut shards = Vec::new();
        for res in results {
            shards.extend(res?);
        }
        shards.sort_by_key(|&(start, _)| start);
        Ok(shards)
    }
}
