//! Scratch-buffer pool for mask and staging buffers.
//!
//! Buffers are lent out as [`PooledBuffer`] guards. Dropping a guard returns
//! its storage to the pool, so a caller that forgets an explicit
//! [`PooledBuffer::release`] leaks nothing.

use fxhash::FxHashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Pool of reusable byte buffers, bucketed by size.
pub struct BufferPool {
    pools: Mutex<FxHashMap<usize, Vec<Vec<u8>>>>,
    /// Buffers larger than this are never pooled.
    max_pooled_size: usize,
    /// Cap per size bucket to bound retained memory.
    max_per_bucket: usize,
    acquired: std::sync::atomic::AtomicUsize,
    reused: std::sync::atomic::AtomicUsize,
}

impl BufferPool {
    pub fn new(max_pooled_size: usize) -> Self {
        Self {
            pools: Mutex::new(FxHashMap::default()),
            max_pooled_size,
            max_per_bucket: 64,
            acquired: std::sync::atomic::AtomicUsize::new(0),
            reused: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Hands out a zeroed buffer of exactly `len` bytes, reusing a pooled
    /// one when available.
    fn checkout(&self, len: usize) -> Vec<u8> {
        self.acquired
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let mut buf = None;
        if len <= self.max_pooled_size {
            if let Ok(mut pools) = self.pools.lock() {
                if let Some(bucket) = pools.get_mut(&len) {
                    buf = bucket.pop();
                }
            }
        }
        match buf {
            Some(mut b) => {
                self.reused
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                b.clear();
                b.resize(len, 0);
                b
            }
            None => vec![0u8; len],
        }
    }

    fn recycle(&self, buf: Vec<u8>) {
        let size = buf.len();
        if size == 0 || size > self.max_pooled_size {
            return;
        }
        if let Ok(mut pools) = self.pools.lock() {
            let bucket = pools.entry(size).or_default();
            if bucket.len() < self.max_per_bucket {
                bucket.push(buf);
            }
        }
        // Poisoned lock or full bucket: the buffer is simply dropped.
    }

    /// Number of buffers currently held back for reuse.
    pub fn pooled_count(&self) -> usize {
        self.pools
            .lock()
            .map(|p| p.values().map(|b| b.len()).sum())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            acquired: self.acquired.load(std::sync::atomic::Ordering::Relaxed),
            reused: self.reused.load(std::sync::atomic::Ordering::Relaxed),
            pooled: self.pooled_count(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        // 4 MiB covers a u8 mask over dozens of morsels.
        Self::new(4 * 1024 * 1024)
    }
}

#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    pub acquired: usize,
    pub reused: usize,
    pub pooled: usize,
}

static GLOBAL_BUFFER_POOL: OnceLock<Arc<BufferPool>> = OnceLock::new();

/// The process-wide buffer pool.
pub fn global_buffer_pool() -> &'static Arc<BufferPool> {
    GLOBAL_BUFFER_POOL.get_or_init(|| Arc::new(BufferPool::default()))
}

/// RAII guard over a pooled buffer. Returns its storage on drop.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Lends a zeroed buffer of `len` bytes from the global pool.
    pub fn new(len: usize) -> Self {
        Self::with_pool(len, global_buffer_pool().clone())
    }

    /// Lends a zeroed buffer of `len` bytes from a specific pool.
    pub fn with_pool(len: usize, pool: Arc<BufferPool>) -> Self {
        let buf = pool.checkout(len);
        Self { buf, pool }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Explicitly returns the buffer to the pool. Equivalent to dropping.
    pub fn release(self) {}
}

impl std::ops::Deref for PooledBuffer {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl std::ops::DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.recycle(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_zeroed() {
        let pool = Arc::new(BufferPool::new(1024));
        let mut buf = PooledBuffer::with_pool(100, pool.clone());
        assert_eq!(buf.len(), 100);
        assert!(buf.iter().all(|&b| b == 0));
        buf.as_mut_slice()[0] = 7;
        drop(buf);
        // Same size comes back zeroed even when reused.
        let buf2 = PooledBuffer::with_pool(100, pool);
        assert_eq!(buf2.as_slice()[0], 0);
    }

    #[test]
    fn test_release_returns_to_pool() {
        let pool = Arc::new(BufferPool::new(1024));
        let buf = PooledBuffer::with_pool(64, pool.clone());
        buf.release();
        assert_eq!(pool.pooled_count(), 1);
        let _buf2 = PooledBuffer::with_pool(64, pool.clone());
        assert_eq!(pool.pooled_count(), 0);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_large_buffers_not_pooled() {
        let pool = Arc::new(BufferPool::new(128));
        let buf = PooledBuffer::with_pool(4096, pool.clone());
        assert_eq!(buf.len(), 4096);
        drop(buf);
        assert_eq!(pool.pooled_count(), 0);
    }
}
