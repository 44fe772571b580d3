//! Performance primitives: vectorized numeric kernels, hashing and gather
//! helpers, the morsel-driven parallel runtime, and the scratch-buffer pool.

pub mod hash;
pub mod memory_pool;
pub mod parallel;
pub mod simd;

pub use memory_pool::{global_buffer_pool, BufferPool, PooledBuffer};
pub use parallel::{CancelToken, MorselIterator, ParallelConfig, WorkerPool, DEFAULT_MORSEL_SIZE};
