// src/engine/pool.rs
//
// Global thread pool for batch generation.
//
// One pool is shared by every batch instead of building a pool per call,
// so threads are reused and the thread count stays predictable.
//
// - Initialized lazily on first use
// - Thread count follows std::thread::available_parallelism() (respects
//   cgroup/CPU quota), minimum MIN_POOL_THREADS
// - If the pool cannot be built, batches run on rayon's global pool

use rayon::ThreadPool;
use std::sync::OnceLock;

/// Minimum number of pool threads to ensure at least some parallelism
const MIN_POOL_THREADS: usize = 1;

static GLOBAL_THREAD_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

/// The shared batch pool, or `None` if it could not be created.
pub fn get_pool() -> Option<&'static ThreadPool> {
    GLOBAL_THREAD_POOL
        .get_or_init(|| {
            let num_threads = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(MIN_POOL_THREADS)
                .max(MIN_POOL_THREADS);

            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("thumbnailer-{i}"))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    tracing::warn!(
                        target: "thumbnailer::task",
                        error = %e,
                        num_threads,
                        "batch pool unavailable, using rayon global pool"
                    );
                    None
                }
            }
        })
        .as_ref()
}

/// Run `f` inside the batch pool when one exists.
pub fn install<R, F>(f: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    match get_pool() {
        Some(pool) => pool.install(f),
        None => f(),
    }
}
