//! Parallel processing utilities

/// Build a dedicated rayon pool of the requested size (0 = all cores).
/// The pipeline runs on its own pool so the configured concurrency limit
/// bounds in-flight search processes without touching the global pool.
pub fn build_thread_pool(threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    let threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
}
