use anyhow::Result;

/// Every tool is interactive and single-threaded, so the binary runs on a current thread
/// runtime. The only background work is the alarm task spawned by the countdown.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
