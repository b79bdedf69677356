//! Centralized tracing initialization for the pipeline threads.
//!
//! The subscriber is installed as a thread-local default. The supervisor hands
//! the same dispatcher to the receiver and worker threads so every thread logs
//! to one sink.

use tracing::subscriber::DefaultGuard;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with thread-local subscriber.
///
/// This function sets up tracing with a thread-local subscriber that:
/// - Respects RUST_LOG environment variable (defaults to "info")
/// - Outputs clean, compact logs without extra metadata
///
/// # Returns
/// A `DefaultGuard` that keeps the subscriber active. The guard must be kept
/// in scope for the duration of the program.
///
/// # Example
/// ```no_run
/// use humanoid_lib::init_tracing;
///
/// fn main() {
///     let _guard = init_tracing();
///     // Your node code here
/// }
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(true);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}

/// Dispatcher active on the calling thread, for handing to spawned threads.
pub fn current_dispatch() -> Dispatch {
    tracing::dispatcher::get_default(|dispatch| dispatch.clone())
}
