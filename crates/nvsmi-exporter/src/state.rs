//! Shared application state and global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;

use nvsmi_core::collector::{Collector, CommandRunner};

pub(crate) struct AppInner<R: CommandRunner> {
    pub(crate) collector: Collector<R>,
    /// Route the exposition is served on, linked from the index page.
    pub(crate) metrics_path: String,
}

pub(crate) type SharedState<R> = Arc<AppInner<R>>;

impl<R: CommandRunner> AppInner<R> {
    pub(crate) fn shared(collector: Collector<R>, metrics_path: impl Into<String>) -> SharedState<R> {
        Arc::new(Self {
            collector,
            metrics_path: metrics_path.into(),
        })
    }
}
