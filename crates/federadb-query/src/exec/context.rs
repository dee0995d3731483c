//! Execution context for query execution.
//!
//! The context carries runtime configuration, cancellation, statistics and
//! the data source that access nodes query.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::source::DataSource;

/// Default cap on rows an operator may buffer.
pub const DEFAULT_MAX_ROWS_IN_MEMORY: usize = 1_000_000;

/// Execution context for a query.
pub struct ExecutionContext {
    cancellation: CancellationToken,
    stats: Arc<ExecutionStats>,
    config: ExecutionConfig,
    source: Option<Arc<dyn DataSource>>,
}

impl ExecutionContext {
    /// Creates a context with the default configuration and no data source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            stats: Arc::new(ExecutionStats::new()),
            config: ExecutionConfig::default(),
            source: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the data source queried by access nodes.
    #[must_use]
    pub fn with_data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Uses an existing cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the data source, if one is set.
    #[must_use]
    pub fn data_source(&self) -> Option<&Arc<dyn DataSource>> {
        self.source.as_ref()
    }

    /// Returns a handle that cancels this query.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancels the query execution.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Checks if the query has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the execution statistics.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the buffering limit; 0 means unlimited.
    #[must_use]
    pub fn max_rows_in_memory(&self) -> usize {
        self.config.max_rows_in_memory
    }

    /// Returns a shared handle to the statistics when collection is enabled.
    #[must_use]
    pub fn stats_handle(&self) -> Option<Arc<ExecutionStats>> {
        self.config.collect_stats.then(|| Arc::clone(&self.stats))
    }

    /// Records that rows were read from the source.
    pub fn record_rows_read(&self, count: u64) {
        if self.config.collect_stats {
            self.stats.add_rows_read(count);
        }
    }

    /// Records that rows were produced.
    pub fn record_rows_produced(&self, count: u64) {
        if self.config.collect_stats {
            self.stats.add_rows_produced(count);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancellation", &self.cancellation)
            .field("stats", &self.stats)
            .field("config", &self.config)
            .field("source", &self.source.as_ref().map(|_| "<DataSource>"))
            .finish()
    }
}

/// Execution statistics collected during query execution.
#[derive(Debug)]
pub struct ExecutionStats {
    start_time: Instant,
    rows_read: AtomicU64,
    rows_produced: AtomicU64,
}

impl ExecutionStats {
    /// Creates new execution statistics.
    #[must_use]
    pub fn new() -> Self {
        Self { start_time: Instant::now(), rows_read: AtomicU64::new(0), rows_produced: AtomicU64::new(0) }
    }

    /// Adds to the rows read counter.
    pub fn add_rows_read(&self, count: u64) {
        self.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Adds to the rows produced counter.
    pub fn add_rows_produced(&self, count: u64) {
        self.rows_produced.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the number of rows read.
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub fn rows_produced(&self) -> u64 {
        self.rows_produced.load(Ordering::Relaxed)
    }

    /// Returns the elapsed execution time.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration options for query execution.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Whether to collect statistics.
    pub collect_stats: bool,
    /// Maximum rows an operator may buffer (0 for no limit).
    pub max_rows_in_memory: usize,
}

impl ExecutionConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self { collect_stats: false, max_rows_in_memory: DEFAULT_MAX_ROWS_IN_MEMORY }
    }

    /// Enables statistics collection.
    #[must_use]
    pub const fn with_stats(mut self) -> Self {
        self.collect_stats = true;
        self
    }

    /// Sets the buffering limit.
    #[must_use]
    pub const fn with_max_rows_in_memory(mut self, limit: usize) -> Self {
        self.max_rows_in_memory = limit;
        self
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A handle for cancelling query execution.
///
/// Clones share state, so a token can be handed to another thread.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    /// Cancels the associated query.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_cancellation() {
        let ctx = ExecutionContext::new();
        let token = ctx.cancellation_token();
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn stats_only_when_enabled() {
        let ctx = ExecutionContext::new();
        ctx.record_rows_read(10);
        assert_eq!(ctx.stats().rows_read(), 0);

        let ctx = ExecutionContext::new().with_config(ExecutionConfig::new().with_stats());
        ctx.record_rows_read(100);
        ctx.record_rows_produced(50);
        assert_eq!(ctx.stats().rows_read(), 100);
        assert_eq!(ctx.stats().rows_produced(), 50);

        let handle = ctx.stats_handle().unwrap();
        handle.add_rows_read(1);
        assert_eq!(ctx.stats().rows_read(), 101);
        assert!(ExecutionContext::new().stats_handle().is_none());
    }

    #[test]
    fn config_builders() {
        let config = ExecutionConfig::new().with_stats().with_max_rows_in_memory(5);
        assert!(config.collect_stats);
        assert_eq!(config.max_rows_in_memory, 5);
        assert_eq!(ExecutionConfig::default().max_rows_in_memory, DEFAULT_MAX_ROWS_IN_MEMORY);
    }

    #[test]
    fn cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let other = token.clone();
        std::thread::spawn(move || other.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }
}
