//! Shared utilities for integration tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use blast_runtime::{Recipient, TimeSource, Timestamp};

/// Controlled clock for deterministic timestamps.
#[derive(Debug, Clone, Default)]
pub struct MockTimeSource {
    now_ms: Arc<AtomicU64>,
}

impl MockTimeSource {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    #[allow(dead_code)]
    pub fn set_time(&self, ms: u64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.now_ms.load(Ordering::SeqCst))
    }
}

/// Initialize test logging once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Build an audience of `n` distinct recipients.
pub fn audience(n: usize) -> Vec<Recipient> {
    (0..n)
        .map(|i| Recipient::named(format!("user{i}@example.com"), format!("User {i}")))
        .collect()
}

/// Poll `condition` until it holds or `deadline` elapses.
pub async fn wait_until<F>(deadline: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    condition()
}
