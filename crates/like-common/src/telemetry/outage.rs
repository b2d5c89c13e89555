//! Once-per-outage logging for optional dependencies

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Gap between recovery checks while a dependency is down
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Tracks whether a dependency is currently unreachable so that a flapping
/// or dead backend logs one warning per outage instead of one per call.
///
/// While down, [`OutageLatch::should_attempt`] lets one caller per retry
/// interval through to check whether the dependency is back.
#[derive(Debug)]
pub struct OutageLatch {
    dependency: &'static str,
    down: AtomicBool,
    retry_interval: Duration,
    /// Unix millis of the last failure or admitted recovery check
    last_attempt: AtomicI64,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl OutageLatch {
    #[must_use]
    pub const fn new(dependency: &'static str) -> Self {
        Self::with_retry_interval(dependency, DEFAULT_RETRY_INTERVAL)
    }

    #[must_use]
    pub const fn with_retry_interval(dependency: &'static str, retry_interval: Duration) -> Self {
        Self {
            dependency,
            down: AtomicBool::new(false),
            retry_interval,
            last_attempt: AtomicI64::new(0),
        }
    }

    /// Record a failure. Returns `true` if this started a new outage.
    pub fn trip(&self, error: &dyn Display) -> bool {
        self.last_attempt.store(now_millis(), Ordering::Release);
        let started = !self.down.swap(true, Ordering::AcqRel);
        if started {
            tracing::warn!(
                dependency = self.dependency,
                error = %error,
                "Dependency unavailable, continuing in local-only mode"
            );
        } else {
            tracing::debug!(dependency = self.dependency, error = %error, "Dependency still unavailable");
        }
        started
    }

    /// Record a success. Returns `true` if this ended an outage.
    pub fn recover(&self) -> bool {
        let ended = self.down.swap(false, Ordering::AcqRel);
        if ended {
            tracing::info!(dependency = self.dependency, "Dependency recovered");
        }
        ended
    }

    #[must_use]
    pub fn is_down(&self) -> bool {
        self.down.load(Ordering::Acquire)
    }

    /// Whether the caller should use the dependency now.
    ///
    /// Always `true` while up. While down, `true` for at most one caller per
    /// retry interval; everyone else should skip straight to their fallback.
    #[must_use]
    pub fn should_attempt(&self) -> bool {
        if !self.is_down() {
            return true;
        }

        let now = now_millis();
        let last = self.last_attempt.load(Ordering::Acquire);
        let interval = i64::try_from(self.retry_interval.as_millis()).unwrap_or(i64::MAX);
        if now.saturating_sub(last) < interval {
            return false;
        }

        let admitted = self
            .last_attempt
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if admitted {
            tracing::debug!(dependency = self.dependency, "Checking whether dependency is back");
        }
        admitted
    }

    #[must_use]
    pub fn dependency(&self) -> &'static str {
        self.dependency
    }
}
