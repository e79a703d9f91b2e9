// Time Provider Port (for testability of timed shell invocations)

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Seconds elapsed since `start_millis`
    fn elapsed_secs(&self, start_millis: i64) -> f64 {
        (self.now_millis() - start_millis) as f64 / 1000.0
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
