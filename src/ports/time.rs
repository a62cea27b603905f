use std::time::Duration;

use time::OffsetDateTime;

/// Wall clock and timers used to plan and arm reminders.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Current instant in the offset reminder times are interpreted in.
    fn now(&self) -> OffsetDateTime;
    /// Resolves once `duration` has elapsed; dropping it disarms the timer.
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
