//! Cumulative scheduler counters.
//!
//! [`SchedulerMetrics`] is the kernel's observability surface alongside
//! the observer hook: counters accumulate over the run and are read via
//! [`Scheduler::metrics()`](crate::scheduler::Scheduler::metrics).

/// Frame-stepped accounting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frames advanced (including skipped frames).
    pub frames: u64,
    /// Frames whose wall-clock cost exceeded the frame budget.
    pub frames_over_budget: u64,
    /// Largest single-frame overrun observed, wall seconds.
    pub worst_overrun_secs: f64,
    /// Frames skipped by the behind-threshold policy (counter advanced,
    /// no work performed).
    pub frames_skipped: u64,
}

/// Cumulative counters for a scheduler instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchedulerMetrics {
    /// Event bodies executed.
    pub events_executed: u64,
    /// Events re-entered into the queue by their own disposition.
    pub events_rescheduled: u64,
    /// Cancelled entries lazily discarded at pop/peek time.
    pub cancelled_discards: u64,
    /// Events accepted through the cross-thread inbox.
    pub inbox_accepted: u64,
    /// Not-behind → behind transitions of the real-time pacer.
    pub behind_transitions: u64,
    /// Largest observed time-behind value, simulation seconds.
    pub max_time_behind: f64,
    /// Frame-stepped statistics (zero in event-stepped mode).
    pub frame: FrameStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = SchedulerMetrics::default();
        assert_eq!(m.events_executed, 0);
        assert_eq!(m.events_rescheduled, 0);
        assert_eq!(m.cancelled_discards, 0);
        assert_eq!(m.inbox_accepted, 0);
        assert_eq!(m.behind_transitions, 0);
        assert_eq!(m.max_time_behind, 0.0);
        assert_eq!(m.frame, FrameStats::default());
    }
}
