//! Frame-stepped time advance.
//!
//! One tick advances exactly one fixed-length frame: due events inside
//! the frame execute in queue order, the bulk update hook fires once at
//! the boundary, and real-time pacing (when enabled) holds the frame
//! start to the wall clock. Frame overruns and the skip-ahead policy
//! are accounted in [`FrameStats`](crate::metrics::FrameStats).

use std::time::Instant;

use cadence_core::KernelNotice;

use crate::scheduler::{Advance, Scheduler};

impl Scheduler {
    /// Advance one frame. Called from [`Scheduler::advance`] when the
    /// discipline is frame-stepped.
    pub(crate) fn advance_frame(&mut self, frame_time: f64) -> Advance {
        let boundary = (self.frame + 1) as f64 * frame_time;
        if let Some(end) = self.end_time {
            if boundary > end {
                self.clock.advance_to(end);
                let _ = self.complete(end);
                return self.finish_completion();
            }
        }
        if self.clock.is_realtime() {
            // An inbox delivery ends a pacing sleep early so the
            // event-stepped path can re-peek; the frame boundary does
            // not move, so keep waiting until it is reached.
            while self.pace_until(boundary) {}
            if let Some(threshold) = self.frame_skip_threshold {
                if self.time_behind > threshold {
                    return self.skip_frame(boundary);
                }
            }
        }

        let frame_start = Instant::now();
        self.drain_inbox();
        // Events execute at their own timestamps inside the frame, so a
        // body observing sim_time() sees its deadline, not the boundary.
        loop {
            match self.queue.peek() {
                Some(key) if key.time <= boundary => {}
                _ => break,
            }
            let Some(pending) = self.queue.pop() else {
                break;
            };
            self.clock.advance_to(pending.key.time);
            self.execute_pending(pending);
        }
        self.clock.advance_to(boundary);
        if let Some(mut updater) = self.frame_updater.take() {
            updater.update_frame(boundary);
            self.frame_updater = Some(updater);
        }
        self.frame += 1;
        self.metrics.frame.frames += 1;

        let elapsed = frame_start.elapsed().as_secs_f64();
        let budget = frame_time / self.clock.rate();
        if elapsed > budget {
            let overrun = elapsed - budget;
            self.metrics.frame.frames_over_budget += 1;
            if overrun > self.metrics.frame.worst_overrun_secs {
                self.metrics.frame.worst_overrun_secs = overrun;
            }
            self.notify(KernelNotice::FrameOverrun {
                frame: self.frame,
                overrun,
            });
        }
        Advance::Frame {
            frame: self.frame,
            time: boundary,
        }
    }

    /// Skip-ahead: advance the frame counter and clock without running
    /// any work, shedding load until the pacer catches up. Pending
    /// events are not discarded; they drain in the next executed frame.
    fn skip_frame(&mut self, boundary: f64) -> Advance {
        self.clock.advance_to(boundary);
        self.frame += 1;
        self.metrics.frame.frames += 1;
        self.metrics.frame.frames_skipped += 1;
        Advance::Frame {
            frame: self.frame,
            time: boundary,
        }
    }
}
