//! Coalescing render scheduler.
//!
//! ```text
//!            change                     deadline              frame
//!   Idle ──────────────▶ PendingDebounce ───────▶ PendingFrame ──────▶ Rendering ──▶ Idle
//!     ▲                    ▲      │ change            │ change             │
//!     │                    └──────┘ (window restarts) └──▶ PendingDebounce │
//!     └──────────────────── cancel_all ◀───────────────────────────────────┘
//! ```
//!
//! Two priority tiers:
//!
//! - **Base render**: at most one in flight. Continuous edits wait for the
//!   debounce window to go quiet; discrete edits ([`request_immediate`]) go
//!   straight to the next frame. Whatever state is current when the frame
//!   begins is what gets rendered, so bursts collapse into one render of the
//!   final snapshot.
//! - **Enhancement**: an optional follow-up pass for the job that just
//!   rendered, run when the host reports idle time or its bounded wait runs
//!   out. Beginning another frame drops it. It is never queued or retried.
//!
//! The scheduler owns no clock and no pixels. The host passes `now` into
//! every call, which keeps it deterministic under test.
//!
//! [`request_immediate`]: RenderScheduler::request_immediate

use std::time::{Duration, Instant};

/// Identity of one base render. Ids only grow; an older id is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PendingDebounce { deadline: Instant },
    PendingFrame,
    Rendering(JobId),
}

/// Permission to run the base render for `job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct FrameTicket {
    pub job: JobId,
}

/// Permission to run the enhancement pass for `job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct IdleTicket {
    pub job: JobId,
}

#[derive(Debug, Clone, Copy)]
struct IdleTask {
    job: JobId,
    deadline: Instant,
}

/// Running counters, mostly for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Render requests received.
    pub requested: u64,
    /// Requests folded into one that was already pending.
    pub coalesced: u64,
    pub frames_rendered: u64,
    pub enhancements_run: u64,
    pub enhancements_dropped: u64,
    /// Pending renders discarded by `cancel_all`.
    pub cancelled: u64,
}

pub struct RenderScheduler {
    debounce: Duration,
    idle_timeout: Duration,
    phase: Phase,
    idle: Option<IdleTask>,
    next_job: u64,
    stats: SchedulerStats,
}

impl RenderScheduler {
    pub fn new(debounce: Duration, idle_timeout: Duration) -> Self {
        Self {
            debounce,
            idle_timeout,
            phase: Phase::Idle,
            idle: None,
            next_job: 1,
            stats: SchedulerStats::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn has_pending_enhancement(&self) -> bool {
        self.idle.is_some()
    }

    /// Nothing pending in either tier.
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Idle && self.idle.is_none()
    }

    /// Earliest instant at which [`tick`](Self::tick) or
    /// [`take_idle`](Self::take_idle) could make progress without host idle time.
    pub fn next_deadline(&self) -> Option<Instant> {
        let debounce = match self.phase {
            Phase::PendingDebounce { deadline } => Some(deadline),
            _ => None,
        };
        let idle = self.idle.map(|task| task.deadline);
        match (debounce, idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn note_request(&mut self) {
        self.stats.requested += 1;
        if matches!(
            self.phase,
            Phase::PendingDebounce { .. } | Phase::PendingFrame
        ) {
            self.stats.coalesced += 1;
        }
    }

    /// A continuous edit: (re)start the debounce window.
    ///
    /// Also cancels a frame that was requested but has not begun.
    pub fn request_debounced(&mut self, now: Instant) {
        self.note_request();
        let deadline = now + self.debounce;
        log::debug!("render debounced until +{:?}", self.debounce);
        self.phase = Phase::PendingDebounce { deadline };
    }

    /// A discrete edit: render at the next frame, skipping the debounce window.
    pub fn request_immediate(&mut self) {
        self.note_request();
        self.phase = Phase::PendingFrame;
    }

    /// Advance timers. Returns `true` when a frame is wanted.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Phase::PendingDebounce { deadline } = self.phase
            && now >= deadline
        {
            log::debug!("debounce window elapsed, requesting frame");
            self.phase = Phase::PendingFrame;
        }
        self.phase == Phase::PendingFrame
    }

    /// A paint opportunity. Returns a ticket if a frame was requested.
    ///
    /// Any enhancement pending for an earlier job is dropped.
    pub fn begin_frame(&mut self) -> Option<FrameTicket> {
        if self.phase != Phase::PendingFrame {
            return None;
        }
        if let Some(task) = self.idle.take() {
            log::debug!("dropping enhancement for job {}", task.job.0);
            self.stats.enhancements_dropped += 1;
        }
        let job = JobId(self.next_job);
        self.next_job += 1;
        self.phase = Phase::Rendering(job);
        Some(FrameTicket { job })
    }

    /// The base render for `ticket` finished. When `enhance` is set, an
    /// enhancement pass is scheduled with a bounded wait.
    ///
    /// Returns `false` (and schedules nothing) for a stale ticket.
    pub fn finish_frame(&mut self, ticket: FrameTicket, enhance: bool, now: Instant) -> bool {
        if self.phase != Phase::Rendering(ticket.job) {
            return false;
        }
        self.phase = Phase::Idle;
        self.stats.frames_rendered += 1;
        if enhance {
            self.idle = Some(IdleTask {
                job: ticket.job,
                deadline: now + self.idle_timeout,
            });
        }
        true
    }

    /// The base render for `ticket` failed; nothing follows it.
    pub fn abort_frame(&mut self, ticket: FrameTicket) {
        if self.phase == Phase::Rendering(ticket.job) {
            self.phase = Phase::Idle;
        }
    }

    /// Hand out the enhancement pass if the host is idle or its wait ran out.
    ///
    /// Held back while a frame is requested, since that frame will drop it.
    pub fn take_idle(&mut self, now: Instant, host_idle: bool) -> Option<IdleTicket> {
        let task = self.idle?;
        if matches!(self.phase, Phase::PendingFrame | Phase::Rendering(_)) {
            return None;
        }
        if !host_idle && now < task.deadline {
            return None;
        }
        self.idle = None;
        self.stats.enhancements_run += 1;
        Some(IdleTicket { job: task.job })
    }

    /// Drop every pending timer, frame request and enhancement.
    pub fn cancel_all(&mut self) {
        if matches!(
            self.phase,
            Phase::PendingDebounce { .. } | Phase::PendingFrame
        ) {
            self.stats.cancelled += 1;
        }
        if self.idle.take().is_some() {
            self.stats.enhancements_dropped += 1;
        }
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestClock;

    fn scheduler() -> RenderScheduler {
        RenderScheduler::new(Duration::from_millis(100), Duration::from_millis(100))
    }

    #[test]
    fn burst_within_window_renders_once() {
        let clock = TestClock::new();
        let mut s = scheduler();
        for ms in [0, 10, 20, 30, 40] {
            s.request_debounced(clock.at(ms));
            assert!(!s.tick(clock.at(ms)));
        }
        assert!(!s.tick(clock.at(139)));
        assert!(s.tick(clock.at(140)));

        let ticket = s.begin_frame().unwrap();
        assert!(s.begin_frame().is_none(), "one frame in flight");
        assert!(s.finish_frame(ticket, false, clock.at(141)));

        assert!(!s.tick(clock.at(500)));
        assert!(s.begin_frame().is_none());
        assert_eq!(s.stats().frames_rendered, 1);
        assert_eq!(s.stats().requested, 5);
        assert_eq!(s.stats().coalesced, 4);
    }

    #[test]
    fn change_restarts_window() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_debounced(clock.at(0));
        s.request_debounced(clock.at(80));
        assert!(!s.tick(clock.at(120)));
        assert!(s.tick(clock.at(180)));
    }

    #[test]
    fn change_after_frame_request_cancels_frame() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_debounced(clock.at(0));
        assert!(s.tick(clock.at(100)));
        assert_eq!(s.phase(), Phase::PendingFrame);

        s.request_debounced(clock.at(105));
        assert!(s.begin_frame().is_none());
        assert!(!s.tick(clock.at(150)));
        assert!(s.tick(clock.at(205)));
    }

    #[test]
    fn immediate_skips_debounce() {
        let mut s = scheduler();
        s.request_immediate();
        assert_eq!(s.phase(), Phase::PendingFrame);
        assert!(s.begin_frame().is_some());
    }

    #[test]
    fn job_ids_increase() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let a = s.begin_frame().unwrap();
        s.finish_frame(a, false, clock.at(0));
        s.request_immediate();
        let b = s.begin_frame().unwrap();
        assert!(b.job > a.job);
    }

    #[test]
    fn stale_ticket_rejected() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.cancel_all();
        assert!(!s.finish_frame(ticket, true, clock.at(0)));
        assert!(!s.has_pending_enhancement());
    }

    #[test]
    fn enhancement_runs_when_host_idle() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.finish_frame(ticket, true, clock.at(0));

        assert!(s.take_idle(clock.at(10), false).is_none());
        let idle = s.take_idle(clock.at(10), true).unwrap();
        assert_eq!(idle.job, ticket.job);
        assert!(s.is_settled());
        assert_eq!(s.stats().enhancements_run, 1);
    }

    #[test]
    fn enhancement_runs_at_deadline_without_idle() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.finish_frame(ticket, true, clock.at(0));
        assert_eq!(s.next_deadline(), Some(clock.at(100)));
        assert!(s.take_idle(clock.at(100), false).is_some());
    }

    #[test]
    fn new_frame_drops_enhancement() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let first = s.begin_frame().unwrap();
        s.finish_frame(first, true, clock.at(0));

        s.request_immediate();
        assert!(s.take_idle(clock.at(5), true).is_none(), "held back for pending frame");
        let second = s.begin_frame().unwrap();
        s.finish_frame(second, false, clock.at(6));

        assert!(s.take_idle(clock.at(500), true).is_none());
        assert_eq!(s.stats().enhancements_dropped, 1);
        assert_eq!(s.stats().enhancements_run, 0);
    }

    #[test]
    fn no_enhancement_without_request() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.finish_frame(ticket, false, clock.at(0));
        assert!(s.take_idle(clock.at(1000), true).is_none());
    }

    #[test]
    fn cancel_all_clears_everything() {
        let clock = TestClock::new();
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.finish_frame(ticket, true, clock.at(0));
        s.request_debounced(clock.at(1));

        s.cancel_all();
        assert!(s.is_settled());
        assert!(!s.tick(clock.at(1000)));
        assert!(s.take_idle(clock.at(1000), true).is_none());
        assert_eq!(s.stats().cancelled, 1);
        assert_eq!(s.stats().enhancements_dropped, 1);
    }

    #[test]
    fn abort_returns_to_idle() {
        let mut s = scheduler();
        s.request_immediate();
        let ticket = s.begin_frame().unwrap();
        s.abort_frame(ticket);
        assert!(s.is_settled());
    }
}
