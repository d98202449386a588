//! Integration tests: delay-queue service flows driven by the real
//! scheduler.

use std::sync::{Arc, Mutex};

use cadence_core::{Priority, ScheduleContext};
use cadence_delay::{DelayQueue, DelayRequest, Discipline, ServiceOutcome};
use cadence_engine::{Advance, Scheduler, SchedulerConfig};

type Log = Arc<Mutex<Vec<(usize, f64)>>>;

struct Tracked {
    id: usize,
    service: f64,
    rank: Priority,
    /// Extra service intervals to request before finishing.
    extensions: Vec<f64>,
    log: Log,
}

impl Tracked {
    fn plain(id: usize, service: f64, log: &Log) -> Box<dyn DelayRequest> {
        Self::ranked(id, service, 0, log)
    }

    fn ranked(id: usize, service: f64, rank: Priority, log: &Log) -> Box<dyn DelayRequest> {
        Box::new(Tracked {
            id,
            service,
            rank,
            extensions: Vec::new(),
            log: Arc::clone(log),
        })
    }
}

impl DelayRequest for Tracked {
    fn time_required(&self) -> f64 {
        self.service
    }

    fn priority(&self) -> Priority {
        self.rank
    }

    fn complete(&mut self, ctx: &mut dyn ScheduleContext) -> ServiceOutcome {
        if let Some(extra) = self.extensions.pop() {
            return ServiceOutcome::MoreTime(extra);
        }
        self.log.lock().unwrap().push((self.id, ctx.sim_time()));
        ServiceOutcome::Done
    }
}

fn run_kernel(setup: impl FnOnce(&mut Scheduler)) -> Scheduler {
    let mut sched = Scheduler::new(SchedulerConfig {
        end_time: Some(1_000.0),
        ..SchedulerConfig::default()
    })
    .expect("valid config");
    setup(&mut sched);
    sched.initialize().expect("initialize");
    sched.start().expect("start");
    assert!(matches!(sched.run(), Advance::Complete { .. }));
    sched
}

#[test]
fn fifo_overload_completes_in_arrival_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(2, Discipline::Fifo).expect("valid");
    run_kernel(|sched| {
        for id in 0..5 {
            queue
                .submit(Tracked::plain(id, 1.0, &log), sched)
                .expect("submit");
        }
        assert_eq!(queue.busy_servers(), 2);
        assert_eq!(queue.pending_len(), 3);
    });

    // Two servers, unit service: pairs finish at t=1 and t=2, the
    // straggler at t=3, strictly in arrival order.
    assert_eq!(
        *log.lock().unwrap(),
        vec![(0, 1.0), (1, 1.0), (2, 2.0), (3, 2.0), (4, 3.0)]
    );
    assert_eq!(queue.busy_servers(), 0);
    assert_eq!(queue.pending_len(), 0);
}

#[test]
fn priority_discipline_reorders_waiters_only() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(1, Discipline::Priority).expect("valid");
    run_kernel(|sched| {
        // id 0 grabs the idle server regardless of its poor rank; the
        // discipline only governs the waiting line behind it.
        for (id, rank) in [(0, 5), (1, 1), (2, 3), (3, 0), (4, 2)] {
            queue
                .submit(Tracked::ranked(id, 1.0, rank, &log), sched)
                .expect("submit");
        }
    });

    let order: Vec<usize> = log.lock().unwrap().iter().map(|&(id, _)| id).collect();
    assert_eq!(order, vec![0, 3, 1, 4, 2]);
}

#[test]
fn lifo_serves_newest_waiter_first() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(1, Discipline::Lifo).expect("valid");
    run_kernel(|sched| {
        for id in 0..4 {
            queue
                .submit(Tracked::plain(id, 1.0, &log), sched)
                .expect("submit");
        }
    });

    let order: Vec<usize> = log.lock().unwrap().iter().map(|&(id, _)| id).collect();
    assert_eq!(order, vec![0, 3, 2, 1]);
}

#[test]
fn more_time_keeps_the_server_without_requeueing() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(1, Discipline::Fifo).expect("valid");
    run_kernel(|sched| {
        queue
            .submit(
                Box::new(Tracked {
                    id: 0,
                    service: 1.0,
                    rank: 0,
                    extensions: vec![2.0],
                    log: Arc::clone(&log),
                }),
                sched,
            )
            .expect("submit");
        queue
            .submit(Tracked::plain(1, 1.0, &log), sched)
            .expect("submit");
    });

    // id 0 runs 1s, extends 2s more (finishing at 3.0) while id 1
    // waits; id 1 then serves 1s and finishes at 4.0.
    assert_eq!(*log.lock().unwrap(), vec![(0, 3.0), (1, 4.0)]);
}

#[test]
fn cancel_all_defuses_inflight_completions() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(1, Discipline::Fifo).expect("valid");
    run_kernel(|sched| {
        queue
            .submit(Tracked::plain(0, 1.0, &log), sched)
            .expect("submit");
        queue
            .submit(Tracked::plain(1, 1.0, &log), sched)
            .expect("submit");
        queue.cancel_all();
        assert_eq!(queue.busy_servers(), 0);
        assert_eq!(queue.pending_len(), 0);
    });

    // The completion event for id 0 still fires, sees a bumped epoch,
    // and does nothing.
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn dropped_queue_defuses_inflight_completions() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    run_kernel(|sched| {
        let queue = DelayQueue::new(1, Discipline::Fifo).expect("valid");
        queue
            .submit(Tracked::plain(0, 1.0, &log), sched)
            .expect("submit");
        // Every strong handle dropped before the kernel runs.
    });
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn freed_server_pulls_next_waiter_mid_run() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let queue = DelayQueue::new(1, Discipline::Fifo).expect("valid");
    run_kernel(|sched| {
        queue
            .submit(Tracked::plain(0, 2.0, &log), sched)
            .expect("submit");
        queue
            .submit(Tracked::plain(1, 5.0, &log), sched)
            .expect("submit");
    });
    // Back-to-back service: id 1 starts at 2.0 and finishes at 7.0.
    assert_eq!(*log.lock().unwrap(), vec![(0, 2.0), (1, 7.0)]);
}
