//! Exhaustive check of the build scheduler against every short sequence of
//! host events.

use braid_preview::scheduler::{BuildScheduler, BuildState, SchedulerAction, SchedulerEvent};
use std::time::{Duration, Instant};

const INTERVAL: Duration = Duration::from_millis(100);
const TICK: Duration = Duration::from_millis(40);

#[derive(Debug, Clone, Copy)]
enum Step {
    Request,
    Tick,
    Finish,
    Hide,
    Show,
}

const STEPS: [Step; 5] = [Step::Request, Step::Tick, Step::Finish, Step::Hide, Step::Show];

/// Host model around the scheduler: tracks the build in flight and
/// whether any request is still unserved.
struct Sim {
    scheduler: BuildScheduler,
    now: Instant,
    running: bool,
    unserved: bool,
    starts: Vec<Instant>,
}

impl Sim {
    fn new() -> Self {
        Self {
            scheduler: BuildScheduler::new(INTERVAL),
            now: Instant::now(),
            running: false,
            unserved: false,
            starts: Vec::new(),
        }
    }

    fn apply(&mut self, action: Option<SchedulerAction>, trace: &[Step]) {
        match action {
            Some(SchedulerAction::StartBuild) => {
                assert!(!self.running, "overlapping builds after {trace:?}");
                assert!(self.unserved, "build without a pending request after {trace:?}");
                if let Some(last) = self.starts.last() {
                    assert!(self.now - *last >= INTERVAL, "rate limit broken after {trace:?}");
                }
                self.running = true;
                self.unserved = false;
                self.starts.push(self.now);
            }
            Some(SchedulerAction::ArmTimer(due)) => assert!(due > self.now),
            None => {}
        }
    }

    fn step(&mut self, step: Step, trace: &[Step]) {
        let action = match step {
            Step::Request => {
                self.unserved = true;
                self.scheduler.request_build(self.now)
            }
            Step::Tick => {
                self.now += TICK;
                match self.scheduler.deadline() {
                    Some(due) if due <= self.now => {
                        self.scheduler.handle(SchedulerEvent::TimerFired, self.now)
                    }
                    _ => None,
                }
            }
            Step::Finish => {
                if !self.running {
                    return;
                }
                self.running = false;
                self.scheduler.handle(SchedulerEvent::BuildFinished, self.now)
            }
            Step::Hide => self
                .scheduler
                .handle(SchedulerEvent::VisibilityChanged(false), self.now),
            Step::Show => self
                .scheduler
                .handle(SchedulerEvent::VisibilityChanged(true), self.now),
        };
        self.apply(action, trace);
    }

    /// Show the panel and let builds and timers run until quiet.
    fn drain(&mut self, trace: &[Step]) {
        self.step(Step::Show, trace);
        for _ in 0..16 {
            if self.running {
                self.step(Step::Finish, trace);
            } else if let Some(due) = self.scheduler.deadline() {
                self.now = self.now.max(due);
                let action = self.scheduler.handle(SchedulerEvent::TimerFired, self.now);
                self.apply(action, trace);
            } else {
                break;
            }
        }
    }
}

fn sequences(len: usize) -> Vec<Vec<Step>> {
    let mut all = vec![Vec::new()];
    for _ in 0..len {
        all = all
            .into_iter()
            .flat_map(|prefix| {
                STEPS.iter().map(move |step| {
                    let mut next = prefix.clone();
                    next.push(*step);
                    next
                })
            })
            .collect();
    }
    all
}

#[test]
fn no_request_is_dropped_duplicated_or_overlapped() {
    for len in 1..=6 {
        for trace in sequences(len) {
            let mut sim = Sim::new();
            for step in &trace {
                sim.step(*step, &trace);
            }
            sim.drain(&trace);

            assert!(!sim.unserved, "request never built after {trace:?}");
            assert_eq!(sim.scheduler.state(), BuildState::Idle, "not settled after {trace:?}");
            assert!(!sim.scheduler.needs_rebuild());
        }
    }
}

#[test]
fn burst_of_requests_during_build_yields_one_follow_up() {
    let mut sim = Sim::new();
    let trace = [Step::Request];
    sim.step(Step::Request, &trace);
    for _ in 0..10 {
        sim.step(Step::Request, &trace);
    }
    assert_eq!(sim.starts.len(), 1);

    sim.now += INTERVAL;
    sim.step(Step::Finish, &trace);
    assert_eq!(sim.starts.len(), 2);
    sim.step(Step::Finish, &trace);
    assert_eq!(sim.scheduler.state(), BuildState::Idle);
    assert_eq!(sim.starts.len(), 2);
}

#[test]
fn quick_second_request_waits_for_interval() {
    let t0 = Instant::now();
    let mut scheduler = BuildScheduler::new(INTERVAL);

    assert_eq!(scheduler.request_build(t0), Some(SchedulerAction::StartBuild));
    let finished = t0 + Duration::from_millis(10);
    assert_eq!(scheduler.handle(SchedulerEvent::BuildFinished, finished), None);

    let second = t0 + Duration::from_millis(20);
    let due = t0 + INTERVAL;
    assert_eq!(scheduler.request_build(second), Some(SchedulerAction::ArmTimer(due)));
    assert_eq!(scheduler.deadline(), Some(due));

    assert_eq!(
        scheduler.handle(SchedulerEvent::TimerFired, due),
        Some(SchedulerAction::StartBuild)
    );
    assert_eq!(scheduler.last_build_start(), Some(due));
}

#[test]
fn hidden_panel_defers_until_shown() {
    let t0 = Instant::now();
    let mut scheduler = BuildScheduler::new(INTERVAL);
    scheduler.handle(SchedulerEvent::VisibilityChanged(false), t0);

    assert_eq!(scheduler.request_build(t0), None);
    assert_eq!(scheduler.state(), BuildState::Scheduled { due: None });
    assert_eq!(scheduler.deadline(), None);

    let shown = t0 + Duration::from_secs(5);
    assert_eq!(
        scheduler.handle(SchedulerEvent::VisibilityChanged(true), shown),
        Some(SchedulerAction::StartBuild)
    );
}

#[test]
fn late_request_serves_a_stalled_timer() {
    let mut sim = Sim::new();
    let trace = [Step::Request, Step::Finish, Step::Request];
    sim.step(Step::Request, &trace);
    sim.step(Step::Finish, &trace);
    sim.now += Duration::from_millis(20);
    sim.step(Step::Request, &trace);
    assert_eq!(sim.starts.len(), 1);

    // The host missed the wake-up entirely.
    sim.now += INTERVAL * 2;
    sim.step(Step::Request, &trace);
    assert_eq!(sim.starts.len(), 2);
    assert!(sim.running);
    assert_eq!(sim.scheduler.deadline(), None);
}
