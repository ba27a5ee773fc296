//! Single-flight, rate-limited build trigger.
//!
//! The scheduler is a pure state machine: callers feed it events together
//! with the current time and carry out the action it returns. It never
//! reads the clock or sleeps.

use log::debug;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    /// A build is owed. `due` is `None` while the panel is hidden.
    Scheduled { due: Option<Instant> },
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Request,
    TimerFired,
    BuildFinished,
    VisibilityChanged(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    StartBuild,
    ArmTimer(Instant),
}

#[derive(Debug, Clone)]
pub struct BuildScheduler {
    state: BuildState,
    needs_rebuild: bool,
    last_build_start: Option<Instant>,
    min_interval: Duration,
    visible: bool,
}

impl BuildScheduler {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            state: BuildState::Idle,
            needs_rebuild: false,
            last_build_start: None,
            min_interval,
            visible: true,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn last_build_start(&self) -> Option<Instant> {
        self.last_build_start
    }

    /// Deadline of the armed timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            BuildState::Scheduled { due } => due,
            _ => None,
        }
    }

    pub fn request_build(&mut self, now: Instant) -> Option<SchedulerAction> {
        self.handle(SchedulerEvent::Request, now)
    }

    /// The single transition function.
    pub fn handle(&mut self, event: SchedulerEvent, now: Instant) -> Option<SchedulerAction> {
        let before = self.state;
        let action = match (self.state, event) {
            (BuildState::Idle, SchedulerEvent::Request) => self.decide(now),
            // A request past an unserviced deadline stands in for the timer.
            (BuildState::Scheduled { due: Some(due) }, SchedulerEvent::Request) if now >= due => {
                self.decide(now)
            }
            (BuildState::Scheduled { .. }, SchedulerEvent::Request) => None,
            (BuildState::Running, SchedulerEvent::Request) => {
                self.needs_rebuild = true;
                None
            }

            (BuildState::Scheduled { .. }, SchedulerEvent::TimerFired) => self.decide(now),
            (_, SchedulerEvent::TimerFired) => None,

            (BuildState::Running, SchedulerEvent::BuildFinished) => {
                if self.needs_rebuild {
                    self.needs_rebuild = false;
                    self.decide(now)
                } else {
                    self.state = BuildState::Idle;
                    None
                }
            }
            (_, SchedulerEvent::BuildFinished) => {
                debug!("build completion while {:?}, ignored", self.state);
                None
            }

            (state, SchedulerEvent::VisibilityChanged(visible)) => {
                self.visible = visible;
                match state {
                    BuildState::Scheduled { due: None } if visible => self.decide(now),
                    _ => None,
                }
            }
        };

        if before != self.state {
            debug!("build state {:?} -> {:?}", before, self.state);
        }
        action
    }

    fn decide(&mut self, now: Instant) -> Option<SchedulerAction> {
        if !self.visible {
            self.state = BuildState::Scheduled { due: None };
            return None;
        }

        if let Some(last) = self.last_build_start {
            let due = last + self.min_interval;
            if now < due {
                self.state = BuildState::Scheduled { due: Some(due) };
                return Some(SchedulerAction::ArmTimer(due));
            }
        }

        self.state = BuildState::Running;
        self.last_build_start = Some(now);
        Some(SchedulerAction::StartBuild)
    }
}
