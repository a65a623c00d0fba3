// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use recoverable::{RecoveryInfo, RecoveryKind};
use tick::Clock;

use super::constants::ERR_POISONED_LOCK;
use super::{BreakerSnapshot, CircuitState, Counts, TripPolicy};

#[derive(Debug, Clone)]
pub(crate) struct EngineOptions {
    pub trip_policy: TripPolicy,
    pub reset_timeout: Duration,
    pub half_open_max_probes: u32,
    pub sampling_duration: Option<Duration>,
}

/// The outcome of an admitted call, from the breaker's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Transient and unavailable errors count against the dependency; everything else
    /// means the dependency answered.
    pub fn from_recovery(recovery: &RecoveryInfo) -> Self {
        match recovery.kind() {
            RecoveryKind::Retry | RecoveryKind::Unavailable => Self::Failure,
            _ => Self::Success,
        }
    }

    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Identifies an admitted call so that its outcome is matched against the right state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket {
    pub generation: u64,
    pub probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
    pub counts: Counts,
    pub at: Instant,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum EnterResult {
    Accepted { ticket: Ticket, transition: Option<Transition> },
    Rejected { state: CircuitState, retry_after: Option<Duration> },
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ExitResult {
    Unchanged,
    /// The call was admitted before the last transition; its outcome is ignored.
    Stale,
    Transitioned(Transition),
}

/// The circuit state machine.
#[derive(Debug)]
pub(crate) struct Engine {
    state: Mutex<State>,
    options: EngineOptions,
    clock: Clock,
}

impl Engine {
    pub fn new(options: EngineOptions, clock: Clock) -> Self {
        let now = clock.instant();

        Self {
            state: Mutex::new(State::new(now)),
            options,
            clock,
        }
    }

    pub fn enter(&self) -> EnterResult {
        // Read the clock outside the lock.
        let now = self.clock.instant();
        self.state.lock().expect(ERR_POISONED_LOCK).enter(now, &self.options)
    }

    pub fn exit(&self, ticket: Ticket, outcome: Outcome) -> ExitResult {
        let now = self.clock.instant();
        self.state.lock().expect(ERR_POISONED_LOCK).exit(ticket, outcome, now, &self.options)
    }

    /// Releases the probe slot of a call that finished without an outcome.
    pub fn abandon(&self, ticket: Ticket) {
        self.state.lock().expect(ERR_POISONED_LOCK).abandon(ticket);
    }

    pub fn state(&self) -> CircuitState {
        self.state.lock().expect(ERR_POISONED_LOCK).phase.state()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.state.lock().expect(ERR_POISONED_LOCK).snapshot()
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    /// `open_until` is `None` when the reset timeout does not fit into an `Instant`.
    Open {
        open_until: Option<Instant>,
    },
    HalfOpen {
        admitted: u32,
        successes: u32,
    },
}

impl Phase {
    fn state(self) -> CircuitState {
        match self {
            Self::Closed => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct State {
    phase: Phase,
    counts: Counts,
    generation: u64,
    last_transition: Instant,
    window_started: Instant,
}

impl State {
    fn new(now: Instant) -> Self {
        Self {
            phase: Phase::Closed,
            counts: Counts::default(),
            generation: 0,
            last_transition: now,
            window_started: now,
        }
    }

    fn enter(&mut self, now: Instant, options: &EngineOptions) -> EnterResult {
        match self.phase {
            Phase::Closed => {
                self.roll_window(now, options);
                self.counts.on_request();

                EnterResult::Accepted {
                    ticket: self.ticket(false),
                    transition: None,
                }
            }
            Phase::Open { open_until } => match open_until {
                Some(open_until) if now >= open_until => {
                    let transition = self.transition(Phase::HalfOpen { admitted: 1, successes: 0 }, now);
                    self.counts.on_request();

                    EnterResult::Accepted {
                        ticket: self.ticket(true),
                        transition: Some(transition),
                    }
                }
                _ => EnterResult::Rejected {
                    state: CircuitState::Open,
                    retry_after: open_until.map(|until| until.saturating_duration_since(now)),
                },
            },
            Phase::HalfOpen { admitted, successes } => {
                if admitted >= options.half_open_max_probes {
                    return EnterResult::Rejected {
                        state: CircuitState::HalfOpen,
                        retry_after: None,
                    };
                }

                self.phase = Phase::HalfOpen {
                    admitted: admitted.saturating_add(1),
                    successes,
                };
                self.counts.on_request();

                EnterResult::Accepted {
                    ticket: self.ticket(true),
                    transition: None,
                }
            }
        }
    }

    fn exit(&mut self, ticket: Ticket, outcome: Outcome, now: Instant, options: &EngineOptions) -> ExitResult {
        // Results of calls admitted under an earlier state are ignored. This happens when the
        // circuit changes state between the enter and exit of a concurrent call.
        if ticket.generation != self.generation {
            return ExitResult::Stale;
        }

        match (self.phase, outcome) {
            (Phase::Closed, Outcome::Success) => {
                self.counts.on_success();
                ExitResult::Unchanged
            }
            (Phase::Closed, Outcome::Failure) => {
                self.counts.on_failure();

                if options.trip_policy.ready_to_trip(&self.counts) {
                    ExitResult::Transitioned(self.open(now, options))
                } else {
                    ExitResult::Unchanged
                }
            }
            (Phase::Open { .. }, _) => ExitResult::Stale,
            (Phase::HalfOpen { admitted, successes }, Outcome::Success) => {
                self.counts.on_success();
                let successes = successes.saturating_add(1);

                if successes >= options.half_open_max_probes {
                    ExitResult::Transitioned(self.transition(Phase::Closed, now))
                } else {
                    self.phase = Phase::HalfOpen { admitted, successes };
                    ExitResult::Unchanged
                }
            }
            (Phase::HalfOpen { .. }, Outcome::Failure) => {
                self.counts.on_failure();
                ExitResult::Transitioned(self.open(now, options))
            }
        }
    }

    fn abandon(&mut self, ticket: Ticket) {
        if ticket.generation != self.generation || !ticket.probe {
            return;
        }

        if let Phase::HalfOpen { admitted, successes } = self.phase {
            self.phase = Phase::HalfOpen {
                admitted: admitted.saturating_sub(1),
                successes,
            };
        }
    }

    fn open(&mut self, now: Instant, options: &EngineOptions) -> Transition {
        let open_until = now.checked_add(options.reset_timeout);
        self.transition(Phase::Open { open_until }, now)
    }

    fn transition(&mut self, phase: Phase, now: Instant) -> Transition {
        let from = self.phase.state();
        let counts = self.counts;

        self.phase = phase;
        self.counts.clear();
        self.generation = self.generation.wrapping_add(1);
        self.last_transition = now;
        self.window_started = now;

        Transition {
            from,
            to: phase.state(),
            counts,
            at: now,
        }
    }

    fn roll_window(&mut self, now: Instant, options: &EngineOptions) {
        if let Some(sampling_duration) = options.sampling_duration
            && now.saturating_duration_since(self.window_started) >= sampling_duration
        {
            self.counts.clear();
            self.window_started = now;
        }
    }

    fn ticket(&self, probe: bool) -> Ticket {
        Ticket {
            generation: self.generation,
            probe,
        }
    }

    fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.phase.state(),
            counts: self.counts,
            half_open_successes: match self.phase {
                Phase::HalfOpen { successes, .. } => successes,
                _ => 0,
            },
            last_transition: self.last_transition,
        }
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use tick::ClockControl;

    use super::*;

    const RESET_TIMEOUT: Duration = Duration::from_secs(5);

    fn options(threshold: u32, probes: u32) -> EngineOptions {
        EngineOptions {
            trip_policy: TripPolicy::consecutive_failures(threshold),
            reset_timeout: RESET_TIMEOUT,
            half_open_max_probes: probes,
            sampling_duration: None,
        }
    }

    fn accept(engine: &Engine) -> Ticket {
        match engine.enter() {
            EnterResult::Accepted { ticket, .. } => ticket,
            EnterResult::Rejected { state, .. } => panic!("expected acceptance, got rejection in {state}"),
        }
    }

    fn trip(engine: &Engine, failures: u32) {
        for _ in 0..failures {
            let ticket = accept(engine);
            let _ = engine.exit(ticket, Outcome::Failure);
        }
    }

    #[test]
    fn outcome_from_recovery() {
        assert_eq!(Outcome::from_recovery(&RecoveryInfo::retry()), Outcome::Failure);
        assert_eq!(Outcome::from_recovery(&RecoveryInfo::unavailable()), Outcome::Failure);
        assert_eq!(Outcome::from_recovery(&RecoveryInfo::never()), Outcome::Success);
        assert_eq!(Outcome::from_recovery(&RecoveryInfo::unknown()), Outcome::Success);
        assert_eq!(Outcome::Failure.as_str(), "failure");
        assert_eq!(Outcome::Success.as_str(), "success");
    }

    #[test]
    fn closed_trips_after_threshold() {
        let control = ClockControl::new();
        let engine = Engine::new(options(3, 1), control.to_clock());

        trip(&engine, 2);
        assert_eq!(engine.state(), CircuitState::Closed);

        let ticket = accept(&engine);
        let result = engine.exit(ticket, Outcome::Failure);

        let ExitResult::Transitioned(transition) = result else {
            panic!("expected a transition, got {result:?}");
        };
        assert_eq!(transition.from, CircuitState::Closed);
        assert_eq!(transition.to, CircuitState::Open);
        assert_eq!(transition.counts.consecutive_failures(), 3);
        assert_eq!(engine.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let control = ClockControl::new();
        let engine = Engine::new(options(3, 1), control.to_clock());

        trip(&engine, 2);
        let ticket = accept(&engine);
        assert_eq!(engine.exit(ticket, Outcome::Success), ExitResult::Unchanged);
        trip(&engine, 2);

        assert_eq!(engine.state(), CircuitState::Closed);
        assert_eq!(engine.snapshot().counts().consecutive_failures(), 2);
    }

    #[test]
    fn open_rejects_with_remaining_time() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());
        trip(&engine, 1);

        control.advance(Duration::from_secs(2));

        assert_eq!(
            engine.enter(),
            EnterResult::Rejected {
                state: CircuitState::Open,
                retry_after: Some(Duration::from_secs(3)),
            }
        );
    }

    #[test]
    fn open_moves_to_half_open_after_reset_timeout() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());
        trip(&engine, 1);

        control.advance(RESET_TIMEOUT);

        let EnterResult::Accepted { ticket, transition } = engine.enter() else {
            panic!("probe expected");
        };
        assert!(ticket.probe);
        let transition = transition.unwrap();
        assert_eq!(transition.from, CircuitState::Open);
        assert_eq!(transition.to, CircuitState::HalfOpen);
        assert_eq!(engine.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_limits_probes() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 2), control.to_clock());
        trip(&engine, 1);
        control.advance(RESET_TIMEOUT);

        let _first = accept(&engine);
        let _second = accept(&engine);

        assert_eq!(
            engine.enter(),
            EnterResult::Rejected {
                state: CircuitState::HalfOpen,
                retry_after: None,
            }
        );
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 2), control.to_clock());
        trip(&engine, 1);
        control.advance(RESET_TIMEOUT);

        let first = accept(&engine);
        let second = accept(&engine);

        assert_eq!(engine.exit(first, Outcome::Success), ExitResult::Unchanged);
        assert_eq!(engine.snapshot().half_open_successes(), 1);

        let ExitResult::Transitioned(transition) = engine.exit(second, Outcome::Success) else {
            panic!("expected close");
        };
        assert_eq!(transition.to, CircuitState::Closed);
        assert_eq!(engine.state(), CircuitState::Closed);
        assert_eq!(engine.snapshot().counts(), Counts::default());
    }

    #[test]
    fn half_open_failure_reopens_with_fresh_transition_time() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());
        trip(&engine, 1);
        let opened_at = engine.snapshot().last_transition();

        control.advance(RESET_TIMEOUT);
        let probe = accept(&engine);
        control.advance(Duration::from_millis(10));

        let ExitResult::Transitioned(transition) = engine.exit(probe, Outcome::Failure) else {
            panic!("expected reopen");
        };
        assert_eq!(transition.from, CircuitState::HalfOpen);
        assert_eq!(transition.to, CircuitState::Open);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.state(), CircuitState::Open);
        assert_eq!(snapshot.last_transition() - opened_at, RESET_TIMEOUT + Duration::from_millis(10));
        assert!(matches!(engine.enter(), EnterResult::Rejected { .. }));
    }

    #[test]
    fn stale_outcomes_are_ignored() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());

        let slow = accept(&engine);
        trip(&engine, 1);
        assert_eq!(engine.state(), CircuitState::Open);

        assert_eq!(engine.exit(slow, Outcome::Success), ExitResult::Stale);
        assert_eq!(engine.state(), CircuitState::Open);
    }

    #[test]
    fn abandoned_probe_frees_slot() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());
        trip(&engine, 1);
        control.advance(RESET_TIMEOUT);

        let probe = accept(&engine);
        assert!(matches!(engine.enter(), EnterResult::Rejected { .. }));

        engine.abandon(probe);

        let probe = accept(&engine);
        assert!(probe.probe);
        assert_eq!(engine.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn abandon_in_closed_state_is_noop() {
        let control = ClockControl::new();
        let engine = Engine::new(options(1, 1), control.to_clock());

        let ticket = accept(&engine);
        engine.abandon(ticket);

        assert_eq!(engine.state(), CircuitState::Closed);
        assert_eq!(engine.snapshot().counts().requests(), 1);
    }

    #[test]
    fn sampling_window_clears_closed_counts() {
        let control = ClockControl::new();
        let mut options = options(3, 1);
        options.sampling_duration = Some(Duration::from_secs(10));
        let engine = Engine::new(options, control.to_clock());

        trip(&engine, 2);
        control.advance(Duration::from_secs(10));
        trip(&engine, 2);

        assert_eq!(engine.state(), CircuitState::Closed);
        assert_eq!(engine.snapshot().counts().consecutive_failures(), 2);
    }

    #[test]
    fn huge_reset_timeout_stays_open() {
        let control = ClockControl::new();
        let mut options = options(1, 1);
        options.reset_timeout = Duration::MAX;
        let engine = Engine::new(options, control.to_clock());
        trip(&engine, 1);

        control.advance(Duration::from_secs(3600));

        assert_eq!(
            engine.enter(),
            EnterResult::Rejected {
                state: CircuitState::Open,
                retry_after: None,
            }
        );
    }
}
