// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;

use super::callbacks::OnStateChange;
use super::engine::{Engine, EnterResult, ExitResult, Outcome, Ticket, Transition};
use super::{Admission, BreakerSnapshot, CircuitBreakerBuilder, CircuitState, StateChangeArgs};
use crate::utils::TelemetryHelper;
use crate::{CircuitOpenError, GuardContext};

/// Tracks the health of one dependency and decides whether calls to it are allowed.
///
/// The breaker starts [`Closed`](CircuitState::Closed) and counts call outcomes. When its
/// [`TripPolicy`][super::TripPolicy] fires it becomes [`Open`](CircuitState::Open) and rejects
/// calls with [`CircuitOpenError`]. Once the reset timeout has elapsed, the next call is admitted
/// as a probe and the breaker becomes [`HalfOpen`](CircuitState::HalfOpen): enough successful
/// probes close it again, any failed probe reopens it.
///
/// The transition from open to half-open is evaluated lazily on the next call; the breaker never
/// spawns timers. Clones share the same state.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
///
/// use bulwark::GuardContext;
/// use bulwark::breaker::CircuitBreaker;
/// use tick::Clock;
///
/// # fn example(clock: Clock) {
/// let context = GuardContext::new(&clock);
/// let breaker = CircuitBreaker::builder("payments", &context)
///     .failure_threshold(3)
///     .reset_timeout(Duration::from_secs(10))
///     .build();
///
/// match breaker.allow() {
///     Ok(admission) => {
///         // call the dependency ...
///         admission.record_success();
///     }
///     Err(rejected) => println!("{rejected}"),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    shared: Arc<BreakerShared>,
}

impl CircuitBreaker {
    /// Starts building a breaker for the dependency called `name`.
    pub fn builder(name: impl Into<Cow<'static, str>>, context: &GuardContext) -> CircuitBreakerBuilder {
        CircuitBreakerBuilder::new(name.into(), context)
    }

    pub(super) fn new(name: Cow<'static, str>, engine: Engine, on_state_change: Option<OnStateChange>, telemetry: TelemetryHelper) -> Self {
        Self {
            shared: Arc::new(BreakerShared {
                name,
                engine,
                on_state_change,
                telemetry,
            }),
        }
    }

    /// The dependency name of this breaker.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Asks for permission to make one call.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitOpenError`] when the circuit is open, or half-open with all probe slots taken.
    pub fn allow(&self) -> Result<Admission, CircuitOpenError> {
        match self.shared.engine.enter() {
            EnterResult::Accepted { ticket, transition } => {
                if let Some(transition) = transition {
                    self.shared.on_transition(transition);
                }

                Ok(Admission::new(Arc::clone(&self.shared), ticket))
            }
            EnterResult::Rejected { state, retry_after } => {
                self.shared.emit_rejected(state);
                Err(CircuitOpenError::new(self.shared.name.clone(), state, retry_after))
            }
        }
    }

    /// The current state of the circuit.
    #[must_use]
    pub fn current_state(&self) -> CircuitState {
        self.shared.engine.state()
    }

    /// A point-in-time view of the circuit, for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> BreakerSnapshot {
        self.shared.engine.snapshot()
    }
}

#[derive(Debug)]
pub(crate) struct BreakerShared {
    name: Cow<'static, str>,
    engine: Engine,
    on_state_change: Option<OnStateChange>,
    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(dead_code, reason = "only read when logs or metrics are enabled")
    )]
    telemetry: TelemetryHelper,
}

impl BreakerShared {
    pub(super) fn exit(&self, ticket: Ticket, outcome: Outcome) {
        if ticket.probe {
            self.emit_probe(outcome);
        }

        match self.engine.exit(ticket, outcome) {
            ExitResult::Transitioned(transition) => self.on_transition(transition),
            ExitResult::Stale => self.emit_stale(outcome),
            ExitResult::Unchanged => {}
        }
    }

    pub(super) fn abandon(&self, ticket: Ticket) {
        self.engine.abandon(ticket);
    }

    // Invoked outside the engine lock so callbacks may call back into the breaker.
    fn on_transition(&self, transition: Transition) {
        self.emit_transition(&transition);

        if let Some(on_state_change) = &self.on_state_change {
            on_state_change.call(StateChangeArgs {
                name: &self.name,
                from: transition.from,
                to: transition.to,
                counts: transition.counts,
                at: transition.at,
            });
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_transition(&self, transition: &Transition) {
        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use super::telemetry::{CIRCUIT_CLOSED_EVENT_NAME, CIRCUIT_HALF_OPENED_EVENT_NAME, CIRCUIT_OPENED_EVENT_NAME, CIRCUIT_STATE};

            let event_name = match transition.to {
                CircuitState::Open => CIRCUIT_OPENED_EVENT_NAME,
                CircuitState::HalfOpen => CIRCUIT_HALF_OPENED_EVENT_NAME,
                CircuitState::Closed => CIRCUIT_CLOSED_EVENT_NAME,
            };

            self.telemetry
                .report_event(event_name, &[opentelemetry::KeyValue::new(CIRCUIT_STATE, transition.to.as_str())]);
        }

        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            match transition.to {
                CircuitState::Open => tracing::event!(
                    name: "bulwark.circuit_breaker.opened",
                    tracing::Level::WARN,
                    dependency.name = %self.name,
                    strategy.name = self.telemetry.strategy_name,
                    circuit_breaker.from = transition.from.as_str(),
                    circuit_breaker.total_failures = transition.counts.total_failures(),
                    circuit_breaker.consecutive_failures = transition.counts.consecutive_failures(),
                ),
                CircuitState::HalfOpen => tracing::event!(
                    name: "bulwark.circuit_breaker.half_opened",
                    tracing::Level::INFO,
                    dependency.name = %self.name,
                    strategy.name = self.telemetry.strategy_name,
                ),
                CircuitState::Closed => tracing::event!(
                    name: "bulwark.circuit_breaker.closed",
                    tracing::Level::INFO,
                    dependency.name = %self.name,
                    strategy.name = self.telemetry.strategy_name,
                    circuit_breaker.probe_successes = transition.counts.total_successes(),
                ),
            }
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_rejected(&self, state: CircuitState) {
        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use super::telemetry::{CIRCUIT_REJECTED_EVENT_NAME, CIRCUIT_STATE};

            self.telemetry
                .report_event(CIRCUIT_REJECTED_EVENT_NAME, &[opentelemetry::KeyValue::new(CIRCUIT_STATE, state.as_str())]);
        }

        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.circuit_breaker.rejected",
                tracing::Level::WARN,
                dependency.name = %self.name,
                strategy.name = self.telemetry.strategy_name,
                circuit_breaker.state = state.as_str(),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs nor metrics are used")
    )]
    fn emit_probe(&self, outcome: Outcome) {
        #[cfg(any(feature = "metrics", test))]
        if self.telemetry.metrics_enabled() {
            use super::telemetry::{CIRCUIT_PROBE_EVENT_NAME, CIRCUIT_PROBE_RESULT, CIRCUIT_STATE};

            self.telemetry.report_event(
                CIRCUIT_PROBE_EVENT_NAME,
                &[
                    opentelemetry::KeyValue::new(CIRCUIT_STATE, CircuitState::HalfOpen.as_str()),
                    opentelemetry::KeyValue::new(CIRCUIT_PROBE_RESULT, outcome.as_str()),
                ],
            );
        }

        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.circuit_breaker.probe",
                tracing::Level::INFO,
                dependency.name = %self.name,
                strategy.name = self.telemetry.strategy_name,
                circuit_breaker.probe.result = outcome.as_str(),
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs are disabled")
    )]
    fn emit_stale(&self, outcome: Outcome) {
        #[cfg(any(feature = "logs", test))]
        if self.telemetry.logs_enabled {
            tracing::event!(
                name: "bulwark.circuit_breaker.stale_outcome",
                tracing::Level::DEBUG,
                dependency.name = %self.name,
                strategy.name = self.telemetry.strategy_name,
                circuit_breaker.outcome = outcome.as_str(),
            );
        }
    }
}
