/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Two-tier circuit breaking for the token exchange endpoint and upstream
//! sources.

use crossbeam_skiplist::SkipMap;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use toolgate_store::StoreProvider;
use toolgate_store::model::BreakerKind;
use toolgate_store::model::BreakerSnapshot;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::PendingEvent;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

use super::domain::event_types;

/// Tunables of one circuit breaker.
#[derive(Clone, Debug)]
pub struct BreakerSettings {
    /// Failures inside the rolling window before the breaker opens.
    pub failure_threshold: u64,
    /// How long an open breaker waits before allowing a probe request.
    pub recovery_timeout_micros: u64,
    /// Length of the failure counting window.
    pub rolling_window_micros: u64,
}

/// Dependency health states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected until the recovery timeout elapses.
    Open,
    /// One probe request decides between reopening and closing.
    HalfOpen,
}

impl CircuitState {
    /// Wire representation used in snapshots and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// A state change that must be published as a domain event.
#[derive(Debug)]
pub enum BreakerTransition {
    /// The breaker opened.
    Opened {
        /// What pushed it over the threshold.
        reason: String,
    },
    /// The breaker closed.
    Closed {
        /// Operator identity for manual resets.
        closed_by: Option<String>,
    },
    /// The breaker allows a probe request.
    HalfOpened,
}

/** Health state machine of one protected dependency.

Transitions are decided with atomic compare-and-swap so that concurrent
executions agree on a single winner; the caller publishes the resulting
[BreakerTransition] as a domain event outside of any lock.
*/
pub struct CircuitBreaker {
    circuit_id: String,
    kind: BreakerKind,
    source_id: Option<String>,
    settings: BreakerSettings,
    state: AtomicU8,
    failures: SkipMap<u64, ()>,
    opened_at_micros: AtomicU64,
}

impl CircuitBreaker {
    /// Return a new instance in the `closed` state.
    pub fn new(
        circuit_id: &str,
        kind: BreakerKind,
        source_id: Option<&str>,
        settings: BreakerSettings,
    ) -> Self {
        Self {
            circuit_id: circuit_id.to_owned(),
            kind,
            source_id: source_id.map(str::to_owned),
            settings,
            state: AtomicU8::new(CircuitState::Closed.as_u8()),
            failures: SkipMap::default(),
            opened_at_micros: AtomicU64::default(),
        }
    }

    /// Breaker identifier.
    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Return `true` if a request may be executed right now.
    ///
    /// An open breaker whose recovery timeout has elapsed transitions to
    /// `half_open` and lets the request through as a probe.
    pub fn can_execute(&self) -> (bool, Option<BreakerTransition>) {
        match self.state() {
            CircuitState::Closed | CircuitState::HalfOpen => (true, None),
            CircuitState::Open => {
                let now = time::get_timestamp_micros();
                let opened_at = self.opened_at_micros.load(Ordering::Acquire);
                if now < opened_at + self.settings.recovery_timeout_micros {
                    return (false, None);
                }
                let transitioned = self
                    .state
                    .compare_exchange(
                        CircuitState::Open.as_u8(),
                        CircuitState::HalfOpen.as_u8(),
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_ok();
                if transitioned {
                    (true, Some(BreakerTransition::HalfOpened))
                } else {
                    // Another execution won the probe slot.
                    (
                        self.state() != CircuitState::Open,
                        None,
                    )
                }
            }
        }
    }

    /// Record a successful execution.
    pub fn record_success(&self) -> Option<BreakerTransition> {
        self.prune_window(time::get_timestamp_micros());
        let transitioned = self
            .state
            .compare_exchange(
                CircuitState::HalfOpen.as_u8(),
                CircuitState::Closed.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if transitioned {
            self.clear_failures();
            Some(BreakerTransition::Closed { closed_by: None })
        } else {
            None
        }
    }

    /// Record a failed execution.
    pub fn record_failure(&self, reason: &str) -> Option<BreakerTransition> {
        let now = time::get_timestamp_micros();
        self.prune_window(now);
        self.failures.insert(now, ());
        // A failed probe reopens immediately.
        if self
            .state
            .compare_exchange(
                CircuitState::HalfOpen.as_u8(),
                CircuitState::Open.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.opened_at_micros.store(now, Ordering::Release);
            return Some(BreakerTransition::Opened {
                reason: format!("probe_failed: {reason}"),
            });
        }
        if self.failure_count() >= self.settings.failure_threshold
            && self
                .state
                .compare_exchange(
                    CircuitState::Closed.as_u8(),
                    CircuitState::Open.as_u8(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
        {
            self.opened_at_micros.store(now, Ordering::Release);
            return Some(BreakerTransition::Opened {
                reason: format!("failure_threshold_reached: {reason}"),
            });
        }
        None
    }

    /// Operator initiated transition to `closed`, clearing all counters.
    pub fn reset(&self, closed_by: &str) -> Option<BreakerTransition> {
        let previous = CircuitState::from_u8(
            self.state
                .swap(CircuitState::Closed.as_u8(), Ordering::AcqRel),
        );
        self.clear_failures();
        if previous != CircuitState::Closed {
            Some(BreakerTransition::Closed {
                closed_by: Some(closed_by.to_owned()),
            })
        } else {
            None
        }
    }

    /// Failures observed inside the rolling window.
    pub fn failure_count(&self) -> u64 {
        self.failures.len() as u64
    }

    /// Point-in-time view for the operator listing.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let opened_at = self.opened_at_micros.load(Ordering::Acquire);
        BreakerSnapshot {
            circuit_id: self.circuit_id.to_owned(),
            kind: self.kind.to_owned(),
            source_id: self.source_id.to_owned(),
            state: self.state().as_str().to_owned(),
            failure_count: self.failure_count(),
            opened_at: (self.state() != CircuitState::Closed && opened_at > 0)
                .then(|| time::as_rfc3339(opened_at)),
        }
    }

    /// Build the domain event payload for a transition.
    fn transition_event(&self, transition: &BreakerTransition) -> PendingEvent {
        let (event_type, reason, closed_by) = match transition {
            BreakerTransition::Opened { reason } => {
                (event_types::BREAKER_OPENED, reason.to_owned(), None)
            }
            BreakerTransition::Closed { closed_by } => (
                event_types::BREAKER_CLOSED,
                "recovered".to_owned(),
                closed_by.to_owned(),
            ),
            BreakerTransition::HalfOpened => (
                event_types::BREAKER_HALF_OPENED,
                "recovery_timeout_elapsed".to_owned(),
                None,
            ),
        };
        PendingEvent::new(
            event_type,
            json!({
                "circuit_id": self.circuit_id,
                "kind": self.kind,
                "source_id": self.source_id,
                "reason": reason,
                "closed_by": closed_by,
            }),
            &uuid::Uuid::new_v4().to_string(),
        )
    }

    fn prune_window(&self, now: u64) {
        let cutoff = now.saturating_sub(self.settings.rolling_window_micros);
        for entry in self.failures.range(..cutoff) {
            entry.remove();
        }
    }

    fn clear_failures(&self) {
        for entry in self.failures.iter() {
            entry.remove();
        }
    }
}

/** Process-wide registry of circuit breakers.

One breaker guards the token exchange endpoint; per-source breakers are
created lazily on the first execution of a source's tool. State transitions
are appended to the journal as `circuit_breaker.*.v1` events so operators
observe them on the admin event stream.
*/
pub struct CircuitBreakers {
    store: Arc<StoreProvider>,
    settings: BreakerSettings,
    breakers: SkipMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakers {
    /// Identifier of the token exchange breaker.
    pub const TOKEN_EXCHANGE_CIRCUIT_ID: &str = "token-exchange";

    /// Return a new instance holding the token exchange breaker.
    pub fn new(store: &Arc<StoreProvider>, settings: BreakerSettings) -> Arc<Self> {
        let instance = Self {
            store: Arc::clone(store),
            settings: settings.clone(),
            breakers: SkipMap::default(),
        };
        instance.breakers.insert(
            Self::TOKEN_EXCHANGE_CIRCUIT_ID.to_owned(),
            Arc::new(CircuitBreaker::new(
                Self::TOKEN_EXCHANGE_CIRCUIT_ID,
                BreakerKind::TokenExchange,
                None,
                settings,
            )),
        );
        Arc::new(instance)
    }

    /// The breaker guarding the token exchange endpoint.
    pub fn token_exchange_breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(
            self.breakers
                .get(Self::TOKEN_EXCHANGE_CIRCUIT_ID)
                .expect("token exchange breaker is created at startup")
                .value(),
        )
    }

    /// The breaker guarding one upstream source. Created lazily.
    pub fn source_breaker(&self, source_id: &str) -> Arc<CircuitBreaker> {
        let circuit_id = format!("source-{source_id}");
        Arc::clone(
            self.breakers
                .get_or_insert_with(circuit_id.to_owned(), || {
                    Arc::new(CircuitBreaker::new(
                        &circuit_id,
                        BreakerKind::Source,
                        Some(source_id),
                        self.settings.clone(),
                    ))
                })
                .value(),
        )
    }

    /// Look up a breaker by its identifier.
    pub fn by_id(&self, circuit_id: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .get(circuit_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Point-in-time view of all known breakers.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect()
    }

    /// Gate an execution on the breaker, publishing a probe transition.
    pub async fn can_execute(&self, breaker: &Arc<CircuitBreaker>) -> bool {
        let (allowed, transition) = breaker.can_execute();
        if let Some(transition) = transition {
            self.publish_transition(breaker, &transition).await;
        }
        allowed
    }

    /// Record an execution outcome, publishing any transition.
    pub async fn record_outcome(&self, breaker: &Arc<CircuitBreaker>, success: bool, reason: &str) {
        let transition = if success {
            breaker.record_success()
        } else {
            breaker.record_failure(reason)
        };
        if let Some(transition) = transition {
            self.publish_transition(breaker, &transition).await;
        }
    }

    /// Operator initiated reset to `closed`.
    pub async fn reset(&self, circuit_id: &str, closed_by: &str) -> Result<(), GatewayError> {
        let breaker = self.by_id(circuit_id).ok_or_else(|| {
            GatewayErrorKind::NotFound
                .error_with_msg(format!("No circuit breaker with id '{circuit_id}'."))
        })?;
        if let Some(transition) = breaker.reset(closed_by) {
            self.publish_transition(&breaker, &transition).await;
        }
        log::info!("Circuit breaker '{circuit_id}' was reset by '{closed_by}'.");
        Ok(())
    }

    /// Append the transition event to the breaker's journal stream.
    ///
    /// Publication happens outside the breaker's state machine; a lost
    /// append only costs observability, never correctness.
    async fn publish_transition(
        &self,
        breaker: &Arc<CircuitBreaker>,
        transition: &BreakerTransition,
    ) {
        let event = breaker.transition_event(transition);
        let journal = self.store.event_journal_facade();
        let stream_id = format!("circuit_breaker-{}", breaker.circuit_id());
        for _attempt in 0..3 {
            let version = journal.stream_version(&stream_id).await;
            match journal
                .append(&stream_id, version, std::slice::from_ref(&event))
                .await
            {
                Ok(_) => return,
                Err(e) if e.kind() == &GatewayErrorKind::ConcurrencyConflict => continue,
                Err(e) => {
                    log::warn!("Failed to journal breaker transition: {e}");
                    return;
                }
            }
        }
        log::warn!(
            "Gave up journaling breaker transition for '{}' after contention.",
            breaker.circuit_id()
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn settings(recovery_micros: u64) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: 3,
            recovery_timeout_micros: recovery_micros,
            rolling_window_micros: 60_000_000,
        }
    }

    fn breaker(recovery_micros: u64) -> CircuitBreaker {
        CircuitBreaker::new(
            "source-s1",
            BreakerKind::Source,
            Some("s1"),
            settings(recovery_micros),
        )
    }

    #[test]
    fn opens_only_at_threshold() {
        let breaker = breaker(60_000_000);
        assert!(breaker.record_failure("http 500").is_none());
        assert!(breaker.record_failure("http 500").is_none());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(matches!(
            breaker.record_failure("http 500"),
            Some(BreakerTransition::Opened { .. })
        ));
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute().0);
    }

    #[test]
    fn half_open_probe_success_closes() {
        let breaker = breaker(20_000);
        for _ in 0..3 {
            breaker.record_failure("http 500");
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        std::thread::sleep(std::time::Duration::from_micros(30_000));
        let (allowed, transition) = breaker.can_execute();
        assert!(allowed);
        assert!(matches!(transition, Some(BreakerTransition::HalfOpened)));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(matches!(
            breaker.record_success(),
            Some(BreakerTransition::Closed { closed_by: None })
        ));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = breaker(20_000);
        for _ in 0..3 {
            breaker.record_failure("http 500");
        }
        std::thread::sleep(std::time::Duration::from_micros(30_000));
        assert!(breaker.can_execute().0);
        assert!(matches!(
            breaker.record_failure("http 503"),
            Some(BreakerTransition::Opened { .. })
        ));
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute().0);
    }

    #[test]
    fn success_in_closed_state_is_silent() {
        let breaker = breaker(60_000_000);
        assert!(breaker.record_success().is_none());
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn reset_clears_counters() {
        let breaker = breaker(60_000_000);
        for _ in 0..3 {
            breaker.record_failure("http 500");
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(matches!(
            breaker.reset("admin-1"),
            Some(BreakerTransition::Closed { closed_by: Some(_) })
        ));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
        // Resetting a closed breaker is not a transition.
        assert!(breaker.reset("admin-1").is_none());
    }

    #[tokio::test]
    async fn registry_journals_transitions() {
        let provider = toolgate_store_mem::InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let breakers = CircuitBreakers::new(
            &store,
            BreakerSettings {
                failure_threshold: 1,
                recovery_timeout_micros: 60_000_000,
                rolling_window_micros: 60_000_000,
            },
        );
        let breaker = breakers.source_breaker("s1");
        breakers.record_outcome(&breaker, false, "http 500").await;
        let events = store
            .event_journal_facade()
            .read("circuit_breaker-source-s1", 0)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].get_event_type(), event_types::BREAKER_OPENED);
        assert_eq!(
            events[0].get_payload().get("source_id").unwrap(),
            &serde_json::json!("s1")
        );
    }
}
