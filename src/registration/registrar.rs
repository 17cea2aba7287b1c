//! Keepalive registrar for a single remote catalog.
//!
//! # States
//! ```text
//! Unregistered ──register ok──▶ Registered ──timer──▶ Renewing ──▶ Registered
//!      │  ▲                         │                    │
//!      └──┘ register failed         │                    │
//!        (backoff)                  ▼                    ▼
//!                     stop ──▶ Stopping ──deregister──▶ Stopped
//! ```
//!
//! # Design Decisions
//! - Renewal at a third of the TTL so the remote entry never lapses
//! - Renewal failures keep the schedule; the remote TTL decides liveness
//! - Stop is honoured in every state, including mid-request
//! - Exactly one deregistration attempt, then acknowledge

use std::time::Duration;

use tokio::time::sleep;
use tracing::Instrument;

use crate::lifecycle::handle::{stop_channel, Completion, StopHandle, StopSignal};
use crate::observability::metrics;
use crate::registration::client::CatalogClient;
use crate::registration::descriptor::RegistrationDescriptor;
use crate::registration::types::{Deregistration, RegistrationState};
use crate::resilience::BackoffPolicy;

/// Handle held by the shutdown coordinator for one registrar.
pub type RegistrationHandle = StopHandle<Deregistration>;

/// Interval between renewals for a TTL, or `None` when the TTL is zero
/// and the registration never expires.
pub fn renewal_interval(ttl: Duration) -> Option<Duration> {
    if ttl.is_zero() {
        None
    } else {
        Some(ttl / 3)
    }
}

/// Keeps one registration alive in one catalog.
pub struct KeepaliveRegistrar<C> {
    target: String,
    client: C,
    descriptor: RegistrationDescriptor,
    backoff: BackoffPolicy,
    state: RegistrationState,
}

impl<C: CatalogClient> KeepaliveRegistrar<C> {
    pub fn new(
        target: impl Into<String>,
        client: C,
        descriptor: RegistrationDescriptor,
        backoff: BackoffPolicy,
    ) -> Self {
        Self {
            target: target.into(),
            client,
            descriptor,
            backoff,
            state: RegistrationState::Unregistered,
        }
    }

    /// Spawn the keepalive loop and return its stop handle.
    ///
    /// The handle exists before the first registration attempt is made.
    pub fn spawn(self) -> RegistrationHandle {
        let (handle, signal, completion) = stop_channel(self.target.clone());
        let span = tracing::info_span!("registrar", target = %self.target);
        tokio::spawn(self.run(signal, completion).instrument(span));
        handle
    }

    /// Run until `stop` resolves, then deregister once and acknowledge.
    pub async fn run(mut self, mut stop: StopSignal, done: Completion<Deregistration>) {
        let interval = renewal_interval(self.descriptor.ttl());
        tracing::info!(
            id = %self.descriptor.id(),
            ttl_secs = self.descriptor.ttl().as_secs(),
            renew_every = ?interval,
            "Starting keepalive registration"
        );

        let mut failures = 0u32;
        loop {
            let next = tokio::select! {
                biased;
                _ = &mut stop => break,
                next = self.attempt(interval, &mut failures) => next,
            };

            match next {
                Some(delay) => {
                    tokio::select! {
                        biased;
                        _ = &mut stop => break,
                        _ = sleep(delay) => {}
                    }
                }
                None => {
                    tracing::debug!("Registration has no TTL, skipping renewals");
                    (&mut stop).await;
                    break;
                }
            }
        }

        self.set_state(RegistrationState::Stopping);
        let outcome = self.deregister().await;
        self.set_state(RegistrationState::Stopped);
        done.complete(outcome);
    }

    /// One registration or renewal attempt. Returns how long to wait before
    /// the next one, or `None` when no further attempts are due.
    async fn attempt(&mut self, interval: Option<Duration>, failures: &mut u32) -> Option<Duration> {
        match self.state {
            RegistrationState::Unregistered => {
                match self.client.register(&self.descriptor).await {
                    Ok(()) => {
                        *failures = 0;
                        metrics::record_registration_attempt(&self.target, "register", true);
                        self.set_state(RegistrationState::Registered);
                        tracing::info!(id = %self.descriptor.id(), "Registered in catalog");
                        interval
                    }
                    Err(e) => {
                        *failures = failures.saturating_add(1);
                        metrics::record_registration_attempt(&self.target, "register", false);
                        let delay = self.backoff.delay(*failures, interval);
                        tracing::warn!(
                            error = %e,
                            attempt = *failures,
                            retry_in = ?delay,
                            "Registration failed"
                        );
                        Some(delay)
                    }
                }
            }
            _ => {
                self.set_state(RegistrationState::Renewing);
                match self.client.renew(&self.descriptor).await {
                    Ok(()) => {
                        metrics::record_registration_attempt(&self.target, "renew", true);
                        tracing::debug!(id = %self.descriptor.id(), "Registration renewed");
                    }
                    Err(e) => {
                        metrics::record_registration_attempt(&self.target, "renew", false);
                        tracing::warn!(error = %e, "Renewal failed, keeping schedule");
                    }
                }
                self.set_state(RegistrationState::Registered);
                interval
            }
        }
    }

    async fn deregister(&self) -> Deregistration {
        match self.client.deregister(self.descriptor.id()).await {
            Ok(()) => {
                metrics::record_deregistration(&self.target, true);
                tracing::info!(id = %self.descriptor.id(), "Deregistered from catalog");
                Deregistration::Removed
            }
            Err(e) => {
                metrics::record_deregistration(&self.target, false);
                tracing::warn!(error = %e, "Deregistration failed");
                Deregistration::Failed(e.to_string())
            }
        }
    }

    fn set_state(&mut self, state: RegistrationState) {
        if self.state != state {
            tracing::trace!(from = %self.state, to = %state, "Registrar state change");
            self.state = state;
            if let Some(registered) = registered_gauge(state) {
                metrics::set_registered(&self.target, registered);
            }
        }
    }
}

/// Gauge value published on entering `state`. Renewing keeps the previous
/// value so the entry does not flap while a renewal is in flight.
fn registered_gauge(state: RegistrationState) -> Option<bool> {
    match state {
        RegistrationState::Registered => Some(true),
        RegistrationState::Stopping => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::registration::types::{RegistrationError, RegistrationResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Register,
        Renew,
        Deregister(String),
    }

    #[derive(Clone, Default)]
    struct RecordingCatalog {
        calls: Arc<Mutex<Vec<Call>>>,
        reachable: bool,
    }

    impl RecordingCatalog {
        fn reachable() -> Self {
            Self {
                reachable: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) -> RegistrationResult<()> {
            self.calls.lock().unwrap().push(call);
            if self.reachable {
                Ok(())
            } else {
                Err(RegistrationError::Status {
                    status: 503,
                    body: "down".into(),
                })
            }
        }
    }

    #[async_trait]
    impl CatalogClient for RecordingCatalog {
        async fn register(&self, _: &RegistrationDescriptor) -> RegistrationResult<()> {
            self.record(Call::Register)
        }

        async fn renew(&self, _: &RegistrationDescriptor) -> RegistrationResult<()> {
            self.record(Call::Renew)
        }

        async fn deregister(&self, service_id: &str) -> RegistrationResult<()> {
            self.record(Call::Deregister(service_id.to_string()))
        }
    }

    fn descriptor(ttl: Duration) -> RegistrationDescriptor {
        RegistrationDescriptor::from_config(&CatalogConfig::default())
            .unwrap()
            .with_ttl(ttl)
    }

    fn backoff() -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(20), Duration::from_millis(50))
    }

    #[test]
    fn test_renewal_interval_shorter_than_ttl() {
        for secs in [1, 3, 30, 120, 3600] {
            let ttl = Duration::from_secs(secs);
            assert!(renewal_interval(ttl).unwrap() < ttl);
        }
        assert_eq!(renewal_interval(Duration::ZERO), None);
    }

    #[test]
    fn test_renewing_keeps_registered_gauge() {
        assert_eq!(registered_gauge(RegistrationState::Registered), Some(true));
        assert_eq!(registered_gauge(RegistrationState::Renewing), None);
        assert_eq!(registered_gauge(RegistrationState::Stopping), Some(false));
        assert_eq!(registered_gauge(RegistrationState::Unregistered), None);
    }

    #[tokio::test]
    async fn test_registers_renews_and_deregisters() {
        let catalog = RecordingCatalog::reachable();
        let registrar = KeepaliveRegistrar::new(
            "sc",
            catalog.clone(),
            descriptor(Duration::from_millis(300)),
            backoff(),
        );
        assert_eq!(registrar.state, RegistrationState::Unregistered);
        let handle = registrar.spawn();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let outcome = handle.stop().await;
        assert_eq!(outcome, Some(Deregistration::Removed));

        let calls = catalog.calls();
        assert_eq!(calls[0], Call::Register);
        let renewals = calls.iter().filter(|c| **c == Call::Renew).count();
        assert!((2..=4).contains(&renewals), "unexpected renewals: {}", renewals);
        assert_eq!(
            calls.last(),
            Some(&Call::Deregister("localhost:8081/DeviceCatalog".into()))
        );
    }

    #[tokio::test]
    async fn test_no_calls_after_stop() {
        let catalog = RecordingCatalog::reachable();
        let handle = KeepaliveRegistrar::new(
            "sc",
            catalog.clone(),
            descriptor(Duration::from_millis(60)),
            backoff(),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;
        let after_stop = catalog.calls().len();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(catalog.calls().len(), after_stop);
        let deregistrations = catalog
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Deregister(_)))
            .count();
        assert_eq!(deregistrations, 1);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_retries_then_deregisters_once() {
        let catalog = RecordingCatalog::default();
        let handle = KeepaliveRegistrar::new(
            "sc",
            catalog.clone(),
            descriptor(Duration::from_secs(30)),
            backoff(),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let outcome = tokio::time::timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("registrar should acknowledge promptly");
        assert!(matches!(outcome, Some(Deregistration::Failed(_))));

        let calls = catalog.calls();
        let registers = calls.iter().filter(|c| **c == Call::Register).count();
        assert!(registers >= 2, "expected retries, got {}", registers);
        assert!(!calls.contains(&Call::Renew));
        assert!(matches!(calls.last(), Some(Call::Deregister(_))));
    }

    #[tokio::test]
    async fn test_zero_ttl_registers_once() {
        let catalog = RecordingCatalog::reachable();
        let handle = KeepaliveRegistrar::new(
            "sc",
            catalog.clone(),
            descriptor(Duration::ZERO),
            backoff(),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;
        assert_eq!(
            catalog.calls(),
            vec![
                Call::Register,
                Call::Deregister("localhost:8081/DeviceCatalog".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_before_first_attempt_completes() {
        let catalog = RecordingCatalog::reachable();
        let (handle, signal, completion) = stop_channel("sc");
        let registrar = KeepaliveRegistrar::new(
            "sc",
            catalog.clone(),
            descriptor(Duration::from_secs(30)),
            backoff(),
        );

        let ack = handle.stop();
        registrar.run(signal, completion).await;
        assert_eq!(ack.await, Some(Deregistration::Removed));
        assert_eq!(
            catalog.calls(),
            vec![Call::Deregister("localhost:8081/DeviceCatalog".into())]
        );
    }
}
