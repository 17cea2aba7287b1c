//! Shutdown coordination.
//!
//! ```text
//! trigger (first signal)
//!     → Shutdown broadcast (HTTP server stops accepting)
//!     → stop every RegistrationHandle (deregistrations run concurrently)
//!     → revoke the AnnouncementHandle
//!     → wait for acknowledgments, at most the grace period
//!     → report; caller exits with status 0
//! ```

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::time::{timeout_at, Instant};

use crate::discovery::{AnnouncementHandle, Revocation};
use crate::lifecycle::handle::StopAck;
use crate::registration::{Deregistration, RegistrationHandle};

/// Process-wide shutdown broadcast.
///
/// Long-running tasks that are not withdrawn individually (the HTTP server)
/// subscribe here.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown broadcast.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to one withdrawal during shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal<T> {
    /// The unit finished and reported its outcome.
    Acknowledged(T),
    /// The unit exited without acknowledging.
    Lost,
    /// Grace period ran out first; the unit is abandoned.
    TimedOut,
}

/// Summary of a completed shutdown.
#[derive(Debug)]
pub struct ShutdownReport {
    pub registrations: Vec<(String, Withdrawal<Deregistration>)>,
    pub announcement: Option<Withdrawal<Revocation>>,
    pub elapsed: Duration,
}

impl ShutdownReport {
    /// Withdrawals abandoned because the grace period expired.
    pub fn timed_out(&self) -> usize {
        let registrations = self
            .registrations
            .iter()
            .filter(|(_, w)| *w == Withdrawal::TimedOut)
            .count();
        let announcement = usize::from(self.announcement == Some(Withdrawal::TimedOut));
        registrations + announcement
    }
}

/// Fans a stop out to every registrar and the announcer, then waits a
/// bounded time for them to withdraw.
pub struct ShutdownCoordinator {
    grace: Duration,
    shutdown: Shutdown,
    registrations: Vec<RegistrationHandle>,
    announcement: Option<AnnouncementHandle>,
}

impl ShutdownCoordinator {
    pub fn new(grace: Duration, shutdown: Shutdown) -> Self {
        Self {
            grace,
            shutdown,
            registrations: Vec::new(),
            announcement: None,
        }
    }

    pub fn add_registration(&mut self, handle: RegistrationHandle) {
        self.registrations.push(handle);
    }

    pub fn set_announcement(&mut self, handle: AnnouncementHandle) {
        self.announcement = Some(handle);
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// Wait for `trigger`, then shut down.
    pub async fn run<F>(self, trigger: F) -> ShutdownReport
    where
        F: Future<Output = &'static str>,
    {
        let reason = trigger.await;
        tracing::info!(reason, "Shutdown triggered");
        self.shutdown().await
    }

    /// Stop everything once and wait at most the grace period.
    pub async fn shutdown(self) -> ShutdownReport {
        let started = Instant::now();
        let deadline = started + self.grace;

        self.shutdown.trigger();

        tracing::info!(
            registrations = self.registrations.len(),
            announcement = self.announcement.is_some(),
            grace = ?self.grace,
            "Withdrawing registrations"
        );

        // Single fan-out pass: every handle is consumed here.
        let registration_acks: Vec<_> = self.registrations.into_iter().map(|h| h.stop()).collect();
        let announcement_ack = self.announcement.map(|h| h.stop());

        let registrations = join_all(
            registration_acks
                .into_iter()
                .map(|ack| await_withdrawal(ack, deadline)),
        );
        let announcement = async {
            match announcement_ack {
                Some(ack) => Some(await_withdrawal(ack, deadline).await.1),
                None => None,
            }
        };
        let (registrations, announcement) = tokio::join!(registrations, announcement);

        let report = ShutdownReport {
            registrations,
            announcement,
            elapsed: started.elapsed(),
        };

        let timed_out = report.timed_out();
        if timed_out > 0 {
            tracing::warn!(
                abandoned = timed_out,
                "Grace period expired before all withdrawals completed"
            );
        }
        tracing::info!(elapsed = ?report.elapsed, "Stopped");
        report
    }
}

async fn await_withdrawal<T>(ack: StopAck<T>, deadline: Instant) -> (String, Withdrawal<T>) {
    let name = ack.name().to_string();
    let withdrawal = match timeout_at(deadline, ack).await {
        Ok(Some(outcome)) => Withdrawal::Acknowledged(outcome),
        Ok(None) => Withdrawal::Lost,
        Err(_) => Withdrawal::TimedOut,
    };
    tracing::debug!(unit = %name, "Withdrawal finished");
    (name, withdrawal)
}
