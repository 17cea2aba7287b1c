//! One-shot stop handles for background units.
//!
//! A unit (registrar, announcer) is spawned with a [`StopSignal`] and a
//! [`Completion`]; the coordinator keeps the matching [`StopHandle`].
//! Stopping consumes the handle, so a unit can be signalled at most once.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Create the three ends of a stop channel for the unit called `name`.
pub fn stop_channel<T>(name: impl Into<String>) -> (StopHandle<T>, StopSignal, Completion<T>) {
    let (stop_tx, stop_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel();
    (
        StopHandle {
            name: name.into(),
            stop_tx,
            done_rx,
        },
        StopSignal { rx: stop_rx },
        Completion { tx: done_tx },
    )
}

/// Coordinator side: request a stop once, then await the acknowledgment.
#[derive(Debug)]
pub struct StopHandle<T> {
    name: String,
    stop_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<T>,
}

impl<T> StopHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the unit to stop and return its pending acknowledgment.
    pub fn stop(self) -> StopAck<T> {
        if self.stop_tx.send(()).is_err() {
            tracing::debug!(unit = %self.name, "Unit already exited before stop was requested");
        }
        StopAck {
            name: self.name,
            rx: self.done_rx,
        }
    }
}

/// Acknowledgment of a stop request.
///
/// Resolves to `None` when the unit went away without acknowledging.
#[derive(Debug)]
pub struct StopAck<T> {
    name: String,
    rx: oneshot::Receiver<T>,
}

impl<T> StopAck<T> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Future for StopAck<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

/// Unit side: resolves once a stop is requested.
///
/// A dropped [`StopHandle`] counts as a stop request.
#[derive(Debug)]
pub struct StopSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for StopSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

/// Unit side: acknowledges completion exactly once.
#[derive(Debug)]
pub struct Completion<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Completion<T> {
    pub fn complete(self, value: T) {
        // Coordinator may have given up waiting already.
        let _ = self.tx.send(value);
    }
}
