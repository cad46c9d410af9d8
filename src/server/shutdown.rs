//! Termination signal handling
//!
//! SIGTERM and SIGINT move the exporter from running to terminating. The
//! poll loop watches a [`ShutdownSignal`] and stops at its next sleep; a
//! cycle that is still talking to the API server is dropped with the
//! runtime rather than drained.

use tokio::sync::watch;
use tracing::info;

/// Receiving side of the shutdown channel, cloned into every task that
/// needs to stop
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait until shutdown is triggered
    ///
    /// Also returns if the controller was dropped.
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                break;
            }
        }
    }

    /// Whether shutdown was triggered or the controller is gone
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }
}

/// Sending side of the shutdown channel, owned by `main`
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Termination signal streams, registered with the OS on construction
///
/// Install this before any slow startup work: a signal delivered before
/// installation takes the default action and kills the process with a
/// non-zero status. Signals delivered after installation are buffered until
/// [`SignalListener::recv`] is polled.
#[cfg(unix)]
pub struct SignalListener {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for SIGTERM or SIGINT and return its name
    pub async fn recv(&mut self) -> &'static str {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Caught signal");
        name
    }
}

#[cfg(windows)]
pub struct SignalListener {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl SignalListener {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    /// Wait for Ctrl+C
    pub async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        info!(signal = "CTRL_C", "Caught signal");
        "CTRL_C"
    }
}
