// ==============================================================================
// debounce.rs - Trailing-Edge Debouncer
// ==============================================================================
// Description: Coalesces bursts of triggers into a single trailing action run
// Author: Matt Barham
// Created: 2026-10-05
// Modified: 2026-10-12
// Version: 1.1.0
// ==============================================================================
// Behaviour:
//   - trigger() never blocks; each trigger restarts the quiet period
//   - the action runs once, `delay` after the last trigger of a burst
//   - the action reads shared state when it runs, not when it was triggered
//   - triggers arriving during a run schedule exactly one more run
//   - flush() runs a pending action now and waits for it
//   - dropping the Debouncer stops the background task
// ==============================================================================

use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Deferred unit of work run by the debouncer
pub type DebouncedAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

enum Command {
    Trigger,
    Flush(oneshot::Sender<()>),
}

/// Handle to a debounce task
pub struct Debouncer {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the background task; must be called within a tokio runtime
    pub fn new(delay: Duration, action: DebouncedAction) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(delay, action, receiver));

        Self { commands, task }
    }

    /// Schedule (or reschedule) the trailing run
    pub fn trigger(&self) {
        if self.commands.send(Command::Trigger).is_err() {
            debug!("Debounce task has stopped, trigger dropped");
        }
    }

    /// Run a pending action immediately; returns once nothing is pending
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.commands.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(delay: Duration, action: DebouncedAction, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut pending = false;

    loop {
        let command = if pending {
            match tokio::time::timeout(delay, commands.recv()).await {
                Ok(command) => command,
                Err(_elapsed) => {
                    pending = false;
                    debug!("Quiet period of {:?} elapsed, running debounced action", delay);
                    action().await;
                    continue;
                }
            }
        } else {
            commands.recv().await
        };

        match command {
            Some(Command::Trigger) => pending = true,
            Some(Command::Flush(done)) => {
                if pending {
                    pending = false;
                    action().await;
                }
                let _ = done.send(());
            }
            None => return,
        }
    }
}
