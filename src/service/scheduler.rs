//! Background refresher
//!
//! A single thread owns every timing concern: the periodic all-sessions
//! refresh at the active page's cadence, the delayed first render after a
//! join, and immediate refreshes requested by editor mutations. All other
//! threads talk to it through a channel; the loop blocks on `recv_timeout`
//! against the earliest due deadline, so there is no busy polling and no
//! work happens while idle.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::host::{ClientHandle, ClientId};

use super::ServiceInner;

// =============================================================================
// COMMANDS
// =============================================================================

pub(crate) enum Command {
    /// Track (or refresh) a client, optionally after a delay
    Open {
        client: Arc<dyn ClientHandle>,
        delay: Option<Duration>,
    },
    /// Refresh one tracked session now
    Refresh(ClientId),
    /// Refresh every tracked session now
    RefreshAll,
    /// Recompute the periodic cadence from the active page
    Rearm,
    Shutdown,
}

// =============================================================================
// REFRESHER HANDLE
// =============================================================================

pub(crate) struct Refresher {
    tx: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Refresher {
    pub(crate) fn spawn(inner: Arc<ServiceInner>) -> Self {
        let (tx, rx) = unbounded::<Command>();
        let handle = std::thread::Builder::new()
            .name("scoreboard-refresher".to_string())
            .spawn(move || refresher_thread(inner, rx));
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "[SERVICE] Could not spawn refresher thread");
                None
            }
        };
        Self {
            tx,
            handle: Mutex::new(handle),
        }
    }

    pub(crate) fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            debug!("[SERVICE] Refresher is gone, command dropped");
        }
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

// =============================================================================
// THREAD LOOP
// =============================================================================

fn refresher_thread(inner: Arc<ServiceInner>, rx: Receiver<Command>) {
    // Delayed first renders waiting for their due time
    let mut pending_opens: Vec<(Instant, Arc<dyn ClientHandle>)> = Vec::new();
    // Periodic tick state; disarmed until the first Rearm
    let mut interval: Option<Duration> = None;
    let mut next_tick: Option<Instant> = None;

    loop {
        let now = Instant::now();
        let mut deadline = next_tick;
        for (due, _) in &pending_opens {
            if deadline.map_or(true, |d| *due < d) {
                deadline = Some(*due);
            }
        }

        let received = match deadline {
            Some(due) => match rx.recv_timeout(due.saturating_duration_since(now)) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            },
        };

        if let Some(command) = received {
            match command {
                Command::Open { client, delay } => match delay {
                    Some(delay) => pending_opens.push((Instant::now() + delay, client)),
                    None => inner.open_session(client),
                },
                Command::Refresh(id) => inner.refresh_one(&id),
                Command::RefreshAll => {
                    if inner.refresh_all() {
                        // Rotation changed the active page; its cadence wins.
                        interval = inner.tick_interval();
                        next_tick = interval.map(|i| Instant::now() + i);
                    }
                }
                Command::Rearm => {
                    interval = inner.tick_interval();
                    next_tick = interval.map(|i| Instant::now() + i);
                    debug!(interval_ms = interval.map(|i| i.as_millis() as u64), "[SERVICE] Cadence re-armed");
                }
                Command::Shutdown => return,
            }
            continue;
        }

        // A deadline elapsed: run due first renders, then the periodic tick.
        let now = Instant::now();
        let mut i = 0;
        while i < pending_opens.len() {
            if pending_opens[i].0 <= now {
                let (_, client) = pending_opens.remove(i);
                inner.open_session(client);
            } else {
                i += 1;
            }
        }
        if let Some(due) = next_tick {
            if due <= now {
                if inner.refresh_all() {
                    interval = inner.tick_interval();
                }
                next_tick = interval.map(|i| Instant::now() + i);
            }
        }
    }
}
