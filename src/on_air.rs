//! On-air warning signal
//!
//! Devices about to play something that breaks a compliance rule get a
//! blinking on-air light. The accountant writes the set of flagged devices
//! into a watch channel; a dedicated thread reads whole-set snapshots from
//! it and turns them into a blinking command stream for the hardware.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::types::DeviceId;

/// Default time between on and off commands
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(250);

/// Receives on-air commands. An empty set switches every light off.
pub trait OnAirCommandSink: Send {
    fn send(&mut self, devices: &BTreeSet<DeviceId>) -> Result<()>;
}

/// Sink that only logs, for setups without on-air hardware.
#[derive(Debug, Default)]
pub struct LoggingSink;

impl OnAirCommandSink for LoggingSink {
    fn send(&mut self, devices: &BTreeSet<DeviceId>) -> Result<()> {
        if devices.is_empty() {
            debug!("On-air off");
        } else {
            info!("On-air warning for devices {:?}", devices);
        }
        Ok(())
    }
}

/// Create the hand-off between the accountant and the signal thread.
#[must_use]
pub fn warn_channel() -> (WarnSet, watch::Receiver<BTreeSet<DeviceId>>) {
    let (tx, rx) = watch::channel(BTreeSet::new());
    (WarnSet { tx }, rx)
}

/// Writer side of the set of devices flagged for the on-air warning.
#[derive(Debug)]
pub struct WarnSet {
    tx: watch::Sender<BTreeSet<DeviceId>>,
}

impl WarnSet {
    /// Flag a device. Returns true if it was not flagged before.
    pub fn set_warn(&self, device: DeviceId) -> bool {
        self.tx.send_if_modified(|devices| devices.insert(device))
    }

    /// Clear a device's flag. Returns true if it was flagged.
    pub fn remove_warn(&self, device: DeviceId) -> bool {
        self.tx.send_if_modified(|devices| devices.remove(&device))
    }

    #[must_use]
    pub fn is_warned(&self, device: DeviceId) -> bool {
        self.tx.borrow().contains(&device)
    }

    /// Copy of the current set
    #[must_use]
    pub fn snapshot(&self) -> BTreeSet<DeviceId> {
        self.tx.borrow().clone()
    }
}

/// Background loop that blinks the warning for flagged devices.
pub struct OnAirSignal {
    warnings: watch::Receiver<BTreeSet<DeviceId>>,
    sink: Box<dyn OnAirCommandSink>,
    interval: Duration,
}

impl OnAirSignal {
    #[must_use]
    pub fn new(
        warnings: watch::Receiver<BTreeSet<DeviceId>>,
        sink: Box<dyn OnAirCommandSink>,
        interval: Duration,
    ) -> Self {
        Self {
            warnings,
            sink,
            interval,
        }
    }

    /// Start the loop on its own thread.
    pub fn spawn(self) -> Result<OnAirHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("on-air-signal".to_string())
            .spawn(move || self.run(&flag))?;
        Ok(OnAirHandle { running, thread })
    }

    /// Blink until stopped, until the warning set is dropped, or until the
    /// sink fails. A failing sink is not retried.
    fn run(mut self, running: &AtomicBool) {
        info!("On-air warning started");

        // always sleep between rounds, whether or not anything was sent
        while nap(self.interval, running) {
            if self.warnings.has_changed().is_err() {
                info!("Warning set closed");
                break;
            }

            let devices = self.warnings.borrow_and_update().clone();
            if devices.is_empty() {
                continue;
            }

            if let Err(e) = self.sink.send(&devices) {
                error!("On-air command failed, stopping warnings: {}", e);
                break;
            }

            let keep_going = nap(self.interval, running);
            if let Err(e) = self.sink.send(&BTreeSet::new()) {
                error!("On-air command failed, stopping warnings: {}", e);
                break;
            }
            if !keep_going {
                break;
            }
        }

        info!("On-air warning stopped");
    }
}

/// Sleep for `interval` unless `running` is cleared first. Returns false if
/// the loop should stop.
fn nap(interval: Duration, running: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}

/// Handle to a running on-air loop.
pub struct OnAirHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl OnAirHandle {
    /// Ask the loop to stop. Does not wait for it.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.thread.thread().unpark();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stop the loop and wait for the thread to exit.
    pub fn shutdown(self) {
        self.stop();
        if self.thread.join().is_err() {
            warn!("On-air thread panicked");
        }
    }
}
