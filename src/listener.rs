//! Song event listeners
//!
//! Listeners subscribe to event kinds on the processor. They can be added
//! and removed at any time, from any thread, which lets integrations be
//! switched on and off without restarting the event loop.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use crate::error::Result;
use crate::event::{EventKind, TrackEvent};

/// Receives song events from the processor.
///
/// Every method has a no-op default so a listener only implements the
/// kinds it subscribes to. Calls are made one at a time on the processing
/// thread, in registration order; a listener that blocks holds up every
/// event behind it.
pub trait SongEventListener: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// A track started playing. Song details may not be resolved yet.
    fn on_track_loaded(&self, _event: &TrackEvent) -> Result<()> {
        Ok(())
    }

    /// A track passed the now-playing point.
    fn on_now_playing(&self, _event: &TrackEvent) -> Result<()> {
        Ok(())
    }

    /// A track ended after its scrobble point.
    fn on_scrobble(&self, _event: &TrackEvent) -> Result<()> {
        Ok(())
    }
}

/// Shared registry of listeners by event kind.
///
/// Cloning gives another handle to the same registry.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<RwLock<HashMap<EventKind, Vec<Arc<dyn SongEventListener>>>>>,
}

impl Listeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener to an event kind.
    pub fn add(&self, kind: EventKind, listener: Arc<dyn SongEventListener>) {
        self.inner.write().entry(kind).or_default().push(listener);
    }

    /// Unsubscribe a listener from an event kind. Returns true if it was
    /// registered.
    pub fn remove(&self, kind: EventKind, listener: &Arc<dyn SongEventListener>) -> bool {
        let mut inner = self.inner.write();
        let Some(registered) = inner.get_mut(&kind) else {
            return false;
        };

        let before = registered.len();
        registered.retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
        before != registered.len()
    }

    /// Number of listeners subscribed to a kind
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.inner.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver an event to every listener of its kind.
    ///
    /// Each call runs inside its own error boundary: errors and panics are
    /// logged and the remaining listeners still get the event. The
    /// registry lock is not held while listeners run. Returns the number of
    /// listeners that failed.
    pub fn notify(&self, kind: EventKind, event: &TrackEvent) -> usize {
        let listeners = self.inner.read().get(&kind).cloned().unwrap_or_default();

        let mut failures = 0;
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match kind {
                EventKind::TrackLoaded => listener.on_track_loaded(event),
                EventKind::NowPlaying => listener.on_now_playing(event),
                EventKind::Scrobble => listener.on_scrobble(event),
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!("Listener {} failed on {}: {}", listener.name(), kind, e);
                }
                Err(_) => {
                    failures += 1;
                    error!("Listener {} panicked on {}", listener.name(), kind);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::tests::snapshot;
    use crate::model::TrackHandle;
    use crate::types::{DeviceId, TrackId};
    use parking_lot::Mutex;

    /// Records the kinds it was called with, in order.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) name: String,
        pub(crate) calls: Mutex<Vec<(String, EventKind)>>,
        pub(crate) log: Option<Arc<Mutex<Vec<String>>>>,
    }

    impl Recorder {
        pub(crate) fn named(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ..Self::default()
            }
        }

        fn record(&self, kind: EventKind) {
            self.calls.lock().push((self.name.clone(), kind));
            if let Some(log) = &self.log {
                log.lock().push(format!("{}:{}", self.name, kind));
            }
        }
    }

    impl SongEventListener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_track_loaded(&self, _event: &TrackEvent) -> Result<()> {
            self.record(EventKind::TrackLoaded);
            Ok(())
        }

        fn on_now_playing(&self, _event: &TrackEvent) -> Result<()> {
            self.record(EventKind::NowPlaying);
            Ok(())
        }

        fn on_scrobble(&self, _event: &TrackEvent) -> Result<()> {
            self.record(EventKind::Scrobble);
            Ok(())
        }
    }

    struct Failing;

    impl SongEventListener for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn on_now_playing(&self, _event: &TrackEvent) -> Result<()> {
            Err(Error::listener("boom"))
        }
    }

    struct Panicking;

    impl SongEventListener for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        fn on_now_playing(&self, _event: &TrackEvent) -> Result<()> {
            panic!("listener bug");
        }
    }

    pub(crate) fn track_event() -> TrackEvent {
        TrackEvent {
            track: Arc::new(TrackHandle::new(DeviceId(1), TrackId(100))),
            status: snapshot(100, 0, true),
            started_at: None,
        }
    }

    #[test]
    fn test_notify_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listeners = Listeners::new();
        for name in ["first", "second", "third"] {
            let mut recorder = Recorder::named(name);
            recorder.log = Some(Arc::clone(&log));
            listeners.add(EventKind::NowPlaying, Arc::new(recorder));
        }

        assert_eq!(listeners.notify(EventKind::NowPlaying, &track_event()), 0);
        assert_eq!(
            *log.lock(),
            ["first:NowPlaying", "second:NowPlaying", "third:NowPlaying"]
        );
    }

    #[test]
    fn test_notify_only_subscribed_kind() {
        let listeners = Listeners::new();
        let recorder = Arc::new(Recorder::named("scrobbles"));
        listeners.add(EventKind::Scrobble, recorder.clone());

        listeners.notify(EventKind::NowPlaying, &track_event());
        assert!(recorder.calls.lock().is_empty());

        listeners.notify(EventKind::Scrobble, &track_event());
        assert_eq!(recorder.calls.lock().len(), 1);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let listeners = Listeners::new();
        let recorder = Arc::new(Recorder::named("after"));
        listeners.add(EventKind::NowPlaying, Arc::new(Failing));
        listeners.add(EventKind::NowPlaying, Arc::new(Panicking));
        listeners.add(EventKind::NowPlaying, recorder.clone());

        assert_eq!(listeners.notify(EventKind::NowPlaying, &track_event()), 2);
        assert_eq!(recorder.calls.lock().len(), 1);
    }

    #[test]
    fn test_remove_listener() {
        let listeners = Listeners::new();
        let recorder: Arc<dyn SongEventListener> = Arc::new(Recorder::named("r"));
        listeners.add(EventKind::NowPlaying, Arc::clone(&recorder));
        listeners.add(EventKind::Scrobble, Arc::clone(&recorder));
        assert_eq!(listeners.count(EventKind::NowPlaying), 1);

        assert!(listeners.remove(EventKind::NowPlaying, &recorder));
        assert!(!listeners.remove(EventKind::NowPlaying, &recorder));
        assert!(!listeners.remove(EventKind::TrackLoaded, &recorder));
        assert_eq!(listeners.count(EventKind::NowPlaying), 0);
        assert_eq!(listeners.count(EventKind::Scrobble), 1);
    }

    #[test]
    fn test_clones_share_registry() {
        let listeners = Listeners::new();
        let handle = listeners.clone();
        handle.add(EventKind::TrackLoaded, Arc::new(Recorder::named("r")));
        assert_eq!(listeners.count(EventKind::TrackLoaded), 1);
    }
}
