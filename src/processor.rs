//! Event processing loop
//!
//! The processor is the only consumer of the event queue. It takes events
//! one at a time, looks up track metadata when a track is loaded (and
//! retries at the now-playing point if the first lookup came back empty),
//! then hands each event to the listeners subscribed to its kind.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::{EventKind, EventReceiver, SongEvent, TrackEvent};
use crate::listener::{Listeners, SongEventListener};
use crate::resolver::MetadataResolver;
use crate::song::SongDetails;

/// Single consumer of the shared event queue.
pub struct EventProcessor {
    queue: EventReceiver,
    resolver: Arc<dyn MetadataResolver>,
    listeners: Listeners,
}

impl EventProcessor {
    #[must_use]
    pub fn new(queue: EventReceiver, resolver: Arc<dyn MetadataResolver>) -> Self {
        Self {
            queue,
            resolver,
            listeners: Listeners::new(),
        }
    }

    /// Handle to the listener registry, usable from other threads while
    /// the processor runs.
    #[must_use]
    pub fn listeners(&self) -> Listeners {
        self.listeners.clone()
    }

    pub fn add_listener(&self, kind: EventKind, listener: Arc<dyn SongEventListener>) {
        self.listeners.add(kind, listener);
    }

    pub fn remove_listener(&self, kind: EventKind, listener: &Arc<dyn SongEventListener>) -> bool {
        self.listeners.remove(kind, listener)
    }

    /// Process events until every sender has been dropped.
    ///
    /// Blocks the calling thread; must not be called from async code.
    pub fn run(mut self) {
        info!("Event processor started");
        while let Some(event) = self.queue.blocking_recv() {
            info!("Received event {}", event);
            self.process(&event);
        }
        info!("Event queue closed, processor stopping");
    }

    /// Run the processing loop on a dedicated thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("event-processor".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Process whatever is queued right now without waiting. Returns the
    /// number of events handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.queue.try_recv() {
            self.process(&event);
            handled += 1;
        }
        handled
    }

    /// Handle one event.
    pub fn process(&self, event: &SongEvent) {
        match event {
            SongEvent::TrackLoaded(e) => {
                // first chance to identify the track, early enough to warn
                // before it is really played
                self.resolve(e);
                self.listeners.notify(EventKind::TrackLoaded, e);
            }
            SongEvent::NowPlaying(e) => {
                // last chance: the scrobble point depends on the duration
                self.resolve(e);
                self.listeners.notify(EventKind::NowPlaying, e);
            }
            SongEvent::Scrobble(e) => {
                self.listeners.notify(EventKind::Scrobble, e);
            }
            SongEvent::Reset(status) => {
                debug!("Device {} reset", status.device);
            }
            SongEvent::Transition { device, from, to } => {
                debug!("Device {} {} -> {}", device, from, to);
            }
        }
    }

    /// Attach song details to the event's track if they are still missing.
    fn resolve(&self, event: &TrackEvent) {
        if event.song().is_some() {
            return;
        }

        let track_id = event.track.track_id();
        match self.resolver.resolve(track_id) {
            Ok(Some(metadata)) => {
                let song = SongDetails::new(metadata);
                info!("Device {} song: {}", event.device(), song);
                event.track.attach(song);
            }
            Ok(None) => {
                warn!("Device {} track {} not found; it will not be scrobbled", event.device(), track_id);
            }
            Err(e) => {
                warn!("Device {} metadata lookup for track {} failed: {}", event.device(), track_id, e);
            }
        }
    }
}
