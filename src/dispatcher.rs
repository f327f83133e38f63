//! Status snapshot dispatch
//!
//! The dispatcher runs on the status-ingestion thread. It feeds each
//! snapshot to the model for its device and puts the resulting events on
//! the shared queue, so that slow work (metadata lookups, scrobbling)
//! happens on the processing thread instead.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::event::{EventSender, SongEvent};
use crate::model::PlaybackModel;
use crate::status::DeviceStatus;
use crate::types::{DeviceId, Milliseconds};

/// Owns one playback model per device.
pub struct EventDispatcher {
    models: HashMap<DeviceId, PlaybackModel>,
    queue: EventSender,
    now_playing_point: Milliseconds,
}

impl EventDispatcher {
    #[must_use]
    pub fn new(queue: EventSender, now_playing_point: Milliseconds) -> Self {
        Self {
            models: HashMap::new(),
            queue,
            now_playing_point,
        }
    }

    /// Apply a snapshot and publish the events it produced.
    ///
    /// A model that reaches the end of its track is replaced with a fresh
    /// one before publishing. If the queue has been closed the remaining
    /// events of this snapshot are dropped and [`Error::QueueClosed`] is
    /// returned; nothing is retried.
    pub fn received(&mut self, status: &DeviceStatus) -> Result<()> {
        let device = status.device;
        let now_playing_point = self.now_playing_point;

        let model = self
            .models
            .entry(device)
            .or_insert_with(|| PlaybackModel::new(device, now_playing_point));

        let events = model.update(status);
        if events.is_empty() {
            return Ok(());
        }

        if events.iter().any(SongEvent::ends_track) {
            debug!("Device {} track lifecycle ended, starting a fresh model", device);
            self.models
                .insert(device, PlaybackModel::new(device, now_playing_point));
        }

        for event in events {
            info!("Device {} sending event {}", device, event);
            self.queue.send(event).map_err(|_| Error::QueueClosed)?;
        }

        Ok(())
    }

    /// Model currently tracking a device, if the device has been seen.
    #[must_use]
    pub fn model(&self, device: DeviceId) -> Option<&PlaybackModel> {
        self.models.get(&device)
    }

    /// Number of devices seen so far
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.models.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{event_queue, EventReceiver};
    use crate::model::tests::snapshot;
    use crate::model::DEFAULT_NOW_PLAYING_POINT;
    use crate::state::SongState;
    use crate::types::TrackId;

    fn drain(rx: &mut EventReceiver) -> Vec<SongEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_models_created_lazily_per_device() {
        let (tx, _rx) = event_queue();
        let mut dispatcher = EventDispatcher::new(tx, DEFAULT_NOW_PLAYING_POINT);
        assert_eq!(dispatcher.device_count(), 0);

        dispatcher.received(&snapshot(100, 0, false)).unwrap();
        let mut other = snapshot(100, 0, false);
        other.device = DeviceId(3);
        dispatcher.received(&other).unwrap();

        assert_eq!(dispatcher.device_count(), 2);
        assert!(dispatcher.model(DeviceId(3)).is_some());
        assert!(dispatcher.model(DeviceId(2)).is_none());
    }

    #[test]
    fn test_events_are_published_in_order() {
        let (tx, mut rx) = event_queue();
        let mut dispatcher = EventDispatcher::new(tx, DEFAULT_NOW_PLAYING_POINT);

        dispatcher.received(&snapshot(100, 0, true)).unwrap();
        dispatcher.received(&snapshot(100, 10_000, true)).unwrap();

        let names: Vec<_> = drain(&mut rx).iter().map(SongEvent::name).collect();
        assert_eq!(names, ["TrackLoaded", "NowPlaying"]);
    }

    #[test]
    fn test_reset_replaces_model() {
        let (tx, mut rx) = event_queue();
        let mut dispatcher = EventDispatcher::new(tx, DEFAULT_NOW_PLAYING_POINT);

        dispatcher.received(&snapshot(100, 0, true)).unwrap();
        dispatcher.received(&snapshot(100, 10_000, true)).unwrap();
        dispatcher.received(&snapshot(200, 10_500, true)).unwrap();

        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(SongEvent::Reset(_))));

        let model = dispatcher.model(DeviceId(1)).unwrap();
        assert_eq!(model.state(), SongState::Started);
        assert!(model.track_id().is_unset());

        // the next snapshot starts the new track from scratch
        dispatcher.received(&snapshot(200, 11_000, true)).unwrap();
        let model = dispatcher.model(DeviceId(1)).unwrap();
        assert_eq!(model.state(), SongState::Cueing);
        assert_eq!(model.track_id(), TrackId(200));
        assert!(model.total_play_time().is_zero());
    }

    #[test]
    fn test_transition_keeps_model() {
        let (tx, mut rx) = event_queue();
        let mut dispatcher = EventDispatcher::new(tx, DEFAULT_NOW_PLAYING_POINT);

        dispatcher.received(&snapshot(100, 0, true)).unwrap();
        dispatcher.received(&snapshot(100, 10_000, true)).unwrap();
        dispatcher.received(&snapshot(100, 10_500, false)).unwrap();

        assert!(matches!(
            drain(&mut rx).last(),
            Some(SongEvent::Transition { .. })
        ));
        assert_eq!(
            dispatcher.model(DeviceId(1)).unwrap().state(),
            SongState::PlayingPaused
        );
    }

    #[test]
    fn test_closed_queue_surfaces_error() {
        let (tx, rx) = event_queue();
        drop(rx);
        let mut dispatcher = EventDispatcher::new(tx, DEFAULT_NOW_PLAYING_POINT);

        let result = dispatcher.received(&snapshot(100, 0, true));
        assert!(matches!(result, Err(Error::QueueClosed)));

        // snapshots that produce no events never touch the queue
        assert!(dispatcher.received(&snapshot(100, 100, true)).is_ok());
    }
}
