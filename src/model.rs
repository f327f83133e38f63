//! Per-device playback model
//!
//! One [`PlaybackModel`] exists per device and follows the song currently
//! playing on it. Each status snapshot is applied to the model, which works
//! out how long the track has actually been listened to (adjusted for pitch,
//! ignoring paused and scratch-held time) and emits events as the track
//! crosses the now-playing and scrobble points.
//!
//! The first stretch of playback (10 seconds by default) is cueing time:
//! any stop or scratch during it resets the accumulated play time. After
//! that, play time accumulates until the track ends.

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::event::{SongEvent, TrackEvent};
use crate::song::SongDetails;
use crate::state::{self, SongState};
use crate::status::DeviceStatus;
use crate::types::{DeviceId, Milliseconds, TrackId};

/// Default now-playing point in milliseconds of forward play.
pub const DEFAULT_NOW_PLAYING_POINT: Milliseconds = Milliseconds(10_000);

/// The track instance a model is following.
///
/// Shared between the model (on the ingestion thread) and the events it
/// emits (on the processing thread). Song details are written once, by the
/// processor, when the metadata lookup succeeds.
#[derive(Debug)]
pub struct TrackHandle {
    device: DeviceId,
    track_id: TrackId,
    song: OnceLock<SongDetails>,
}

impl TrackHandle {
    #[must_use]
    pub const fn new(device: DeviceId, track_id: TrackId) -> Self {
        Self {
            device,
            track_id,
            song: OnceLock::new(),
        }
    }

    #[must_use]
    pub const fn device(&self) -> DeviceId {
        self.device
    }

    #[must_use]
    pub const fn track_id(&self) -> TrackId {
        self.track_id
    }

    #[must_use]
    pub fn song(&self) -> Option<&SongDetails> {
        self.song.get()
    }

    /// Attach resolved details. Returns false if details were already attached.
    pub fn attach(&self, song: SongDetails) -> bool {
        self.song.set(song).is_ok()
    }
}

/// State machine of the song playing on one device.
#[derive(Debug)]
pub struct PlaybackModel {
    pub(crate) device: DeviceId,
    pub(crate) state: SongState,
    pub(crate) total_play_time: Milliseconds,
    pub(crate) last_update: Option<Milliseconds>,
    pub(crate) track: Option<Arc<TrackHandle>>,
    pub(crate) started_at: Option<DateTime<Local>>,
    now_playing_point: Milliseconds,
}

impl PlaybackModel {
    /// Create a fresh model in the `STARTED` state.
    #[must_use]
    pub const fn new(device: DeviceId, now_playing_point: Milliseconds) -> Self {
        Self {
            device,
            state: SongState::Started,
            total_play_time: Milliseconds(0),
            last_update: None,
            track: None,
            started_at: None,
            now_playing_point,
        }
    }

    /// Apply a snapshot, running the state machine until it yields no more
    /// events.
    ///
    /// A single snapshot can move the model through more than one state, e.g.
    /// `PLAYINGPAUSED -> PLAYING -> SCROBBLING` after a large timestamp jump.
    pub fn update(&mut self, status: &DeviceStatus) -> Vec<SongEvent> {
        let mut events = Vec::new();

        loop {
            let prev = self.state;
            let event = state::apply(self, status);

            if prev != self.state {
                info!("Device {} track {} {} -> {}", self.device, self.track_id(), prev, self);
            } else if self.state.is_moving() {
                debug!("Device {} track {} {}", self.device, self.track_id(), self);
            }

            self.last_update = Some(status.timestamp);

            match event {
                Some(event) => {
                    debug!("yielded {}", event.name());
                    events.push(event);
                }
                None => return events,
            }
        }
    }

    /// Forget accumulated play time after a false start during cueing.
    /// The state is preserved.
    pub fn reset_play(&mut self) {
        self.total_play_time = Milliseconds(0);
        self.started_at = None;
    }

    /// Add the time since the last snapshot, scaled by the pitch.
    ///
    /// Nothing is added for the first snapshot, when not playing forward, or
    /// when the timestamp went backwards.
    pub fn add_playtime_from(&mut self, status: &DeviceStatus) {
        let Some(last) = self.last_update else {
            return;
        };
        if !status.is_playing_forward() {
            return;
        }

        let elapsed = status.timestamp - last;
        if elapsed.get() <= 0 {
            return;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let scaled = (elapsed.get() as f64 * status.tempo_multiplier()) as i64;
        self.total_play_time += Milliseconds(scaled);
    }

    #[must_use]
    pub fn is_past_now_playing(&self) -> bool {
        self.total_play_time >= self.now_playing_point
    }

    /// Past the scrobble point of the resolved song. Never true for a track
    /// whose details are unknown.
    #[must_use]
    pub fn is_past_scrobble_point(&self) -> bool {
        self.song().is_some_and(|song| {
            self.total_play_time.whole_secs() > i64::from(song.scrobble_point())
        })
    }

    #[must_use]
    pub const fn device(&self) -> DeviceId {
        self.device
    }

    #[must_use]
    pub const fn state(&self) -> SongState {
        self.state
    }

    #[must_use]
    pub const fn total_play_time(&self) -> Milliseconds {
        self.total_play_time
    }

    #[must_use]
    pub const fn last_update(&self) -> Option<Milliseconds> {
        self.last_update
    }

    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Id of the tracked track, or the unset id before a track is loaded.
    #[must_use]
    pub fn track_id(&self) -> TrackId {
        self.track
            .as_ref()
            .map_or_else(TrackId::default, |track| track.track_id())
    }

    #[must_use]
    pub const fn track(&self) -> Option<&Arc<TrackHandle>> {
        self.track.as_ref()
    }

    #[must_use]
    pub fn song(&self) -> Option<&SongDetails> {
        self.track.as_ref().and_then(|track| track.song())
    }

    /// Follow the track in the snapshot, starting a new track instance if
    /// the id differs from the one being followed.
    pub(crate) fn adopt_track(&mut self, status: &DeviceStatus) -> Arc<TrackHandle> {
        match &self.track {
            Some(track) if track.track_id() == status.track_id => Arc::clone(track),
            _ => {
                let track = Arc::new(TrackHandle::new(self.device, status.track_id));
                self.track = Some(Arc::clone(&track));
                track
            }
        }
    }

    pub(crate) fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Local::now());
        }
    }

    pub(crate) fn track_event(&self, status: &DeviceStatus) -> Option<TrackEvent> {
        self.track.as_ref().map(|track| TrackEvent {
            track: Arc::clone(track),
            status: status.clone(),
            started_at: self.started_at,
        })
    }
}

impl fmt::Display for PlaybackModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device {} {} song: ", self.device, self.state)?;
        match self.song() {
            Some(song) => write!(f, "{song}")?,
            None => f.write_str("<unknown>")?,
        }
        write!(f, " playtime: {}", self.total_play_time)
    }
}
