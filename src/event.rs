//! Song lifecycle events and the queue that carries them between threads

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use crate::model::TrackHandle;
use crate::song::SongDetails;
use crate::state::SongState;
use crate::status::DeviceStatus;
use crate::types::DeviceId;

/// Producer side of the shared event queue
pub type EventSender = mpsc::UnboundedSender<SongEvent>;

/// Consumer side of the shared event queue
pub type EventReceiver = mpsc::UnboundedReceiver<SongEvent>;

/// Create the FIFO queue between the status-ingestion thread and the
/// event-processing thread.
#[must_use]
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Event emitted by a playback model transition.
#[derive(Debug, Clone)]
pub enum SongEvent {
    /// A track started playing forward on a device for the first time
    TrackLoaded(TrackEvent),
    /// The track passed the now-playing point
    NowPlaying(TrackEvent),
    /// The track ended after passing its scrobble point
    Scrobble(TrackEvent),
    /// The track ended before its scrobble point
    Reset(DeviceStatus),
    /// Any other state change worth recording
    Transition {
        device: DeviceId,
        from: SongState,
        to: SongState,
    },
}

/// Payload of the events that concern a specific track instance.
#[derive(Debug, Clone)]
pub struct TrackEvent {
    /// Shared handle to the track the model is tracking
    pub track: Arc<TrackHandle>,
    /// Snapshot that triggered the event
    pub status: DeviceStatus,
    /// Wall clock time the track was judged started
    pub started_at: Option<DateTime<Local>>,
}

impl TrackEvent {
    /// Resolved song details, if the metadata lookup has succeeded
    #[must_use]
    pub fn song(&self) -> Option<&SongDetails> {
        self.track.song()
    }

    #[must_use]
    pub const fn device(&self) -> DeviceId {
        self.status.device
    }
}

/// Event kinds that listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrackLoaded,
    NowPlaying,
    Scrobble,
}

impl SongEvent {
    /// Listener kind for this event, if listeners receive it at all.
    #[must_use]
    pub const fn kind(&self) -> Option<EventKind> {
        match self {
            Self::TrackLoaded(_) => Some(EventKind::TrackLoaded),
            Self::NowPlaying(_) => Some(EventKind::NowPlaying),
            Self::Scrobble(_) => Some(EventKind::Scrobble),
            Self::Reset(_) | Self::Transition { .. } => None,
        }
    }

    /// Device the event came from
    #[must_use]
    pub const fn device(&self) -> DeviceId {
        match self {
            Self::TrackLoaded(e) | Self::NowPlaying(e) | Self::Scrobble(e) => e.status.device,
            Self::Reset(status) => status.device,
            Self::Transition { device, .. } => *device,
        }
    }

    /// Whether this event ends the track lifecycle on its device.
    #[must_use]
    pub const fn ends_track(&self) -> bool {
        matches!(self, Self::Reset(_) | Self::Scrobble(_))
    }

    /// Track payload, for the kinds that carry one
    #[must_use]
    pub const fn track_event(&self) -> Option<&TrackEvent> {
        match self {
            Self::TrackLoaded(e) | Self::NowPlaying(e) | Self::Scrobble(e) => Some(e),
            Self::Reset(_) | Self::Transition { .. } => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TrackLoaded(_) => "TrackLoaded",
            Self::NowPlaying(_) => "NowPlaying",
            Self::Scrobble(_) => "Scrobble",
            Self::Reset(_) => "Reset",
            Self::Transition { .. } => "Transition",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TrackLoaded => "TrackLoaded",
            Self::NowPlaying => "NowPlaying",
            Self::Scrobble => "Scrobble",
        };
        f.write_str(name)
    }
}

impl fmt::Display for SongEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrackLoaded(e) => write!(f, "** TRACK LOADED ** track {}", e.track.track_id()),
            Self::NowPlaying(_) => f.write_str("** NOW PLAYING **"),
            Self::Scrobble(_) => f.write_str("** SCROBBLING **"),
            Self::Reset(_) => f.write_str("** RESET **"),
            Self::Transition { from, to, .. } => write!(f, "transition {from} -> {to}"),
        }
    }
}
