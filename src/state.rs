//! Playback state machine
//!
//! States and the transition function applied to a [`PlaybackModel`] for
//! each snapshot. Most transitions emit an event that is handled later on
//! the processing thread. The interesting ones are `NowPlaying` (`CUEING`
//! to `PLAYING`) and `Scrobble` (`SCROBBLING` or `SCROBBLINGPAUSED` to
//! `STOPPED`); `Reset` ends a track that never reached its scrobble point.

use std::fmt;

use crate::event::SongEvent;
use crate::model::PlaybackModel;
use crate::status::DeviceStatus;

/// State of the song on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SongState {
    /// A track has recently been loaded but is not playing yet
    Started,
    /// Playing, but for less than the now-playing point
    Cueing,
    /// Paused before the now-playing point
    CueingPaused,
    /// Played long enough that it is really playing
    Playing,
    /// Paused before the scrobble point
    PlayingPaused,
    /// Played long enough to scrobble, and still playing
    Scrobbling,
    /// Paused after the scrobble point
    ScrobblingPaused,
    /// The track ended, was ejected or replaced
    Stopped,
}

impl SongState {
    /// Does the state represent playback? Paused and stopped states don't.
    #[must_use]
    pub const fn is_moving(self) -> bool {
        matches!(self, Self::Cueing | Self::Playing | Self::Scrobbling)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Cueing => "CUEING",
            Self::CueingPaused => "CUEINGPAUSED",
            Self::Playing => "PLAYING",
            Self::PlayingPaused => "PLAYINGPAUSED",
            Self::Scrobbling => "SCROBBLING",
            Self::ScrobblingPaused => "SCROBBLINGPAUSED",
            Self::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for SongState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The track has ended, been ejected, or been replaced by another one.
#[must_use]
pub fn is_stopping(model: &PlaybackModel, status: &DeviceStatus) -> bool {
    status.at_end || !status.track_loaded || status.track_id != model.track_id()
}

/// Run one transition of the state machine. May return an event.
pub fn apply(model: &mut PlaybackModel, status: &DeviceStatus) -> Option<SongEvent> {
    let forward = status.is_playing_forward();

    match model.state {
        SongState::Started => {
            if !forward {
                return None;
            }
            model.adopt_track(status);
            model.mark_started();
            model.state = SongState::Cueing;
            model.track_event(status).map(SongEvent::TrackLoaded)
        }

        SongState::Cueing => {
            model.add_playtime_from(status);
            if forward {
                // metadata is not needed before the now-playing point, so
                // whatever is loaded now is the track we follow
                model.adopt_track(status);
                if model.is_past_now_playing() {
                    model.state = SongState::Playing;
                    return model.track_event(status).map(SongEvent::NowPlaying);
                }
            } else {
                // any stop while cueing (pause, search, scratch) is a false start
                model.reset_play();
                model.state = SongState::CueingPaused;
            }
            None
        }

        SongState::CueingPaused => {
            if is_stopping(model, status) {
                model.state = SongState::Stopped;
                Some(SongEvent::Reset(status.clone()))
            } else {
                if forward {
                    model.mark_started();
                    model.state = SongState::Cueing;
                }
                None
            }
        }

        SongState::Playing => {
            model.add_playtime_from(status);
            if is_stopping(model, status) {
                model.state = SongState::Stopped;
                Some(SongEvent::Reset(status.clone()))
            } else if forward {
                if model.is_past_scrobble_point() {
                    transition(model, SongState::Scrobbling)
                } else {
                    None
                }
            } else {
                transition(model, SongState::PlayingPaused)
            }
        }

        SongState::PlayingPaused => {
            if is_stopping(model, status) {
                model.state = SongState::Stopped;
                Some(SongEvent::Reset(status.clone()))
            } else if forward {
                transition(model, SongState::Playing)
            } else {
                None
            }
        }

        SongState::Scrobbling => {
            model.add_playtime_from(status);
            if is_stopping(model, status) {
                scrobble(model, status)
            } else if forward {
                None
            } else {
                transition(model, SongState::ScrobblingPaused)
            }
        }

        SongState::ScrobblingPaused => {
            if is_stopping(model, status) {
                scrobble(model, status)
            } else if forward {
                transition(model, SongState::Scrobbling)
            } else {
                None
            }
        }

        SongState::Stopped => None,
    }
}

fn transition(model: &mut PlaybackModel, to: SongState) -> Option<SongEvent> {
    let from = model.state;
    model.state = to;
    Some(SongEvent::Transition {
        device: model.device,
        from,
        to,
    })
}

fn scrobble(model: &mut PlaybackModel, status: &DeviceStatus) -> Option<SongEvent> {
    model.state = SongState::Stopped;
    // SCROBBLING is only reachable with a track; fall back to a reset otherwise
    Some(
        model
            .track_event(status)
            .map_or_else(|| SongEvent::Reset(status.clone()), SongEvent::Scrobble),
    )
}
