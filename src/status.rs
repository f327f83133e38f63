//! Device status snapshots

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, Milliseconds, TrackId};

/// One periodic status report from a single playback device.
///
/// Immutable once received; the status feed produces several of these a
/// second per device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Player number that sent the report
    pub device: DeviceId,

    /// Track currently loaded on the device
    pub track_id: TrackId,

    /// Monotonic timestamp of the report
    pub timestamp: Milliseconds,

    /// Pitch adjustment in percent (0.0 = normal speed, 8.0 = +8%)
    #[serde(default)]
    pub pitch: f64,

    /// Device reports playback (not paused, not cue-listening)
    pub playing: bool,

    /// Platter or jog wheel is actually moving forward (false while held for scratching)
    #[serde(default = "default_moving")]
    pub moving: bool,

    /// Playback reached the end of the track
    #[serde(default)]
    pub at_end: bool,

    /// A track is loaded on the device
    #[serde(default = "default_track_loaded")]
    pub track_loaded: bool,
}

const fn default_moving() -> bool {
    true
}

const fn default_track_loaded() -> bool {
    true
}

impl DeviceStatus {
    /// Device is in active, non-paused, non-scratch forward playback.
    #[must_use]
    pub const fn is_playing_forward(&self) -> bool {
        self.playing && self.moving
    }

    /// Playback speed multiplier derived from the pitch. Never negative.
    #[must_use]
    pub fn tempo_multiplier(&self) -> f64 {
        (1.0 + self.pitch / 100.0).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> DeviceStatus {
        DeviceStatus {
            device: DeviceId(1),
            track_id: TrackId(100),
            timestamp: Milliseconds(0),
            pitch: 0.0,
            playing: true,
            moving: true,
            at_end: false,
            track_loaded: true,
        }
    }

    #[test]
    fn test_playing_forward_requires_motion() {
        let mut s = status();
        assert!(s.is_playing_forward());

        s.moving = false;
        assert!(!s.is_playing_forward());

        s.moving = true;
        s.playing = false;
        assert!(!s.is_playing_forward());
    }

    #[test]
    fn test_tempo_multiplier() {
        let mut s = status();
        assert!((s.tempo_multiplier() - 1.0).abs() < f64::EPSILON);

        s.pitch = 8.0;
        assert!((s.tempo_multiplier() - 1.08).abs() < 1e-9);

        s.pitch = -50.0;
        assert!((s.tempo_multiplier() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_multiplier_floors_at_zero() {
        let mut s = status();
        s.pitch = -150.0;
        assert!(s.tempo_multiplier().abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"device":2,"track_id":7,"timestamp":1500,"playing":true}"#;
        let s: DeviceStatus = serde_json::from_str(json).unwrap();
        assert_eq!(s.device, DeviceId(2));
        assert_eq!(s.track_id, TrackId(7));
        assert_eq!(s.timestamp, Milliseconds(1500));
        assert!(s.moving);
        assert!(s.track_loaded);
        assert!(!s.at_end);
        assert!(s.pitch.abs() < f64::EPSILON);
    }
}
