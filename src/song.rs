//! Track metadata and scrobble points

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TrackId;

/// Shortest scrobble point, for very short tracks.
const MIN_SCROBBLE_POINT_SECS: u32 = 15;

/// Longest scrobble point; tracks longer than 8 minutes scrobble after 4.
const MAX_SCROBBLE_POINT_SECS: u32 = 240;

/// Metadata returned by a metadata resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub id: TrackId,
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub album: String,
    /// Duration in seconds
    pub duration: u32,
}

/// Resolved details of a track, plus the point after which it counts as a
/// completed listen.
///
/// The scrobble point follows the Last.fm rules
/// (<https://www.last.fm/api/scrobbling>): half the track, but never less
/// than 15 seconds or more than 4 minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDetails {
    artist: String,
    title: String,
    album: String,
    duration: u32,
    scrobble_point: u32,
}

impl SongDetails {
    #[must_use]
    pub fn new(metadata: TrackMetadata) -> Self {
        Self {
            scrobble_point: scrobble_point(metadata.duration),
            artist: metadata.artist,
            title: metadata.title,
            album: metadata.album,
            duration: metadata.duration,
        }
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn album(&self) -> &str {
        &self.album
    }

    /// Track duration in seconds
    #[must_use]
    pub const fn duration(&self) -> u32 {
        self.duration
    }

    /// Seconds of play after which the track may be scrobbled
    #[must_use]
    pub const fn scrobble_point(&self) -> u32 {
        self.scrobble_point
    }
}

impl From<TrackMetadata> for SongDetails {
    fn from(metadata: TrackMetadata) -> Self {
        Self::new(metadata)
    }
}

impl fmt::Display for SongDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} – {}", self.artist, self.title)
    }
}

/// Scrobble point in seconds for a track of `duration` seconds.
#[must_use]
pub const fn scrobble_point(duration: u32) -> u32 {
    if duration < 30 {
        MIN_SCROBBLE_POINT_SECS
    } else if duration > 480 {
        MAX_SCROBBLE_POINT_SECS
    } else {
        duration / 2
    }
}

#[cfg(test)]
pub(crate) fn test_metadata(id: u32, artist: &str, album: &str, duration: u32) -> TrackMetadata {
    TrackMetadata {
        id: TrackId(id),
        artist: artist.to_string(),
        title: format!("Track {id}"),
        album: album.to_string(),
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(duration: u32) -> SongDetails {
        SongDetails::new(test_metadata(1, "Artist", "Album", duration))
    }

    #[test]
    fn test_scrobble_point_too_short_track() {
        let s = details(10);
        assert_eq!(s.duration(), 10);
        assert_eq!(s.scrobble_point(), 15);
    }

    #[test]
    fn test_scrobble_point_shortest_track() {
        let s = details(30);
        assert_eq!(s.duration(), 30);
        assert_eq!(s.scrobble_point(), 15);
    }

    #[test]
    fn test_scrobble_point_normal_track() {
        let s = details(100);
        assert_eq!(s.duration(), 100);
        assert_eq!(s.scrobble_point(), 50);
    }

    #[test]
    fn test_scrobble_point_longest_track() {
        let s = details(480);
        assert_eq!(s.duration(), 480);
        assert_eq!(s.scrobble_point(), 240);
    }

    #[test]
    fn test_scrobble_point_too_long_track() {
        let s = details(4800);
        assert_eq!(s.duration(), 4800);
        assert_eq!(s.scrobble_point(), 240);
    }

    #[test]
    fn test_scrobble_point_odd_duration_rounds_down() {
        assert_eq!(scrobble_point(101), 50);
    }

    #[test]
    fn test_display_artist_and_title() {
        let s = details(100);
        assert_eq!(s.to_string(), "Artist – Track 1");
    }
}
