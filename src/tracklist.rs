//! Tracklist CSV log
//!
//! Appends every scrobbled track to a CSV file with the same columns a
//! Serato history export has, so the file can be fed to podcast tooling
//! that expects one.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::error::Result;
use crate::event::TrackEvent;
use crate::listener::SongEventListener;

const HEADER: [&str; 3] = ["name", "artist", "start time"];

/// Scrobble listener writing `name,artist,start time` rows.
#[derive(Debug, Clone)]
pub struct TracklistLogger {
    path: PathBuf,
}

impl TracklistLogger {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file is empty.
    pub fn append(&self, name: &str, artist: &str, started_at: Option<DateTime<Local>>) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
        }
        let start = started_at.map(wall_clock).unwrap_or_default();
        writer.write_record([name, artist, start.as_str()])?;
        writer.flush()?;
        Ok(())
    }
}

impl SongEventListener for TracklistLogger {
    fn name(&self) -> &str {
        "tracklist"
    }

    fn on_scrobble(&self, event: &TrackEvent) -> Result<()> {
        let Some(song) = event.song() else {
            debug!("Device {} scrobble without song details, not logged", event.device());
            return Ok(());
        };

        self.append(song.title(), song.artist(), event.started_at)?;
        info!("Wrote {} to {:?}", song, self.path);
        Ok(())
    }
}

/// `HH:MM:SS` plus the local zone offset
fn wall_clock(time: DateTime<Local>) -> String {
    time.format("%H:%M:%S %:z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::tests::track_event;
    use crate::song::{test_metadata, SongDetails};
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 17, 21, 4, 9).unwrap()
    }

    #[test]
    fn test_fields_with_separators_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TracklistLogger::new(dir.path().join("tracklist.csv"));

        logger
            .append("12\" Mix", "Simon, Garfunkel", None)
            .unwrap();

        let contents = std::fs::read_to_string(logger.path()).unwrap();
        let row = contents.lines().nth(1).unwrap();
        assert_eq!(row, "\"12\"\" Mix\",\"Simon, Garfunkel\",");
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TracklistLogger::new(dir.path().join("tracklist.csv"));

        logger.append("Da Funk", "Daft Punk", Some(started())).unwrap();
        logger.append("Windowlicker", "Aphex Twin", None).unwrap();

        let contents = std::fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "name,artist,start time");
        assert!(lines[1].starts_with("Da Funk,Daft Punk,21:04:09 "));
        assert_eq!(lines[2], "Windowlicker,Aphex Twin,");
    }

    #[test]
    fn test_scrobble_without_song_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TracklistLogger::new(dir.path().join("tracklist.csv"));

        logger.on_scrobble(&track_event()).unwrap();
        assert!(!logger.path().exists());
    }

    #[test]
    fn test_scrobble_writes_title_and_artist() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TracklistLogger::new(dir.path().join("tracklist.csv"));

        let mut event = track_event();
        event
            .track
            .attach(SongDetails::new(test_metadata(100, "Artist", "Album", 200)));
        event.started_at = Some(started());
        logger.on_scrobble(&event).unwrap();

        let contents = std::fs::read_to_string(logger.path()).unwrap();
        assert!(contents.contains("Track 100,Artist,21:04:09"));
    }

    #[test]
    fn test_unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let logger = TracklistLogger::new(dir.path().join("missing").join("tracklist.csv"));
        assert!(logger.append("a", "b", None).is_err());
    }
}
