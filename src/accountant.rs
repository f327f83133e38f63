//! Play-count compliance
//!
//! Broadcast licensing limits how often one artist or one album may be
//! played. The accountant keeps the history of everything that reached the
//! now-playing point, and when a new track is loaded it checks whether
//! playing it would go over a limit. Offending devices are flagged in the
//! [`WarnSet`] so the on-air signal can warn the DJ before the track is
//! really on air.

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::AccountantConfig;
use crate::error::Result;
use crate::event::TrackEvent;
use crate::listener::SongEventListener;
use crate::on_air::WarnSet;
use crate::song::SongDetails;

/// Play limits. A track is rejected once its artist or album already has
/// this many plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplianceRules {
    pub max_artist_plays: usize,
    pub max_album_plays: usize,
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self {
            max_artist_plays: 4,
            max_album_plays: 3,
        }
    }
}

impl From<&AccountantConfig> for ComplianceRules {
    fn from(config: &AccountantConfig) -> Self {
        Self {
            max_artist_plays: config.max_artist_plays,
            max_album_plays: config.max_album_plays,
        }
    }
}

/// Why a track may not be played
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Artist { artist: String, plays: usize },
    Album { album: String, plays: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artist { artist, plays } => {
                write!(f, "artist {artist} already played {plays} times")
            }
            Self::Album { album, plays } => write!(f, "album {album} already played {plays} times"),
        }
    }
}

/// Ordered record of songs that reached the now-playing point.
#[derive(Debug, Default)]
pub struct PlayHistory {
    played: Vec<SongDetails>,
}

impl PlayHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, song: SongDetails) {
        self.played.push(song);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.played.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.played.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongDetails> {
        self.played.iter()
    }

    /// Plays by an artist, ignoring case
    #[must_use]
    pub fn artist_plays(&self, artist: &str) -> usize {
        self.count_matching(artist, SongDetails::artist)
    }

    /// Plays from an album, ignoring case
    #[must_use]
    pub fn album_plays(&self, album: &str) -> usize {
        self.count_matching(album, SongDetails::album)
    }

    fn count_matching(&self, name: &str, field: fn(&SongDetails) -> &str) -> usize {
        let wanted = name.to_lowercase();
        self.played
            .iter()
            .filter(|song| field(song).to_lowercase() == wanted)
            .count()
    }

    /// First rule this song would break if played now.
    #[must_use]
    pub fn check(&self, song: &SongDetails, rules: ComplianceRules) -> Option<Violation> {
        let plays = self.artist_plays(song.artist());
        if plays >= rules.max_artist_plays {
            return Some(Violation::Artist {
                artist: song.artist().to_string(),
                plays,
            });
        }

        let plays = self.album_plays(song.album());
        if plays >= rules.max_album_plays {
            return Some(Violation::Album {
                album: song.album().to_string(),
                plays,
            });
        }

        None
    }
}

/// Listener that enforces [`ComplianceRules`].
///
/// Subscribe it to `TrackLoaded` (checks) and `NowPlaying` (records).
pub struct ComplianceAccountant {
    rules: ComplianceRules,
    history: Mutex<PlayHistory>,
    warnings: WarnSet,
}

impl ComplianceAccountant {
    #[must_use]
    pub fn new(rules: ComplianceRules, warnings: WarnSet) -> Self {
        Self {
            rules,
            history: Mutex::new(PlayHistory::new()),
            warnings,
        }
    }

    #[must_use]
    pub const fn rules(&self) -> ComplianceRules {
        self.rules
    }

    /// Would this song break a rule if played now? Unknown songs are
    /// always allowed.
    #[must_use]
    pub fn check(&self, song: Option<&SongDetails>) -> Option<Violation> {
        song.and_then(|song| self.history.lock().check(song, self.rules))
    }

    /// Number of plays recorded so far
    #[must_use]
    pub fn plays(&self) -> usize {
        self.history.lock().len()
    }

    #[must_use]
    pub const fn warnings(&self) -> &WarnSet {
        &self.warnings
    }
}

impl SongEventListener for ComplianceAccountant {
    fn name(&self) -> &str {
        "compliance"
    }

    fn on_track_loaded(&self, event: &TrackEvent) -> Result<()> {
        let device = event.device();
        match self.check(event.song()) {
            Some(violation) => {
                warn!("Device {} should not play track {}: {}", device, event.track.track_id(), violation);
                self.warnings.set_warn(device);
            }
            None => {
                if self.warnings.remove_warn(device) {
                    info!("Device {} warning cleared", device);
                }
            }
        }
        Ok(())
    }

    fn on_now_playing(&self, event: &TrackEvent) -> Result<()> {
        let Some(song) = event.song() else {
            warn!("Device {} playing unknown track {}, not counted", event.device(), event.track.track_id());
            return Ok(());
        };

        let mut history = self.history.lock();
        history.record(song.clone());
        debug!("Recorded play {}: {}", history.len(), song);
        Ok(())
    }
}
