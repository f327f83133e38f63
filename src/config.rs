//! Configuration management for cdj-scrobbler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::Milliseconds;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Playback tracking settings
    pub tracking: TrackingConfig,

    /// Play-count compliance rules
    pub accountant: AccountantConfig,

    /// On-air warning signal
    pub on_air: OnAirConfig,

    /// Tracklist CSV log
    pub tracklist: TracklistConfig,

    /// Metadata catalog
    pub catalog: CatalogConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Playback tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Forward play (ms) before a track counts as now playing. Stops or
    /// scratches before this point restart the count.
    pub now_playing_point_ms: u64,
}

/// Play-count compliance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountantConfig {
    pub enabled: bool,

    /// Plays of one artist after which further tracks are flagged
    pub max_artist_plays: usize,

    /// Plays from one album after which further tracks are flagged
    pub max_album_plays: usize,
}

/// On-air warning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnAirConfig {
    pub enabled: bool,

    /// Time between on and off commands while blinking
    pub blink_interval_ms: u64,
}

/// Tracklist CSV settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracklistConfig {
    pub enabled: bool,
    pub path: PathBuf,
}

/// Metadata catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// TOML catalog file (no catalog = every track unknown)
    pub path: Option<PathBuf>,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            now_playing_point_ms: 10_000,
        }
    }
}

impl Default for AccountantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_artist_plays: 4,
            max_album_plays: 3,
        }
    }
}

impl Default for OnAirConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blink_interval_ms: 250,
        }
    }
}

impl Default for TracklistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("tracklist.csv"),
        }
    }
}

impl TrackingConfig {
    #[must_use]
    pub fn now_playing_point(&self) -> Milliseconds {
        Milliseconds::new(i64::try_from(self.now_playing_point_ms).unwrap_or(i64::MAX))
    }
}

impl OnAirConfig {
    #[must_use]
    pub const fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::config("Could not determine config directory"))?;
        Ok(config_dir.join("cdj-scrobbler").join("config.toml"))
    }

    /// Validate configuration values.
    ///
    /// Call this after loading to ensure all values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        // Validate log_level is a known level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "log_level must be one of {:?}, got '{}'",
                valid_levels, self.general.log_level
            )));
        }

        if self.tracking.now_playing_point_ms > 600_000 {
            return Err(Error::config(format!(
                "now_playing_point_ms should not exceed 600000 (10 minutes), got {}",
                self.tracking.now_playing_point_ms
            )));
        }

        if !(10..=5000).contains(&self.on_air.blink_interval_ms) {
            return Err(Error::config(format!(
                "blink_interval_ms must be between 10 and 5000, got {}",
                self.on_air.blink_interval_ms
            )));
        }

        if self.accountant.max_artist_plays == 0 || self.accountant.max_album_plays == 0 {
            return Err(Error::config(
                "max_artist_plays and max_album_plays must be at least 1",
            ));
        }

        Ok(())
    }
}
