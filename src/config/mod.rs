//! Configuration for the game rules, the offline cache and on-disk paths.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Game rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of rounds in one game.
    pub rounds_total: u32,
    /// Lowest possible secret (inclusive).
    pub min_number: u32,
    /// Highest possible secret (inclusive).
    pub max_number: u32,
    /// How many decoy numbers a hint rules out.
    pub hint_exclusions: usize,
    /// A round scoring strictly more than this unlocks the hint.
    pub auto_unlock_threshold: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds_total: 5,
            min_number: 1,
            max_number: 100,
            hint_exclusions: 25,
            auto_unlock_threshold: 90,
        }
    }
}

impl GameConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of rounds per game.
    #[must_use]
    pub const fn with_rounds_total(mut self, rounds: u32) -> Self {
        self.rounds_total = rounds;
        self
    }

    /// Sets the inclusive range secrets are drawn from.
    #[must_use]
    pub const fn with_range(mut self, min: u32, max: u32) -> Self {
        self.min_number = min;
        self.max_number = max;
        self
    }

    /// Sets how many numbers a hint excludes.
    #[must_use]
    pub const fn with_hint_exclusions(mut self, count: usize) -> Self {
        self.hint_exclusions = count;
        self
    }

    /// Sets the per-round score above which the hint unlocks itself.
    #[must_use]
    pub const fn with_auto_unlock_threshold(mut self, threshold: u32) -> Self {
        self.auto_unlock_threshold = threshold;
        self
    }

    /// Number of distinct values a secret can take.
    #[must_use]
    pub const fn range_size(&self) -> usize {
        self.max_number.saturating_sub(self.min_number) as usize + 1
    }

    /// Checks that the rules describe a playable game.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the range is empty, there are no rounds,
    /// or a hint would have to exclude the secret itself.
    pub fn validate(&self) -> Result<()> {
        if self.min_number >= self.max_number {
            return Err(Error::Config(format!(
                "min_number ({}) must be below max_number ({})",
                self.min_number, self.max_number
            )));
        }
        if self.rounds_total == 0 {
            return Err(Error::Config("rounds_total must be at least 1".to_string()));
        }
        if self.hint_exclusions >= self.range_size() {
            return Err(Error::Config(format!(
                "hint_exclusions ({}) must leave at least the secret unexcluded (range has {} numbers)",
                self.hint_exclusions,
                self.range_size()
            )));
        }
        Ok(())
    }
}

/// Offline cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Version-tagged cache name; any other cache is stale.
    pub cache_name: String,
    /// Origin the game is served from. Relative manifest entries resolve against it.
    pub origin: String,
    /// Assets cached wholesale on install.
    pub manifest: Vec<String>,
    /// Page opened when a notification's play action is clicked.
    pub page: String,
    /// Icon and badge used by push notifications.
    pub icon: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_name: "guess-number-mobile-v1".to_string(),
            origin: "http://localhost:8080".to_string(),
            manifest: vec![
                "/mobile.html".to_string(),
                "/mobile-style.css".to_string(),
                "/mobile-script.js".to_string(),
                "/manifest.json".to_string(),
                "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap"
                    .to_string(),
            ],
            page: "/mobile.html".to_string(),
            icon: "/icon-192.png".to_string(),
        }
    }
}

impl CacheConfig {
    /// Sets the cache name.
    #[must_use]
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replaces the manifest.
    #[must_use]
    pub fn with_manifest<I, S>(mut self, manifest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = manifest.into_iter().map(Into::into).collect();
        self
    }
}

/// Path configuration for config, state and cache directories.
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Directory where configuration files are read from.
    pub config_dir: PathBuf,
    /// Directory where the best score is saved.
    pub state_dir: PathBuf,
    /// Directory holding the offline asset cache.
    pub cache_dir: PathBuf,
}

impl Default for PathConfig {
    /// Uses `STATE_DIRECTORY` (set by systemd when `StateDirectory=` is configured)
    /// for state, falling back to the platform data directory.
    fn default() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        let state_dir = std::env::var("STATE_DIRECTORY").map_or_else(
            |_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("numguess")
            },
            PathBuf::from,
        );
        let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir: config_dir.join("numguess"),
            state_dir,
            cache_dir: cache_dir.join("numguess"),
        }
    }
}

impl PathConfig {
    /// File holding persisted scores.
    #[must_use]
    pub fn scores_file(&self) -> PathBuf {
        self.state_dir.join("scores.toml")
    }
}

/// On-disk shape of the config file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileConfig {
    #[serde(default)]
    game: GameConfig,
    #[serde(default)]
    cache: CacheConfig,
}

/// Complete application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Game rules.
    pub game: GameConfig,
    /// Offline cache settings.
    pub cache: CacheConfig,
    /// Directories.
    pub paths: PathConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file.
    ///
    /// `NUMGUESS_CONFIG` overrides the platform config directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::var("NUMGUESS_CONFIG").map_or_else(
            |_| PathConfig::default().config_dir.join("config.toml"),
            PathBuf::from,
        )
    }

    /// Parses a config from TOML text. Missing sections fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML or the game
    /// rules do not validate.
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(text)?;
        file.game.validate()?;
        Ok(Self {
            game: file.game,
            cache: file.cache,
            paths: PathConfig::default(),
        })
    }

    /// Serializes the game and cache sections to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        let file = FileConfig {
            game: self.game.clone(),
            cache: self.cache.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    /// Loads the config at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Loads the config at `path`, writing a default file first if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or created.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        log::info!("Wrote default config to {}", path.display());
        Ok(config)
    }

    /// Writes the game and cache sections to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
