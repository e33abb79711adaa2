use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::groups::DEFAULT_BPM_BAND;
use crate::scoring::{ParamsError, ScoringParams, Strictness};
use crate::session::DEFAULT_MATCHES_LIMIT;

/// Application configuration loaded from TOML config file.
/// All fields have defaults, so the config file is optional.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Library export to load when `--library` is not given.
    pub library: Option<PathBuf>,
    /// Scoring defaults. Command-line flags override individual fields.
    pub scoring: ScoringParams,
    /// Matches listed per track by `matches`.
    pub matches_limit: usize,
    /// Tempo band width for mixable groups, in BPM.
    pub group_bpm_band: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: None,
            scoring: ScoringParams::default(),
            matches_limit: DEFAULT_MATCHES_LIMIT,
            group_bpm_band: DEFAULT_BPM_BAND,
        }
    }
}

/// Scoring values given on the command line. `None` keeps the config value.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScoringOverrides {
    pub key_weight: Option<f64>,
    pub bpm_tolerance: Option<f64>,
    pub no_half_double: bool,
    pub strictness: Option<Strictness>,
}

impl AppConfig {
    /// Load config from `~/.config/setmix/config.toml`.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::debug!("No config directory, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    /// Logs a warning if the file exists but can't be read or parsed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve scoring params: CLI > config > built-in default.
    pub fn resolve_params(&self, cli: &ScoringOverrides) -> Result<ScoringParams, ParamsError> {
        let params = ScoringParams {
            key_weight: cli.key_weight.unwrap_or(self.scoring.key_weight),
            bpm_tolerance: cli.bpm_tolerance.unwrap_or(self.scoring.bpm_tolerance),
            half_double: self.scoring.half_double && !cli.no_half_double,
            strictness: cli.strictness.unwrap_or(self.scoring.strictness),
        };
        params.validate()?;
        Ok(params)
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
