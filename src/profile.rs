//! Static engine configuration: park profiles, temporal tables and tunables.
//!
//! [`EngineConfig`] is built once (defaults or a JSON file) and only ever
//! borrowed afterwards. The JSON layout mirrors the structs below; every
//! section is optional:
//!
//! ```json
//! {
//!   "parks": [
//!     { "name": "Epcot", "weight_factor": 1.0, "baseline_wait_minutes": 12,
//!       "peak_multiplier": 3.5, "capacity_factor": 1.2,
//!       "key_attractions": ["Test Track", "Soarin'"] }
//!   ],
//!   "temporal": { "hourly": { "12": 1.4 }, "daily": [1.2, 0.8, 0.7, 0.8, 1.0, 1.3, 1.2] },
//!   "params": { "window_minutes": 10 }
//! }
//! ```

use crate::sample::Attraction;
use chrono::Weekday;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-park tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParkProfile {
    pub name: String,
    pub weight_factor: f64,
    /// Name fragments identifying the park's headline attractions.
    #[serde(default)]
    pub key_attractions: Vec<String>,
    pub baseline_wait_minutes: f64,
    #[serde(default = "default_peak_multiplier")]
    pub peak_multiplier: f64,
    #[serde(default = "default_capacity_factor")]
    pub capacity_factor: f64,
}

fn default_peak_multiplier() -> f64 {
    4.0
}

fn default_capacity_factor() -> f64 {
    1.0
}

impl ParkProfile {
    fn new(
        name: &str,
        weight_factor: f64,
        key_attractions: &[&str],
        baseline_wait_minutes: f64,
        peak_multiplier: f64,
        capacity_factor: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            weight_factor,
            key_attractions: key_attractions.iter().map(|s| s.to_string()).collect(),
            baseline_wait_minutes,
            peak_multiplier,
            capacity_factor,
        }
    }
}

/// Ordered set of park profiles, looked up by exact park name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkProfiles(Vec<ParkProfile>);

impl ParkProfiles {
    pub fn new(profiles: Vec<ParkProfile>) -> Self {
        Self(profiles)
    }

    pub fn get(&self, park: &str) -> Option<&ParkProfile> {
        self.0.iter().find(|p| p.name == park)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|p| p.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParkProfile> {
        self.0.iter()
    }
}

impl Default for ParkProfiles {
    fn default() -> Self {
        Self(vec![
            ParkProfile::new(
                "Magic Kingdom",
                1.2,
                &[
                    "Space Mountain",
                    "Seven Dwarfs Mine Train",
                    "Splash Mountain",
                    "Big Thunder Mountain Railroad",
                    "Pirates of the Caribbean",
                    "Haunted Mansion",
                    "Peter Pan's Flight",
                    "Jungle Cruise",
                ],
                15.0,
                4.0,
                1.0,
            ),
            ParkProfile::new(
                "Epcot",
                1.0,
                &[
                    "Guardians of the Galaxy",
                    "Remy's Ratatouille Adventure",
                    "Test Track",
                    "Soarin'",
                    "Frozen Ever After",
                    "Spaceship Earth",
                ],
                12.0,
                3.5,
                1.2,
            ),
            ParkProfile::new(
                "Hollywood Studios",
                1.1,
                &[
                    "Rise of the Resistance",
                    "Millennium Falcon",
                    "Slinky Dog Dash",
                    "Tower of Terror",
                    "Rock 'n' Roller Coaster",
                    "Mickey & Minnie's Runaway Railway",
                ],
                18.0,
                5.0,
                0.8,
            ),
            ParkProfile::new(
                "Animal Kingdom",
                1.0,
                &[
                    "Avatar Flight of Passage",
                    "Na'vi River Journey",
                    "Expedition Everest",
                    "Kilimanjaro Safaris",
                    "Dinosaur",
                ],
                10.0,
                4.5,
                0.9,
            ),
        ])
    }
}

/// Hour-of-day (UTC) and day-of-week crowd multipliers. Weekdays are indexed Monday = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalAdjustments {
    hourly: [f64; 24],
    daily: [f64; 7],
}

static DEFAULT_HOURLY: &[(u32, f64)] = &[
    (8, 0.7),
    (9, 0.8),
    (10, 1.0),
    (11, 1.2),
    (12, 1.4),
    (13, 1.3),
    (14, 1.2),
    (15, 1.1),
    (16, 1.0),
    (17, 0.9),
    (18, 0.8),
    (19, 0.7),
    (20, 0.6),
    (21, 0.5),
];

static DEFAULT_DAILY: [f64; 7] = [1.2, 0.8, 0.7, 0.8, 1.0, 1.3, 1.2];

impl TemporalAdjustments {
    /// Builds the tables from sparse hour overrides; unlisted hours stay at 1.0.
    pub fn new(hourly: &[(u32, f64)], daily: [f64; 7]) -> Self {
        let mut table = [1.0; 24];
        for &(hour, factor) in hourly {
            if let Some(slot) = table.get_mut(hour as usize) {
                *slot = factor;
            }
        }
        Self {
            hourly: table,
            daily,
        }
    }

    /// All factors 1.0.
    pub fn neutral() -> Self {
        Self::new(&[], [1.0; 7])
    }

    pub fn hour_factor(&self, hour: u32) -> f64 {
        self.hourly.get(hour as usize).copied().unwrap_or(1.0)
    }

    pub fn day_factor(&self, weekday: Weekday) -> f64 {
        self.daily[weekday.num_days_from_monday() as usize]
    }

    pub fn factor(&self, hour: u32, weekday: Weekday) -> f64 {
        self.hour_factor(hour) * self.day_factor(weekday)
    }

    fn all_positive(&self) -> bool {
        self.hourly.iter().chain(self.daily.iter()).all(|f| *f > 0.0)
    }
}

impl Default for TemporalAdjustments {
    fn default() -> Self {
        Self::new(DEFAULT_HOURLY, DEFAULT_DAILY)
    }
}

/// Numeric knobs of the estimator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Half-width of the evaluation window.
    pub window_minutes: i64,
    pub max_valid_wait_minutes: i64,
    pub key_attraction_multiplier: f64,
    pub popularity_cap: f64,
    /// Average wait that earns a key attraction weight 1.0.
    pub popularity_reference_wait: f64,
    pub min_popularity_samples: u32,
    pub popularity_lookback_days: i64,
    pub baseline_lookback_days: i64,
    pub baseline_exclusion_days: i64,
    pub min_baseline_wait: f64,
    pub expected_operating_fraction: f64,
    pub operating_floor_weight: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            window_minutes: 10,
            max_valid_wait_minutes: 300,
            key_attraction_multiplier: 2.0,
            popularity_cap: 3.0,
            popularity_reference_wait: 30.0,
            min_popularity_samples: 5,
            popularity_lookback_days: 7,
            baseline_lookback_days: 28,
            baseline_exclusion_days: 1,
            min_baseline_wait: 5.0,
            expected_operating_fraction: 0.6,
            operating_floor_weight: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub parks: ParkProfiles,
    pub temporal: TemporalAdjustments,
    pub params: EngineParams,
}

#[derive(Deserialize)]
struct RawTemporal {
    #[serde(default)]
    hourly: HashMap<u32, f64>,
    daily: Option<[f64; 7]>,
}

#[derive(Deserialize)]
struct RawConfig {
    parks: Option<Vec<ParkProfile>>,
    temporal: Option<RawTemporal>,
    #[serde(default)]
    params: EngineParams,
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`, filling missing sections with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;

        let parks = raw.parks.map(ParkProfiles::new).unwrap_or_default();
        let temporal = match raw.temporal {
            Some(t) => {
                let hourly: Vec<(u32, f64)> = t.hourly.into_iter().collect();
                if let Some((hour, _)) = hourly.iter().find(|(h, _)| *h > 23) {
                    return Err(ConfigError::Invalid(format!("hour {hour} out of range")));
                }
                TemporalAdjustments::new(&hourly, t.daily.unwrap_or(DEFAULT_DAILY))
            }
            None => TemporalAdjustments::default(),
        };

        let config = Self {
            parks,
            temporal,
            params: raw.params,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would divide by zero, invert the score, or push
    /// query windows past the supported date range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for park in self.parks.iter() {
            if !(park.baseline_wait_minutes > 0.0 && park.capacity_factor > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "park '{}' needs positive baseline_wait_minutes and capacity_factor",
                    park.name
                )));
            }
            if park.weight_factor < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "park '{}' has a negative weight_factor",
                    park.name
                )));
            }
            // An empty fragment is a substring of every attraction name.
            if park.key_attractions.iter().any(|key| key.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "park '{}' has an empty key_attractions entry",
                    park.name
                )));
            }
        }
        if !self.temporal.all_positive() {
            return Err(ConfigError::Invalid(
                "temporal adjustment factors must be positive".to_string(),
            ));
        }
        self.params.validate()
    }
}

/// Longest evaluation half-window accepted, one day.
pub const MAX_WINDOW_MINUTES: i64 = 24 * 60;
/// Longest history lookback accepted, about ten years.
pub const MAX_LOOKBACK_DAYS: i64 = 3660;

impl EngineParams {
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(1..=MAX_WINDOW_MINUTES).contains(&self.window_minutes) {
            return invalid("window_minutes must be between 1 and 1440");
        }
        if self.max_valid_wait_minutes < 0 {
            return invalid("max_valid_wait_minutes must not be negative");
        }
        for (name, days) in [
            ("popularity_lookback_days", self.popularity_lookback_days),
            ("baseline_lookback_days", self.baseline_lookback_days),
        ] {
            if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 1 and {MAX_LOOKBACK_DAYS}"
                )));
            }
        }
        if !(0..self.baseline_lookback_days).contains(&self.baseline_exclusion_days) {
            return invalid("baseline_exclusion_days must be at least 0 and below baseline_lookback_days");
        }
        for (name, value) in [
            ("key_attraction_multiplier", self.key_attraction_multiplier),
            ("popularity_cap", self.popularity_cap),
            ("popularity_reference_wait", self.popularity_reference_wait),
            ("min_baseline_wait", self.min_baseline_wait),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        for (name, value) in [
            ("expected_operating_fraction", self.expected_operating_fraction),
            ("operating_floor_weight", self.operating_floor_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within 0 and 1")));
            }
        }
        Ok(())
    }
}

/// How much an attraction counts towards its park's aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttractionTier {
    Ordinary,
    /// Headline attraction; `patterns` are the configured names it matched.
    Key { patterns: Vec<String> },
}

static ORDINARY: AttractionTier = AttractionTier::Ordinary;

/// Attraction id → tier, resolved once against the store's catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyAttractionIndex {
    tiers: HashMap<String, AttractionTier>,
}

impl KeyAttractionIndex {
    /// Matches every configured key-attraction name against the catalog
    /// (case-sensitive substring). Attractions of other parks are ignored.
    pub fn resolve(profile: &ParkProfile, catalog: &[Attraction]) -> Self {
        let mut index = Self::default();
        index.extend(profile, catalog);
        index
    }

    pub fn extend(&mut self, profile: &ParkProfile, catalog: &[Attraction]) {
        for attraction in catalog.iter().filter(|a| a.park == profile.name) {
            let patterns: Vec<String> = profile
                .key_attractions
                .iter()
                .filter(|key| !key.is_empty() && attraction.name.contains(key.as_str()))
                .cloned()
                .collect();
            if !patterns.is_empty() {
                self.tiers
                    .insert(attraction.id.clone(), AttractionTier::Key { patterns });
            }
        }
    }

    pub fn tier(&self, attraction_id: &str) -> &AttractionTier {
        self.tiers.get(attraction_id).unwrap_or(&ORDINARY)
    }

    pub fn key_count(&self) -> usize {
        self.tiers.len()
    }
}
