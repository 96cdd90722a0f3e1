use serde::Serialize;
use std::fmt;

/// Qualitative crowd level for a crowd index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum CrowdLevel {
    VeryLight,
    Light,
    Moderate,
    Busy,
    VeryBusy,
    Packed,
}

/// Inclusive upper bound of each level, ascending.
static THRESHOLDS: &[(u8, CrowdLevel)] = &[
    (15, CrowdLevel::VeryLight),
    (30, CrowdLevel::Light),
    (45, CrowdLevel::Moderate),
    (65, CrowdLevel::Busy),
    (85, CrowdLevel::VeryBusy),
    (100, CrowdLevel::Packed),
];

/// Converts a crowd index (0–100) into a [`CrowdLevel`].
///
/// | Range   | Level      |
/// |---------|------------|
/// | 0–15    | Very Light |
/// | 16–30   | Light      |
/// | 31–45   | Moderate   |
/// | 46–65   | Busy       |
/// | 66–85   | Very Busy  |
/// | 86–100  | Packed     |
///
/// Anything above 100 is reported as [`CrowdLevel::Packed`].
pub fn classify(score: u8) -> CrowdLevel {
    THRESHOLDS
        .iter()
        .find(|(upper, _)| score <= *upper)
        .map(|(_, level)| *level)
        .unwrap_or(CrowdLevel::Packed)
}

impl CrowdLevel {
    pub fn label(&self) -> &'static str {
        match self {
            CrowdLevel::VeryLight => "Very Light",
            CrowdLevel::Light => "Light",
            CrowdLevel::Moderate => "Moderate",
            CrowdLevel::Busy => "Busy",
            CrowdLevel::VeryBusy => "Very Busy",
            CrowdLevel::Packed => "Packed",
        }
    }

    /// Display color used by the dashboard cards.
    pub fn color(&self) -> &'static str {
        match self {
            CrowdLevel::VeryLight | CrowdLevel::Light => "green",
            CrowdLevel::Moderate => "goldenrod",
            CrowdLevel::Busy => "orange",
            CrowdLevel::VeryBusy | CrowdLevel::Packed => "red",
        }
    }
}

impl fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}
