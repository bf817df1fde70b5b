use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::FitError;

/// Body zone a crop or mask pertains to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionTarget {
    /// Whole person.
    #[default]
    Full,

    /// Upper garment: shoulders down to the hip line.
    Upper,

    /// Lower garment: hip line down.
    Lower,
}

impl RegionTarget {
    pub const ALL: [RegionTarget; 3] = [RegionTarget::Full, RegionTarget::Upper, RegionTarget::Lower];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionTarget::Full => "full",
            RegionTarget::Upper => "upper",
            RegionTarget::Lower => "lower",
        }
    }
}

impl fmt::Display for RegionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionTarget {
    type Err = FitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(RegionTarget::Full),
            "upper" => Ok(RegionTarget::Upper),
            "lower" => Ok(RegionTarget::Lower),
            _ => Err(FitError::UnknownTarget(s.to_string())),
        }
    }
}
