use std::fmt;
use std::str::FromStr;

use crate::engine::errors::ReduceError;

/// Unit of a down-sampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl FrequencyUnit {
    pub fn millis(&self) -> i64 {
        match self {
            FrequencyUnit::Second => 1_000,
            FrequencyUnit::Minute => 60_000,
            FrequencyUnit::Hour => 3_600_000,
            FrequencyUnit::Day => 86_400_000,
        }
    }

    fn parse(unit: &str) -> Option<Self> {
        match unit {
            "s" | "S" | "sec" | "secs" | "second" | "seconds" => Some(FrequencyUnit::Second),
            "T" | "m" | "min" | "mins" | "minute" | "minutes" => Some(FrequencyUnit::Minute),
            "h" | "H" | "hr" | "hour" | "hours" => Some(FrequencyUnit::Hour),
            "d" | "D" | "day" | "days" => Some(FrequencyUnit::Day),
            _ => None,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            FrequencyUnit::Second => "s",
            FrequencyUnit::Minute => "min",
            FrequencyUnit::Hour => "h",
            FrequencyUnit::Day => "d",
        }
    }
}

/// Fixed-width bucket size: `magnitude` units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    pub magnitude: u32,
    pub unit: FrequencyUnit,
}

impl Frequency {
    pub fn new(magnitude: u32, unit: FrequencyUnit) -> Self {
        Self { magnitude, unit }
    }

    /// Parse `<integer><unit>`, e.g. `1T`, `15min`, `2 hours`.
    /// The magnitude may be omitted and then defaults to 1.
    pub fn parse(spec: &str) -> Result<Self, ReduceError> {
        let s = spec.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);

        let magnitude = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| ReduceError::InvalidFrequency(spec.to_string()))?
        };
        if magnitude == 0 {
            return Err(ReduceError::InvalidFrequency(spec.to_string()));
        }

        let unit = FrequencyUnit::parse(unit.trim())
            .ok_or_else(|| ReduceError::InvalidFrequency(spec.to_string()))?;

        Ok(Self { magnitude, unit })
    }

    /// Bucket width in milliseconds.
    pub fn width_millis(&self) -> i64 {
        self.magnitude as i64 * self.unit.millis()
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Self::new(1, FrequencyUnit::Minute)
    }
}

impl FromStr for Frequency {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.suffix())
    }
}
