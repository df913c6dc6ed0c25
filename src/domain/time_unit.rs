// Calculation units and the duration converter
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationUnit {
    #[default]
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl CalculationUnit {
    fn seconds_per_unit(self) -> f64 {
        match self {
            CalculationUnit::Seconds => 1.0,
            CalculationUnit::Minutes => 60.0,
            CalculationUnit::Hours => 3_600.0,
            CalculationUnit::Days => 86_400.0,
        }
    }

    /// Converts `duration` into this unit. Negative durations count as zero.
    pub fn convert(self, duration: TimeDelta) -> f64 {
        convert(duration, self)
    }
}

impl fmt::Display for CalculationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalculationUnit::Seconds => "seconds",
            CalculationUnit::Minutes => "minutes",
            CalculationUnit::Hours => "hours",
            CalculationUnit::Days => "days",
        };
        f.write_str(name)
    }
}

/// `max(duration in unit, 0)`. Out-of-order samples never shrink a total.
pub fn convert(duration: TimeDelta, unit: CalculationUnit) -> f64 {
    let total_seconds =
        duration.num_seconds() as f64 + f64::from(duration.subsec_nanos()) / 1_000_000_000.0;
    (total_seconds / unit.seconds_per_unit()).max(0.0)
}
