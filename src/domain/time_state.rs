// Operating-time state machine
//
// Every transition is a pure function of (current state, input) that either
// leaves the state alone (`None`) or returns the next state.
use super::sample::ConditionSample;
use super::time_unit::CalculationUnit;
use super::timestamp::Timestamp;
use chrono::TimeDelta;
use std::fmt;

/// The per-monitor settings the transitions depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRules {
    pub unit: CalculationUnit,
    reset_period: TimeDelta,
}

impl TimeRules {
    /// Negative reset periods are treated as zero.
    pub fn new(unit: CalculationUnit, reset_period: TimeDelta) -> Self {
        Self {
            unit,
            reset_period: reset_period.max(TimeDelta::zero()),
        }
    }

    pub fn reset_period(&self) -> TimeDelta {
        self.reset_period
    }

    /// When a hold that began at `held_since` expires. `None` if that instant
    /// is past the end of the tick range, i.e. never.
    pub fn expiry(&self, held_since: Timestamp) -> Option<Timestamp> {
        held_since.checked_add(self.reset_period)
    }
}

impl Default for TimeRules {
    fn default() -> Self {
        Self::new(CalculationUnit::Seconds, TimeDelta::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Reset,
    Operating,
    Holding,
}

impl StateKind {
    /// The name written into the persisted record.
    pub fn record_name(self) -> &'static str {
        match self {
            StateKind::Reset => "Reset",
            StateKind::Operating => "Operating",
            StateKind::Holding => "Hold",
        }
    }

    pub fn from_record_name(name: &str) -> Option<Self> {
        match name {
            "Reset" => Some(StateKind::Reset),
            "Operating" => Some(StateKind::Operating),
            "Hold" => Some(StateKind::Holding),
            _ => None,
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.record_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeState {
    /// Not accumulating. The total is zero.
    Reset { last_timestamp: Timestamp },
    /// Accumulating since `last_timestamp`, on top of `previous_value`.
    Operating {
        previous_value: f64,
        last_timestamp: Timestamp,
    },
    /// Frozen at `previous_value` since the condition dropped at
    /// `last_timestamp`. Resets once the reset period has elapsed.
    Holding {
        previous_value: f64,
        last_timestamp: Timestamp,
    },
}

impl Default for TimeState {
    fn default() -> Self {
        TimeState::Reset {
            last_timestamp: Timestamp::UNSET,
        }
    }
}

impl TimeState {
    pub fn kind(&self) -> StateKind {
        match self {
            TimeState::Reset { .. } => StateKind::Reset,
            TimeState::Operating { .. } => StateKind::Operating,
            TimeState::Holding { .. } => StateKind::Holding,
        }
    }

    pub fn previous_value(&self) -> f64 {
        match *self {
            TimeState::Reset { .. } => 0.0,
            TimeState::Operating { previous_value, .. }
            | TimeState::Holding { previous_value, .. } => previous_value,
        }
    }

    pub fn last_timestamp(&self) -> Timestamp {
        match *self {
            TimeState::Reset { last_timestamp }
            | TimeState::Operating { last_timestamp, .. }
            | TimeState::Holding { last_timestamp, .. } => last_timestamp,
        }
    }

    /// The operating time this state reports at `time`.
    pub fn value_at(&self, time: Timestamp, unit: CalculationUnit) -> f64 {
        match *self {
            TimeState::Reset { .. } => 0.0,
            TimeState::Operating {
                previous_value,
                last_timestamp,
            } => previous_value + unit.convert(time.since(last_timestamp)),
            TimeState::Holding { previous_value, .. } => previous_value,
        }
    }

    pub fn on_condition_true(&self, timestamp: Timestamp) -> Option<TimeState> {
        match *self {
            TimeState::Reset { .. } => Some(TimeState::Operating {
                previous_value: 0.0,
                last_timestamp: timestamp,
            }),
            TimeState::Operating { .. } => None,
            TimeState::Holding { previous_value, .. } => Some(TimeState::Operating {
                previous_value,
                last_timestamp: timestamp,
            }),
        }
    }

    pub fn on_condition_false(&self, timestamp: Timestamp, rules: &TimeRules) -> Option<TimeState> {
        match *self {
            TimeState::Reset { last_timestamp } => bootstrap(last_timestamp, timestamp),
            TimeState::Operating { .. } => Some(TimeState::Holding {
                previous_value: self.value_at(timestamp, rules.unit),
                last_timestamp: timestamp,
            }),
            TimeState::Holding { last_timestamp, .. } => expire(last_timestamp, timestamp, rules),
        }
    }

    /// Called once per evaluation after the condition update, so a hold can
    /// expire without a fresh condition sample.
    pub fn on_clock_advance(&self, time: Timestamp, rules: &TimeRules) -> Option<TimeState> {
        match *self {
            TimeState::Reset { last_timestamp } => bootstrap(last_timestamp, time),
            TimeState::Operating { .. } => None,
            TimeState::Holding { last_timestamp, .. } => expire(last_timestamp, time, rules),
        }
    }

    /// Feeds the latest condition. A missing condition acts as a false one
    /// with no reliable timestamp.
    pub fn on_condition(
        &self,
        condition: Option<ConditionSample>,
        rules: &TimeRules,
    ) -> Option<TimeState> {
        match condition {
            Some(sample) if sample.value => self.on_condition_true(sample.timestamp.into()),
            Some(sample) => self.on_condition_false(sample.timestamp.into(), rules),
            None => self.on_condition_false(Timestamp::UNSET, rules),
        }
    }
}

// A reset with no baseline adopts the first real instant it sees.
fn bootstrap(last_timestamp: Timestamp, seen: Timestamp) -> Option<TimeState> {
    (last_timestamp.is_unset() && !seen.is_unset()).then_some(TimeState::Reset {
        last_timestamp: seen,
    })
}

fn expire(held_since: Timestamp, now: Timestamp, rules: &TimeRules) -> Option<TimeState> {
    let reset_after = rules.expiry(held_since)?;
    (now >= reset_after).then_some(TimeState::Reset {
        last_timestamp: reset_after,
    })
}
