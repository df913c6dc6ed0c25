// Operating time calculator - Runs one evaluation cycle for a monitored entity
use crate::application::sample_stream::{SampleStream, WritableSampleStream};
use crate::domain::state_codec;
use crate::domain::{
    CalculationUnit, ComputedSample, ConditionSample, Sample, SampleType, SampleValue, TimeRules,
    TimeState, Timestamp, UpdateMode,
};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Problems with how a calculator is wired. Reported every cycle, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no status store configured for '{host}', the operating time cannot be persisted")]
    MissingStatusStore { host: String },

    #[error("status store '{stream}' of '{host}' must carry String samples, found {found}")]
    StatusNotString {
        host: String,
        stream: String,
        found: SampleType,
    },

    #[error("status store '{stream}' of '{host}' must use the OnWrite update mode, found {found}")]
    StatusNotOnWrite {
        host: String,
        stream: String,
        found: UpdateMode,
    },

    #[error("no condition configured for '{host}'")]
    MissingCondition { host: String },

    #[error("condition '{stream}' of '{host}' must carry Boolean samples, found {found}")]
    ConditionNotBoolean {
        host: String,
        stream: String,
        found: SampleType,
    },
}

/// Store I/O failures. A failed cycle leaves the persisted state untouched.
#[derive(Debug, Error)]
pub enum CalculatorError {
    #[error("failed to read status from '{stream}'")]
    ReadStatus {
        stream: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read condition from '{stream}'")]
    ReadCondition {
        stream: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write status to '{stream}'")]
    WriteStatus {
        stream: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of one completed cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// State decoded from the status store
    pub initial: TimeState,
    /// State after the condition and clock updates
    pub state: TimeState,
    /// Record written back, `None` when no status store is configured
    pub record: Option<String>,
    pub sample: ComputedSample,
    pub issues: Vec<ConfigurationError>,
}

#[derive(Clone)]
pub struct OperatingTimeCalculator {
    host: String,
    condition: Option<Arc<dyn SampleStream>>,
    status: Option<Arc<dyn WritableSampleStream>>,
    unit: CalculationUnit,
    reset_period: TimeDelta,
    max_condition_age: Option<TimeDelta>,
}

impl OperatingTimeCalculator {
    /// A calculator counting seconds with a zero reset period.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            condition: None,
            status: None,
            unit: CalculationUnit::Seconds,
            reset_period: TimeDelta::zero(),
            max_condition_age: None,
        }
    }

    pub fn using_condition(mut self, condition: Arc<dyn SampleStream>) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn store_status_in(mut self, status: Arc<dyn WritableSampleStream>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn reset_after(mut self, period: TimeDelta) -> Self {
        self.reset_period = period;
        self
    }

    pub fn with_unit(mut self, unit: CalculationUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn total_minutes(self) -> Self {
        self.with_unit(CalculationUnit::Minutes)
    }

    pub fn total_hours(self) -> Self {
        self.with_unit(CalculationUnit::Hours)
    }

    pub fn total_days(self) -> Self {
        self.with_unit(CalculationUnit::Days)
    }

    /// Condition samples at least this old at evaluation time count as bad.
    pub fn ignore_samples_older_than(mut self, max_age: TimeDelta) -> Self {
        self.max_condition_age = Some(max_age);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn condition_name(&self) -> Option<&str> {
        self.condition.as_deref().map(|c| c.name())
    }

    pub fn status_name(&self) -> Option<&str> {
        self.status.as_deref().map(|s| s.name())
    }

    pub fn rules(&self) -> TimeRules {
        TimeRules::new(self.unit, self.reset_period)
    }

    pub fn validate(&self) -> Vec<ConfigurationError> {
        let mut issues = Vec::new();
        let host = || self.host.clone();

        match &self.status {
            None => issues.push(ConfigurationError::MissingStatusStore { host: host() }),
            Some(status) => {
                if status.sample_type() != SampleType::String {
                    issues.push(ConfigurationError::StatusNotString {
                        host: host(),
                        stream: status.name().to_string(),
                        found: status.sample_type(),
                    });
                }
                if status.update_mode() != UpdateMode::OnWrite {
                    issues.push(ConfigurationError::StatusNotOnWrite {
                        host: host(),
                        stream: status.name().to_string(),
                        found: status.update_mode(),
                    });
                }
            }
        }

        match &self.condition {
            None => issues.push(ConfigurationError::MissingCondition { host: host() }),
            Some(condition) if condition.sample_type() != SampleType::Boolean => {
                issues.push(ConfigurationError::ConditionNotBoolean {
                    host: host(),
                    stream: condition.name().to_string(),
                    found: condition.sample_type(),
                });
            }
            Some(_) => {}
        }

        issues
    }

    /// Runs one cycle at `time`: load state, apply the latest condition and
    /// the clock, persist, and report the operating time.
    ///
    /// Cycles for the same status store must not overlap.
    pub async fn calculate(&self, time: DateTime<Utc>) -> Result<CycleReport, CalculatorError> {
        let issues = self.validate();
        for issue in &issues {
            tracing::error!(host = %self.host, "{}", issue);
        }

        let initial = self.load_state(time).await?;
        let condition = self.latest_condition(time).await?;

        let rules = self.rules();
        let now = Timestamp::from_datetime(time);
        let mut state = initial;
        if let Some(next) = state.on_condition(condition, &rules) {
            state = self.change_state(state, next);
        }
        if let Some(next) = state.on_clock_advance(now, &rules) {
            state = self.change_state(state, next);
        }

        let record = match &self.status {
            Some(status) => {
                let record = state_codec::encode(&state);
                let sample = Sample::good(time, SampleValue::String(record.clone()));
                status
                    .write(sample)
                    .await
                    .map_err(|source| CalculatorError::WriteStatus {
                        stream: status.name().to_string(),
                        source,
                    })?;
                Some(record)
            }
            None => None,
        };

        let sample = ComputedSample::good(time, state.value_at(now, self.unit));
        Ok(CycleReport {
            initial,
            state,
            record,
            sample,
            issues,
        })
    }

    async fn load_state(&self, time: DateTime<Utc>) -> Result<TimeState, CalculatorError> {
        let Some(status) = &self.status else {
            return Ok(TimeState::default());
        };

        let sample = status
            .last_on_or_before(time)
            .await
            .map_err(|source| CalculatorError::ReadStatus {
                stream: status.name().to_string(),
                source,
            })?;

        let record = sample
            .as_ref()
            .filter(|s| s.is_good())
            .and_then(|s| s.value.as_str());
        Ok(state_codec::decode(record))
    }

    async fn latest_condition(
        &self,
        time: DateTime<Utc>,
    ) -> Result<Option<ConditionSample>, CalculatorError> {
        let Some(condition) = &self.condition else {
            return Ok(None);
        };

        let sample = condition
            .last_on_or_before(time)
            .await
            .map_err(|source| CalculatorError::ReadCondition {
                stream: condition.name().to_string(),
                source,
            })?;

        let Some(sample) = sample.map(|s| self.ignore_if_old(s, time)) else {
            return Ok(None);
        };
        let parsed = ConditionSample::from_sample(&sample);
        if parsed.is_none() && sample.is_good() {
            tracing::warn!(
                host = %self.host,
                value = ?sample.value,
                "Condition value is not a boolean, treating it as missing"
            );
        }
        Ok(parsed)
    }

    fn ignore_if_old(&self, sample: Sample, time: DateTime<Utc>) -> Sample {
        let Some(max_age) = self.max_condition_age else {
            return sample;
        };
        let age = time - sample.timestamp;
        if age < max_age {
            return sample;
        }
        tracing::warn!(
            host = %self.host,
            "Ignoring old samples. Age={:.1} min",
            age.num_milliseconds() as f64 / 60_000.0
        );
        sample.into_bad()
    }

    fn change_state(&self, from: TimeState, to: TimeState) -> TimeState {
        tracing::debug!(
            host = %self.host,
            "StateChange: {} -> {} ({})",
            from.kind(),
            to.kind(),
            to.previous_value()
        );
        to
    }
}
