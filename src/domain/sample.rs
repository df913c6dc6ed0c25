// Time-series sample models shared by the condition source and status store
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    #[default]
    Bad,
}

impl Quality {
    pub fn is_good(self) -> bool {
        self == Quality::Good
    }
}

/// The declared value type of a sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    Boolean,
    Integer,
    Double,
    String,
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::Boolean => "Boolean",
            SampleType::Integer => "Integer",
            SampleType::Double => "Double",
            SampleType::String => "String",
        };
        f.write_str(name)
    }
}

/// How a stream receives new samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Samples are appended by explicit writes.
    #[default]
    OnWrite,
    /// Samples are polled from a device on a schedule.
    Periodic,
    /// Samples are produced by an expression.
    Calculated,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateMode::OnWrite => "OnWrite",
            UpdateMode::Periodic => "Periodic",
            UpdateMode::Calculated => "Calculated",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl SampleValue {
    pub fn sample_type(&self) -> SampleType {
        match self {
            SampleValue::Boolean(_) => SampleType::Boolean,
            SampleValue::Integer(_) => SampleType::Integer,
            SampleValue::Double(_) => SampleType::Double,
            SampleValue::String(_) => SampleType::String,
        }
    }

    /// Reads the value as a condition. Numbers are true when non-zero and
    /// strings must spell `true` or `false`; anything else is `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SampleValue::Boolean(value) => Some(*value),
            SampleValue::Integer(value) => Some(*value != 0),
            SampleValue::Double(value) if value.is_nan() => None,
            SampleValue::Double(value) => Some(*value != 0.0),
            SampleValue::String(text) => {
                let text = text.trim();
                if text.eq_ignore_ascii_case("true") {
                    Some(true)
                } else if text.eq_ignore_ascii_case("false") {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SampleValue::String(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: SampleValue,
    pub quality: Quality,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: SampleValue, quality: Quality) -> Self {
        Self {
            timestamp,
            value,
            quality,
        }
    }

    pub fn good(timestamp: DateTime<Utc>, value: SampleValue) -> Self {
        Self::new(timestamp, value, Quality::Good)
    }

    pub fn is_good(&self) -> bool {
        self.quality.is_good()
    }

    /// The same sample downgraded to bad quality.
    pub fn into_bad(self) -> Self {
        Self {
            quality: Quality::Bad,
            ..self
        }
    }
}

/// A good condition sample whose value read cleanly as a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionSample {
    pub timestamp: DateTime<Utc>,
    pub value: bool,
}

impl ConditionSample {
    /// `None` for bad samples and for values that are not booleans.
    pub fn from_sample(sample: &Sample) -> Option<Self> {
        if !sample.is_good() {
            return None;
        }
        sample.value.as_bool().map(|value| Self {
            timestamp: sample.timestamp,
            value,
        })
    }
}

/// The operating time reported for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedSample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub quality: Quality,
}

impl ComputedSample {
    pub fn good(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self {
            timestamp,
            value,
            quality: Quality::Good,
        }
    }

    /// What a failed cycle reports: zero with default quality.
    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: 0.0,
            quality: Quality::default(),
        }
    }
}
