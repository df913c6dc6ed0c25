use crate::domain::{CalculationUnit, SampleType, UpdateMode};
use chrono::TimeDelta;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxConfig {
    pub influx: InfluxSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorsConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub id: String,
    #[serde(default)]
    pub unit: CalculationUnit,
    #[serde(default = "zero_duration", deserialize_with = "deserialize_duration")]
    pub reset_after: TimeDelta,
    #[serde(default, deserialize_with = "deserialize_optional_duration")]
    pub max_condition_age: Option<TimeDelta>,
    pub condition: Option<SeriesConfig>,
    pub status: Option<SeriesConfig>,
}

/// Where one sample stream lives in the time-series store.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SeriesConfig {
    pub measurement: String,
    pub entity: String,
    #[serde(default = "default_field")]
    pub field: String,
    pub sample_type: SampleType,
    #[serde(default)]
    pub update_mode: UpdateMode,
}

impl SeriesConfig {
    pub fn display_name(&self) -> String {
        format!("{}.{}[{}]", self.measurement, self.field, self.entity)
    }
}

impl MonitorsConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for monitor in &self.monitors {
            if monitor.id.trim().is_empty() {
                anyhow::bail!("monitor id must not be empty");
            }
            if !seen.insert(monitor.id.as_str()) {
                anyhow::bail!("duplicate monitor id '{}'", monitor.id);
            }
        }
        Ok(())
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_field() -> String {
    "value".to_string()
}

fn zero_duration() -> TimeDelta {
    TimeDelta::zero()
}

pub fn load_influx_config() -> anyhow::Result<InfluxConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/influx"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_monitors_config() -> anyhow::Result<MonitorsConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitors"))
        .build()?;

    let monitors: MonitorsConfig = settings.try_deserialize()?;
    monitors.validate()?;
    Ok(monitors)
}

/// Parse a duration string such as "2d", "8h", "30m", "90s" or "120" (seconds).
pub fn parse_duration(s: &str) -> Option<TimeDelta> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n, 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        (s, 1)
    };

    let num: u32 = num_str.trim().parse().ok()?;
    Some(TimeDelta::seconds(i64::from(num) * multiplier))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw)))
}

fn deserialize_optional_duration<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_duration(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> MonitorsConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("2d"), Some(TimeDelta::days(2)));
        assert_eq!(parse_duration("8h"), Some(TimeDelta::hours(8)));
        assert_eq!(parse_duration("30m"), Some(TimeDelta::minutes(30)));
        assert_eq!(parse_duration("90s"), Some(TimeDelta::seconds(90)));
        assert_eq!(parse_duration("120"), Some(TimeDelta::seconds(120)));
        assert_eq!(parse_duration("-5m"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[test]
    fn test_monitor_config() {
        let config = parse(
            r#"
            [server]
            bind = "127.0.0.1:9000"

            [[monitors]]
            id = "crusher_1"
            unit = "hours"
            reset_after = "8h"
            max_condition_age = "5m"

            [monitors.condition]
            measurement = "equipment"
            entity = "crusher_1"
            field = "running"
            sample_type = "boolean"

            [monitors.status]
            measurement = "operating_time_status"
            entity = "crusher_1"
            sample_type = "string"
            "#,
        );

        assert_eq!(config.server.bind, "127.0.0.1:9000");

        let monitor = &config.monitors[0];
        assert_eq!(monitor.unit, CalculationUnit::Hours);
        assert_eq!(monitor.reset_after, TimeDelta::hours(8));
        assert_eq!(monitor.max_condition_age, Some(TimeDelta::minutes(5)));

        let status = monitor.status.as_ref().unwrap();
        assert_eq!(status.field, "value");
        assert_eq!(status.update_mode, UpdateMode::OnWrite);
        assert_eq!(status.display_name(), "operating_time_status.value[crusher_1]");
        assert_eq!(monitor.condition.as_ref().unwrap().sample_type, SampleType::Boolean);
    }

    #[test]
    fn test_monitor_defaults() {
        let config = parse(
            r#"
            [[monitors]]
            id = "pump"
            "#,
        );

        let monitor = &config.monitors[0];
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(monitor.unit, CalculationUnit::Seconds);
        assert_eq!(monitor.reset_after, TimeDelta::zero());
        assert_eq!(monitor.max_condition_age, None);
        assert!(monitor.condition.is_none());
        assert!(monitor.status.is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config = parse(
            r#"
            [[monitors]]
            id = "pump"

            [[monitors]]
            id = "pump"
            "#,
        );
        assert!(config.validate().is_err());
    }
}
