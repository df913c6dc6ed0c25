// InfluxDB adapter - Condition and status streams over InfluxQL and line protocol
use crate::application::sample_stream::{SampleStream, WritableSampleStream};
use crate::domain::{Quality, Sample, SampleType, SampleValue, UpdateMode};
use crate::infrastructure::config::SeriesConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    results: Vec<InfluxQLResult>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    #[allow(dead_code)]
    name: String,
    columns: Vec<String>,
    values: Vec<Vec<serde_json::Value>>,
}

impl InfluxRepository {
    pub fn new(host: String, token: String, database: String, retention_policy: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            token,
            database,
            retention_policy,
        }
    }

    fn build_query_url(&self, query: &str) -> String {
        format!(
            "{}/query?db={}&rp={}&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(query)
        )
    }

    fn build_write_url(&self) -> String {
        format!(
            "{}/write?db={}&rp={}&precision=ns",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse> {
        let url = self.build_query_url(query);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB query failed with status {}: {}", status, body);
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .context("Failed to parse InfluxDB response")?;

        if let Some(result) = data.results.first() {
            if let Some(error) = &result.error {
                anyhow::bail!("InfluxDB query error: {}", error);
            }
        }

        Ok(data)
    }

    async fn write_line(&self, line: String) -> Result<()> {
        let response = self
            .client
            .post(self.build_write_url())
            .header("Authorization", format!("Token {}", self.token))
            .body(line)
            .send()
            .await
            .context("Failed to send write to InfluxDB")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("InfluxDB write failed with status {}: {}", status, body);
        }

        Ok(())
    }
}

/// One series of an InfluxDB measurement, addressed by its `entity` tag.
#[derive(Debug, Clone)]
pub struct InfluxSampleStream {
    repository: Arc<InfluxRepository>,
    series: SeriesConfig,
    name: String,
}

impl InfluxSampleStream {
    pub fn new(repository: Arc<InfluxRepository>, series: SeriesConfig) -> Self {
        let name = series.display_name();
        Self {
            repository,
            series,
            name,
        }
    }
}

#[async_trait]
impl SampleStream for InfluxSampleStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_type(&self) -> SampleType {
        self.series.sample_type
    }

    async fn last_on_or_before(&self, time: DateTime<Utc>) -> Result<Option<Sample>> {
        let query = last_sample_query(&self.series, time);
        tracing::debug!("Executing last sample query: {}", query);

        let response = self.repository.execute_query(&query).await?;
        Ok(parse_last_sample(&response, &self.series))
    }
}

#[async_trait]
impl WritableSampleStream for InfluxSampleStream {
    fn update_mode(&self) -> UpdateMode {
        self.series.update_mode
    }

    async fn write(&self, sample: Sample) -> Result<()> {
        let line = line_protocol(&self.series, &sample)?;
        self.repository.write_line(line).await
    }
}

fn last_sample_query(series: &SeriesConfig, time: DateTime<Utc>) -> String {
    format!(
        "SELECT {}, \"quality\" FROM {} WHERE \"entity\" = '{}' AND time <= '{}' ORDER BY time DESC LIMIT 1",
        quote_identifier(&series.field),
        quote_identifier(&series.measurement),
        series.entity.replace('\\', "\\\\").replace('\'', "\\'"),
        time.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

fn parse_last_sample(response: &InfluxQLResponse, series: &SeriesConfig) -> Option<Sample> {
    let result = response.results.first()?;
    let s = result.series.as_ref()?.first()?;
    let row = s.values.first()?;

    let time_idx = s.columns.iter().position(|c| c == "time").unwrap_or(0);
    let value_idx = s.columns.iter().position(|c| c == &series.field).unwrap_or(1);
    let quality_idx = s.columns.iter().position(|c| c == "quality");

    let timestamp = row
        .get(time_idx)?
        .as_str()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())?
        .with_timezone(&Utc);
    let value = json_to_value(row.get(value_idx)?, series.sample_type)?;
    let quality = match quality_idx.and_then(|i| row.get(i)).and_then(|q| q.as_str()) {
        Some(q) if !q.eq_ignore_ascii_case("good") => Quality::Bad,
        _ => Quality::Good,
    };

    Some(Sample::new(timestamp, value, quality))
}

fn json_to_value(value: &serde_json::Value, sample_type: SampleType) -> Option<SampleValue> {
    match value {
        serde_json::Value::Bool(b) => Some(SampleValue::Boolean(*b)),
        serde_json::Value::String(text) => Some(SampleValue::String(text.clone())),
        serde_json::Value::Number(n) => match (sample_type, n.as_i64()) {
            (SampleType::Double, _) | (_, None) => n.as_f64().map(SampleValue::Double),
            (_, Some(i)) => Some(SampleValue::Integer(i)),
        },
        _ => None,
    }
}

fn line_protocol(series: &SeriesConfig, sample: &Sample) -> Result<String> {
    let nanos = sample
        .timestamp
        .timestamp_nanos_opt()
        .context("Sample timestamp is outside the InfluxDB time range")?;
    let field_value = match &sample.value {
        SampleValue::Boolean(b) => b.to_string(),
        SampleValue::Integer(i) => format!("{}i", i),
        SampleValue::Double(d) => d.to_string(),
        SampleValue::String(text) => quote_field_string(text),
    };
    let quality = match sample.quality {
        Quality::Good => "good",
        Quality::Bad => "bad",
    };

    Ok(format!(
        "{},entity={} {}={},quality=\"{}\" {}",
        escape_key(&series.measurement, false),
        escape_key(&series.entity, true),
        escape_key(&series.field, true),
        field_value,
        quality,
        nanos
    ))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_field_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

// Measurements escape commas and spaces; tag keys, tag values and field keys
// also escape equals signs.
fn escape_key(text: &str, escape_equals: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ',' || c == ' ' || (escape_equals && c == '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(sample_type: SampleType) -> SeriesConfig {
        SeriesConfig {
            measurement: "operating time".to_string(),
            entity: "crusher,1".to_string(),
            field: "value".to_string(),
            sample_type,
            update_mode: UpdateMode::OnWrite,
        }
    }

    fn response(json: serde_json::Value) -> InfluxQLResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_last_sample_query() {
        let time = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let mut series = series(SampleType::String);
        series.entity = "o'brien".to_string();
        assert_eq!(
            last_sample_query(&series, time),
            "SELECT \"value\", \"quality\" FROM \"operating time\" WHERE \"entity\" = 'o\\'brien' \
             AND time <= '2025-06-01T08:00:00.000000000Z' ORDER BY time DESC LIMIT 1"
        );
    }

    #[test]
    fn test_parse_last_sample() {
        let data = response(serde_json::json!({
            "results": [{
                "series": [{
                    "name": "operating time",
                    "columns": ["time", "value", "quality"],
                    "values": [["2025-06-01T07:59:00.5Z", "Hold:100:638845487400000000", null]]
                }]
            }]
        }));

        let sample = parse_last_sample(&data, &series(SampleType::String)).unwrap();
        assert_eq!(
            sample.timestamp,
            Utc.with_ymd_and_hms(2025, 6, 1, 7, 59, 0).unwrap() + chrono::TimeDelta::milliseconds(500)
        );
        assert_eq!(sample.value.as_str(), Some("Hold:100:638845487400000000"));
        assert!(sample.is_good());
    }

    #[test]
    fn test_parse_bad_quality_and_numbers() {
        let data = response(serde_json::json!({
            "results": [{
                "series": [{
                    "name": "equipment",
                    "columns": ["time", "value", "quality"],
                    "values": [["2025-06-01T07:59:00Z", 1, "bad"]]
                }]
            }]
        }));

        let sample = parse_last_sample(&data, &series(SampleType::Boolean)).unwrap();
        assert_eq!(sample.value, SampleValue::Integer(1));
        assert_eq!(sample.quality, Quality::Bad);

        let sample = parse_last_sample(&data, &series(SampleType::Double)).unwrap();
        assert_eq!(sample.value, SampleValue::Double(1.0));
    }

    #[test]
    fn test_parse_empty_result() {
        let data = response(serde_json::json!({ "results": [{ "statement_id": 0 }] }));
        assert!(parse_last_sample(&data, &series(SampleType::Boolean)).is_none());
    }

    #[test]
    fn test_line_protocol_escaping() {
        let time = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let sample = Sample::good(time, SampleValue::String("say \"hi\"".to_string()));
        let line = line_protocol(&series(SampleType::String), &sample).unwrap();
        assert_eq!(
            line,
            "operating\\ time,entity=crusher\\,1 value=\"say \\\"hi\\\"\",quality=\"good\" 1748764800000000000"
        );
    }

    #[test]
    fn test_line_protocol_scalar_values() {
        let time = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let s = series(SampleType::Integer);
        let line = line_protocol(&s, &Sample::good(time, SampleValue::Integer(7))).unwrap();
        assert!(line.contains(" value=7i,"));
        let line = line_protocol(&s, &Sample::good(time, SampleValue::Boolean(false))).unwrap();
        assert!(line.contains(" value=false,"));
    }

    #[test]
    fn test_write_url() {
        let repository = InfluxRepository::new(
            "http://influx:8086/".to_string(),
            "token".to_string(),
            "plant".to_string(),
            "autogen".to_string(),
        );
        assert_eq!(
            repository.build_write_url(),
            "http://influx:8086/write?db=plant&rp=autogen&precision=ns"
        );
    }

    #[test]
    fn test_query_url_encodes_names() {
        let repository = InfluxRepository::new(
            "http://influx:8086".to_string(),
            "token".to_string(),
            "plant data".to_string(),
            "one&two".to_string(),
        );
        assert_eq!(
            repository.build_query_url("SELECT 1"),
            "http://influx:8086/query?db=plant%20data&rp=one%26two&q=SELECT%201"
        );
    }
}
