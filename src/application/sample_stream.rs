// Stream traits for the condition source and the status store
use crate::domain::{Sample, SampleType, UpdateMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait SampleStream: Send + Sync {
    /// Human readable name used in diagnostics
    fn name(&self) -> &str;

    /// The value type this stream is declared to carry
    fn sample_type(&self) -> SampleType;

    /// The latest sample at or before `time`, whatever its quality
    async fn last_on_or_before(&self, time: DateTime<Utc>) -> anyhow::Result<Option<Sample>>;
}

#[async_trait]
pub trait WritableSampleStream: SampleStream {
    fn update_mode(&self) -> UpdateMode;

    /// Append a sample. A sample at an existing timestamp replaces it.
    async fn write(&self, sample: Sample) -> anyhow::Result<()>;
}
