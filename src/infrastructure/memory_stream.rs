// In-memory sample stream used as a test double
use crate::application::sample_stream::{SampleStream, WritableSampleStream};
use crate::domain::{Sample, SampleType, UpdateMode};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug)]
pub struct MemorySampleStream {
    name: String,
    sample_type: SampleType,
    update_mode: UpdateMode,
    samples: RwLock<BTreeMap<DateTime<Utc>, Sample>>,
}

impl MemorySampleStream {
    pub fn new(name: impl Into<String>, sample_type: SampleType) -> Self {
        Self::with_samples(name, sample_type, Vec::new())
    }

    pub fn with_samples(
        name: impl Into<String>,
        sample_type: SampleType,
        samples: Vec<Sample>,
    ) -> Self {
        let samples = samples.into_iter().map(|s| (s.timestamp, s)).collect();
        Self {
            name: name.into(),
            sample_type,
            update_mode: UpdateMode::OnWrite,
            samples: RwLock::new(samples),
        }
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    /// All samples in timestamp order
    pub async fn samples(&self) -> Vec<Sample> {
        self.samples.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SampleStream for MemorySampleStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    async fn last_on_or_before(&self, time: DateTime<Utc>) -> anyhow::Result<Option<Sample>> {
        let samples = self.samples.read().await;
        Ok(samples.range(..=time).next_back().map(|(_, s)| s.clone()))
    }
}

#[async_trait]
impl WritableSampleStream for MemorySampleStream {
    fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    async fn write(&self, sample: Sample) -> anyhow::Result<()> {
        self.samples.write().await.insert(sample.timestamp, sample);
        Ok(())
    }
}
