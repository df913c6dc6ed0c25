// Builds one calculator per configured monitor from the streams its series name
use crate::application::operating_time_calculator::OperatingTimeCalculator;
use crate::application::sample_stream::{SampleStream, WritableSampleStream};
use crate::infrastructure::config::{MonitorConfig, SeriesConfig};
use crate::infrastructure::influx_repository::{InfluxRepository, InfluxSampleStream};
use std::sync::Arc;

/// Opens the stream a configured series points at.
pub trait StreamFactory {
    fn source(&self, series: &SeriesConfig) -> Arc<dyn SampleStream>;
    fn store(&self, series: &SeriesConfig) -> Arc<dyn WritableSampleStream>;
}

pub struct InfluxStreams {
    repository: Arc<InfluxRepository>,
}

impl InfluxStreams {
    pub fn new(repository: Arc<InfluxRepository>) -> Self {
        Self { repository }
    }
}

impl StreamFactory for InfluxStreams {
    fn source(&self, series: &SeriesConfig) -> Arc<dyn SampleStream> {
        Arc::new(InfluxSampleStream::new(self.repository.clone(), series.clone()))
    }

    fn store(&self, series: &SeriesConfig) -> Arc<dyn WritableSampleStream> {
        Arc::new(InfluxSampleStream::new(self.repository.clone(), series.clone()))
    }
}

pub fn build_calculator(monitor: &MonitorConfig, streams: &dyn StreamFactory) -> OperatingTimeCalculator {
    let mut calculator = OperatingTimeCalculator::new(monitor.id.clone())
        .with_unit(monitor.unit)
        .reset_after(monitor.reset_after);

    if let Some(condition) = &monitor.condition {
        calculator = calculator.using_condition(streams.source(condition));
    }
    if let Some(status) = &monitor.status {
        calculator = calculator.store_status_in(streams.store(status));
    }
    if let Some(max_age) = monitor.max_condition_age {
        calculator = calculator.ignore_samples_older_than(max_age);
    }

    calculator
}

pub fn build_calculators(
    monitors: &[MonitorConfig],
    streams: &dyn StreamFactory,
) -> Vec<OperatingTimeCalculator> {
    monitors
        .iter()
        .map(|monitor| {
            let calculator = build_calculator(monitor, streams);
            for issue in calculator.validate() {
                tracing::error!(monitor = %monitor.id, "{}", issue);
            }
            calculator
        })
        .collect()
}
