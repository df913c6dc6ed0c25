// Evaluation service - Serializes cycles per monitor and fans out across monitors
use crate::application::operating_time_calculator::{CycleReport, OperatingTimeCalculator};
use crate::domain::{CalculationUnit, ComputedSample, TimeState};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct MonitorSlot {
    calculator: OperatingTimeCalculator,
    // Held for the whole read-modify-write of the status record
    cycle_lock: Mutex<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorInfo {
    pub id: String,
    pub unit: CalculationUnit,
    pub reset_after_seconds: i64,
    pub condition: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSummary {
    pub kind: String,
    pub previous_value: f64,
    /// `None` while no timestamp has been recorded
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl From<&TimeState> for StateSummary {
    fn from(state: &TimeState) -> Self {
        let last = state.last_timestamp();
        Self {
            kind: state.kind().to_string(),
            previous_value: state.previous_value(),
            last_timestamp: if last.is_unset() { None } else { last.to_datetime() },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorReading {
    pub monitor_id: String,
    pub sample: ComputedSample,
    pub state: Option<StateSummary>,
    pub issues: Vec<String>,
    pub error: Option<String>,
}

impl MonitorReading {
    fn completed(monitor_id: &str, report: CycleReport) -> Self {
        Self {
            monitor_id: monitor_id.to_string(),
            sample: report.sample,
            state: Some(StateSummary::from(&report.state)),
            issues: report.issues.iter().map(ToString::to_string).collect(),
            error: None,
        }
    }

    fn failed(monitor_id: &str, time: DateTime<Utc>, error: String) -> Self {
        Self {
            monitor_id: monitor_id.to_string(),
            sample: ComputedSample::fallback(time),
            state: None,
            issues: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Clone)]
pub struct EvaluationService {
    order: Arc<Vec<String>>,
    monitors: Arc<HashMap<String, Arc<MonitorSlot>>>,
}

impl EvaluationService {
    pub fn new(calculators: Vec<OperatingTimeCalculator>) -> Self {
        let order = calculators.iter().map(|c| c.host().to_string()).collect();
        let monitors = calculators
            .into_iter()
            .map(|calculator| {
                let id = calculator.host().to_string();
                let slot = MonitorSlot {
                    calculator,
                    cycle_lock: Mutex::new(()),
                };
                (id, Arc::new(slot))
            })
            .collect();

        Self {
            order: Arc::new(order),
            monitors: Arc::new(monitors),
        }
    }

    pub fn monitors(&self) -> Vec<MonitorInfo> {
        self.order
            .iter()
            .filter_map(|id| self.monitors.get(id))
            .map(|slot| {
                let calculator = &slot.calculator;
                let rules = calculator.rules();
                MonitorInfo {
                    id: calculator.host().to_string(),
                    unit: rules.unit,
                    reset_after_seconds: rules.reset_period().num_seconds(),
                    condition: calculator.condition_name().map(str::to_string),
                    status: calculator.status_name().map(str::to_string),
                }
            })
            .collect()
    }

    /// Evaluates one monitor. `None` if the id is unknown.
    pub async fn evaluate(&self, monitor_id: &str, time: DateTime<Utc>) -> Option<MonitorReading> {
        let slot = self.monitors.get(monitor_id)?.clone();
        Some(Self::run_cycle(monitor_id, &slot, time).await)
    }

    /// Evaluates every monitor concurrently, in configuration order.
    pub async fn evaluate_all(&self, time: DateTime<Utc>) -> Vec<MonitorReading> {
        let cycles = self
            .order
            .iter()
            .filter_map(|id| self.monitors.get(id).map(|slot| (id, slot)))
            .map(|(id, slot)| Self::run_cycle(id, slot, time));

        join_all(cycles).await
    }

    async fn run_cycle(monitor_id: &str, slot: &MonitorSlot, time: DateTime<Utc>) -> MonitorReading {
        let _guard = slot.cycle_lock.lock().await;

        match slot.calculator.calculate(time).await {
            Ok(report) => {
                tracing::info!(
                    monitor = monitor_id,
                    state = %report.state.kind(),
                    value = report.sample.value,
                    "Evaluated operating time"
                );
                MonitorReading::completed(monitor_id, report)
            }
            Err(e) => {
                tracing::warn!(monitor = monitor_id, error = ?e, "Operating time cycle failed, reporting 0");
                MonitorReading::failed(monitor_id, time, format!("{:#}", anyhow::Error::new(e)))
            }
        }
    }
}
