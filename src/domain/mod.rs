// Domain layer - Samples, the operating-time state machine and its record codec
pub mod sample;
pub mod state_codec;
pub mod time_state;
pub mod time_unit;
pub mod timestamp;

pub use sample::{ComputedSample, ConditionSample, Quality, Sample, SampleType, SampleValue, UpdateMode};
pub use time_state::{StateKind, TimeRules, TimeState};
pub use time_unit::CalculationUnit;
pub use timestamp::Timestamp;
