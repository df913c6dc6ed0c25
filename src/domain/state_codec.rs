// Persisted record codec: "<VariantName>:<previousValue>:<lastTimestampTicks>"
use super::time_state::{StateKind, TimeState};
use super::timestamp::Timestamp;
use thiserror::Error;

const SEPARATOR: char = ':';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no persisted record")]
    Empty,
    #[error("expected 3 fields in persisted record, found {0}")]
    FieldCount(usize),
    #[error("unknown state name '{0}' in persisted record")]
    UnknownState(String),
}

/// Encodes a state into its persisted record.
pub fn encode(state: &TimeState) -> String {
    format!(
        "{}:{}:{}",
        state.kind().record_name(),
        state.previous_value(),
        state.last_timestamp().ticks()
    )
}

/// Strict parse. Unparseable numeric fields still fall back per field: the
/// value to `0`, the timestamp to [`Timestamp::UNSET`].
pub fn parse(record: &str) -> Result<TimeState, DecodeError> {
    if record.is_empty() {
        return Err(DecodeError::Empty);
    }

    let fields: Vec<&str> = record.split(SEPARATOR).collect();
    if fields.len() != 3 {
        return Err(DecodeError::FieldCount(fields.len()));
    }

    let kind = StateKind::from_record_name(fields[0])
        .ok_or_else(|| DecodeError::UnknownState(fields[0].to_string()))?;
    let previous_value = parse_value(fields[1]);
    let last_timestamp = parse_ticks(fields[2]);

    Ok(match kind {
        StateKind::Reset => TimeState::Reset { last_timestamp },
        StateKind::Operating => TimeState::Operating {
            previous_value,
            last_timestamp,
        },
        StateKind::Holding => TimeState::Holding {
            previous_value,
            last_timestamp,
        },
    })
}

/// Decodes the latest persisted record, substituting the default reset
/// state when there is none or it cannot be read.
pub fn decode(record: Option<&str>) -> TimeState {
    let Some(record) = record else {
        return TimeState::default();
    };

    match parse(record) {
        Ok(state) => state,
        Err(DecodeError::Empty) => TimeState::default(),
        Err(e) => {
            tracing::warn!(record, error = %e, "Discarding persisted state, starting from Reset");
            TimeState::default()
        }
    }
}

fn parse_value(field: &str) -> f64 {
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => value,
        _ => 0.0,
    }
}

fn parse_ticks(field: &str) -> Timestamp {
    match field.trim().parse::<i64>() {
        Ok(ticks) if ticks >= 0 => Timestamp::from_ticks(ticks),
        _ => Timestamp::UNSET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_formats() {
        let state = TimeState::Holding {
            previous_value: 100.0,
            last_timestamp: Timestamp::from_ticks(638_000_000_000_000_000),
        };
        assert_eq!(encode(&state), "Hold:100:638000000000000000");

        let state = TimeState::Operating {
            previous_value: 0.25,
            last_timestamp: Timestamp::from_ticks(42),
        };
        assert_eq!(encode(&state), "Operating:0.25:42");

        assert_eq!(encode(&TimeState::default()), "Reset:0:0");
    }

    #[test]
    fn test_round_trip() {
        let states = [
            TimeState::default(),
            TimeState::Reset {
                last_timestamp: Timestamp::from_ticks(638_400_000_000_000_123),
            },
            TimeState::Operating {
                previous_value: 1.0 / 3.0,
                last_timestamp: Timestamp::from_ticks(638_400_000_000_000_000),
            },
            TimeState::Holding {
                previous_value: 12_345.678_9,
                last_timestamp: Timestamp::UNSET,
            },
        ];
        for state in states {
            assert_eq!(parse(&encode(&state)), Ok(state));
        }
    }

    #[test]
    fn test_garbage_decodes_to_default() {
        assert_eq!(parse("garbage"), Err(DecodeError::FieldCount(1)));
        assert_eq!(decode(Some("garbage")), TimeState::default());
        assert_eq!(decode(Some("")), TimeState::default());
        assert_eq!(decode(None), TimeState::default());
    }

    #[test]
    fn test_unknown_state_and_extra_fields() {
        assert_eq!(
            parse("Holding:1:2"),
            Err(DecodeError::UnknownState("Holding".to_string()))
        );
        assert_eq!(parse("Hold:1:2:3"), Err(DecodeError::FieldCount(4)));
        assert_eq!(decode(Some("Hold:1:2:3")), TimeState::default());
    }

    #[test]
    fn test_bad_numeric_fields_default_per_field() {
        assert_eq!(
            decode(Some("Hold:abc:500")),
            TimeState::Holding {
                previous_value: 0.0,
                last_timestamp: Timestamp::from_ticks(500)
            }
        );
        assert_eq!(
            decode(Some("Operating:7.5:soon")),
            TimeState::Operating {
                previous_value: 7.5,
                last_timestamp: Timestamp::UNSET
            }
        );
        assert_eq!(
            decode(Some("Operating:-4:-9")),
            TimeState::Operating {
                previous_value: 0.0,
                last_timestamp: Timestamp::UNSET
            }
        );
    }

    #[test]
    fn test_reset_ignores_stored_value() {
        assert_eq!(
            decode(Some("Reset:55:900")),
            TimeState::Reset {
                last_timestamp: Timestamp::from_ticks(900)
            }
        );
    }

    #[test]
    fn test_accepts_exponent_values() {
        assert_eq!(
            decode(Some("Hold:1E-05:10")),
            TimeState::Holding {
                previous_value: 0.00001,
                last_timestamp: Timestamp::from_ticks(10)
            }
        );
    }
}
