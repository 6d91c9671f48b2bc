use serde::Deserialize;
use serde_json::Value;

use crate::lenient;

/// Timestamp as delivered by a provider.
///
/// Providers disagree on encoding: plain numbers, `"12.3s"`, colon timecodes
/// (`MM:SS` / `HH:MM:SS` with optional fraction) or protobuf-style
/// `{seconds, nanos}` objects. Anything else is kept as `Other` and reads as
/// unparseable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Number(f64),
    Text(String),
    Duration {
        #[serde(default, deserialize_with = "lenient::number")]
        seconds: Option<f64>,
        #[serde(default, deserialize_with = "lenient::number")]
        nanos: Option<f64>,
    },
    Other(Value),
}

impl TimeValue {
    /// Seconds represented by this value, or `None` when it cannot be read.
    pub fn seconds(&self) -> Option<f64> {
        let parsed = match self {
            TimeValue::Number(value) => Some(*value),
            TimeValue::Text(raw) => parse_time_text(raw),
            TimeValue::Duration { seconds, nanos } => {
                Some(seconds.unwrap_or(0.0) + nanos.unwrap_or(0.0) / 1_000_000_000.0)
            }
            TimeValue::Other(_) => None,
        };
        parsed.filter(|value| value.is_finite())
    }
}

fn parse_time_text(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(stripped) = raw.strip_suffix('s')
        && let Ok(value) = stripped.trim().parse::<f64>()
    {
        return Some(value);
    }

    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }

    if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').collect();
        if (2..=3).contains(&parts.len()) {
            let mut total = 0.0;
            for part in parts {
                let value = part.trim().parse::<f64>().ok()?;
                total = total * 60.0 + value;
            }
            return Some(total);
        }
    }

    None
}
