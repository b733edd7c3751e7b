pub mod native;
pub mod report;

use report::Measurement;
use serde_json::json;

pub const EMPTY_PAYLOAD: &str = "{}";

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTestResult {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub payload: String,
}

impl Default for SpeedTestResult {
    fn default() -> Self {
        Self {
            download_mbps: 0.0,
            upload_mbps: 0.0,
            payload: EMPTY_PAYLOAD.to_string(),
        }
    }
}

impl SpeedTestResult {
    fn errored(message: &str) -> Self {
        Self {
            payload: json!({ "error": message }).to_string(),
            ..Self::default()
        }
    }
}

/// What a single run of the speed-test binary produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Measured(Measurement),
    /// Non-zero exit. `code` is `None` when the process was killed by a signal.
    BinaryFailed { code: Option<i32>, stderr: String },
    /// Launch failure or unusable output.
    Errored(String),
}

impl From<ProbeOutcome> for SpeedTestResult {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Measured(m) => match serde_json::to_string(&m.payload()) {
                Ok(payload) => Self {
                    download_mbps: m.download_mbps(),
                    upload_mbps: m.upload_mbps(),
                    payload,
                },
                Err(e) => Self::errored(&e.to_string()),
            },
            ProbeOutcome::BinaryFailed { .. } => Self::default(),
            ProbeOutcome::Errored(message) => Self::errored(&message),
        }
    }
}

/// Bytes per second to megabits per second, rounded to two decimals.
pub fn bytes_per_sec_to_mbps(bandwidth: f64) -> f64 {
    round2(bandwidth * 8.0 / 1_000_000.0)
}

// Decimal rounding of the exact binary value, exact ties going to the even
// digit: 0.125 rounds to 0.12, 0.135 (stored just above) to 0.14.
fn round2(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}
