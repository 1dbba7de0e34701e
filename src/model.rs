use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One time step of OHLCV data.
///
/// `index` is the bar's sequence position in the host's series. Bars are
/// produced by the host and never mutated by a calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}


#[cfg(test)]
mod tests {
    use super::test_support::bar;
    use super::*;

    #[test]
    fn bar_serde_round_trip() {
        let b = bar(3, 1.0, 2.0, 0.5, 1.5, 42.0);
        let json = serde_json::to_string(&b).unwrap();
        let parsed: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, b);
    }

    #[test]
    fn bar_timestamp_parses_rfc3339() {
        let json = r#"{"index":0,"timestamp":"2024-03-01T09:30:00Z","open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":10.0}"#;
        let parsed: Bar = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp.to_rfc3339(), "2024-03-01T09:30:00+00:00");
    }
}
