pub mod imbalance;
pub mod rolling;
pub mod volume_spikes;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graphics::{Color, Graphics};
use crate::history::BoundedHistory;
use crate::model::Bar;

/// A streaming indicator evaluated one bar at a time.
///
/// Construction takes the calculator's validated configuration and builds any
/// rolling state it needs. `map` is then called exactly once per bar, in
/// strictly increasing `index` order, and never again for an index already
/// seen.
pub trait Calculator: Send {
    /// Unique name of this calculator (e.g., "imbalance").
    fn name(&self) -> &str;

    /// Maximum number of prior bars `map` reads through `history.back(k)`.
    fn lookback(&self) -> usize;

    /// Compute the result for `bar`.
    ///
    /// `history.current()` is `bar`, and `history` is only valid for the
    /// duration of this call. Any read of `history.back(k)` must be guarded by
    /// `index >= k`; when the guard fails the calculator returns absent values
    /// and no graphics.
    fn map(&mut self, bar: &Bar, index: usize, history: &BoundedHistory) -> CalculatorResult;
}

/// Per-plot style override.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotStyle {
    pub color: Color,
}

/// Output of one `map` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculatorResult {
    /// Plot name to value; `None` marks the value absent for this bar.
    pub values: BTreeMap<&'static str, Option<f64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<&'static str, PlotStyle>,
    /// `None` means render nothing for this bar; it never clears earlier
    /// graphics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphics: Option<Graphics>,
}

impl CalculatorResult {
    pub fn with_value(mut self, plot: &'static str, value: Option<f64>) -> Self {
        self.values.insert(plot, value);
        self
    }

    pub fn with_style(mut self, plot: &'static str, style: PlotStyle) -> Self {
        self.style.insert(plot, style);
        self
    }

    pub fn with_graphics(mut self, graphics: Option<Graphics>) -> Self {
        self.graphics = graphics;
        self
    }

    /// Value of `plot`, `None` when the plot is absent or has no value.
    pub fn value(&self, plot: &str) -> Option<f64> {
        self.values.get(plot).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_serializes_as_null() {
        let result = CalculatorResult::default().with_value("value", None);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"values":{"value":null}}"#);
    }

    #[test]
    fn value_lookup_flattens_absent() {
        let result = CalculatorResult::default()
            .with_value("a", Some(1.5))
            .with_value("b", None);
        assert_eq!(result.value("a"), Some(1.5));
        assert_eq!(result.value("b"), None);
        assert_eq!(result.value("missing"), None);
    }

    #[test]
    fn style_serialized_when_present() {
        let style = PlotStyle {
            color: Color::parse("#F8E71C").unwrap(),
        };
        let result = CalculatorResult::default()
            .with_value("volume", Some(10.0))
            .with_style("volume", style);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["style"]["volume"]["color"], "#F8E71C");
    }
}
