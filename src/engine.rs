use crate::history::BoundedHistory;
use crate::indicator::{Calculator, CalculatorResult};
use crate::model::Bar;

/// Drives one calculator over a bar stream.
///
/// The engine owns the history and the calculator exclusively. Bars are
/// processed synchronously, one `map` call per bar, in the order they are
/// pushed.
pub struct Engine<C> {
    calculator: C,
    history: BoundedHistory,
}

impl<C: Calculator> Engine<C> {
    pub fn new(calculator: C) -> Self {
        let history = BoundedHistory::with_max_lookback(calculator.lookback());
        Self {
            calculator,
            history,
        }
    }

    /// Process the next bar.
    ///
    /// # Panics
    ///
    /// Panics if `bar.index` does not increase over the previous bar.
    pub fn step(&mut self, bar: Bar) -> CalculatorResult {
        self.history.push(bar);
        let index = self.history.current_index();
        let bar = self.history.current();
        tracing::trace!(calculator = self.calculator.name(), index, "map");
        self.calculator.map(bar, index, &self.history)
    }

    /// Process a whole series in order, one result per bar.
    pub fn replay<I>(&mut self, bars: I) -> Vec<CalculatorResult>
    where
        I: IntoIterator<Item = Bar>,
    {
        let bars = bars.into_iter();
        let mut results = Vec::with_capacity(bars.size_hint().0);
        tracing::debug!(calculator = self.calculator.name(), "replay started");
        for bar in bars {
            results.push(self.step(bar));
        }
        tracing::debug!(
            calculator = self.calculator.name(),
            bars = results.len(),
            "replay complete"
        );
        results
    }

    pub fn calculator(&self) -> &C {
        &self.calculator
    }

    /// Number of bars processed so far.
    pub fn processed(&self) -> usize {
        self.history.total_pushed()
    }
}
