use std::collections::VecDeque;

use crate::model::Bar;

const MAX_PREALLOC: usize = 1024;

/// Sliding window over the bars pushed so far.
///
/// `back(k)` returns the bar that was current exactly `k` pushes ago. When a
/// maximum lookback is declared, only the current bar and the `max_lookback`
/// bars before it are retained; older bars are evicted.
///
/// A calculator receives `&BoundedHistory` for the duration of one `map` call
/// and must not hold on to it afterwards.
#[derive(Debug, Clone, Default)]
pub struct BoundedHistory {
    bars: VecDeque<Bar>,
    max_lookback: Option<usize>,
    pushed: usize,
}

impl BoundedHistory {
    /// Unbounded history: every pushed bar is retained.
    pub fn new() -> Self {
        Self::default()
    }

    /// History that keeps the current bar plus `max_lookback` prior bars.
    ///
    /// `usize::MAX` retains every bar.
    pub fn with_max_lookback(max_lookback: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(max_lookback.saturating_add(1).min(MAX_PREALLOC)),
            max_lookback: Some(max_lookback),
            pushed: 0,
        }
    }

    /// Append `bar` and make it the current bar.
    ///
    /// # Panics
    ///
    /// Panics if `bar.index` does not strictly increase over the previously
    /// pushed bar.
    pub fn push(&mut self, bar: Bar) {
        if let Some(last) = self.bars.back() {
            assert!(
                bar.index > last.index,
                "bar index must strictly increase: got {} after {}",
                bar.index,
                last.index
            );
        }
        self.bars.push_back(bar);
        self.pushed += 1;

        if let Some(max) = self.max_lookback {
            while self.bars.len() > max.saturating_add(1) {
                self.bars.pop_front();
            }
        }
    }

    /// The most recently pushed bar.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been pushed yet.
    pub fn current(&self) -> &Bar {
        self.bars
            .back()
            .expect("current() called on an empty history")
    }

    /// Running index of the current bar (pushes so far minus one).
    ///
    /// # Panics
    ///
    /// Panics if nothing has been pushed yet.
    pub fn current_index(&self) -> usize {
        assert!(self.pushed > 0, "current_index() called on an empty history");
        self.pushed - 1
    }

    /// The bar `k` pushes before the current one.
    ///
    /// Callers guard with `index >= k` first; calling this out of range is a
    /// contract violation.
    ///
    /// # Panics
    ///
    /// Panics if `k == 0`, if fewer than `k` bars precede the current one, or
    /// if `k` exceeds the declared maximum lookback.
    pub fn back(&self, k: usize) -> &Bar {
        match self.get_back(k) {
            Some(bar) => bar,
            None => panic!(
                "back({k}) out of range: {} bar(s) precede the current one",
                self.pushed.saturating_sub(1)
            ),
        }
    }

    /// Non-panicking form of [`back`](Self::back).
    pub fn get_back(&self, k: usize) -> Option<&Bar> {
        if k == 0 || k >= self.bars.len() {
            return None;
        }
        self.bars.get(self.bars.len() - 1 - k)
    }

    /// Number of bars currently retained (current bar included).
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Total number of bars ever pushed, including evicted ones.
    pub fn total_pushed(&self) -> usize {
        self.pushed
    }

    pub fn max_lookback(&self) -> Option<usize> {
        self.max_lookback
    }
}
