use std::collections::VecDeque;

use error_stack::{Report, bail};

use crate::error::IndicatorError;

// Upper bound on buffer pre-allocation; larger windows grow as samples arrive.
const MAX_PREALLOC: usize = 1024;

/// Rolling mean and population standard deviation over the last `period`
/// samples, updated in O(1) per sample.
///
/// Until `period` samples have been seen the statistics cover the partial
/// window, the way a simple moving average warms up. Accumulators follow
/// Welford's method with sliding-window removal. Once every `period`
/// evictions the accumulators are rebased from the buffer, which bounds
/// rounding drift while keeping the amortized cost O(1).
#[derive(Debug, Clone)]
pub struct RollingStatistic {
    period: usize,
    window: VecDeque<f64>,
    mean: f64,
    // Sum of squared deviations from the mean.
    m2: f64,
    evictions: usize,
}

impl RollingStatistic {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            window: VecDeque::with_capacity(period.min(MAX_PREALLOC)),
            mean: 0.0,
            m2: 0.0,
            evictions: 0,
        })
    }

    /// Add `sample` as the newest observation and return the population
    /// standard deviation of the resulting window.
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.window.len() == self.period {
            let evicted = self.window.pop_front().unwrap_or(sample);
            self.window.push_back(sample);
            self.evictions += 1;
            if self.evictions >= self.period {
                self.rebase();
            } else {
                let n = self.period as f64;
                let old_mean = self.mean;
                self.mean += (sample - evicted) / n;
                self.m2 += (sample - evicted) * (sample - self.mean + evicted - old_mean);
            }
        } else {
            self.window.push_back(sample);
            let n = self.window.len() as f64;
            let delta = sample - self.mean;
            self.mean += delta / n;
            self.m2 += delta * (sample - self.mean);
        }

        if self.m2 < 0.0 {
            self.m2 = 0.0;
        }
        self.std_dev()
    }

    fn rebase(&mut self) {
        let n = self.window.len() as f64;
        self.mean = self.window.iter().sum::<f64>() / n;
        self.m2 = self.window.iter().map(|&x| (x - self.mean).powi(2)).sum();
        self.evictions = 0;
    }

    /// Arithmetic mean of the current window, 0 before any sample.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance of the current window.
    pub fn variance(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.m2 / self.window.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Number of samples in the window, `min(count, period)`.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// True once the window holds a full `period` of samples.
    pub fn is_warm(&self) -> bool {
        self.window.len() == self.period
    }
}
