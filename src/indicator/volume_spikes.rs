use error_stack::{Report, bail};
use serde::Deserialize;

use crate::error::IndicatorError;
use crate::graphics::Color;
use crate::history::BoundedHistory;
use crate::indicator::rolling::RollingStatistic;
use crate::indicator::{Calculator, CalculatorResult, PlotStyle};
use crate::model::Bar;

fn default_period() -> usize {
    50
}

fn default_std_dev() -> f64 {
    1.5
}

fn default_spike_color() -> Color {
    Color::from_literal("#F8E71C")
}

/// Parameters for [`VolumeSpikes`].
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeSpikesConfig {
    /// Moving average period.
    #[serde(default = "default_period")]
    pub period: usize,
    /// Standard deviations above the average that define a spike.
    #[serde(default = "default_std_dev")]
    pub std_dev: f64,
    #[serde(default = "default_spike_color")]
    pub spike_color: Color,
}

impl Default for VolumeSpikesConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            std_dev: default_std_dev(),
            spike_color: default_spike_color(),
        }
    }
}

impl VolumeSpikesConfig {
    pub fn validate(&self) -> Result<(), Report<IndicatorError>> {
        if self.period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        if !(self.std_dev >= 0.1) {
            bail!(IndicatorError::InvalidParameter {
                name: format!("std_dev must be >= 0.1, got {}", self.std_dev),
            });
        }
        Ok(())
    }
}

/// Volume histogram that highlights bars above a moving-average threshold.
///
/// The threshold sits `std_dev` standard deviations above the simple moving
/// average of volume. Reference bands are plotted at 1, 2 and 3 standard
/// deviations. All plots are emitted from the first bar; during warm-up the
/// average covers the bars seen so far.
pub struct VolumeSpikes {
    config: VolumeSpikesConfig,
    stat: RollingStatistic,
}

impl VolumeSpikes {
    pub const VOLUME: &'static str = "volume";
    pub const THRESHOLD: &'static str = "threshold";
    pub const SMA: &'static str = "sma";
    pub const BAND1: &'static str = "band1";
    pub const BAND2: &'static str = "band2";
    pub const BAND3: &'static str = "band3";

    pub fn new(config: VolumeSpikesConfig) -> Result<Self, Report<IndicatorError>> {
        config.validate()?;
        let stat = RollingStatistic::new(config.period)?;
        Ok(Self { config, stat })
    }
}

impl Calculator for VolumeSpikes {
    fn name(&self) -> &str {
        "volume_spikes"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn map(&mut self, bar: &Bar, index: usize, _history: &BoundedHistory) -> CalculatorResult {
        let std_dev = self.stat.update(bar.volume);
        let sma = self.stat.mean();
        let threshold = sma + std_dev * self.config.std_dev;

        let mut result = CalculatorResult::default()
            .with_value(Self::VOLUME, Some(bar.volume))
            .with_value(Self::THRESHOLD, Some(threshold))
            .with_value(Self::SMA, Some(sma))
            .with_value(Self::BAND1, Some(sma + std_dev))
            .with_value(Self::BAND2, Some(sma + std_dev * 2.0))
            .with_value(Self::BAND3, Some(sma + std_dev * 3.0));

        if bar.volume > threshold {
            tracing::debug!(index, volume = bar.volume, threshold, "volume spike");
            result = result.with_style(
                Self::VOLUME,
                PlotStyle {
                    color: self.config.spike_color.clone(),
                },
            );
        }

        result
    }
}
