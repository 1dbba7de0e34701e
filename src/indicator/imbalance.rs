use error_stack::{Report, bail};
use serde::Deserialize;

use crate::error::IndicatorError;
use crate::graphics::{
    Color, FillStyle, Graphics, GraphicsNode, Operator, Point, ScaleValue, Size, validate_opacity,
};
use crate::history::BoundedHistory;
use crate::indicator::{Calculator, CalculatorResult};
use crate::model::Bar;

// Candlesticks render at z-index -20; graphics at 20 or above are not drawn.
const MAX_Z_INDEX: i32 = 19;
const RECT_WIDTH: f64 = 3.0;

fn default_min_gap() -> f64 {
    2.25
}

fn default_gap_up_color() -> Color {
    Color::from_literal("#B8E986")
}

fn default_gap_down_color() -> Color {
    Color::from_literal("#D0021B")
}

fn default_opacity() -> f64 {
    40.0
}

fn default_true() -> bool {
    true
}

fn default_z_index() -> i32 {
    -30
}

/// Parameters for [`Imbalance`].
#[derive(Debug, Clone, Deserialize)]
pub struct ImbalanceConfig {
    /// Gaps smaller than this are ignored.
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
    #[serde(default = "default_gap_up_color")]
    pub gap_up_color: Color,
    #[serde(default = "default_opacity")]
    pub gap_up_opacity: f64,
    #[serde(default = "default_gap_down_color")]
    pub gap_down_color: Color,
    #[serde(default = "default_opacity")]
    pub gap_down_opacity: f64,
    #[serde(default = "default_true")]
    pub show_graphics: bool,
    #[serde(default = "default_z_index")]
    pub z_index: i32,
}

impl Default for ImbalanceConfig {
    fn default() -> Self {
        Self {
            min_gap: default_min_gap(),
            gap_up_color: default_gap_up_color(),
            gap_up_opacity: default_opacity(),
            gap_down_color: default_gap_down_color(),
            gap_down_opacity: default_opacity(),
            show_graphics: default_true(),
            z_index: default_z_index(),
        }
    }
}

impl ImbalanceConfig {
    pub fn validate(&self) -> Result<(), Report<IndicatorError>> {
        if !(self.min_gap >= 0.0) {
            bail!(IndicatorError::InvalidParameter {
                name: format!("min_gap must be >= 0, got {}", self.min_gap),
            });
        }
        validate_opacity("gap_up_opacity", self.gap_up_opacity)?;
        validate_opacity("gap_down_opacity", self.gap_down_opacity)?;
        if self.z_index > MAX_Z_INDEX {
            bail!(IndicatorError::InvalidParameter {
                name: format!("z_index must be <= {MAX_Z_INDEX}, got {}", self.z_index),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapDirection {
    Up,
    Down,
}

/// Price range left uncovered between the first and third bar of a
/// three-bar sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    pub direction: GapDirection,
    pub bottom: f64,
    pub top: f64,
}

impl Gap {
    pub fn size(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Imbalance / fair value gap detector.
///
/// Looks at three consecutive bars. A gap up is a bar whose low stays above
/// the high from two bars earlier by at least `min_gap`; a gap down is the
/// mirror image. Each gap is drawn as a rectangle, three bars wide, centred
/// on the middle bar.
pub struct Imbalance {
    config: ImbalanceConfig,
    gap_up_fill: FillStyle,
    gap_down_fill: FillStyle,
}

impl Imbalance {
    pub const VALUE: &'static str = "value";
    const LOOKBACK: usize = 2;

    pub fn new(config: ImbalanceConfig) -> Result<Self, Report<IndicatorError>> {
        config.validate()?;
        let gap_up_fill = FillStyle::new(config.gap_up_color.clone(), config.gap_up_opacity)?;
        let gap_down_fill = FillStyle::new(config.gap_down_color.clone(), config.gap_down_opacity)?;
        Ok(Self {
            config,
            gap_up_fill,
            gap_down_fill,
        })
    }

    /// Gap between `left` and `right`, if one at least `min_gap` wide exists.
    ///
    /// Gap up is checked first; both cannot hold at once since that would
    /// need `left.high < right.low <= right.high < left.low`.
    pub fn detect(&self, left: &Bar, right: &Bar) -> Option<Gap> {
        if left.high < right.low && right.low - left.high >= self.config.min_gap {
            Some(Gap {
                direction: GapDirection::Up,
                bottom: left.high,
                top: right.low,
            })
        } else if left.low > right.high && left.low - right.high >= self.config.min_gap {
            Some(Gap {
                direction: GapDirection::Down,
                bottom: right.high,
                top: left.low,
            })
        } else {
            None
        }
    }

    fn rectangle(&self, middle: &Bar, gap: &Gap) -> GraphicsNode {
        let fill = match gap.direction {
            GapDirection::Up => self.gap_up_fill.clone(),
            GapDirection::Down => self.gap_down_fill.clone(),
        };
        let position = Point {
            x: ScaleValue::op(
                ScaleValue::du(middle.index as f64),
                Operator::Sub,
                ScaleValue::du(RECT_WIDTH / 2.0),
            ),
            y: ScaleValue::du(gap.bottom),
        };
        let size = Size {
            height: ScaleValue::du(gap.size()),
            width: ScaleValue::du(RECT_WIDTH),
        };
        GraphicsNode::rectangle("rectangle", position, size, fill)
    }
}

impl Calculator for Imbalance {
    fn name(&self) -> &str {
        "imbalance"
    }

    fn lookback(&self) -> usize {
        Self::LOOKBACK
    }

    fn map(&mut self, bar: &Bar, index: usize, history: &BoundedHistory) -> CalculatorResult {
        let mut shapes = Vec::new();

        if index >= Self::LOOKBACK {
            let left = history.back(2);
            let middle = history.back(1);
            if let Some(gap) = self.detect(left, bar) {
                tracing::debug!(
                    index,
                    direction = ?gap.direction,
                    bottom = gap.bottom,
                    top = gap.top,
                    "imbalance detected"
                );
                shapes.push(self.rectangle(middle, &gap));
            }
        }

        let graphics = if self.config.show_graphics && !shapes.is_empty() {
            Graphics::from_items(vec![GraphicsNode::container(
                "container",
                shapes,
                self.config.z_index,
            )])
        } else {
            None
        };

        CalculatorResult::default()
            .with_value(Self::VALUE, None)
            .with_graphics(graphics)
    }
}
