//! Declarative, renderer-agnostic chart annotations.
//!
//! Calculators build these values and hand them to the host; nothing here
//! draws or holds chart state.

use std::fmt;

use error_stack::{Report, bail};
use serde::{Deserialize, Serialize};

use crate::error::IndicatorError;

/// A `#RGB` or `#RRGGBB` hex color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn parse(value: &str) -> Result<Self, Report<IndicatorError>> {
        let digits = match value.strip_prefix('#') {
            Some(d) => d,
            None => bail!(IndicatorError::InvalidColor {
                value: value.to_string(),
            }),
        };
        if !matches!(digits.len(), 3 | 6) || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!(IndicatorError::InvalidColor {
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_ascii_uppercase()))
    }

    /// Color from a hex literal known to be well formed, for defaults.
    pub(crate) fn from_literal(value: &'static str) -> Self {
        debug_assert!(Self::parse(value).is_ok(), "malformed color literal {value}");
        Self(value.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Color {
    type Error = IndicatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|_| IndicatorError::InvalidColor { value })
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

/// A coordinate or length on the chart.
///
/// `Du` is a value in chart data units: bar index on the x axis, price on the
/// y axis. `Op` combines two values so the renderer can resolve mixed
/// expressions such as "bar index minus one and a half bars".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag")]
pub enum ScaleValue {
    Du { value: f64 },
    Op {
        a: Box<ScaleValue>,
        op: Operator,
        b: Box<ScaleValue>,
    },
}

impl ScaleValue {
    pub fn du(value: f64) -> Self {
        Self::Du { value }
    }

    pub fn op(a: ScaleValue, op: Operator, b: ScaleValue) -> Self {
        Self::Op {
            a: Box::new(a),
            op,
            b: Box::new(b),
        }
    }

    /// Evaluate to a plain data-unit value.
    pub fn resolve(&self) -> f64 {
        match self {
            Self::Du { value } => *value,
            Self::Op { a, op, b } => {
                let (a, b) = (a.resolve(), b.resolve());
                match op {
                    Operator::Add => a + b,
                    Operator::Sub => a - b,
                    Operator::Mul => a * b,
                    Operator::Div => a / b,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: ScaleValue,
    pub y: ScaleValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Size {
    pub height: ScaleValue,
    pub width: ScaleValue,
}

/// Fill color plus opacity in percent (0-100).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillStyle {
    pub color: Color,
    pub opacity: f64,
}

impl FillStyle {
    pub fn new(color: Color, opacity: f64) -> Result<Self, Report<IndicatorError>> {
        validate_opacity("opacity", opacity)?;
        Ok(Self { color, opacity })
    }
}

/// Rejects opacities outside 0-100 percent; `name` identifies the parameter.
pub fn validate_opacity(name: &str, opacity: f64) -> Result<(), Report<IndicatorError>> {
    if !(0.0..=100.0).contains(&opacity) {
        bail!(IndicatorError::InvalidParameter {
            name: format!("{name} must be within 0..=100, got {opacity}"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag")]
pub enum Primitive {
    /// `position` is the bottom-left corner.
    Rectangle { position: Point, size: Size },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "tag")]
pub enum TransformOp {
    ZIndex {
        #[serde(rename = "zIndex")]
        z_index: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tag")]
pub enum GraphicsNode {
    Container {
        key: String,
        children: Vec<GraphicsNode>,
        #[serde(rename = "transformOps")]
        transform_ops: Vec<TransformOp>,
    },
    Shapes {
        key: String,
        primitives: Vec<Primitive>,
        #[serde(rename = "fillStyle")]
        fill_style: FillStyle,
    },
}

impl GraphicsNode {
    /// A `Shapes` node holding a single rectangle.
    pub fn rectangle(key: impl Into<String>, position: Point, size: Size, fill: FillStyle) -> Self {
        Self::Shapes {
            key: key.into(),
            primitives: vec![Primitive::Rectangle { position, size }],
            fill_style: fill,
        }
    }

    pub fn container(key: impl Into<String>, children: Vec<GraphicsNode>, z_index: i32) -> Self {
        Self::Container {
            key: key.into(),
            children,
            transform_ops: vec![TransformOp::ZIndex { z_index }],
        }
    }
}

/// Top-level graphics for one bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graphics {
    pub items: Vec<GraphicsNode>,
}

impl Graphics {
    /// `None` when there is nothing to render.
    pub fn from_items(items: Vec<GraphicsNode>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self { items })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_accepts_short_and_long_hex() {
        assert_eq!(Color::parse("#b8e986").unwrap().as_str(), "#B8E986");
        assert_eq!(Color::parse("#fff").unwrap().as_str(), "#FFF");
    }

    #[test]
    fn color_rejects_malformed_values() {
        assert!(Color::parse("B8E986").is_err());
        assert!(Color::parse("#B8E98").is_err());
        assert!(Color::parse("#GGGGGG").is_err());
        assert!(Color::parse("").is_err());
    }

    #[test]
    fn color_deserialize_validates() {
        let ok: Result<Color, _> = serde_json::from_str("\"#D0021B\"");
        assert!(ok.is_ok());
        let bad: Result<Color, _> = serde_json::from_str("\"red\"");
        assert!(bad.is_err());
    }

    #[test]
    fn fill_style_rejects_out_of_range_opacity() {
        let color = Color::parse("#000000").unwrap();
        assert!(FillStyle::new(color.clone(), -1.0).is_err());
        assert!(FillStyle::new(color.clone(), 100.5).is_err());
        assert!(FillStyle::new(color.clone(), 0.0).is_ok());
        assert!(FillStyle::new(color, 100.0).is_ok());
    }

    #[test]
    fn scale_value_resolves_operator_tree() {
        let x = ScaleValue::op(ScaleValue::du(10.0), Operator::Sub, ScaleValue::du(1.5));
        assert!((x.resolve() - 8.5).abs() < 1e-12);
        let nested = ScaleValue::op(x, Operator::Mul, ScaleValue::du(2.0));
        assert!((nested.resolve() - 17.0).abs() < 1e-12);
    }

    #[test]
    fn empty_items_render_nothing() {
        assert!(Graphics::from_items(Vec::new()).is_none());
    }

    #[test]
    fn nodes_serialize_with_tags() {
        let fill = FillStyle::new(Color::parse("#B8E986").unwrap(), 40.0).unwrap();
        let rect = GraphicsNode::rectangle(
            "rectangle",
            Point {
                x: ScaleValue::du(1.0),
                y: ScaleValue::du(2.0),
            },
            Size {
                height: ScaleValue::du(3.0),
                width: ScaleValue::du(3.0),
            },
            fill,
        );
        let node = GraphicsNode::container("container", vec![rect], -30);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["tag"], "Container");
        assert_eq!(json["transformOps"][0]["tag"], "ZIndex");
        assert_eq!(json["transformOps"][0]["zIndex"], -30);
        assert_eq!(json["children"][0]["tag"], "Shapes");
        assert_eq!(json["children"][0]["fillStyle"]["color"], "#B8E986");
        assert_eq!(json["children"][0]["primitives"][0]["tag"], "Rectangle");
    }
}
