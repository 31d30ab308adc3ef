//! Geometry primitives shared by styles, measurement and layout results.
//!
//! Unset axes are `None` throughout the object model. The engine boundary
//! encodes the same state as NaN; [`option_to_nan`] and [`nan_to_option`]
//! convert between the two and are the only place that convention lives.

use serde::{Deserialize, Serialize};

/// Unit tag of a [`DimensionValue`].
///
/// The discriminants are the engine's dimension tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionUnit {
    Points = 0,
    Percent = 1,
    Auto = 2,
    Undefined = 3,
}

/// A length-like style quantity.
///
/// `value` only carries meaning for [`DimensionUnit::Points`] and
/// [`DimensionUnit::Percent`]; percentages are fractions, so `0.5` is half of
/// the containing block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionValue {
    pub unit: DimensionUnit,
    pub value: f32,
}

impl DimensionValue {
    pub const AUTO: DimensionValue = DimensionValue {
        unit: DimensionUnit::Auto,
        value: 0.0,
    };

    pub const UNDEFINED: DimensionValue = DimensionValue {
        unit: DimensionUnit::Undefined,
        value: 0.0,
    };

    pub const fn points(value: f32) -> Self {
        Self {
            unit: DimensionUnit::Points,
            value,
        }
    }

    pub const fn percent(value: f32) -> Self {
        Self {
            unit: DimensionUnit::Percent,
            value,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self.unit, DimensionUnit::Points | DimensionUnit::Percent)
    }
}

impl Default for DimensionValue {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

/// Two-axis quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub const fn new(width: T, height: T) -> Self {
        Self { width, height }
    }

    pub fn map<R, F>(self, f: F) -> Size<R>
    where
        F: Fn(T) -> R,
    {
        Size {
            width: f(self.width),
            height: f(self.height),
        }
    }
}

impl Size<Option<f32>> {
    /// Both axes unset: size to content and constraints.
    pub const UNDEFINED: Size<Option<f32>> = Size {
        width: None,
        height: None,
    };

    /// Encodes unset axes as NaN for the engine boundary.
    pub fn to_nan(self) -> Size<f32> {
        self.map(option_to_nan)
    }
}

impl Size<f32> {
    pub const ZERO: Size<f32> = Size {
        width: 0.0,
        height: 0.0,
    };

    /// Decodes NaN axes from the engine boundary into unset axes.
    pub fn from_nan(self) -> Size<Option<f32>> {
        self.map(nan_to_option)
    }

    pub fn has_nan(&self) -> bool {
        self.width.is_nan() || self.height.is_nan()
    }
}

impl Size<DimensionValue> {
    pub const AUTO: Size<DimensionValue> = Size {
        width: DimensionValue::AUTO,
        height: DimensionValue::AUTO,
    };

    pub const fn points(width: f32, height: f32) -> Self {
        Self {
            width: DimensionValue::points(width),
            height: DimensionValue::points(height),
        }
    }
}

/// Four-sided quantity keyed by logical edges.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect<T> {
    pub start: T,
    pub end: T,
    pub top: T,
    pub bottom: T,
}

impl<T> Rect<T> {
    pub const fn new(start: T, end: T, top: T, bottom: T) -> Self {
        Self {
            start,
            end,
            top,
            bottom,
        }
    }

    pub fn map<R, F>(self, f: F) -> Rect<R>
    where
        F: Fn(T) -> R,
    {
        Rect {
            start: f(self.start),
            end: f(self.end),
            top: f(self.top),
            bottom: f(self.bottom),
        }
    }
}

impl<T: Copy> Rect<T> {
    pub const fn uniform(value: T) -> Self {
        Self {
            start: value,
            end: value,
            top: value,
            bottom: value,
        }
    }
}

impl Rect<DimensionValue> {
    pub const UNDEFINED: Rect<DimensionValue> = Rect::uniform(DimensionValue::UNDEFINED);
}

/// Position relative to the parent box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl Point<f32> {
    pub const ZERO: Point<f32> = Point { x: 0.0, y: 0.0 };
}

pub fn option_to_nan(value: Option<f32>) -> f32 {
    value.unwrap_or(f32::NAN)
}

pub fn nan_to_option(value: f32) -> Option<f32> {
    if value.is_nan() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_axes_cross_the_boundary_as_nan() {
        let available = Size::new(Some(320.0), None);
        let raw = available.to_nan();
        assert_eq!(raw.width, 320.0);
        assert!(raw.height.is_nan());
        assert_eq!(raw.from_nan(), available);
    }

    #[test]
    fn reserved_dimensions_carry_zero_values() {
        assert_eq!(DimensionValue::AUTO.value, 0.0);
        assert_eq!(DimensionValue::UNDEFINED.value, 0.0);
        assert!(!DimensionValue::AUTO.is_defined());
        assert!(DimensionValue::percent(0.5).is_defined());
        assert_eq!(DimensionValue::default(), DimensionValue::UNDEFINED);
    }

    #[test]
    fn dimension_tags_match_engine_order() {
        assert_eq!(DimensionUnit::Points as i32, 0);
        assert_eq!(DimensionUnit::Percent as i32, 1);
        assert_eq!(DimensionUnit::Auto as i32, 2);
        assert_eq!(DimensionUnit::Undefined as i32, 3);
    }

    #[test]
    fn rect_map_touches_every_edge() {
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0).map(|v: f32| v * 10.0);
        assert_eq!(rect, Rect::new(10.0, 20.0, 30.0, 40.0));
    }
}
