//! Boundary to the layout engine.
//!
//! The object model never talks to a flexbox implementation directly. It
//! speaks the narrow [`Engine`] protocol below: plain enum indices, tagged
//! dimensions, NaN for unset axes, generational handles, and a flat `f32`
//! buffer for results. [`TaffyEngine`] is the bundled implementation.

mod handle;
mod taffy_engine;

use crate::error::{LayoutError, Result};
use crate::geometry::{DimensionUnit, DimensionValue, Rect, Size};

pub(crate) use handle::Arena;
pub use handle::{NodeHandle, StyleHandle};
pub use taffy_engine::TaffyEngine;

/// Size record exchanged with measure callbacks. NaN marks an unset axis.
pub type RawSize = Size<f32>;

/// Engine-side form of a [`DimensionValue`]: `dim` is the unit tag
/// (Points=0, Percent=1, Auto=2, Undefined=3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineDimension {
    pub dim: i32,
    pub value: f32,
}

impl EngineDimension {
    pub fn to_dimension(self) -> Result<DimensionValue> {
        let unit = match self.dim {
            0 => DimensionUnit::Points,
            1 => DimensionUnit::Percent,
            2 => DimensionUnit::Auto,
            3 => DimensionUnit::Undefined,
            n => return Err(LayoutError::InvalidDimension(n)),
        };
        Ok(DimensionValue {
            unit,
            value: self.value,
        })
    }
}

impl From<DimensionValue> for EngineDimension {
    fn from(value: DimensionValue) -> Self {
        Self {
            dim: value.unit as i32,
            value: value.value,
        }
    }
}

/// The converted property set handed to [`Engine::create_style`].
///
/// Enum fields are the indices from the style enum tables; `aspect_ratio` is
/// NaN when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStyle {
    pub display: i32,
    pub position_type: i32,
    pub direction: i32,
    pub flex_direction: i32,
    pub flex_wrap: i32,
    pub overflow: i32,
    pub align_items: i32,
    pub align_self: i32,
    pub align_content: i32,
    pub justify_content: i32,

    pub position: Rect<EngineDimension>,
    pub margin: Rect<EngineDimension>,
    pub padding: Rect<EngineDimension>,
    pub border: Rect<EngineDimension>,

    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: EngineDimension,

    pub size: Size<EngineDimension>,
    pub min_size: Size<EngineDimension>,
    pub max_size: Size<EngineDimension>,

    pub aspect_ratio: f32,
}

/// Callback the engine invokes to size a leaf's content.
///
/// `node` is the handle the engine is laying out; `width`/`height` are NaN
/// when the axis is unconstrained. The returned size must not contain NaN.
pub trait MeasureCallback {
    fn call(&self, node: NodeHandle, width: f32, height: f32) -> Result<RawSize>;
}

/// Minimal contract the object model depends on.
///
/// `&mut self` plays the role of the engine handle: every node and style
/// handle is only valid against the engine instance that issued it.
pub trait Engine {
    fn create_style(&mut self, style: &EngineStyle) -> Result<StyleHandle>;
    fn free_style(&mut self, style: StyleHandle) -> Result<()>;

    fn create_node(&mut self, style: StyleHandle) -> Result<NodeHandle>;
    fn free_node(&mut self, node: NodeHandle) -> Result<()>;
    fn set_style(&mut self, node: NodeHandle, style: StyleHandle) -> Result<()>;

    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()>;
    /// Swaps the child at `index` for `child` in one step and returns the
    /// previous occupant.
    fn replace_child_at_index(
        &mut self,
        parent: NodeHandle,
        index: usize,
        child: NodeHandle,
    ) -> Result<NodeHandle>;
    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<NodeHandle>;
    fn remove_child_at_index(&mut self, parent: NodeHandle, index: usize) -> Result<NodeHandle>;

    /// Installs (or with `None`, removes) the measure callback of `node`.
    fn set_measure(
        &mut self,
        node: NodeHandle,
        callback: Option<Box<dyn MeasureCallback>>,
    ) -> Result<()>;

    fn is_dirty(&self, node: NodeHandle) -> Result<bool>;
    fn mark_dirty(&mut self, node: NodeHandle) -> Result<()>;

    /// Lays out the tree rooted at `node` and serializes it pre-order, five
    /// values per node: `x, y, width, height, child_count`.
    fn compute_layout(&mut self, node: NodeHandle, width: f32, height: f32) -> Result<Vec<f32>>;

    /// Number of live node handles.
    fn node_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_tags_survive_the_boundary() {
        for value in [
            DimensionValue::points(12.0),
            DimensionValue::percent(0.25),
            DimensionValue::AUTO,
            DimensionValue::UNDEFINED,
        ] {
            let raw = EngineDimension::from(value);
            assert_eq!(raw.to_dimension().unwrap(), value);
        }
    }

    #[test]
    fn unknown_dimension_tag_is_rejected() {
        let raw = EngineDimension { dim: 7, value: 1.0 };
        assert!(matches!(
            raw.to_dimension(),
            Err(LayoutError::InvalidDimension(7))
        ));
    }
}
