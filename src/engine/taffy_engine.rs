//! [`Engine`] implementation backed by the `taffy` flexbox solver.

use std::collections::HashMap;
use std::fmt;

use taffy::geometry::{Point, Rect as TaffyRect, Size as TaffySize};
use taffy::style::{
    AlignContent, AlignItems, AlignSelf, AvailableSpace, Dimension, Display, FlexDirection,
    FlexWrap, JustifyContent, LengthPercentage, LengthPercentageAuto, Overflow, Position, Style,
};
use taffy::tree::{NodeId, TaffyError, TaffyTree};

use crate::error::{HandleKind, LayoutError, Result};
use crate::geometry::{DimensionUnit, Rect, option_to_nan};

use super::{Arena, Engine, EngineDimension, EngineStyle, MeasureCallback, NodeHandle, StyleHandle};

type NodeContext = Box<dyn MeasureCallback>;

/// Engine that owns a `TaffyTree` plus the handle arenas the object model
/// addresses it through.
pub struct TaffyEngine {
    tree: TaffyTree<NodeContext>,
    styles: Arena<Style>,
    nodes: Arena<NodeId>,
    handles: HashMap<NodeId, NodeHandle>,
}

impl Default for TaffyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaffyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaffyEngine")
            .field("styles", &self.styles.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl TaffyEngine {
    pub fn new() -> Self {
        Self {
            tree: TaffyTree::new(),
            styles: Arena::new(),
            nodes: Arena::new(),
            handles: HashMap::new(),
        }
    }

    /// Controls whether computed geometry is snapped to whole pixels.
    pub fn with_rounding(mut self, enabled: bool) -> Self {
        if enabled {
            self.tree.enable_rounding();
        } else {
            self.tree.disable_rounding();
        }
        self
    }

    pub fn style_count(&self) -> usize {
        self.styles.len()
    }

    fn node_id(&self, node: NodeHandle) -> Result<NodeId> {
        self.nodes
            .get(node.0)
            .copied()
            .ok_or_else(|| LayoutError::stale_node(node))
    }

    fn style(&self, style: StyleHandle) -> Result<&Style> {
        self.styles
            .get(style.0)
            .ok_or_else(|| LayoutError::stale_style(style))
    }

    fn handle_of(&self, id: NodeId) -> Result<NodeHandle> {
        self.handles
            .get(&id)
            .copied()
            .ok_or_else(|| LayoutError::Engine(format!("untracked engine node {id:?}")))
    }

    fn write_output(&self, id: NodeId, output: &mut Vec<f32>) -> Result<()> {
        let layout = self.tree.layout(id).map_err(engine_error)?;
        let children = self.tree.children(id).map_err(engine_error)?;

        output.push(layout.location.x);
        output.push(layout.location.y);
        output.push(layout.size.width);
        output.push(layout.size.height);
        output.push(children.len() as f32);

        for child in children {
            self.write_output(child, output)?;
        }
        Ok(())
    }
}

impl Engine for TaffyEngine {
    fn create_style(&mut self, style: &EngineStyle) -> Result<StyleHandle> {
        let converted = convert_style(style)?;
        self.styles
            .insert(converted)
            .map(StyleHandle)
            .ok_or_else(|| LayoutError::EngineAllocation {
                kind: HandleKind::Style,
                reason: "style arena exhausted".to_string(),
            })
    }

    fn free_style(&mut self, style: StyleHandle) -> Result<()> {
        self.styles
            .remove(style.0)
            .map(|_| ())
            .ok_or_else(|| LayoutError::stale_style(style))
    }

    fn create_node(&mut self, style: StyleHandle) -> Result<NodeHandle> {
        let style = self.style(style)?.clone();
        let id = self
            .tree
            .new_leaf(style)
            .map_err(|err| LayoutError::EngineAllocation {
                kind: HandleKind::Node,
                reason: err.to_string(),
            })?;
        let Some(raw) = self.nodes.insert(id) else {
            let _ = self.tree.remove(id);
            return Err(LayoutError::EngineAllocation {
                kind: HandleKind::Node,
                reason: "node arena exhausted".to_string(),
            });
        };
        let handle = NodeHandle(raw);
        self.handles.insert(id, handle);
        Ok(handle)
    }

    fn free_node(&mut self, node: NodeHandle) -> Result<()> {
        let id = self
            .nodes
            .remove(node.0)
            .ok_or_else(|| LayoutError::stale_node(node))?;
        self.handles.remove(&id);
        self.tree.remove(id).map_err(engine_error)?;
        Ok(())
    }

    fn set_style(&mut self, node: NodeHandle, style: StyleHandle) -> Result<()> {
        let id = self.node_id(node)?;
        let style = self.style(style)?.clone();
        self.tree.set_style(id, style).map_err(engine_error)
    }

    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        let parent = self.node_id(parent)?;
        let child = self.node_id(child)?;
        self.tree.add_child(parent, child).map_err(engine_error)
    }

    fn replace_child_at_index(
        &mut self,
        parent: NodeHandle,
        index: usize,
        child: NodeHandle,
    ) -> Result<NodeHandle> {
        let parent = self.node_id(parent)?;
        let child = self.node_id(child)?;
        let previous = self
            .tree
            .replace_child_at_index(parent, index, child)
            .map_err(engine_error)?;
        self.handle_of(previous)
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<NodeHandle> {
        let parent = self.node_id(parent)?;
        let child = self.node_id(child)?;
        let removed = self.tree.remove_child(parent, child).map_err(engine_error)?;
        self.handle_of(removed)
    }

    fn remove_child_at_index(&mut self, parent: NodeHandle, index: usize) -> Result<NodeHandle> {
        let parent = self.node_id(parent)?;
        let removed = self
            .tree
            .remove_child_at_index(parent, index)
            .map_err(engine_error)?;
        self.handle_of(removed)
    }

    fn set_measure(
        &mut self,
        node: NodeHandle,
        callback: Option<Box<dyn MeasureCallback>>,
    ) -> Result<()> {
        let id = self.node_id(node)?;
        self.tree.set_node_context(id, callback).map_err(engine_error)?;
        // A new content size invalidates whatever was cached for the leaf.
        self.tree.mark_dirty(id).map_err(engine_error)
    }

    fn is_dirty(&self, node: NodeHandle) -> Result<bool> {
        let id = self.node_id(node)?;
        self.tree.dirty(id).map_err(engine_error)
    }

    fn mark_dirty(&mut self, node: NodeHandle) -> Result<()> {
        let id = self.node_id(node)?;
        self.tree.mark_dirty(id).map_err(engine_error)
    }

    fn compute_layout(&mut self, node: NodeHandle, width: f32, height: f32) -> Result<Vec<f32>> {
        let root = self.node_id(node)?;
        let available = TaffySize {
            width: available_space(width),
            height: available_space(height),
        };

        let handles = &self.handles;
        let mut failure: Option<LayoutError> = None;
        // Leaves whose cached size is a placeholder after a failed callback.
        let mut unmeasured: Vec<NodeId> = Vec::new();
        self.tree
            .compute_layout_with_measure(
                root,
                available,
                |known, available, id, context, _style| {
                    let Some(callback) = context else {
                        return TaffySize::ZERO;
                    };
                    if failure.is_some() {
                        unmeasured.push(id);
                        return TaffySize::ZERO;
                    }
                    let Some(handle) = handles.get(&id).copied() else {
                        failure = Some(LayoutError::Engine(format!(
                            "measure requested for untracked engine node {id:?}"
                        )));
                        unmeasured.push(id);
                        return TaffySize::ZERO;
                    };
                    let width = option_to_nan(known.width.or_else(|| definite(available.width)));
                    let height =
                        option_to_nan(known.height.or_else(|| definite(available.height)));
                    match callback.call(handle, width, height) {
                        Ok(size) => TaffySize {
                            width: size.width,
                            height: size.height,
                        },
                        Err(err) => {
                            failure = Some(err);
                            unmeasured.push(id);
                            TaffySize::ZERO
                        }
                    }
                },
            )
            .map_err(engine_error)?;

        if let Some(err) = failure {
            // The pass left these leaves clean with a zero size; the next
            // pass has to call their measures again.
            for id in unmeasured {
                self.tree.mark_dirty(id).map_err(engine_error)?;
            }
            self.tree.mark_dirty(root).map_err(engine_error)?;
            return Err(err);
        }

        let mut output = Vec::new();
        self.write_output(root, &mut output)?;
        Ok(output)
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn engine_error(err: TaffyError) -> LayoutError {
    LayoutError::Engine(err.to_string())
}

fn available_space(value: f32) -> AvailableSpace {
    if value.is_nan() {
        AvailableSpace::MaxContent
    } else {
        AvailableSpace::Definite(value)
    }
}

fn definite(space: AvailableSpace) -> Option<f32> {
    match space {
        AvailableSpace::Definite(value) => Some(value),
        AvailableSpace::MinContent | AvailableSpace::MaxContent => None,
    }
}

fn invalid(kind: &'static str, index: i32) -> LayoutError {
    LayoutError::InvalidEnumIndex { kind, index }
}

fn convert_style(style: &EngineStyle) -> Result<Style> {
    // Taffy has no writing direction; the index is still validated.
    if !(0..=2).contains(&style.direction) {
        return Err(invalid("Direction", style.direction));
    }

    let overflow = overflow(style.overflow)?;

    Ok(Style {
        display: display(style.display)?,
        position: position_type(style.position_type)?,
        flex_direction: flex_direction(style.flex_direction)?,
        flex_wrap: flex_wrap(style.flex_wrap)?,
        overflow: Point {
            x: overflow,
            y: overflow,
        },
        align_items: Some(align_items(style.align_items)?),
        align_self: align_self(style.align_self)?,
        align_content: Some(align_content(style.align_content)?),
        justify_content: Some(justify_content(style.justify_content)?),

        inset: rect(style.position, inset)?,
        margin: rect(style.margin, margin)?,
        padding: rect(style.padding, length_percentage)?,
        border: rect(style.border, length_percentage)?,

        flex_grow: style.flex_grow,
        flex_shrink: style.flex_shrink,
        flex_basis: dimension(style.flex_basis)?,

        size: TaffySize {
            width: dimension(style.size.width)?,
            height: dimension(style.size.height)?,
        },
        min_size: TaffySize {
            width: dimension(style.min_size.width)?,
            height: dimension(style.min_size.height)?,
        },
        max_size: TaffySize {
            width: dimension(style.max_size.width)?,
            height: dimension(style.max_size.height)?,
        },

        aspect_ratio: if style.aspect_ratio.is_nan() {
            None
        } else {
            Some(style.aspect_ratio)
        },
        ..Style::default()
    })
}

fn rect<T>(
    value: Rect<EngineDimension>,
    convert: fn(EngineDimension) -> Result<T>,
) -> Result<TaffyRect<T>> {
    Ok(TaffyRect {
        left: convert(value.start)?,
        right: convert(value.end)?,
        top: convert(value.top)?,
        bottom: convert(value.bottom)?,
    })
}

fn dimension(value: EngineDimension) -> Result<Dimension> {
    let value = value.to_dimension()?;
    Ok(match value.unit {
        DimensionUnit::Points => Dimension::Length(value.value),
        DimensionUnit::Percent => Dimension::Percent(value.value),
        DimensionUnit::Auto | DimensionUnit::Undefined => Dimension::Auto,
    })
}

fn inset(value: EngineDimension) -> Result<LengthPercentageAuto> {
    let value = value.to_dimension()?;
    Ok(match value.unit {
        DimensionUnit::Points => LengthPercentageAuto::Length(value.value),
        DimensionUnit::Percent => LengthPercentageAuto::Percent(value.value),
        DimensionUnit::Auto | DimensionUnit::Undefined => LengthPercentageAuto::Auto,
    })
}

fn margin(value: EngineDimension) -> Result<LengthPercentageAuto> {
    let value = value.to_dimension()?;
    Ok(match value.unit {
        DimensionUnit::Points => LengthPercentageAuto::Length(value.value),
        DimensionUnit::Percent => LengthPercentageAuto::Percent(value.value),
        DimensionUnit::Auto => LengthPercentageAuto::Auto,
        DimensionUnit::Undefined => LengthPercentageAuto::Length(0.0),
    })
}

fn length_percentage(value: EngineDimension) -> Result<LengthPercentage> {
    let value = value.to_dimension()?;
    Ok(match value.unit {
        DimensionUnit::Points => LengthPercentage::Length(value.value),
        DimensionUnit::Percent => LengthPercentage::Percent(value.value),
        DimensionUnit::Auto | DimensionUnit::Undefined => LengthPercentage::Length(0.0),
    })
}

fn display(index: i32) -> Result<Display> {
    match index {
        0 => Ok(Display::Flex),
        1 => Ok(Display::None),
        n => Err(invalid("Display", n)),
    }
}

fn position_type(index: i32) -> Result<Position> {
    match index {
        0 => Ok(Position::Relative),
        1 => Ok(Position::Absolute),
        n => Err(invalid("PositionType", n)),
    }
}

fn flex_direction(index: i32) -> Result<FlexDirection> {
    match index {
        0 => Ok(FlexDirection::Row),
        1 => Ok(FlexDirection::Column),
        2 => Ok(FlexDirection::RowReverse),
        3 => Ok(FlexDirection::ColumnReverse),
        n => Err(invalid("FlexDirection", n)),
    }
}

fn flex_wrap(index: i32) -> Result<FlexWrap> {
    match index {
        0 => Ok(FlexWrap::NoWrap),
        1 => Ok(FlexWrap::Wrap),
        2 => Ok(FlexWrap::WrapReverse),
        n => Err(invalid("FlexWrap", n)),
    }
}

fn overflow(index: i32) -> Result<Overflow> {
    match index {
        0 => Ok(Overflow::Visible),
        1 => Ok(Overflow::Hidden),
        2 => Ok(Overflow::Scroll),
        n => Err(invalid("Overflow", n)),
    }
}

fn align_items(index: i32) -> Result<AlignItems> {
    match index {
        0 => Ok(AlignItems::FlexStart),
        1 => Ok(AlignItems::FlexEnd),
        2 => Ok(AlignItems::Center),
        3 => Ok(AlignItems::Baseline),
        4 => Ok(AlignItems::Stretch),
        n => Err(invalid("AlignItems", n)),
    }
}

fn align_self(index: i32) -> Result<Option<AlignSelf>> {
    match index {
        0 => Ok(None),
        1 => Ok(Some(AlignSelf::FlexStart)),
        2 => Ok(Some(AlignSelf::FlexEnd)),
        3 => Ok(Some(AlignSelf::Center)),
        4 => Ok(Some(AlignSelf::Baseline)),
        5 => Ok(Some(AlignSelf::Stretch)),
        n => Err(invalid("AlignSelf", n)),
    }
}

fn align_content(index: i32) -> Result<AlignContent> {
    match index {
        0 => Ok(AlignContent::FlexStart),
        1 => Ok(AlignContent::FlexEnd),
        2 => Ok(AlignContent::Center),
        3 => Ok(AlignContent::Stretch),
        4 => Ok(AlignContent::SpaceBetween),
        5 => Ok(AlignContent::SpaceAround),
        n => Err(invalid("AlignContent", n)),
    }
}

fn justify_content(index: i32) -> Result<JustifyContent> {
    match index {
        0 => Ok(JustifyContent::FlexStart),
        1 => Ok(JustifyContent::FlexEnd),
        2 => Ok(JustifyContent::Center),
        3 => Ok(JustifyContent::SpaceBetween),
        4 => Ok(JustifyContent::SpaceAround),
        5 => Ok(JustifyContent::SpaceEvenly),
        n => Err(invalid("JustifyContent", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::style::StyleProperties;

    fn fixed(width: f32, height: f32) -> EngineStyle {
        StyleProperties::default()
            .with_size(Size::points(width, height))
            .to_engine()
    }

    #[test]
    fn fresh_nodes_are_dirty_until_laid_out() {
        let mut engine = TaffyEngine::new();
        let style = engine.create_style(&fixed(10.0, 10.0)).unwrap();
        let node = engine.create_node(style).unwrap();
        assert!(engine.is_dirty(node).unwrap());

        engine.compute_layout(node, f32::NAN, f32::NAN).unwrap();
        assert!(!engine.is_dirty(node).unwrap());

        engine.mark_dirty(node).unwrap();
        assert!(engine.is_dirty(node).unwrap());
    }

    #[test]
    fn output_is_pre_order_with_child_counts() {
        let mut engine = TaffyEngine::new();
        let root_style = engine.create_style(&StyleProperties::default().to_engine()).unwrap();
        let child_style = engine.create_style(&fixed(30.0, 20.0)).unwrap();
        let root = engine.create_node(root_style).unwrap();
        let first = engine.create_node(child_style).unwrap();
        let second = engine.create_node(child_style).unwrap();
        engine.add_child(root, first).unwrap();
        engine.add_child(root, second).unwrap();

        let output = engine.compute_layout(root, f32::NAN, f32::NAN).unwrap();
        assert_eq!(
            output,
            vec![
                0.0, 0.0, 60.0, 20.0, 2.0, //
                0.0, 0.0, 30.0, 20.0, 0.0, //
                30.0, 0.0, 30.0, 20.0, 0.0,
            ]
        );
    }

    #[test]
    fn stale_handles_are_reported() {
        let mut engine = TaffyEngine::new();
        let style = engine.create_style(&StyleProperties::default().to_engine()).unwrap();
        let node = engine.create_node(style).unwrap();
        engine.free_node(node).unwrap();

        assert!(matches!(
            engine.free_node(node),
            Err(LayoutError::StaleHandle {
                kind: HandleKind::Node,
                ..
            })
        ));
        assert!(matches!(
            engine.is_dirty(node),
            Err(LayoutError::StaleHandle { .. })
        ));

        engine.free_style(style).unwrap();
        assert!(matches!(
            engine.create_node(style),
            Err(LayoutError::StaleHandle {
                kind: HandleKind::Style,
                ..
            })
        ));
    }

    #[test]
    fn invalid_enum_index_is_rejected_before_allocation() {
        let mut engine = TaffyEngine::new();
        let mut style = StyleProperties::default().to_engine();
        style.justify_content = 6;
        let err = engine.create_style(&style).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvalidEnumIndex {
                kind: "JustifyContent",
                index: 6
            }
        ));
        assert_eq!(engine.style_count(), 0);
    }

    #[test]
    fn replace_returns_previous_handle() {
        let mut engine = TaffyEngine::new();
        let style = engine.create_style(&StyleProperties::default().to_engine()).unwrap();
        let root = engine.create_node(style).unwrap();
        let old = engine.create_node(style).unwrap();
        let new = engine.create_node(style).unwrap();
        engine.add_child(root, old).unwrap();

        assert_eq!(engine.replace_child_at_index(root, 0, new).unwrap(), old);
        assert_eq!(engine.remove_child_at_index(root, 0).unwrap(), new);
        assert_eq!(engine.node_count(), 3);
    }
}
