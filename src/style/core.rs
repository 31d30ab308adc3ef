use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::LayoutContext;
use crate::engine::{EngineDimension, EngineStyle, StyleHandle};
use crate::error::Result;
use crate::geometry::{DimensionValue, Rect, Size, option_to_nan};
use crate::logging::{LogLevel, TARGET_STYLE, json_kv};

use super::enums::{
    AlignContent, AlignItems, AlignSelf, Direction, Display, FlexDirection, FlexWrap,
    JustifyContent, Overflow, PositionType,
};

/// Plain flexbox property set. Build one with the `with_*` methods and turn it
/// into a [`StyleDescriptor`] to use it on nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleProperties {
    pub display: Display,
    pub position_type: PositionType,
    pub direction: Direction,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub overflow: Overflow,
    pub align_items: AlignItems,
    pub align_self: AlignSelf,
    pub align_content: AlignContent,
    pub justify_content: JustifyContent,
    pub position: Rect<DimensionValue>,
    pub margin: Rect<DimensionValue>,
    pub padding: Rect<DimensionValue>,
    pub border: Rect<DimensionValue>,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: DimensionValue,
    pub size: Size<DimensionValue>,
    pub min_size: Size<DimensionValue>,
    pub max_size: Size<DimensionValue>,
    pub aspect_ratio: Option<f32>,
}

impl Default for StyleProperties {
    fn default() -> Self {
        Self {
            display: Display::default(),
            position_type: PositionType::default(),
            direction: Direction::default(),
            flex_direction: FlexDirection::default(),
            flex_wrap: FlexWrap::default(),
            overflow: Overflow::default(),
            align_items: AlignItems::default(),
            align_self: AlignSelf::default(),
            align_content: AlignContent::default(),
            justify_content: JustifyContent::default(),
            position: Rect::UNDEFINED,
            margin: Rect::UNDEFINED,
            padding: Rect::UNDEFINED,
            border: Rect::UNDEFINED,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            flex_basis: DimensionValue::AUTO,
            size: Size::AUTO,
            min_size: Size::AUTO,
            max_size: Size::AUTO,
            aspect_ratio: None,
        }
    }
}

macro_rules! setters {
    ($($method:ident => $field:ident: $ty:ty),+ $(,)?) => {
        $(
            pub fn $method(mut self, value: $ty) -> Self {
                self.$field = value;
                self
            }
        )+
    };
}

impl StyleProperties {
    setters! {
        with_display => display: Display,
        with_position_type => position_type: PositionType,
        with_direction => direction: Direction,
        with_flex_direction => flex_direction: FlexDirection,
        with_flex_wrap => flex_wrap: FlexWrap,
        with_overflow => overflow: Overflow,
        with_align_items => align_items: AlignItems,
        with_align_self => align_self: AlignSelf,
        with_align_content => align_content: AlignContent,
        with_justify_content => justify_content: JustifyContent,
        with_position => position: Rect<DimensionValue>,
        with_margin => margin: Rect<DimensionValue>,
        with_padding => padding: Rect<DimensionValue>,
        with_border => border: Rect<DimensionValue>,
        with_flex_grow => flex_grow: f32,
        with_flex_shrink => flex_shrink: f32,
        with_flex_basis => flex_basis: DimensionValue,
        with_size => size: Size<DimensionValue>,
        with_min_size => min_size: Size<DimensionValue>,
        with_max_size => max_size: Size<DimensionValue>,
    }

    pub fn with_aspect_ratio(mut self, ratio: f32) -> Self {
        self.aspect_ratio = Some(ratio);
        self
    }

    /// Engine record for this property set.
    pub fn to_engine(&self) -> EngineStyle {
        EngineStyle {
            display: self.display.index(),
            position_type: self.position_type.index(),
            direction: self.direction.index(),
            flex_direction: self.flex_direction.index(),
            flex_wrap: self.flex_wrap.index(),
            overflow: self.overflow.index(),
            align_items: self.align_items.index(),
            align_self: self.align_self.index(),
            align_content: self.align_content.index(),
            justify_content: self.justify_content.index(),
            position: self.position.map(EngineDimension::from),
            margin: self.margin.map(EngineDimension::from),
            padding: self.padding.map(EngineDimension::from),
            border: self.border.map(EngineDimension::from),
            flex_grow: self.flex_grow,
            flex_shrink: self.flex_shrink,
            flex_basis: self.flex_basis.into(),
            size: self.size.map(EngineDimension::from),
            min_size: self.min_size.map(EngineDimension::from),
            max_size: self.max_size.map(EngineDimension::from),
            aspect_ratio: option_to_nan(self.aspect_ratio),
        }
    }
}

/// Immutable style registered with a context's engine.
///
/// Clones share the same engine handle, which is released when the last clone
/// is dropped. To restyle a node, build a new descriptor and pass it to
/// [`LayoutNode::set_style`](crate::LayoutNode::set_style).
#[derive(Clone)]
pub struct StyleDescriptor {
    inner: Rc<StyleInner>,
}

struct StyleInner {
    ctx: LayoutContext,
    handle: StyleHandle,
    properties: StyleProperties,
}

impl StyleDescriptor {
    pub fn new(ctx: &LayoutContext, properties: StyleProperties) -> Result<Self> {
        let record = properties.to_engine();
        let handle = ctx.with_engine_mut(|engine| engine.create_style(&record))?;

        ctx.record(|metrics| metrics.record_style_created());
        ctx.log(
            LogLevel::Debug,
            TARGET_STYLE,
            "style_created",
            [
                json_kv("style", handle.index()),
                json_kv("generation", handle.generation()),
            ],
        );

        Ok(Self {
            inner: Rc::new(StyleInner {
                ctx: ctx.clone(),
                handle,
                properties,
            }),
        })
    }

    pub fn properties(&self) -> &StyleProperties {
        &self.inner.properties
    }

    pub fn handle(&self) -> StyleHandle {
        self.inner.handle
    }

    pub fn context(&self) -> &LayoutContext {
        &self.inner.ctx
    }

    /// True when both values refer to the same registered style.
    pub fn ptr_eq(&self, other: &StyleDescriptor) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for StyleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for StyleDescriptor {}

impl fmt::Debug for StyleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleDescriptor")
            .field("handle", &self.inner.handle)
            .field("properties", &self.inner.properties)
            .finish()
    }
}

impl Drop for StyleInner {
    fn drop(&mut self) {
        self.ctx.release_style(self.handle);
    }
}
