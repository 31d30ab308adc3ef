//! Flexbox node/style object model over a pluggable layout engine.
//!
//! Build [`StyleDescriptor`]s and [`LayoutNode`]s inside a
//! [`LayoutContext`], mutate the tree, then call
//! [`LayoutNode::compute_layout`] to get a [`LayoutResult`] mirroring the
//! tree's shape. The flexbox algorithm itself sits behind the [`Engine`]
//! trait; [`TaffyEngine`] is the bundled implementation.
//!
//! Everything here is single-threaded: nodes, styles and contexts are `!Send`.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod measure;
pub mod metrics;
pub mod node;
pub mod result;
pub mod style;

pub use config::LayoutConfig;
pub use context::LayoutContext;
pub use engine::{
    Engine, EngineDimension, EngineStyle, MeasureCallback, NodeHandle, RawSize, StyleHandle,
    TaffyEngine,
};
pub use error::{HandleKind, LayoutError, Result};
pub use geometry::{DimensionUnit, DimensionValue, Point, Rect, Size, nan_to_option, option_to_nan};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use measure::{Measure, MeasureBridge};
pub use metrics::{LayoutMetrics, MetricSnapshot};
pub use node::LayoutNode;
pub use result::{DecodeError, LayoutResult};
pub use style::{
    AlignContent, AlignItems, AlignSelf, Direction, Display, FlexDirection, FlexWrap,
    JustifyContent, Overflow, PositionType, StyleDescriptor, StyleProperties,
};
