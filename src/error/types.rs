use std::fmt;

use thiserror::Error;

use crate::engine::{NodeHandle, StyleHandle};
use crate::result::DecodeError;

/// Unified result type for the crate.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// The kind of engine-side handle an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Style,
    Node,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Style => f.write_str("style"),
            HandleKind::Node => f.write_str("node"),
        }
    }
}

/// Errors surfaced by the node/style object model and its engine boundary.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("engine refused to allocate a {kind} handle: {reason}")]
    EngineAllocation { kind: HandleKind, reason: String },
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("child node not found")]
    NotFound,
    #[error("malformed layout buffer: {0}")]
    MalformedBuffer(#[from] DecodeError),
    #[error("measure bridge registered for {expected:?} was invoked for {actual:?}")]
    BridgeMismatch {
        expected: NodeHandle,
        actual: NodeHandle,
    },
    #[error("stale {kind} handle {index}@gen{generation}")]
    StaleHandle {
        kind: HandleKind,
        index: u32,
        generation: u32,
    },
    #[error("handle belongs to a different layout context")]
    ContextMismatch,
    #[error("engine is busy computing a layout; re-entrant calls are not allowed")]
    Reentrant,
    #[error("enum {kind} - invalid index: {index}")]
    InvalidEnumIndex { kind: &'static str, index: i32 },
    #[error("invalid dimension tag: {0}")]
    InvalidDimension(i32),
    #[error("measure function returned an undetermined size ({width} x {height})")]
    InvalidMeasurement { width: f32, height: f32 },
    #[error("engine error: {0}")]
    Engine(String),
}

impl LayoutError {
    pub(crate) fn stale_node(handle: NodeHandle) -> Self {
        LayoutError::StaleHandle {
            kind: HandleKind::Node,
            index: handle.index(),
            generation: handle.generation(),
        }
    }

    pub(crate) fn stale_style(handle: StyleHandle) -> Self {
        LayoutError::StaleHandle {
            kind: HandleKind::Style,
            index: handle.index(),
            generation: handle.generation(),
        }
    }

    /// Short machine-friendly label used as a structured log field.
    pub fn code(&self) -> &'static str {
        match self {
            LayoutError::EngineAllocation { .. } => "engine_allocation",
            LayoutError::InvalidNode(_) => "invalid_node",
            LayoutError::IndexOutOfRange { .. } => "index_out_of_range",
            LayoutError::NotFound => "not_found",
            LayoutError::MalformedBuffer(_) => "malformed_buffer",
            LayoutError::BridgeMismatch { .. } => "bridge_mismatch",
            LayoutError::StaleHandle { .. } => "stale_handle",
            LayoutError::ContextMismatch => "context_mismatch",
            LayoutError::Reentrant => "reentrant",
            LayoutError::InvalidEnumIndex { .. } => "invalid_enum_index",
            LayoutError::InvalidDimension(_) => "invalid_dimension",
            LayoutError::InvalidMeasurement { .. } => "invalid_measurement",
            LayoutError::Engine(_) => "engine",
        }
    }
}
