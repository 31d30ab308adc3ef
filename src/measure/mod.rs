//! Content measurement for leaf nodes.

use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::engine::{MeasureCallback, NodeHandle, RawSize};
use crate::error::{LayoutError, Result};
use crate::geometry::Size;
use crate::metrics::LayoutMetrics;

/// Sizes a leaf's content.
///
/// `available` carries `None` for an unconstrained axis. Both axes of the
/// returned size must be numbers. The engine may call this any number of
/// times per pass, so equal inputs should produce equal outputs.
pub trait Measure {
    fn measure(&self, available: Size<Option<f32>>) -> Size<f32>;
}

impl<F> Measure for F
where
    F: Fn(Size<Option<f32>>) -> Size<f32>,
{
    fn measure(&self, available: Size<Option<f32>>) -> Size<f32> {
        self(available)
    }
}

/// Engine-facing adapter around a [`Measure`], bound to one node handle.
pub struct MeasureBridge {
    node: NodeHandle,
    measure: Rc<dyn Measure>,
    metrics: Option<Arc<Mutex<LayoutMetrics>>>,
}

impl MeasureBridge {
    pub fn new(node: NodeHandle, measure: Rc<dyn Measure>) -> Self {
        Self {
            node,
            measure,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Option<Arc<Mutex<LayoutMetrics>>>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Runs the wrapped measure for `node`, translating NaN axes in and
    /// rejecting NaN axes out.
    pub fn invoke(&self, node: NodeHandle, width: f32, height: f32) -> Result<RawSize> {
        if node != self.node {
            return Err(LayoutError::BridgeMismatch {
                expected: self.node,
                actual: node,
            });
        }

        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_measure_call();
            }
        }

        let available = Size::new(width, height).from_nan();
        let size = self.measure.measure(available);
        if size.has_nan() {
            return Err(LayoutError::InvalidMeasurement {
                width: size.width,
                height: size.height,
            });
        }
        Ok(size)
    }
}

impl MeasureCallback for MeasureBridge {
    fn call(&self, node: NodeHandle, width: f32, height: f32) -> Result<RawSize> {
        self.invoke(node, width, height)
    }
}

impl fmt::Debug for MeasureBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasureBridge")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
