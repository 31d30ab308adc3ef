//! Explicit owner of one engine instance.
//!
//! Every [`StyleDescriptor`](crate::StyleDescriptor) and
//! [`LayoutNode`](crate::LayoutNode) is bound to the context it was created
//! in. Contexts are cheap to clone; clones share the same engine.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;

use crate::config::LayoutConfig;
use crate::engine::{Engine, NodeHandle, StyleHandle, TaffyEngine};
use crate::error::{LayoutError, Result};
use crate::logging::{
    LogLevel, Logger, TARGET_CONTEXT, TARGET_NODE, TARGET_STYLE, event_with_fields, json_kv,
    json_str,
};
use crate::metrics::{LayoutMetrics, MetricSnapshot};

thread_local! {
    static THREAD_DEFAULT: LayoutContext = LayoutContext::new(LayoutConfig::default());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    Node(NodeHandle),
    Style(StyleHandle),
}

struct ContextInner {
    engine: RefCell<Box<dyn Engine>>,
    pending: RefCell<Vec<Release>>,
    config: LayoutConfig,
    started: Instant,
}

#[derive(Clone)]
pub struct LayoutContext {
    inner: Rc<ContextInner>,
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl fmt::Debug for LayoutContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutContext")
            .field("config", &self.inner.config)
            .field("pending", &self.inner.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

impl LayoutContext {
    /// Creates a context backed by a fresh [`TaffyEngine`].
    pub fn new(config: LayoutConfig) -> Self {
        let engine = TaffyEngine::new().with_rounding(config.rounding);
        Self::with_engine(engine, config)
    }

    /// Creates a context around a caller-supplied engine.
    pub fn with_engine<E>(engine: E, config: LayoutConfig) -> Self
    where
        E: Engine + 'static,
    {
        let ctx = Self {
            inner: Rc::new(ContextInner {
                engine: RefCell::new(Box::new(engine)),
                pending: RefCell::new(Vec::new()),
                config,
                started: Instant::now(),
            }),
        };
        ctx.log(
            LogLevel::Info,
            TARGET_CONTEXT,
            "context_created",
            [json_kv("rounding", ctx.inner.config.rounding)],
        );
        ctx
    }

    /// The context shared by everything on the current thread that does not
    /// build its own. Created on first use and kept until the thread exits.
    pub fn thread_default() -> Self {
        THREAD_DEFAULT.with(Clone::clone)
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.inner.config
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.inner.config.logger.as_ref()
    }

    /// True when both values share one engine.
    pub fn same_as(&self, other: &LayoutContext) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Live engine nodes, for diagnostics.
    pub fn node_count(&self) -> Result<usize> {
        self.read_engine(|engine| Ok(engine.node_count()))
    }

    /// Releases queued while the engine was busy and not yet applied.
    pub fn pending_releases(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.inner.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.inner.started.elapsed()))
    }

    /// Logs a metrics snapshot through the configured logger.
    pub fn emit_metrics(&self) {
        let Some(snapshot) = self.metrics_snapshot() else {
            return;
        };
        if let Some(logger) = self.logger() {
            let event = snapshot.to_log_event(&self.inner.config.metrics_target);
            let _ = logger.log_event(event);
        }
    }

    pub(crate) fn metrics_handle(&self) -> Option<Arc<Mutex<LayoutMetrics>>> {
        self.inner.config.metrics_handle()
    }

    pub(crate) fn ensure_same(&self, other: &LayoutContext) -> Result<()> {
        if self.same_as(other) {
            Ok(())
        } else {
            Err(LayoutError::ContextMismatch)
        }
    }

    /// Runs `f` with exclusive engine access. Fails with
    /// [`LayoutError::Reentrant`] while a layout pass holds the engine.
    pub(crate) fn with_engine_mut<R>(
        &self,
        f: impl FnOnce(&mut dyn Engine) -> Result<R>,
    ) -> Result<R> {
        let mut engine = self
            .inner
            .engine
            .try_borrow_mut()
            .map_err(|_| LayoutError::Reentrant)?;
        self.drain_pending(&mut **engine);
        let outcome = f(&mut **engine);
        // Values dropped inside `f` (replaced measure closures) may have
        // queued releases of their own.
        self.drain_pending(&mut **engine);
        outcome
    }

    pub(crate) fn read_engine<R>(&self, f: impl FnOnce(&dyn Engine) -> Result<R>) -> Result<R> {
        let engine = self
            .inner
            .engine
            .try_borrow()
            .map_err(|_| LayoutError::Reentrant)?;
        f(&**engine)
    }

    pub(crate) fn release_node(&self, handle: NodeHandle) {
        self.release(Release::Node(handle));
    }

    pub(crate) fn release_style(&self, handle: StyleHandle) {
        self.release(Release::Style(handle));
    }

    fn release(&self, release: Release) {
        match self.inner.engine.try_borrow_mut() {
            Ok(mut engine) => {
                self.apply_release(&mut **engine, release);
                self.drain_pending(&mut **engine);
            }
            Err(_) => {
                self.inner.pending.borrow_mut().push(release);
                self.log(
                    LogLevel::Debug,
                    TARGET_CONTEXT,
                    "release_deferred",
                    release_fields(release),
                );
            }
        }
    }

    fn drain_pending(&self, engine: &mut dyn Engine) {
        // Freeing can drop measure closures that queue further releases, so
        // the queue borrow is never held across `apply_release`.
        loop {
            let next = self.inner.pending.borrow_mut().pop();
            match next {
                Some(release) => self.apply_release(engine, release),
                None => break,
            }
        }
    }

    fn apply_release(&self, engine: &mut dyn Engine, release: Release) {
        let outcome = match release {
            Release::Node(handle) => engine.free_node(handle),
            Release::Style(handle) => engine.free_style(handle),
        };

        match outcome {
            Ok(()) => {
                let (target, message) = match release {
                    Release::Node(_) => {
                        self.record(|metrics| metrics.record_node_released());
                        (TARGET_NODE, "node_released")
                    }
                    Release::Style(_) => {
                        self.record(|metrics| metrics.record_style_released());
                        (TARGET_STYLE, "style_released")
                    }
                };
                self.log(LogLevel::Debug, target, message, release_fields(release));
            }
            Err(err) => {
                let mut fields = release_fields(release).to_vec();
                fields.push(json_str("error", err.to_string()));
                fields.push(json_str("code", err.code()));
                self.log(LogLevel::Warn, TARGET_CONTEXT, "release_failed", fields);
                if cfg!(debug_assertions) && !std::thread::panicking() {
                    panic!("failed to release {release:?}: {err}");
                }
            }
        }
    }

    pub(crate) fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.inner.config.logger.as_ref() {
            if !logger.enabled(level) {
                return;
            }
            let event = event_with_fields(level, target, message, fields);
            let _ = logger.log_event(event);
        }
    }

    pub(crate) fn record(&self, f: impl FnOnce(&mut LayoutMetrics)) {
        if let Some(metrics) = self.inner.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                f(&mut guard);
            }
        }
    }
}

fn release_fields(release: Release) -> [(String, Value); 3] {
    match release {
        Release::Node(handle) => [
            json_str("kind", "node"),
            json_kv("index", handle.index()),
            json_kv("generation", handle.generation()),
        ],
        Release::Style(handle) => [
            json_str("kind", "style"),
            json_kv("index", handle.index()),
            json_kv("generation", handle.generation()),
        ],
    }
}
