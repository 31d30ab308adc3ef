use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use serde_json::Value;

use crate::context::LayoutContext;
use crate::engine::{MeasureCallback, NodeHandle};
use crate::error::{LayoutError, Result};
use crate::geometry::Size;
use crate::logging::{LogLevel, TARGET_NODE, json_kv};
use crate::measure::{Measure, MeasureBridge};
use crate::result::LayoutResult;
use crate::style::StyleDescriptor;

/// A box in the layout tree.
///
/// `LayoutNode` is a handle: clones refer to the same node and equality is
/// identity. The node owns one engine node, released when the last handle is
/// dropped. Children held elsewhere survive their parent as detached nodes.
///
/// Every mutation checks its preconditions before the engine is touched and
/// updates the local child list only after the engine accepted the change.
#[derive(Clone)]
pub struct LayoutNode {
    inner: Rc<NodeInner>,
}

struct NodeInner {
    ctx: LayoutContext,
    handle: NodeHandle,
    style: RefCell<StyleDescriptor>,
    children: RefCell<Vec<LayoutNode>>,
    parent: RefCell<Weak<NodeInner>>,
    measure: RefCell<Option<Rc<dyn Measure>>>,
}

impl LayoutNode {
    /// Creates a childless node bound to `style`.
    pub fn new(style: &StyleDescriptor) -> Result<Self> {
        let ctx = style.context().clone();
        let style_handle = style.handle();
        let handle = ctx.with_engine_mut(|engine| engine.create_node(style_handle))?;

        ctx.record(|metrics| metrics.record_node_created());
        ctx.log(
            LogLevel::Debug,
            TARGET_NODE,
            "node_created",
            [
                json_kv("node", handle.index()),
                json_kv("generation", handle.generation()),
                json_kv("style", style_handle.index()),
            ],
        );

        Ok(Self {
            inner: Rc::new(NodeInner {
                ctx,
                handle,
                style: RefCell::new(style.clone()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                measure: RefCell::new(None),
            }),
        })
    }

    /// Creates a node, appends `children` in order and installs `measure`.
    /// On failure the partially built node is released.
    pub fn build(
        style: &StyleDescriptor,
        children: &[LayoutNode],
        measure: Option<Rc<dyn Measure>>,
    ) -> Result<Self> {
        let node = Self::new(style)?;
        for child in children {
            node.add_child(child)?;
        }
        if let Some(measure) = measure {
            node.install_measure(Some(measure))?;
        }
        Ok(node)
    }

    /// Creates a measured leaf.
    pub fn leaf<M>(style: &StyleDescriptor, measure: M) -> Result<Self>
    where
        M: Measure + 'static,
    {
        Self::build(style, &[], Some(Rc::new(measure)))
    }

    pub fn context(&self) -> &LayoutContext {
        &self.inner.ctx
    }

    pub fn handle(&self) -> NodeHandle {
        self.inner.handle
    }

    pub fn ptr_eq(&self, other: &LayoutNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn style(&self) -> StyleDescriptor {
        self.inner.style.borrow().clone()
    }

    /// Assigns `style` to this node. The previous descriptor is left to its
    /// other owners.
    pub fn set_style(&self, style: &StyleDescriptor) -> Result<()> {
        self.inner.ctx.ensure_same(style.context())?;
        let style_handle = style.handle();
        self.inner
            .ctx
            .with_engine_mut(|engine| engine.set_style(self.inner.handle, style_handle))?;

        let previous = self.inner.style.replace(style.clone());
        self.inner.ctx.record(|metrics| metrics.record_mutation());
        self.log_mutation("style_assigned", [json_kv("style", style_handle.index())]);
        drop(previous);
        Ok(())
    }

    /// Snapshot of the current children. Changing the returned vector does
    /// not affect the tree.
    pub fn children(&self) -> Vec<LayoutNode> {
        self.inner.children.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.children.borrow().is_empty()
    }

    pub fn child_at(&self, index: usize) -> Option<LayoutNode> {
        self.inner.children.borrow().get(index).cloned()
    }

    pub fn parent(&self) -> Option<LayoutNode> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| LayoutNode { inner })
    }

    /// Replaces all children with `nodes`.
    ///
    /// The whole list is validated first. Nodes that are already children of
    /// this node may appear in it; any other attached node is rejected.
    pub fn set_children(&self, nodes: &[LayoutNode]) -> Result<()> {
        for (position, node) in nodes.iter().enumerate() {
            if nodes[..position].iter().any(|seen| seen.ptr_eq(node)) {
                return Err(LayoutError::InvalidNode(
                    "node listed more than once".to_string(),
                ));
            }
            match node.parent() {
                Some(parent) if parent.ptr_eq(self) => self.check_context(node)?,
                Some(_) => return Err(already_attached()),
                None => self.check_attach(node)?,
            }
        }

        while let Some(index) = self.len().checked_sub(1) {
            self.remove_child_index(index)?;
        }
        for node in nodes {
            self.add_child(node)?;
        }
        Ok(())
    }

    /// Appends `child`. Fails if `child` already has a parent, is this node,
    /// or is one of its ancestors.
    pub fn add_child(&self, child: &LayoutNode) -> Result<()> {
        if child.parent().is_some() {
            return Err(already_attached());
        }
        self.check_attach(child)?;

        let handle = self.inner.handle;
        self.inner
            .ctx
            .with_engine_mut(|engine| engine.add_child(handle, child.inner.handle))?;

        self.inner.children.borrow_mut().push(child.clone());
        child.set_parent(Some(self));
        self.inner.ctx.record(|metrics| metrics.record_mutation());
        self.log_mutation(
            "child_added",
            [
                json_kv("child", child.inner.handle.index()),
                json_kv("index", self.len() - 1),
            ],
        );
        Ok(())
    }

    /// Puts `child` at `index` and returns the node that was there.
    pub fn replace_child_at_index(&self, index: usize, child: &LayoutNode) -> Result<LayoutNode> {
        let current = self.child_at(index).ok_or(LayoutError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        if current.ptr_eq(child) {
            return Ok(current);
        }
        if child.parent().is_some() {
            return Err(already_attached());
        }
        self.check_attach(child)?;

        let handle = self.inner.handle;
        let previous = self.inner.ctx.with_engine_mut(|engine| {
            engine.replace_child_at_index(handle, index, child.inner.handle)
        })?;
        debug_assert_eq!(previous, current.inner.handle);

        self.inner.children.borrow_mut()[index] = child.clone();
        current.set_parent(None);
        child.set_parent(Some(self));
        self.inner.ctx.record(|metrics| metrics.record_mutation());
        self.log_mutation(
            "child_replaced",
            [
                json_kv("index", index),
                json_kv("previous", current.inner.handle.index()),
                json_kv("child", child.inner.handle.index()),
            ],
        );
        Ok(current)
    }

    /// Detaches `child` and hands it back.
    pub fn remove_child(&self, child: &LayoutNode) -> Result<LayoutNode> {
        let index = self
            .inner
            .children
            .borrow()
            .iter()
            .position(|candidate| candidate.ptr_eq(child))
            .ok_or(LayoutError::NotFound)?;

        let handle = self.inner.handle;
        self.inner
            .ctx
            .with_engine_mut(|engine| engine.remove_child(handle, child.inner.handle))?;
        Ok(self.detach_at(index))
    }

    pub fn remove_child_index(&self, index: usize) -> Result<LayoutNode> {
        let len = self.len();
        if index >= len {
            return Err(LayoutError::IndexOutOfRange { index, len });
        }

        let handle = self.inner.handle;
        self.inner
            .ctx
            .with_engine_mut(|engine| engine.remove_child_at_index(handle, index))?;
        Ok(self.detach_at(index))
    }

    /// Whether the engine considers this node's layout stale.
    pub fn dirty(&self) -> Result<bool> {
        let handle = self.inner.handle;
        self.inner.ctx.read_engine(|engine| engine.is_dirty(handle))
    }

    pub fn mark_dirty(&self) -> Result<()> {
        let handle = self.inner.handle;
        self.inner
            .ctx
            .with_engine_mut(|engine| engine.mark_dirty(handle))
    }

    pub fn measure(&self) -> Option<Rc<dyn Measure>> {
        self.inner.measure.borrow().clone()
    }

    /// Installs `measure` as this node's content sizer.
    pub fn set_measure<M>(&self, measure: M) -> Result<()>
    where
        M: Measure + 'static,
    {
        self.install_measure(Some(Rc::new(measure)))
    }

    pub fn set_measure_rc(&self, measure: Rc<dyn Measure>) -> Result<()> {
        self.install_measure(Some(measure))
    }

    pub fn clear_measure(&self) -> Result<()> {
        self.install_measure(None)
    }

    /// Lays out the tree rooted here. `None` on an axis sizes it to content.
    pub fn compute_layout(&self, available: Size<Option<f32>>) -> Result<LayoutResult> {
        let started = Instant::now();
        let raw = available.to_nan();
        let handle = self.inner.handle;
        let buffer = self
            .inner
            .ctx
            .with_engine_mut(|engine| engine.compute_layout(handle, raw.width, raw.height))?;
        let result = LayoutResult::decode(&buffer)?;

        let decoded = result.node_count();
        self.inner.ctx.record(|metrics| metrics.record_layout(decoded));
        self.inner.ctx.log(
            LogLevel::Info,
            TARGET_NODE,
            "layout_computed",
            [
                json_kv("node", handle.index()),
                json_kv("nodes", decoded),
                json_kv("buffer_len", buffer.len()),
                json_kv("elapsed_us", started.elapsed().as_micros() as u64),
            ],
        );
        Ok(result)
    }

    fn install_measure(&self, measure: Option<Rc<dyn Measure>>) -> Result<()> {
        let handle = self.inner.handle;
        let bridge = measure.as_ref().map(|measure| {
            MeasureBridge::new(handle, Rc::clone(measure))
                .with_metrics(self.inner.ctx.metrics_handle())
        });
        self.inner.ctx.with_engine_mut(|engine| {
            engine.set_measure(
                handle,
                bridge.map(|bridge| Box::new(bridge) as Box<dyn MeasureCallback>),
            )
        })?;

        let installed = measure.is_some();
        let previous = self.inner.measure.replace(measure);
        self.inner.ctx.record(|metrics| metrics.record_mutation());
        self.log_mutation("measure_installed", [json_kv("installed", installed)]);
        drop(previous);
        Ok(())
    }

    fn check_context(&self, child: &LayoutNode) -> Result<()> {
        self.inner.ctx.ensure_same(&child.inner.ctx)
    }

    /// Shared precondition for attaching `child` under this node.
    fn check_attach(&self, child: &LayoutNode) -> Result<()> {
        self.check_context(child)?;
        if child.ptr_eq(self) {
            return Err(LayoutError::InvalidNode(
                "a node cannot be its own child".to_string(),
            ));
        }
        let mut ancestor = self.parent();
        while let Some(node) = ancestor {
            if node.ptr_eq(child) {
                return Err(LayoutError::InvalidNode(
                    "attaching an ancestor would create a cycle".to_string(),
                ));
            }
            ancestor = node.parent();
        }
        Ok(())
    }

    fn detach_at(&self, index: usize) -> LayoutNode {
        let removed = self.inner.children.borrow_mut().remove(index);
        removed.set_parent(None);
        self.inner.ctx.record(|metrics| metrics.record_mutation());
        self.log_mutation(
            "child_removed",
            [
                json_kv("index", index),
                json_kv("child", removed.inner.handle.index()),
            ],
        );
        removed
    }

    fn set_parent(&self, parent: Option<&LayoutNode>) {
        let link = parent.map_or_else(Weak::new, |parent| Rc::downgrade(&parent.inner));
        *self.inner.parent.borrow_mut() = link;
    }

    fn log_mutation<const N: usize>(&self, message: &str, fields: [(String, Value); N]) {
        let node = json_kv("node", self.inner.handle.index());
        self.inner.ctx.log(
            LogLevel::Debug,
            TARGET_NODE,
            message,
            std::iter::once(node).chain(fields),
        );
    }
}

fn already_attached() -> LayoutError {
    LayoutError::InvalidNode("node already has a parent; detach it first".to_string())
}

impl PartialEq for LayoutNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for LayoutNode {}

impl fmt::Debug for LayoutNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutNode")
            .field("handle", &self.inner.handle)
            .field("children", &self.len())
            .field("measured", &self.inner.measure.borrow().is_some())
            .finish()
    }
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        self.ctx.release_node(self.handle);
    }
}
