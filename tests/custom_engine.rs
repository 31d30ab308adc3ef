use flexnode::{
    Engine, EngineStyle, LayoutConfig, LayoutContext, LayoutError, LayoutNode, MeasureCallback,
    NodeHandle, Result, Size, StyleDescriptor, StyleHandle, StyleProperties,
};

struct StubNode {
    measure: Option<Box<dyn MeasureCallback>>,
    children: Vec<NodeHandle>,
    dirty: bool,
}

/// Lays out only the root: a measured root takes its measured size, anything
/// else is 0x0. With `misroute` set, measures are invoked for the slot after
/// the node being laid out.
struct StubEngine {
    misroute: bool,
    styles: u32,
    nodes: Vec<Option<StubNode>>,
}

impl StubEngine {
    fn new(misroute: bool) -> Self {
        Self {
            misroute,
            styles: 0,
            nodes: Vec::new(),
        }
    }

    fn slot(&mut self, node: NodeHandle) -> Result<&mut StubNode> {
        self.nodes
            .get_mut(node.index() as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| LayoutError::Engine(format!("unknown node {node:?}")))
    }
}

impl Engine for StubEngine {
    fn create_style(&mut self, _style: &EngineStyle) -> Result<StyleHandle> {
        self.styles += 1;
        Ok(StyleHandle::from_parts(self.styles - 1, 0))
    }

    fn free_style(&mut self, _style: StyleHandle) -> Result<()> {
        Ok(())
    }

    fn create_node(&mut self, _style: StyleHandle) -> Result<NodeHandle> {
        self.nodes.push(Some(StubNode {
            measure: None,
            children: Vec::new(),
            dirty: true,
        }));
        Ok(NodeHandle::from_parts(self.nodes.len() as u32 - 1, 0))
    }

    fn free_node(&mut self, node: NodeHandle) -> Result<()> {
        self.slot(node)?;
        self.nodes[node.index() as usize] = None;
        Ok(())
    }

    fn set_style(&mut self, node: NodeHandle, _style: StyleHandle) -> Result<()> {
        self.slot(node)?.dirty = true;
        Ok(())
    }

    fn add_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<()> {
        self.slot(parent)?.children.push(child);
        Ok(())
    }

    fn replace_child_at_index(
        &mut self,
        parent: NodeHandle,
        index: usize,
        child: NodeHandle,
    ) -> Result<NodeHandle> {
        let children = &mut self.slot(parent)?.children;
        let len = children.len();
        let slot = children
            .get_mut(index)
            .ok_or(LayoutError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, child))
    }

    fn remove_child(&mut self, parent: NodeHandle, child: NodeHandle) -> Result<NodeHandle> {
        let children = &mut self.slot(parent)?.children;
        let index = children
            .iter()
            .position(|candidate| *candidate == child)
            .ok_or(LayoutError::NotFound)?;
        Ok(children.remove(index))
    }

    fn remove_child_at_index(&mut self, parent: NodeHandle, index: usize) -> Result<NodeHandle> {
        let children = &mut self.slot(parent)?.children;
        if index >= children.len() {
            return Err(LayoutError::IndexOutOfRange {
                index,
                len: children.len(),
            });
        }
        Ok(children.remove(index))
    }

    fn set_measure(
        &mut self,
        node: NodeHandle,
        callback: Option<Box<dyn MeasureCallback>>,
    ) -> Result<()> {
        let slot = self.slot(node)?;
        slot.measure = callback;
        slot.dirty = true;
        Ok(())
    }

    fn is_dirty(&self, node: NodeHandle) -> Result<bool> {
        self.nodes
            .get(node.index() as usize)
            .and_then(Option::as_ref)
            .map(|slot| slot.dirty)
            .ok_or_else(|| LayoutError::Engine(format!("unknown node {node:?}")))
    }

    fn mark_dirty(&mut self, node: NodeHandle) -> Result<()> {
        self.slot(node)?.dirty = true;
        Ok(())
    }

    fn compute_layout(&mut self, node: NodeHandle, width: f32, height: f32) -> Result<Vec<f32>> {
        let target = if self.misroute {
            NodeHandle::from_parts(node.index() + 1, node.generation())
        } else {
            node
        };
        let slot = self.slot(node)?;
        let size = match slot.measure.as_ref() {
            Some(measure) => measure.call(target, width, height)?,
            None => Size::new(0.0, 0.0),
        };
        slot.dirty = false;
        Ok(vec![0.0, 0.0, size.width, size.height, 0.0])
    }

    fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }
}

fn plain(ctx: &LayoutContext) -> StyleDescriptor {
    StyleDescriptor::new(ctx, StyleProperties::default()).expect("style")
}

#[test]
fn caller_supplied_engine_drives_layout() {
    let ctx = LayoutContext::with_engine(StubEngine::new(false), LayoutConfig::default());
    let leaf = LayoutNode::leaf(&plain(&ctx), |available: Size<Option<f32>>| {
        Size::new(available.width.unwrap_or(12.0), 8.0)
    })
    .expect("leaf");
    assert_eq!(ctx.node_count().expect("count"), 1);

    let result = leaf.compute_layout(Size::UNDEFINED).expect("layout");
    assert_eq!((result.width, result.height), (12.0, 8.0));
    assert!(!leaf.dirty().expect("dirty"));

    drop(leaf);
    assert_eq!(ctx.node_count().expect("count"), 0);
}

#[test]
fn misrouted_measure_aborts_layout() {
    let ctx = LayoutContext::with_engine(StubEngine::new(true), LayoutConfig::default());
    let leaf = LayoutNode::leaf(&plain(&ctx), |_: Size<Option<f32>>| Size::new(1.0, 1.0))
        .expect("leaf");

    match leaf.compute_layout(Size::UNDEFINED) {
        Err(LayoutError::BridgeMismatch { expected, actual }) => {
            assert_eq!(expected, leaf.handle());
            assert_eq!(actual, NodeHandle::from_parts(leaf.handle().index() + 1, 0));
        }
        other => panic!("expected a bridge mismatch, got {other:?}"),
    }
    assert!(leaf.dirty().expect("dirty"));
}
