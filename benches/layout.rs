use criterion::{Criterion, black_box, criterion_group, criterion_main};
use flexnode::{
    FlexDirection, FlexWrap, LayoutConfig, LayoutContext, LayoutNode, LayoutResult, Logger,
    NullSink, Result, Size, StyleDescriptor, StyleProperties,
};

const ROWS: usize = 20;
const CELLS_PER_ROW: usize = 12;

fn bench_context() -> LayoutContext {
    let mut config = LayoutConfig::default().with_logger(Logger::new(NullSink));
    config.enable_metrics();
    LayoutContext::new(config)
}

/// A column of wrapping rows, each holding measured text-like cells.
fn build_grid(ctx: &LayoutContext) -> Result<LayoutNode> {
    let column = StyleDescriptor::new(
        ctx,
        StyleProperties::default().with_flex_direction(FlexDirection::Column),
    )?;
    let row = StyleDescriptor::new(
        ctx,
        StyleProperties::default().with_flex_wrap(FlexWrap::Wrap),
    )?;
    let cell = StyleDescriptor::new(ctx, StyleProperties::default())?;

    let root = LayoutNode::new(&column)?;
    for r in 0..ROWS {
        let line = LayoutNode::new(&row)?;
        for c in 0..CELLS_PER_ROW {
            let chars = ((r * 7 + c * 3) % 11 + 1) as f32;
            line.add_child(&LayoutNode::leaf(&cell, move |available: Size<Option<f32>>| {
                let natural = chars * 8.0;
                let width = available.width.map_or(natural, |w| w.min(natural));
                Size::new(width, 16.0)
            })?)?;
        }
        root.add_child(&line)?;
    }
    Ok(root)
}

fn layout_fresh_tree(c: &mut Criterion) {
    c.bench_function("layout_fresh_tree", |b| {
        b.iter(|| {
            let ctx = bench_context();
            let root = build_grid(&ctx).expect("grid");
            root.compute_layout(black_box(Size::new(Some(640.0), None)))
                .expect("layout")
        });
    });
}

fn relayout_after_mark_dirty(c: &mut Criterion) {
    let ctx = bench_context();
    let root = build_grid(&ctx).expect("grid");
    root.compute_layout(Size::new(Some(640.0), None))
        .expect("warm layout");
    let leaf = root
        .child_at(ROWS / 2)
        .and_then(|row| row.child_at(0))
        .expect("leaf");

    c.bench_function("relayout_after_mark_dirty", |b| {
        b.iter(|| {
            leaf.mark_dirty().expect("mark dirty");
            root.compute_layout(black_box(Size::new(Some(640.0), None)))
                .expect("layout")
        });
    });
}

fn decode_buffer(c: &mut Criterion) {
    let ctx = bench_context();
    let root = build_grid(&ctx).expect("grid");
    let buffer = root
        .compute_layout(Size::new(Some(640.0), None))
        .expect("layout")
        .encode();

    c.bench_function("decode_buffer", |b| {
        b.iter(|| LayoutResult::decode(black_box(&buffer)).expect("decode"));
    });
}

criterion_group!(
    benches,
    layout_fresh_tree,
    relayout_after_mark_dirty,
    decode_buffer
);
criterion_main!(benches);
