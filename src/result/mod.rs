//! Decoded layout geometry.
//!
//! The engine serializes a computed tree as a flat `f32` buffer in pre-order.
//! Each node takes [`VALUES_PER_NODE`] slots: `x, y, width, height,
//! child_count`, immediately followed by the blocks of its children.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const VALUES_PER_NODE: usize = 5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("buffer truncated at offset {offset}: needed {needed} values, {len} available")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("invalid child count {value} at offset {offset}")]
    InvalidChildCount { offset: usize, value: f32 },
    #[error("trailing data after root block: consumed {consumed} of {len} values")]
    TrailingData { consumed: usize, len: usize },
}

/// Computed geometry of one node and its subtree. `x`/`y` are relative to the
/// parent's box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub children: Vec<LayoutResult>,
}

struct Frame {
    result: LayoutResult,
    remaining: usize,
}

impl LayoutResult {
    /// Decodes a buffer that must hold exactly one root block.
    pub fn decode(buffer: &[f32]) -> Result<Self, DecodeError> {
        let (consumed, result) = Self::decode_prefix(buffer, 0)?;
        if consumed != buffer.len() {
            return Err(DecodeError::TrailingData {
                consumed,
                len: buffer.len(),
            });
        }
        Ok(result)
    }

    /// Decodes the block starting at `offset` and returns the offset just past
    /// it together with the decoded tree.
    pub fn decode_prefix(buffer: &[f32], offset: usize) -> Result<(usize, Self), DecodeError> {
        let mut cursor = offset;
        let mut stack: Vec<Frame> = Vec::new();
        let mut root = read_block(buffer, &mut cursor)?;

        loop {
            if root.remaining > 0 {
                root.remaining -= 1;
                stack.push(root);
                root = read_block(buffer, &mut cursor)?;
                continue;
            }

            match stack.pop() {
                Some(mut parent) => {
                    parent.result.children.push(root.result);
                    root = parent;
                }
                None => return Ok((cursor, root.result)),
            }
        }
    }

    /// Inverse of [`LayoutResult::decode`].
    pub fn encode(&self) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(self.node_count() * VALUES_PER_NODE);
        self.encode_into(&mut buffer);
        buffer
    }

    pub fn encode_into(&self, buffer: &mut Vec<f32>) {
        for node in self.iter() {
            buffer.extend_from_slice(&[
                node.x,
                node.y,
                node.width,
                node.height,
                node.children.len() as f32,
            ]);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Pre-order traversal of the subtree.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

fn read_block(buffer: &[f32], cursor: &mut usize) -> Result<Frame, DecodeError> {
    let offset = *cursor;
    let block = buffer
        .get(offset..offset.saturating_add(VALUES_PER_NODE))
        .ok_or(DecodeError::Truncated {
            offset,
            needed: VALUES_PER_NODE,
            len: buffer.len(),
        })?;

    let count = block[4];
    if !count.is_finite() || count < 0.0 || count.fract() != 0.0 {
        return Err(DecodeError::InvalidChildCount {
            offset: offset + 4,
            value: count,
        });
    }
    let remaining = count as usize;

    // Every child needs at least one block; reject impossible counts up front.
    let left = buffer.len() - offset - VALUES_PER_NODE;
    if remaining.saturating_mul(VALUES_PER_NODE) > left {
        return Err(DecodeError::Truncated {
            offset: offset + VALUES_PER_NODE,
            needed: remaining.saturating_mul(VALUES_PER_NODE),
            len: buffer.len(),
        });
    }

    *cursor = offset + VALUES_PER_NODE;
    Ok(Frame {
        result: LayoutResult {
            x: block[0],
            y: block[1],
            width: block[2],
            height: block[3],
            children: Vec::with_capacity(remaining),
        },
        remaining,
    })
}

pub struct Iter<'a> {
    stack: Vec<&'a LayoutResult>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a LayoutResult;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

impl<'a> IntoIterator for &'a LayoutResult {
    type Item = &'a LayoutResult;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(x: f32, y: f32, width: f32, height: f32) -> LayoutResult {
        LayoutResult {
            x,
            y,
            width,
            height,
            children: Vec::new(),
        }
    }

    #[test]
    fn decodes_single_leaf() {
        let result = LayoutResult::decode(&[1.0, 2.0, 3.0, 4.0, 0.0]).unwrap();
        assert_eq!(result, leaf(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn decodes_nested_tree_in_preorder() {
        #[rustfmt::skip]
        let buffer = [
            0.0, 0.0, 100.0, 50.0, 2.0,
            0.0, 0.0, 40.0, 50.0, 1.0,
            5.0, 5.0, 10.0, 10.0, 0.0,
            40.0, 0.0, 60.0, 50.0, 0.0,
        ];
        let result = LayoutResult::decode(&buffer).unwrap();

        let expected = LayoutResult {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
            children: vec![
                LayoutResult {
                    children: vec![leaf(5.0, 5.0, 10.0, 10.0)],
                    ..leaf(0.0, 0.0, 40.0, 50.0)
                },
                leaf(40.0, 0.0, 60.0, 50.0),
            ],
        };
        assert_eq!(result, expected);
        assert_eq!(result.node_count(), 4);
        assert_eq!(result.encode(), buffer.to_vec());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let err = LayoutResult::decode(&[0.0, 0.0, 10.0, 10.0, 1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }));

        let err = LayoutResult::decode(&[0.0, 0.0, 10.0]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 0,
                needed: 5,
                len: 3
            }
        );

        assert!(matches!(
            LayoutResult::decode(&[]),
            Err(DecodeError::Truncated { len: 0, .. })
        ));
    }

    #[test]
    fn bad_child_counts_are_rejected() {
        for count in [-1.0, 1.5, f32::NAN, f32::INFINITY] {
            let err = LayoutResult::decode(&[0.0, 0.0, 0.0, 0.0, count]).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidChildCount { offset: 4, .. }));
        }
    }

    #[test]
    fn trailing_values_are_rejected() {
        let err = LayoutResult::decode(&[0.0, 0.0, 1.0, 1.0, 0.0, 9.0]).unwrap_err();
        assert_eq!(err, DecodeError::TrailingData { consumed: 5, len: 6 });
    }

    #[test]
    fn decode_prefix_reports_next_offset() {
        #[rustfmt::skip]
        let buffer = [
            7.0,
            0.0, 0.0, 10.0, 10.0, 1.0,
            1.0, 1.0, 2.0, 2.0, 0.0,
            3.0, 3.0, 3.0, 3.0, 0.0,
        ];
        let (next, first) = LayoutResult::decode_prefix(&buffer, 1).unwrap();
        assert_eq!(next, 11);
        assert_eq!(first.children.len(), 1);

        let (end, second) = LayoutResult::decode_prefix(&buffer, next).unwrap();
        assert_eq!(end, buffer.len());
        assert_eq!(second, leaf(3.0, 3.0, 3.0, 3.0));
    }

    #[test]
    fn deep_chain_decodes_without_recursion() {
        let depth = 100_000;
        let mut buffer = Vec::with_capacity(depth * VALUES_PER_NODE);
        for level in 0..depth {
            let children = if level + 1 == depth { 0.0 } else { 1.0 };
            buffer.extend_from_slice(&[0.0, 0.0, 1.0, 1.0, children]);
        }

        let result = LayoutResult::decode(&buffer).unwrap();
        assert_eq!(result.node_count(), depth);

        // Tear down iteratively so the test itself stays shallow.
        let mut next = Some(result);
        while let Some(mut node) = next {
            next = node.children.pop();
        }
    }

    /// Complete tree of `depth` levels where each node at level `n` has
    /// `fanout + n % 2` children. Every node gets distinct geometry.
    fn shape(depth: usize, fanout: usize, level: usize, next: &mut f32) -> LayoutResult {
        *next += 1.0;
        let mut node = LayoutResult {
            x: *next,
            y: *next * 0.5,
            width: *next + 10.0,
            height: -*next,
            children: Vec::new(),
        };
        if level + 1 < depth {
            for _ in 0..fanout + level % 2 {
                node.children.push(shape(depth, fanout, level + 1, next));
            }
        }
        node
    }

    #[test]
    fn generated_shapes_survive_both_directions() {
        for depth in 1..=5 {
            for fanout in 0..=4 {
                let mut next = 0.0;
                let tree = shape(depth, fanout, 0, &mut next);
                let buffer = tree.encode();

                assert_eq!(buffer.len(), tree.node_count() * VALUES_PER_NODE);
                assert_eq!(tree.iter().count(), tree.node_count());
                assert_eq!(tree.node_count(), next as usize);

                let decoded = LayoutResult::decode(&buffer).unwrap();
                assert_eq!(decoded, tree, "depth {depth} fanout {fanout}");
                assert_eq!(decoded.encode(), buffer);

                let mut padded = vec![f32::NAN; 3];
                padded.extend_from_slice(&buffer);
                let (end, prefixed) = LayoutResult::decode_prefix(&padded, 3).unwrap();
                assert_eq!(end, padded.len());
                assert_eq!(prefixed, tree);
            }
        }
    }

    #[test]
    fn serializes_to_json() {
        let value = serde_json::to_value(leaf(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(value["width"], 3.0);
        assert_eq!(value["children"], serde_json::json!([]));
    }
}
