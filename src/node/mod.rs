//! Layout tree nodes.

mod core;

pub use self::core::LayoutNode;
