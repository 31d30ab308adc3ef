//! Style descriptors and the enum tables they are built from.

mod core;
mod enums;

pub use self::core::{StyleDescriptor, StyleProperties};
pub use enums::{
    AlignContent, AlignItems, AlignSelf, Direction, Display, FlexDirection, FlexWrap,
    JustifyContent, Overflow, PositionType,
};
