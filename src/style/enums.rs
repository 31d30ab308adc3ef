use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Declares a style enum together with its engine index table.
macro_rules! engine_enum {
    (
        $(#[$meta:meta])*
        $name:ident default $default:ident {
            $($variant:ident = $index:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Index passed across the engine boundary.
            pub const fn index(self) -> i32 {
                match self {
                    $($name::$variant => $index),+
                }
            }

            pub fn from_index(index: i32) -> Result<Self> {
                match index {
                    $($index => Ok($name::$variant),)+
                    n => Err(LayoutError::InvalidEnumIndex {
                        kind: stringify!($name),
                        index: n,
                    }),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }
    };
}

engine_enum! {
    Display default Flex {
        Flex = 0,
        None = 1,
    }
}

engine_enum! {
    PositionType default Relative {
        Relative = 0,
        Absolute = 1,
    }
}

engine_enum! {
    /// Writing direction. `Inherit` defers to the parent.
    Direction default Inherit {
        Inherit = 0,
        Ltr = 1,
        Rtl = 2,
    }
}

engine_enum! {
    FlexDirection default Row {
        Row = 0,
        Column = 1,
        RowReverse = 2,
        ColumnReverse = 3,
    }
}

engine_enum! {
    FlexWrap default NoWrap {
        NoWrap = 0,
        Wrap = 1,
        WrapReverse = 2,
    }
}

engine_enum! {
    Overflow default Hidden {
        Visible = 0,
        Hidden = 1,
        Scroll = 2,
    }
}

engine_enum! {
    AlignItems default Stretch {
        FlexStart = 0,
        FlexEnd = 1,
        Center = 2,
        Baseline = 3,
        Stretch = 4,
    }
}

engine_enum! {
    /// Per-item override of the parent's [`AlignItems`]; `Auto` inherits it.
    AlignSelf default Auto {
        Auto = 0,
        FlexStart = 1,
        FlexEnd = 2,
        Center = 3,
        Baseline = 4,
        Stretch = 5,
    }
}

engine_enum! {
    AlignContent default FlexStart {
        FlexStart = 0,
        FlexEnd = 1,
        Center = 2,
        Stretch = 3,
        SpaceBetween = 4,
        SpaceAround = 5,
    }
}

engine_enum! {
    JustifyContent default FlexStart {
        FlexStart = 0,
        FlexEnd = 1,
        Center = 2,
        SpaceBetween = 3,
        SpaceAround = 4,
        SpaceEvenly = 5,
    }
}
