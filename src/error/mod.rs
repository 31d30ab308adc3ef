//! Error module orchestrator.
//!
//! Every fallible operation in the crate reports a [`LayoutError`]; decoding
//! failures carry a more specific [`DecodeError`](crate::result::DecodeError) inside
//! [`LayoutError::MalformedBuffer`].

mod types;

pub use types::{HandleKind, LayoutError, Result};
