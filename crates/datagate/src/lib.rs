//! Public facade crate for `datagate`.
//!
//! This crate intentionally contains no IO or upstream-specific logic.
//! It re-exports the transport-agnostic types from `datagate-core`.

pub use datagate_core::*;
