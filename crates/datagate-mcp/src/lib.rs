//! `datagate-mcp` crate (library surface).
//!
//! The primary entrypoint is the `datagate` binary (MCP over stdio or
//! streamable HTTP). This library exists so embedders can reach the core and
//! upstream crates without depending on the internal crate layout.

pub use datagate_core as core;
pub use datagate_upstream as upstream;
