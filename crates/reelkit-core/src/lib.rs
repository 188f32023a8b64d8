//! reelkit Core
//!
//! Shared utilities for the reelkit crates: logging bootstrap, profiling
//! helpers, small geometry types and the hash collections used throughout.

pub mod alloc;
pub mod geometry;
pub mod logging;
pub mod profiling;
