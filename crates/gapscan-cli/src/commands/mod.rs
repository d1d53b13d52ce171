//! CLI command implementations.

pub mod common;
pub mod gap;
pub mod rem;
pub mod sweep;
