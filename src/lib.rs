//! panda-rs library root.
//!
//! A concurrent scheduler that replays a JSON compilation database
//! through a configurable set of compiler-based tools (CBTs).

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod commands;
pub mod core;
pub mod error;
pub mod options;

/// Specialized `Result` type used throughout panda-rs.
pub type Result<T> = error::PandaResult<T>;
