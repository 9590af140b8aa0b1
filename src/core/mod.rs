//! Core scheduling engine for panda-rs.
//!
//! Each subsystem lives in its own submodule:
//! - `cdb` for parsing and normalizing compilation-database entries
//! - `actions` for the built-in action catalog
//! - `plugin` for loading user-supplied action descriptors
//! - `estimator` for pluggable job-size heuristics
//! - `parallel` for the worklist, worker pool, and subprocess launcher
//! - `reducers` for the whole-CDB aggregation passes

pub mod actions;
pub mod cdb;
pub mod estimator;
pub mod parallel;
pub mod plugin;
pub mod reducers;
