//! Data models for the data access layer.
//!
//! This module re-exports the call, parameter and shape types used
//! throughout the crate.

pub mod call;
pub mod params;
pub mod shape;

// Re-export commonly used types
pub use call::{Command, CommandKind, ProcedureCall};
pub use params::{ParamValue, Params};
pub use shape::{JsonRow, MAX_RESULT_SETS, MIN_RESULT_SETS, Shape, SlotData, SlotMode};
