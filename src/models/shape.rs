//! Result-shape descriptors for multi-result-set reads.
//!
//! A [`Shape`] lists, in server emission order, how each result set is
//! decoded: as a single row or as a full list. A guarded shape treats its
//! first slot as an existence check; when that slot comes back empty no
//! further result sets are read.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decoded JSON row: column name to value.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// Minimum number of result sets in a multi-result shape.
pub const MIN_RESULT_SETS: usize = 2;

/// Maximum number of result sets in a multi-result shape.
pub const MAX_RESULT_SETS: usize = 7;

/// How one result set is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotMode {
    /// First row of the set, or absent when the set is empty.
    Single,
    /// Every row of the set, in server order.
    List,
}

impl fmt::Display for SlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::List => write!(f, "list"),
        }
    }
}

impl FromStr for SlotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "one" => Ok(Self::Single),
            "list" | "many" => Ok(Self::List),
            other => Err(format!("unknown slot mode '{other}' (expected single or list)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    slots: Vec<SlotMode>,
    guarded: bool,
}

impl Shape {
    /// Shape whose first slot gates the rest. The first slot must be `Single`.
    pub fn guarded(slots: impl Into<Vec<SlotMode>>) -> Result<Self, String> {
        Self::new(slots.into(), true)
    }

    /// Shape that reads every result set regardless of content.
    pub fn unguarded(slots: impl Into<Vec<SlotMode>>) -> Result<Self, String> {
        Self::new(slots.into(), false)
    }

    fn new(slots: Vec<SlotMode>, guarded: bool) -> Result<Self, String> {
        if !(MIN_RESULT_SETS..=MAX_RESULT_SETS).contains(&slots.len()) {
            return Err(format!(
                "a multi-result shape needs {} to {} result sets, got {}",
                MIN_RESULT_SETS,
                MAX_RESULT_SETS,
                slots.len()
            ));
        }
        if guarded && slots[0] != SlotMode::Single {
            return Err("the guard slot of a guarded shape must be single".to_string());
        }
        Ok(Self { slots, guarded })
    }

    pub fn slots(&self) -> &[SlotMode] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self.slots.iter().map(ToString::to_string).collect();
        let kind = if self.guarded { "guarded" } else { "unguarded" };
        write!(f, "{}({})", kind, slots.join(","))
    }
}

/// Materialized content of one result set slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotData {
    Single(Option<JsonRow>),
    List(Vec<JsonRow>),
}

impl SlotData {
    pub fn empty(mode: SlotMode) -> Self {
        match mode {
            SlotMode::Single => Self::Single(None),
            SlotMode::List => Self::List(Vec::new()),
        }
    }

    /// Build a slot from a fully read result set.
    pub fn from_rows(mode: SlotMode, rows: Vec<JsonRow>) -> Self {
        match mode {
            SlotMode::Single => Self::Single(rows.into_iter().next()),
            SlotMode::List => Self::List(rows),
        }
    }

    /// Whether the slot holds no value.
    ///
    /// A single row whose columns are all NULL decodes to nothing, so it
    /// counts as absent just like a missing row.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Single(None) => true,
            Self::Single(Some(row)) => row.values().all(serde_json::Value::is_null),
            Self::List(rows) => rows.is_empty(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            Self::Single(row) => usize::from(row.is_some()),
            Self::List(rows) => rows.len(),
        }
    }
}
