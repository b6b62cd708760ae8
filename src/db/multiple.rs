//! Multi-result-set reading.
//!
//! [`read_slots`] is the one loop every read goes through: it walks the
//! result sets of a single command in server order, decoding each as a
//! single row or a list, and stops after the first slot when a guarded
//! shape's guard comes back empty.
//!
//! Typed reads are expressed as tuples of [`ResultSlot`]s: `Option<T>` for
//! a single row and `Vec<T>` for a list. A tuple whose first element is an
//! `Option` is guarded; an all-`Vec` tuple is not.

use crate::db::decode::{decode_optional, decode_rows};
use crate::db::driver::ResultSetCursor;
use crate::error::{DalError, DalResult};
use crate::models::{Shape, SlotData, SlotMode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Read `slots.len()` result sets from `cursor`.
///
/// A result set the server never emitted reads as empty. When `guarded` is
/// set and the first slot is absent (no row, or a row of NULLs), the cursor
/// is not advanced again and every slot, the guard included, is returned
/// empty.
pub async fn read_slots<K: ResultSetCursor>(
    cursor: &mut K,
    slots: &[SlotMode],
    guarded: bool,
) -> DalResult<Vec<SlotData>> {
    let mut out = Vec::with_capacity(slots.len());

    for (index, mode) in slots.iter().copied().enumerate() {
        let rows = cursor
            .next_set()
            .await
            .map_err(|e| e.at_slot(index))?
            .unwrap_or_default();
        let slot = SlotData::from_rows(mode, rows);

        if index == 0 && guarded && slot.is_absent() {
            debug!(
                skipped = slots.len() - 1,
                "Guard result set empty, skipping remaining result sets"
            );
            out.extend(slots.iter().copied().map(SlotData::empty));
            return Ok(out);
        }

        out.push(slot);
    }

    Ok(out)
}

/// One typed position in a multi-result read.
pub trait ResultSlot: Sized {
    const MODE: SlotMode;

    fn from_slot(slot: SlotData) -> Result<Self, String>;
}

impl<T: DeserializeOwned> ResultSlot for Option<T> {
    const MODE: SlotMode = SlotMode::Single;

    fn from_slot(slot: SlotData) -> Result<Self, String> {
        match slot {
            SlotData::Single(row) => decode_optional(row),
            SlotData::List(_) => Err("expected a single-row slot, got a list".to_string()),
        }
    }
}

impl<T: DeserializeOwned> ResultSlot for Vec<T> {
    const MODE: SlotMode = SlotMode::List;

    fn from_slot(slot: SlotData) -> Result<Self, String> {
        match slot {
            SlotData::List(rows) => decode_rows(rows),
            SlotData::Single(_) => Err("expected a list slot, got a single row".to_string()),
        }
    }
}

/// A fixed-arity tuple decoded from consecutive result sets.
pub trait FromResultSets: Sized {
    /// The shape to read, derived from the element types.
    fn shape() -> DalResult<Shape>;

    /// Decode slots read with [`FromResultSets::shape`]. Errors carry the
    /// index of the failing result set.
    fn from_slots(slots: Vec<SlotData>) -> Result<Self, (usize, String)>;
}

macro_rules! impl_from_result_sets {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: ResultSlot),+> FromResultSets for ($($name,)+) {
            fn shape() -> DalResult<Shape> {
                let slots = vec![$(<$name as ResultSlot>::MODE),+];
                let shape = if slots[0] == SlotMode::Single {
                    Shape::guarded(slots)
                } else {
                    Shape::unguarded(slots)
                };
                shape.map_err(DalError::internal)
            }

            fn from_slots(slots: Vec<SlotData>) -> Result<Self, (usize, String)> {
                let mut slots = slots.into_iter();
                Ok(($(
                    {
                        let slot = slots
                            .next()
                            .ok_or_else(|| ($idx, "result set missing".to_string()))?;
                        <$name as ResultSlot>::from_slot(slot).map_err(|e| ($idx, e))?
                    },
                )+))
            }
        }
    };
}

impl_from_result_sets!(A: 0, B: 1);
impl_from_result_sets!(A: 0, B: 1, C: 2);
impl_from_result_sets!(A: 0, B: 1, C: 2, D: 3);
impl_from_result_sets!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_from_result_sets!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_from_result_sets!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);

/// Header row plus one list: `(T1, [T2])`.
pub type Guarded2<T1, T2> = (Option<T1>, Vec<T2>);
/// `(T1, [T2], [T3])`.
pub type Guarded3<T1, T2, T3> = (Option<T1>, Vec<T2>, Vec<T3>);
/// Two single rows then two lists: `(T1, T2, [T3], [T4])`. Only `T1` guards.
pub type Guarded4<T1, T2, T3, T4> = (Option<T1>, Option<T2>, Vec<T3>, Vec<T4>);
pub type Guarded5<T1, T2, T3, T4, T5> = (Option<T1>, Vec<T2>, Vec<T3>, Vec<T4>, Vec<T5>);
pub type Guarded6<T1, T2, T3, T4, T5, T6> =
    (Option<T1>, Vec<T2>, Vec<T3>, Vec<T4>, Vec<T5>, Vec<T6>);
pub type Guarded7<T1, T2, T3, T4, T5, T6, T7> =
    (Option<T1>, Vec<T2>, Vec<T3>, Vec<T4>, Vec<T5>, Vec<T6>, Vec<T7>);
/// Six lists, all read regardless of content.
pub type Lists6<T1, T2, T3, T4, T5, T6> = (Vec<T1>, Vec<T2>, Vec<T3>, Vec<T4>, Vec<T5>, Vec<T6>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JsonRow;
    use serde_json::{Value as JsonValue, json};
    use std::collections::VecDeque;

    struct VecCursor {
        sets: VecDeque<Vec<JsonRow>>,
        advances: usize,
    }

    impl VecCursor {
        fn new(sizes: &[usize]) -> Self {
            let sets = sizes
                .iter()
                .map(|n| (0..*n).map(|i| row(i as i64)).collect())
                .collect();
            Self { sets, advances: 0 }
        }
    }

    impl ResultSetCursor for VecCursor {
        async fn next_set(&mut self) -> DalResult<Option<Vec<JsonRow>>> {
            self.advances += 1;
            Ok(self.sets.pop_front())
        }
    }

    fn row(id: i64) -> JsonRow {
        let mut map = JsonRow::new();
        map.insert("Id".to_string(), json!(id));
        map
    }

    #[tokio::test]
    async fn test_guard_present_reads_everything() {
        let mut cursor = VecCursor::new(&[1, 3, 2]);
        let slots = [SlotMode::Single, SlotMode::List, SlotMode::List];
        let out = read_slots(&mut cursor, &slots, true).await.unwrap();

        assert_eq!(cursor.advances, 3);
        let counts: Vec<usize> = out.iter().map(SlotData::row_count).collect();
        assert_eq!(counts, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_guard_absent_stops_after_first_set() {
        let mut cursor = VecCursor::new(&[0, 3, 2]);
        let slots = [SlotMode::Single, SlotMode::List, SlotMode::List];
        let out = read_slots(&mut cursor, &slots, true).await.unwrap();

        assert_eq!(cursor.advances, 1);
        assert!(out.iter().all(SlotData::is_absent));
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn test_guard_null_row_stops_after_first_set() {
        let mut null_row = JsonRow::new();
        null_row.insert("Id".to_string(), JsonValue::Null);
        let mut cursor = VecCursor {
            sets: VecDeque::from([vec![null_row], vec![row(1), row(2)]]),
            advances: 0,
        };
        let slots = [SlotMode::Single, SlotMode::List];
        let out = read_slots(&mut cursor, &slots, true).await.unwrap();

        assert_eq!(cursor.advances, 1);
        assert_eq!(out, vec![SlotData::Single(None), SlotData::List(Vec::new())]);
    }

    #[tokio::test]
    async fn test_unguarded_keeps_null_row() {
        let mut null_row = JsonRow::new();
        null_row.insert("Id".to_string(), JsonValue::Null);
        let mut cursor = VecCursor {
            sets: VecDeque::from([vec![null_row.clone()], vec![row(1)]]),
            advances: 0,
        };
        let slots = [SlotMode::Single, SlotMode::List];
        let out = read_slots(&mut cursor, &slots, false).await.unwrap();

        assert_eq!(cursor.advances, 2);
        assert_eq!(out[0], SlotData::Single(Some(null_row)));
    }

    #[tokio::test]
    async fn test_unguarded_reads_through_empty_sets() {
        let mut cursor = VecCursor::new(&[0, 2, 0, 1, 0, 3]);
        let slots = [SlotMode::List; 6];
        let out = read_slots(&mut cursor, &slots, false).await.unwrap();

        assert_eq!(cursor.advances, 6);
        let counts: Vec<usize> = out.iter().map(SlotData::row_count).collect();
        assert_eq!(counts, vec![0, 2, 0, 1, 0, 3]);
    }

    #[tokio::test]
    async fn test_missing_sets_read_as_empty() {
        let mut cursor = VecCursor::new(&[1]);
        let slots = [SlotMode::Single, SlotMode::List];
        let out = read_slots(&mut cursor, &slots, true).await.unwrap();
        assert_eq!(out[1], SlotData::List(Vec::new()));
    }

    #[test]
    fn test_tuple_shapes() {
        let shape = <Guarded2<i64, i64>>::shape().unwrap();
        assert!(shape.is_guarded());
        assert_eq!(shape.slots(), &[SlotMode::Single, SlotMode::List]);

        let shape = <Guarded4<i64, i64, i64, i64>>::shape().unwrap();
        assert_eq!(
            shape.slots(),
            &[SlotMode::Single, SlotMode::Single, SlotMode::List, SlotMode::List]
        );

        let shape = <Lists6<i64, i64, i64, i64, i64, i64>>::shape().unwrap();
        assert!(!shape.is_guarded());
        assert_eq!(shape.len(), 6);

        assert_eq!(<Guarded7<i64, i64, i64, i64, i64, i64, i64>>::shape().unwrap().len(), 7);
    }

    #[test]
    fn test_from_slots_reports_failing_index() {
        let slots = vec![
            SlotData::Single(Some(row(7))),
            SlotData::List(vec![row(1)]),
            SlotData::List(vec![{
                let mut bad = JsonRow::new();
                bad.insert("Id".to_string(), json!("x"));
                bad
            }]),
        ];
        let err = <Guarded3<i64, i64, i64>>::from_slots(slots).unwrap_err();
        assert_eq!(err.0, 2);
    }
}
