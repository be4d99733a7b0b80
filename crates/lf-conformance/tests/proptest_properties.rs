#![forbid(unsafe_code)]

//! Property suite for the frame invariants: generated inputs cover the
//! (shape x null-pattern x operation) space instead of hand-picked fixtures.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use lf_frame::Frame;
use lf_join::{JoinType, join_on};
use lf_types::{Cell, CellKey};

// ---------------------------------------------------------------------------
// Strategy generators
// ---------------------------------------------------------------------------

/// Numeric-or-null cells keep every generated column totally orderable.
fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        4 => (-50i64..50).prop_map(Cell::Int),
        1 => Just(Cell::Null),
    ]
}

fn arb_frame(max_cols: usize, max_rows: usize) -> impl Strategy<Value = Frame> {
    (1..=max_cols, 0..=max_rows).prop_flat_map(|(cols, rows)| {
        proptest::collection::vec(proptest::collection::vec(arb_cell(), cols), rows).prop_map(
            move |row_data| {
                let names: Vec<String> = (0..cols).map(|i| format!("c{i}")).collect();
                let mut frame = Frame::new(names).expect("generated names are unique");
                for row in row_data {
                    frame.append(row).expect("generated row matches schema");
                }
                frame
            },
        )
    })
}

/// A frame keyed by a unique `id` column, plus one value column.
fn arb_keyed_frame(value_name: &'static str) -> impl Strategy<Value = Frame> {
    proptest::collection::hash_set(0i64..30, 0..10).prop_flat_map(move |keys| {
        let keys: Vec<i64> = keys.into_iter().collect();
        let len = keys.len();
        proptest::collection::vec(arb_cell(), len).prop_map(move |values| {
            let mut frame = Frame::new(["id", value_name]).expect("schema builds");
            for (key, value) in keys.iter().zip(values) {
                frame
                    .append(vec![Cell::Int(*key), value])
                    .expect("row matches schema");
            }
            frame
        })
    })
}

fn row_counts(frame: &Frame) -> HashMap<Vec<CellKey>, usize> {
    let mut counts = HashMap::new();
    for row in frame.rows() {
        let key: Vec<CellKey> = row.iter().map(Cell::key).collect();
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

fn key_set(frame: &Frame) -> HashSet<CellKey> {
    frame
        .column("id")
        .expect("keyed frame has an id column")
        .iter()
        .map(Cell::key)
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// P1 + P3: the name map is the inverse of the name list, and names are
    /// pairwise distinct.
    #[test]
    fn prop_col_index_inverts_columns(frame in arb_frame(4, 12)) {
        let names = frame.columns();
        let distinct: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(distinct.len(), names.len());
        for (position, name) in names.iter().enumerate() {
            prop_assert_eq!(frame.col_index(name), Some(position));
        }
    }

    /// P2: every column has exactly `length()` cells.
    #[test]
    fn prop_columns_share_the_row_count(frame in arb_frame(4, 12)) {
        for col in 0..frame.size() {
            let column = frame.column(col).expect("column in range");
            prop_assert_eq!(column.len(), frame.length());
        }
    }

    /// P4: a clone is equal, and mutating it leaves the original unchanged.
    #[test]
    fn prop_clone_is_deep(frame in arb_frame(3, 8)) {
        let mut copy = frame.clone();
        prop_assert_eq!(&copy, &frame);
        copy.add("scratch").expect("fresh name");
        if copy.length() > 0 {
            copy.set(0, "scratch", Cell::Int(999)).expect("set");
        }
        prop_assert_eq!(frame.col_index("scratch"), None);
        prop_assert_eq!(frame.size() + 1, copy.size());
    }

    /// P5: sorting an already sorted frame changes nothing, and equal keys
    /// keep their insertion order (checked via an injected sequence column).
    #[test]
    fn prop_sort_is_idempotent_and_stable(frame in arb_frame(1, 12)) {
        let mut tagged = Frame::new(["k", "seq"]).expect("schema builds");
        for (position, row) in frame.rows().enumerate() {
            tagged
                .append(vec![row[0].clone(), Cell::Int(position as i64)])
                .expect("tagged row");
        }

        let once = tagged.sort_by(&["k"]).expect("sort");
        let twice = once.sort_by(&["k"]).expect("sort again");
        prop_assert_eq!(&once, &twice);

        let keys: Vec<CellKey> = once.column("k").expect("column").iter().map(Cell::key).collect();
        let seqs: Vec<Cell> = once.column("seq").expect("column").to_vec();
        for window in 0..keys.len().saturating_sub(1) {
            if keys[window] == keys[window + 1] {
                match (&seqs[window], &seqs[window + 1]) {
                    (Cell::Int(a), Cell::Int(b)) => {
                        prop_assert!(a < b, "equal keys out of insertion order");
                    }
                    _ => prop_assert!(false, "sequence column must stay Int"),
                }
            }
        }
    }

    /// P6: sorting permutes the rows — the multiset of rows is unchanged.
    #[test]
    fn prop_sort_preserves_the_row_multiset(frame in arb_frame(3, 12)) {
        let specs: Vec<String> = frame.columns().to_vec();
        let spec_refs: Vec<&str> = specs.iter().map(String::as_str).collect();
        let sorted = frame.sort_by(&spec_refs).expect("sort by every column");
        prop_assert_eq!(sorted.length(), frame.length());
        prop_assert_eq!(row_counts(&sorted), row_counts(&frame));
    }

    /// P7: join row counts over unique keys follow set arithmetic.
    #[test]
    fn prop_join_counts_follow_key_sets(
        left in arb_keyed_frame("a"),
        right in arb_keyed_frame("b"),
    ) {
        let left_keys = key_set(&left);
        let right_keys = key_set(&right);

        let inner = join_on(&left, &right, JoinType::Inner, "id").expect("inner");
        prop_assert_eq!(inner.length(), left_keys.intersection(&right_keys).count());

        let outer = join_on(&left, &right, JoinType::Outer, "id").expect("outer");
        prop_assert_eq!(outer.length(), left_keys.union(&right_keys).count());

        let left_join = join_on(&left, &right, JoinType::Left, "id").expect("left");
        prop_assert_eq!(left_join.length(), left_keys.len());

        let right_join = join_on(&left, &right, JoinType::Right, "id").expect("right");
        prop_assert_eq!(right_join.length(), right_keys.len());
    }

    /// P8: unique never grows the frame and is idempotent.
    #[test]
    fn prop_unique_shrinks_and_is_idempotent(frame in arb_frame(2, 12)) {
        let once = frame.unique(["c0"]).expect("unique");
        prop_assert!(once.length() <= frame.length());
        let twice = once.unique(["c0"]).expect("unique again");
        prop_assert_eq!(&once, &twice);
    }

    /// P9: dropping a column removes its name and shrinks the schema by one.
    #[test]
    fn prop_drop_removes_the_column(frame in arb_frame(3, 8)) {
        let mut frame = frame;
        let victim = frame.columns()[0].clone();
        let before = frame.size();
        frame.drop([victim.as_str()]).expect("drop");
        prop_assert_eq!(frame.col_index(&victim), None);
        prop_assert_eq!(frame.size(), before - 1);
    }

    /// P10: appending a row and reading the last row gives it back.
    #[test]
    fn prop_append_round_trips(frame in arb_frame(4, 8), seed in proptest::collection::vec(arb_cell(), 4)) {
        let mut frame = frame;
        let row: Vec<Cell> = seed.into_iter().take(frame.size()).collect();
        prop_assume!(row.len() == frame.size());
        frame.append(row.clone()).expect("append");
        let read = frame.row(frame.length() - 1).expect("last row");
        prop_assert_eq!(read, row);
    }
}
