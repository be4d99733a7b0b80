#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use lf_columnar::{BlockError, BlockStore};
use lf_types::{Cell, CellError, CellKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },
    #[error("duplicate column '{name}'")]
    DuplicateColumn { name: String },
    #[error("row {row} out of range for length {len}")]
    RowOutOfRange { row: usize, len: usize },
    #[error("column index {col} out of range for {count} columns")]
    ColumnOutOfRange { col: usize, count: usize },
    #[error("row of length {found} does not match column count {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Block(#[from] BlockError),
}

/// Addresses a column either by position or by name. `From` impls let the
/// public surface accept both interchangeably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

impl From<usize> for ColumnSelector {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl From<&str> for ColumnSelector {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for ColumnSelector {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// An in-memory table: an ordered column-name list, its inverse lookup map,
/// and column-major cell storage. All columns share one value domain
/// ([`Cell`]) and equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    index: HashMap<String, usize>,
    store: BlockStore,
}

impl Frame {
    /// Create an empty frame with the given column names.
    /// Fails on a duplicate name.
    pub fn new<I, S>(columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(FrameError::DuplicateColumn { name: name.clone() });
            }
        }
        let mut store = BlockStore::new();
        store.reshape(names.len(), 0);
        Ok(Self {
            names,
            index,
            store,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.names
    }

    /// Position of `name` in [`columns`](Self::columns), or `None` if the
    /// frame has no such column.
    #[must_use]
    pub fn col_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of columns.
    #[must_use]
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Number of rows.
    #[must_use]
    pub fn length(&self) -> usize {
        self.store.length()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    fn resolve(&self, selector: &ColumnSelector) -> Result<usize, FrameError> {
        match selector {
            ColumnSelector::Index(col) => {
                if *col < self.size() {
                    Ok(*col)
                } else {
                    Err(FrameError::ColumnOutOfRange {
                        col: *col,
                        count: self.size(),
                    })
                }
            }
            ColumnSelector::Name(name) => {
                self.index
                    .get(name)
                    .copied()
                    .ok_or_else(|| FrameError::UnknownColumn { name: name.clone() })
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, name) in self.names.iter().enumerate() {
            self.index.insert(name.clone(), position);
        }
    }

    /// Append one row. The row length must equal the column count; the
    /// store is only grown after that check, so a rejected row leaves the
    /// frame untouched.
    pub fn append(&mut self, row: Vec<Cell>) -> Result<&mut Self, FrameError> {
        if row.len() != self.size() {
            return Err(FrameError::ShapeMismatch {
                expected: self.size(),
                found: row.len(),
            });
        }
        let new_row = self.length();
        self.store.reshape(self.size(), new_row + 1);
        for (col, cell) in row.into_iter().enumerate() {
            self.store
                .set(col, new_row, cell)
                .expect("reshaped store must contain the new row");
        }
        Ok(self)
    }

    /// Append a null-filled column named `name`.
    pub fn add(&mut self, name: impl Into<String>) -> Result<&mut Self, FrameError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(FrameError::DuplicateColumn { name });
        }
        self.index.insert(name.clone(), self.names.len());
        self.names.push(name);
        self.store.add(Vec::new());
        Ok(self)
    }

    /// Remove the selected columns. Names are resolved to positions before
    /// any removal; positions are then deduplicated and removed in
    /// descending order, so index- and name-based selectors compose. All
    /// selectors are validated up front and a failed call removes nothing.
    pub fn drop<I, S>(&mut self, columns: I) -> Result<&mut Self, FrameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnSelector>,
    {
        let mut positions = Vec::new();
        for selector in columns {
            positions.push(self.resolve(&selector.into())?);
        }
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();
        for col in positions {
            let name = self.names.remove(col);
            self.index.remove(&name);
            self.store.drop_col(col);
        }
        self.rebuild_index();
        Ok(self)
    }

    /// Remove the given rows. Indices are validated against the current row
    /// count before any removal, then deduplicated and removed in
    /// descending order.
    pub fn drop_rows(&mut self, rows: &[usize]) -> Result<&mut Self, FrameError> {
        let len = self.length();
        for &row in rows {
            if row >= len {
                return Err(FrameError::RowOutOfRange { row, len });
            }
        }
        let mut ordered = rows.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        for row in ordered {
            self.store.del_row(row)?;
        }
        Ok(self)
    }

    /// Rename column `old` to `new`. Renaming to any name already present
    /// fails, including the identity rename `old == new`.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> Result<&mut Self, FrameError> {
        let new = new.into();
        let col = self
            .index
            .get(old)
            .copied()
            .ok_or_else(|| FrameError::UnknownColumn {
                name: old.to_owned(),
            })?;
        if self.index.contains_key(&new) {
            return Err(FrameError::DuplicateColumn { name: new });
        }
        self.names[col] = new;
        self.rebuild_index();
        Ok(self)
    }

    /// Apply `(old, new)` renames in order.
    pub fn rename_map(&mut self, mapping: &[(&str, &str)]) -> Result<&mut Self, FrameError> {
        for (old, new) in mapping {
            self.rename(old, *new)?;
        }
        Ok(self)
    }

    pub fn get(&self, row: usize, column: impl Into<ColumnSelector>) -> Result<&Cell, FrameError> {
        let col = self.resolve(&column.into())?;
        self.store.get(col, row).ok_or(FrameError::RowOutOfRange {
            row,
            len: self.length(),
        })
    }

    pub fn set(
        &mut self,
        row: usize,
        column: impl Into<ColumnSelector>,
        value: impl Into<Cell>,
    ) -> Result<(), FrameError> {
        let col = self.resolve(&column.into())?;
        self.store.set(col, row, value.into())?;
        Ok(())
    }

    /// Materialize row `row` as a fresh sequence; mutating it does not
    /// touch the frame.
    pub fn row(&self, row: usize) -> Result<Vec<Cell>, FrameError> {
        Ok(self.store.row(row)?)
    }

    /// Borrow the selected column's cells, or `None` when the selector does
    /// not resolve.
    #[must_use]
    pub fn column(&self, column: impl Into<ColumnSelector>) -> Option<&[Cell]> {
        let col = self.resolve(&column.into()).ok()?;
        self.store.column(col)
    }

    /// Iterate rows in insertion order. The row count is captured at
    /// creation; the shared borrow rules out structural mutation while the
    /// iterator is live.
    #[must_use]
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            frame: self,
            next: 0,
            len: self.length(),
        }
    }

    /// Reduce to the rows whose cell tuple at the selected columns has not
    /// been seen before, preserving insertion order.
    pub fn unique<I, S>(&self, columns: I) -> Result<Self, FrameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnSelector>,
    {
        let mut cols = Vec::new();
        for selector in columns {
            cols.push(self.resolve(&selector.into())?);
        }
        let mut out = Self::new(self.names.clone())?;
        let mut seen: HashSet<Vec<CellKey>> = HashSet::new();
        for row in 0..self.length() {
            let key: Vec<CellKey> = cols
                .iter()
                .map(|&col| {
                    self.store
                        .get(col, row)
                        .expect("resolved column and in-range row")
                        .key()
                })
                .collect();
            if seen.insert(key) {
                out.append(self.store.row(row)?)?;
            }
        }
        Ok(out)
    }

    /// Replace every null cell of the selected column with `value`.
    pub fn fill_na(
        &mut self,
        column: impl Into<ColumnSelector>,
        value: &Cell,
    ) -> Result<&mut Self, FrameError> {
        let col = self.resolve(&column.into())?;
        for row in 0..self.length() {
            if self.store.get(col, row).is_some_and(Cell::is_null) {
                self.store.set(col, row, value.clone())?;
            }
        }
        Ok(self)
    }

    /// Per-column null fill: each `(name, value)` entry behaves like
    /// [`fill_na`](Self::fill_na) on that column.
    pub fn fill_na_map(&mut self, mapping: &[(&str, Cell)]) -> Result<&mut Self, FrameError> {
        for (name, value) in mapping {
            self.fill_na(*name, value)?;
        }
        Ok(self)
    }

    /// Copy cells from `source` into `target`; with `only_na` set, only
    /// null target cells are overwritten.
    pub fn copy_column(
        &mut self,
        source: impl Into<ColumnSelector>,
        target: impl Into<ColumnSelector>,
        only_na: bool,
    ) -> Result<&mut Self, FrameError> {
        let source = self.resolve(&source.into())?;
        let target = self.resolve(&target.into())?;
        for row in 0..self.length() {
            if only_na && !self.store.get(target, row).is_some_and(Cell::is_null) {
                continue;
            }
            let value = self
                .store
                .get(source, row)
                .expect("resolved column and in-range row")
                .clone();
            self.store.set(target, row, value)?;
        }
        Ok(self)
    }

    /// Smallest non-null cell of the column, `None` when every cell is null.
    pub fn min(&self, column: impl Into<ColumnSelector>) -> Result<Option<Cell>, FrameError> {
        self.extremum(column.into(), Ordering::Less)
    }

    /// Largest non-null cell of the column, `None` when every cell is null.
    pub fn max(&self, column: impl Into<ColumnSelector>) -> Result<Option<Cell>, FrameError> {
        self.extremum(column.into(), Ordering::Greater)
    }

    fn extremum(
        &self,
        column: ColumnSelector,
        keep: Ordering,
    ) -> Result<Option<Cell>, FrameError> {
        let col = self.resolve(&column)?;
        let cells = self.store.column(col).expect("resolved column exists");
        let mut best: Option<&Cell> = None;
        for cell in cells {
            if cell.is_null() {
                continue;
            }
            match best {
                None => best = Some(cell),
                Some(current) => {
                    if cell.try_cmp(current)? == keep {
                        best = Some(cell);
                    }
                }
            }
        }
        Ok(best.cloned())
    }

    /// Sort by the named columns; a leading `-` requests descending order
    /// on that column. Caller order is the tie-break precedence.
    pub fn sort_by(&self, columns: &[&str]) -> Result<Self, FrameError> {
        let mut priorities = Vec::with_capacity(columns.len());
        for &spec in columns {
            let (name, direction) = match spec.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Descending),
                None => (spec, SortDirection::Ascending),
            };
            let col = self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| FrameError::UnknownColumn {
                    name: name.to_owned(),
                })?;
            priorities.push((col, direction));
        }
        sort_by_priorities(self, &priorities)
    }
}

impl Serialize for Frame {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Frame", 2)?;
        state.serialize_field("names", &self.names)?;
        state.serialize_field("store", &self.store)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            names: Vec<String>,
            store: BlockStore,
        }
        let raw = Raw::deserialize(deserializer)?;
        if raw.store.size() != raw.names.len() {
            return Err(serde::de::Error::custom(format!(
                "store has {} columns but {} names",
                raw.store.size(),
                raw.names.len()
            )));
        }
        let mut frame = Frame::new(raw.names).map_err(serde::de::Error::custom)?;
        frame.store = raw.store;
        Ok(frame)
    }
}

pub struct Rows<'a> {
    frame: &'a Frame,
    next: usize,
    len: usize,
}

impl Iterator for Rows<'_> {
    type Item = Vec<Cell>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let row = self
            .frame
            .store
            .row(self.next)
            .expect("snapshot row is in range");
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Rows<'_> {}

impl<'a> IntoIterator for &'a Frame {
    type Item = Vec<Cell>;
    type IntoIter = Rows<'a>;

    fn into_iter(self) -> Rows<'a> {
        self.rows()
    }
}

// ── Sorting ────────────────────────────────────────────────────────────

/// Stable indirect sort: order `[0, row_count)` by walking the priority
/// list, then append the source rows in that order into a fresh frame with
/// the same schema. The first non-equal comparison decides; equal rows keep
/// their original order.
pub fn sort_by_priorities(
    frame: &Frame,
    priorities: &[(usize, SortDirection)],
) -> Result<Frame, FrameError> {
    for &(col, _) in priorities {
        if col >= frame.size() {
            return Err(FrameError::ColumnOutOfRange {
                col,
                count: frame.size(),
            });
        }
    }

    let mut order: Vec<usize> = (0..frame.length()).collect();
    // sort_by needs an infallible comparator; the first comparison failure
    // is parked here and aborts the sort afterwards.
    let mut failure: Option<CellError> = None;
    order.sort_by(|&left, &right| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match compare_rows(frame, left, right, priorities) {
            Ok(ordering) => ordering,
            Err(err) => {
                failure = Some(err);
                Ordering::Equal
            }
        }
    });
    if let Some(err) = failure {
        return Err(err.into());
    }

    let mut sorted = Frame::new(frame.names.clone())?;
    for row in order {
        sorted.append(frame.store.row(row)?)?;
    }
    Ok(sorted)
}

/// Nulls compare greater than every value before the direction multiplier
/// applies, so they land last ascending and first descending.
fn compare_rows(
    frame: &Frame,
    left: usize,
    right: usize,
    priorities: &[(usize, SortDirection)],
) -> Result<Ordering, CellError> {
    for &(col, direction) in priorities {
        let lhs = frame
            .store
            .get(col, left)
            .expect("validated priority column and in-range row");
        let rhs = frame
            .store
            .get(col, right)
            .expect("validated priority column and in-range row");
        let mut ordering = lhs.try_cmp(rhs)?;
        if direction == SortDirection::Descending {
            ordering = ordering.reverse();
        }
        if ordering != Ordering::Equal {
            return Ok(ordering);
        }
    }
    Ok(Ordering::Equal)
}
