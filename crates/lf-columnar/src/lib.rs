#![forbid(unsafe_code)]

use lf_types::Cell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BlockError {
    #[error("row {row} out of range for length {len}")]
    RowOutOfRange { row: usize, len: usize },
    #[error("column {col} out of range for {count} columns")]
    ColumnOutOfRange { col: usize, count: usize },
}

/// Column-major cell storage: an ordered sequence of equally long columns.
///
/// Every mutation maintains the equal-length invariant eagerly, so the row
/// count is well-defined at all times. Growth operations never shrink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStore {
    blocks: Vec<Vec<Cell>>,
}

impl BlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from whole columns, padding each with nulls to the
    /// longest length so the equal-length invariant holds from the start.
    #[must_use]
    pub fn from_columns(columns: Vec<Vec<Cell>>) -> Self {
        let mut store = Self::new();
        for column in columns {
            store.add(column);
        }
        store
    }

    /// Number of columns.
    #[must_use]
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    /// Number of rows.
    #[must_use]
    pub fn length(&self) -> usize {
        self.blocks.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Grow to at least `cols` columns and `rows` rows. New columns are
    /// entirely null; new cells in existing columns are null. Never shrinks.
    pub fn reshape(&mut self, cols: usize, rows: usize) {
        let current_rows = self.length();
        for _ in self.blocks.len()..cols {
            self.blocks.push(vec![Cell::Null; current_rows]);
        }
        for block in &mut self.blocks {
            if block.len() < rows {
                block.resize(rows, Cell::Null);
            }
        }
    }

    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> Option<&Cell> {
        self.blocks.get(col).and_then(|block| block.get(row))
    }

    pub fn set(&mut self, col: usize, row: usize, value: Cell) -> Result<(), BlockError> {
        let count = self.blocks.len();
        let block = self
            .blocks
            .get_mut(col)
            .ok_or(BlockError::ColumnOutOfRange { col, count })?;
        let len = block.len();
        let cell = block
            .get_mut(row)
            .ok_or(BlockError::RowOutOfRange { row, len })?;
        *cell = value;
        Ok(())
    }

    /// Materialize row `row` as a fresh sequence of length `size()`.
    /// The result does not alias column storage.
    pub fn row(&self, row: usize) -> Result<Vec<Cell>, BlockError> {
        if row >= self.length() {
            return Err(BlockError::RowOutOfRange {
                row,
                len: self.length(),
            });
        }
        Ok(self
            .blocks
            .iter()
            .map(|block| block[row].clone())
            .collect())
    }

    #[must_use]
    pub fn column(&self, col: usize) -> Option<&[Cell]> {
        self.blocks.get(col).map(Vec::as_slice)
    }

    /// Append `column` as the last column. A short column is right-padded
    /// with nulls to the current row count; a long one grows every other
    /// column to its length first.
    pub fn add(&mut self, mut column: Vec<Cell>) {
        let rows = self.length();
        if column.len() < rows {
            column.resize(rows, Cell::Null);
        } else if column.len() > rows {
            let target = column.len();
            for block in &mut self.blocks {
                block.resize(target, Cell::Null);
            }
        }
        self.blocks.push(column);
    }

    /// Remove column `col`; later columns shift left. Out of range is a
    /// silent no-op.
    pub fn drop_col(&mut self, col: usize) {
        if col < self.blocks.len() {
            self.blocks.remove(col);
        }
    }

    /// Remove row `row` from every column.
    pub fn del_row(&mut self, row: usize) -> Result<(), BlockError> {
        if row >= self.length() {
            return Err(BlockError::RowOutOfRange {
                row,
                len: self.length(),
            });
        }
        for block in &mut self.blocks {
            block.remove(row);
        }
        Ok(())
    }
}
