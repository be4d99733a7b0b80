#![forbid(unsafe_code)]

//! Shared fixtures for the end-to-end and property suites in `tests/`.

use lf_frame::{Frame, FrameError};
use lf_types::Cell;

/// Build a frame from literal rows.
pub fn frame_from_rows(names: &[&str], rows: Vec<Vec<Cell>>) -> Result<Frame, FrameError> {
    let mut frame = Frame::new(names.iter().copied())?;
    for row in rows {
        frame.append(row)?;
    }
    Ok(frame)
}

/// Materialize every row of `frame` for whole-table assertions.
#[must_use]
pub fn rows_of(frame: &Frame) -> Vec<Vec<Cell>> {
    frame.rows().collect()
}
