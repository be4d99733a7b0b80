#![forbid(unsafe_code)]

use std::{collections::HashMap, mem::size_of};

use bumpalo::{Bump, collections::Vec as BumpVec};
use lf_frame::{Frame, FrameError};
use lf_types::{Cell, CellKey};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
}

#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join key is not unique: {key}")]
    DuplicateJoinKey { key: Cell },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub const DEFAULT_ARENA_BUDGET_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinExecutionOptions {
    pub use_arena: bool,
    pub arena_budget_bytes: usize,
}

impl Default for JoinExecutionOptions {
    fn default() -> Self {
        Self {
            use_arena: true,
            arena_budget_bytes: DEFAULT_ARENA_BUDGET_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JoinExecutionTrace {
    used_arena: bool,
    output_rows: usize,
    estimated_bytes: usize,
}

/// One planned output row: positions into the driving and following frames.
/// `driving` is `None` only for the outer-join tail rows; `following` is
/// `None` for unmatched driving rows outside an inner join.
type RowPlan = (Option<usize>, Option<usize>);

/// Everything the planning and materialization phases need, resolved once.
struct JoinContext<'a> {
    driving: &'a Frame,
    following: &'a Frame,
    driving_key: usize,
    following_key: usize,
    driving_keys: Vec<CellKey>,
    following_keys: Vec<CellKey>,
    driving_map: HashMap<CellKey, usize>,
    following_map: HashMap<CellKey, usize>,
    how: JoinType,
    key: &'a str,
}

/// Join two frames on the shared key column `key`.
///
/// The join is 1:1 on key: a duplicate key on either side fails. The left
/// frame drives row order for `Inner`/`Left`/`Outer`; the right frame
/// drives for `Right`. Non-key column names shared by both sides come out
/// suffixed `_left`/`_right`; the key column appears exactly once.
pub fn join_on(left: &Frame, right: &Frame, how: JoinType, key: &str) -> Result<Frame, JoinError> {
    join_on_with_options(left, right, how, key, JoinExecutionOptions::default())
}

pub fn join_on_with_options(
    left: &Frame,
    right: &Frame,
    how: JoinType,
    key: &str,
    options: JoinExecutionOptions,
) -> Result<Frame, JoinError> {
    let (joined, _) = join_on_with_trace(left, right, how, key, options)?;
    Ok(joined)
}

fn join_on_with_trace(
    left: &Frame,
    right: &Frame,
    how: JoinType,
    key: &str,
    options: JoinExecutionOptions,
) -> Result<(Frame, JoinExecutionTrace), JoinError> {
    let left_key = left
        .col_index(key)
        .ok_or_else(|| FrameError::UnknownColumn {
            name: key.to_owned(),
        })?;
    let right_key = right
        .col_index(key)
        .ok_or_else(|| FrameError::UnknownColumn {
            name: key.to_owned(),
        })?;

    // The driving side defines primary row order; Right swaps the roles.
    let (driving, following, driving_key, following_key) = match how {
        JoinType::Right => (right, left, right_key, left_key),
        _ => (left, right, left_key, right_key),
    };

    let (driving_keys, driving_map) = key_column(driving, driving_key)?;
    let (following_keys, following_map) = key_column(following, following_key)?;

    let ctx = JoinContext {
        driving,
        following,
        driving_key,
        following_key,
        driving_keys,
        following_keys,
        driving_map,
        following_map,
        how,
        key,
    };

    let output_rows = estimate_output_rows(&ctx);
    let estimated_bytes = output_rows.saturating_mul(size_of::<RowPlan>());
    let use_arena = options.use_arena && estimated_bytes <= options.arena_budget_bytes;

    let joined = if use_arena {
        join_with_arena(&ctx, output_rows)?
    } else {
        join_with_global_allocator(&ctx, output_rows)?
    };

    Ok((
        joined,
        JoinExecutionTrace {
            used_arena: use_arena,
            output_rows,
            estimated_bytes,
        },
    ))
}

/// Extract the key column as `CellKey`s and build the key→row map,
/// rejecting duplicate keys. Null keys participate and match only null.
fn key_column(
    frame: &Frame,
    key_col: usize,
) -> Result<(Vec<CellKey>, HashMap<CellKey, usize>), JoinError> {
    let cells = frame
        .column(key_col)
        .expect("key column index was resolved on this frame");
    let mut keys = Vec::with_capacity(cells.len());
    let mut map = HashMap::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        let key = cell.key();
        if map.insert(key.clone(), row).is_some() {
            return Err(JoinError::DuplicateJoinKey { key: cell.clone() });
        }
        keys.push(key);
    }
    Ok((keys, map))
}

fn estimate_output_rows(ctx: &JoinContext<'_>) -> usize {
    match ctx.how {
        JoinType::Inner => ctx
            .driving_keys
            .iter()
            .filter(|key| ctx.following_map.contains_key(key))
            .count(),
        JoinType::Left | JoinType::Right => ctx.driving_keys.len(),
        JoinType::Outer => {
            let tail = ctx
                .following_keys
                .iter()
                .filter(|key| !ctx.driving_map.contains_key(key))
                .count();
            ctx.driving_keys.len() + tail
        }
    }
}

/// Phase one: emit `(driving_pos, following_pos)` pairs in output order —
/// driving rows first, then (outer only) the unmatched following rows.
fn plan_rows(ctx: &JoinContext<'_>, mut emit: impl FnMut(RowPlan)) {
    for (driving_pos, key) in ctx.driving_keys.iter().enumerate() {
        match ctx.following_map.get(key) {
            Some(&following_pos) => emit((Some(driving_pos), Some(following_pos))),
            None if ctx.how == JoinType::Inner => {}
            None => emit((Some(driving_pos), None)),
        }
    }

    if ctx.how == JoinType::Outer {
        for (following_pos, key) in ctx.following_keys.iter().enumerate() {
            if !ctx.driving_map.contains_key(key) {
                emit((None, Some(following_pos)));
            }
        }
    }
}

fn join_with_global_allocator(
    ctx: &JoinContext<'_>,
    output_rows: usize,
) -> Result<Frame, JoinError> {
    let mut plan = Vec::with_capacity(output_rows);
    plan_rows(ctx, |entry| plan.push(entry));
    materialize(ctx, &plan)
}

fn join_with_arena(ctx: &JoinContext<'_>, output_rows: usize) -> Result<Frame, JoinError> {
    let arena = Bump::new();
    let mut plan = BumpVec::with_capacity_in(output_rows, &arena);
    plan_rows(ctx, |entry| plan.push(entry));
    materialize(ctx, plan.as_slice())
}

/// Phase two: build the combined schema, append one row per plan entry,
/// then collapse the key pair down to a single key column.
fn materialize(ctx: &JoinContext<'_>, plan: &[RowPlan]) -> Result<Frame, JoinError> {
    let (driving_suffix, following_suffix) = match ctx.how {
        JoinType::Right => ("right", "left"),
        _ => ("left", "right"),
    };

    let mut names: Vec<String> = ctx.driving.columns().to_vec();
    for name in ctx.following.columns() {
        if let Some(position) = names.iter().position(|existing| existing == name) {
            names[position] = format!("{name}_{driving_suffix}");
            names.push(format!("{name}_{following_suffix}"));
        } else {
            names.push(name.clone());
        }
    }

    let mut out = Frame::new(names).map_err(JoinError::Frame)?;
    for &(driving_pos, following_pos) in plan {
        let mut row = match driving_pos {
            Some(pos) => ctx.driving.row(pos).map_err(JoinError::Frame)?,
            None => {
                // Outer tail: null driving half, except the key slot is
                // copied in so the collapsed key column stays populated.
                let following_pos =
                    following_pos.expect("outer tail rows carry a following position");
                let mut padded = vec![Cell::Null; ctx.driving.size()];
                padded[ctx.driving_key] = ctx
                    .following
                    .get(following_pos, ctx.following_key)
                    .map_err(JoinError::Frame)?
                    .clone();
                padded
            }
        };
        match following_pos {
            Some(pos) => row.extend(ctx.following.row(pos).map_err(JoinError::Frame)?),
            None => row.extend(vec![Cell::Null; ctx.following.size()]),
        }
        out.append(row).map_err(JoinError::Frame)?;
    }

    out.rename(&format!("{key}_left", key = ctx.key), ctx.key)
        .map_err(JoinError::Frame)?;
    out.drop([format!("{key}_right", key = ctx.key)])
        .map_err(JoinError::Frame)?;

    Ok(out)
}
