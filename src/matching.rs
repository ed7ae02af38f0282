use crate::{error::TrackError, lapjv::lapjv, rect::Rect};
use nalgebra::DMatrix;
use tracing::error;

/*-----------------------------------------------------------------------------
IoU affinity
-----------------------------------------------------------------------------*/

pub(crate) fn calc_ious(
    a_rects: &[Rect<f32>],
    b_rects: &[Rect<f32>],
) -> DMatrix<f32> {
    DMatrix::from_fn(a_rects.len(), b_rects.len(), |ai, bi| {
        a_rects[ai].calc_iou(&b_rects[bi])
    })
}

/// `1 - IoU` for every pair; shape `(a.len(), b.len())`.
///
/// Either side being empty yields a matrix with zero rows or columns. A pair
/// involving a degenerate box (zero height, NaN state) has no overlap and
/// costs 1.
pub(crate) fn iou_distance(
    a_rects: &[Rect<f32>],
    b_rects: &[Rect<f32>],
) -> DMatrix<f32> {
    if a_rects.is_empty() || b_rects.is_empty() {
        return DMatrix::zeros(a_rects.len(), b_rects.len());
    }
    calc_ious(a_rects, b_rects).map(|iou| {
        let dist = 1.0 - iou;
        if dist.is_finite() {
            dist
        } else {
            1.0
        }
    })
}

/*-----------------------------------------------------------------------------
Assignment
-----------------------------------------------------------------------------*/

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LapjvSolution {
    /// Column for each row, `-1` when the row is unmatched.
    pub(crate) rowsol: Vec<isize>,
    /// Row for each column, `-1` when the column is unmatched.
    pub(crate) colsol: Vec<isize>,
}

/// Runs LAPJV on a possibly rectangular cost matrix.
///
/// A rectangular matrix or a `cost_limit` embeds the `m x n` matrix in an
/// `(m + n) x (m + n)` one: the dummy blocks cost `cost_limit / 2` (or
/// `max + 1` without a limit) and the dummy-dummy block costs 0. A real pair
/// whose cost exceeds the limit is then always beaten by routing both ends
/// through dummies.
pub(crate) fn exec_lapjv(
    cost: &DMatrix<f32>,
    cost_limit: Option<f64>,
) -> Result<LapjvSolution, TrackError> {
    let n_rows = cost.nrows();
    let n_cols = cost.ncols();
    if n_rows == 0 || n_cols == 0 {
        return Err(TrackError::Lapjv(format!(
            "cost matrix must not be empty, but got {}x{}",
            n_rows, n_cols
        )));
    }

    let cost_c: DMatrix<f64> = if n_rows != n_cols || cost_limit.is_some() {
        let n = n_rows + n_cols;
        let fill = match cost_limit {
            Some(limit) => limit / 2.0,
            None => cost.max() as f64 + 1.0,
        };
        DMatrix::from_fn(n, n, |i, j| {
            if i < n_rows && j < n_cols {
                cost[(i, j)] as f64
            } else if i >= n_rows && j >= n_cols {
                0.0
            } else {
                fill
            }
        })
    } else {
        cost.map(|c| c as f64)
    };

    let n = cost_c.nrows();
    let mut x_c = vec![-1; n];
    let mut y_c = vec![-1; n];
    lapjv(&cost_c, &mut x_c, &mut y_c)?;

    let rowsol: Vec<isize> = x_c[..n_rows]
        .iter()
        .map(|&j| if j >= n_cols as isize { -1 } else { j })
        .collect();
    let colsol: Vec<isize> = y_c[..n_cols]
        .iter()
        .map(|&i| if i >= n_rows as isize { -1 } else { i })
        .collect();

    Ok(LapjvSolution { rowsol, colsol })
}

/// Result of a threshold-gated assignment between rows `a` and columns `b`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AssignmentResult {
    /// `(row, col)` pairs.
    pub(crate) matches: Vec<(usize, usize)>,
    pub(crate) unmatched_a: Vec<usize>,
    pub(crate) unmatched_b: Vec<usize>,
}

impl AssignmentResult {
    fn all_unmatched(n_rows: usize, n_cols: usize) -> Self {
        Self {
            matches: Vec::new(),
            unmatched_a: (0..n_rows).collect(),
            unmatched_b: (0..n_cols).collect(),
        }
    }
}

/// Minimum-cost matching that leaves every pair costing more than `thresh`
/// unmatched.
///
/// An empty side skips the solver entirely. A solver failure is a broken
/// internal contract: it panics in debug builds and reports everything as
/// unmatched otherwise.
pub(crate) fn linear_assignment(
    cost: &DMatrix<f32>,
    thresh: f32,
) -> AssignmentResult {
    let (n_rows, n_cols) = cost.shape();
    if n_rows == 0 || n_cols == 0 {
        return AssignmentResult::all_unmatched(n_rows, n_cols);
    }

    let solution = match exec_lapjv(cost, Some(thresh as f64)) {
        Ok(solution) => solution,
        Err(err) => {
            error!(%err, n_rows, n_cols, "assignment solver failed");
            if cfg!(debug_assertions) {
                panic!("assignment solver failed: {}", err);
            }
            return AssignmentResult::all_unmatched(n_rows, n_cols);
        }
    };

    let mut result = AssignmentResult::default();
    for (i, &j) in solution.rowsol.iter().enumerate() {
        if j >= 0 {
            result.matches.push((i, j as usize));
        } else {
            result.unmatched_a.push(i);
        }
    }
    result.unmatched_b = solution
        .colsol
        .iter()
        .enumerate()
        .filter(|(_, i)| **i < 0)
        .map(|(j, _)| j)
        .collect();
    result
}
