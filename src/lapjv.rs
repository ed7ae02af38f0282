use crate::error::TrackError;
use nalgebra::DMatrix;

/* -----------------------------------------------------------------------------
 * lapjv.rs - Jonker-Volgenant linear assignment algorithm
 * ----------------------------------------------------------------------------- */

const LARGE: f64 = 1_000_000.0;

/// Column reduction and reduction transfer.
fn ccrt_dense(
    n: usize,
    cost: &DMatrix<f64>,
    free_rows: &mut [usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) -> usize {
    x.fill(-1);
    v.fill(LARGE);
    y.fill(0);
    for i in 0..n {
        for j in 0..n {
            let c = cost[(i, j)];
            if c < v[j] {
                v[j] = c;
                y[j] = i as isize;
            }
        }
    }

    let mut unique = vec![true; n];
    for j in (0..n).rev() {
        let i = y[j] as usize;
        if x[i] < 0 {
            x[i] = j as isize;
        } else {
            unique[i] = false;
            y[j] = -1;
        }
    }

    let mut n_free_rows = 0;
    for i in 0..n {
        if x[i] < 0 {
            free_rows[n_free_rows] = i;
            n_free_rows += 1;
        } else if unique[i] {
            let j = x[i] as usize;
            let mut min = LARGE;
            for j2 in 0..n {
                if j2 == j {
                    continue;
                }
                let c = cost[(i, j2)] - v[j2];
                if c < min {
                    min = c;
                }
            }
            v[j] -= min;
        }
    }
    n_free_rows
}

/// Augmenting row reduction.
fn carr_dense(
    n: usize,
    cost: &DMatrix<f64>,
    n_free_rows: usize,
    free_rows: &mut [usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) -> usize {
    let mut current = 0;
    let mut new_free_rows = 0;
    let mut rr_cnt = 0;

    while current < n_free_rows {
        rr_cnt += 1;
        let free_i = free_rows[current];
        current += 1;

        let mut j1: isize = 0;
        let mut j2: isize = -1;
        let mut v1 = cost[(free_i, 0)] - v[0];
        let mut v2 = LARGE;

        for j in 1..n {
            let c = cost[(free_i, j)] - v[j];
            if c < v2 {
                if c >= v1 {
                    v2 = c;
                    j2 = j as isize;
                } else {
                    v2 = v1;
                    v1 = c;
                    j2 = j1;
                    j1 = j as isize;
                }
            }
        }

        let mut i0 = y[j1 as usize];
        let v1_new = v[j1 as usize] - (v2 - v1);
        let v1_lowers = v1_new < v[j1 as usize];

        if rr_cnt < current * n {
            if v1_lowers {
                v[j1 as usize] = v1_new;
            } else if i0 >= 0 && j2 >= 0 {
                j1 = j2;
                i0 = y[j2 as usize];
            }

            if i0 >= 0 {
                if v1_lowers {
                    current -= 1;
                    free_rows[current] = i0 as usize;
                } else {
                    free_rows[new_free_rows] = i0 as usize;
                    new_free_rows += 1;
                }
            }
        } else if i0 >= 0 {
            free_rows[new_free_rows] = i0 as usize;
            new_free_rows += 1;
        }
        x[free_i] = j1;
        y[j1 as usize] = free_i as isize;
    }
    new_free_rows
}

/// Collects the columns with the minimum `d` into `cols[lo..hi]`.
fn find_dense(n: usize, lo: usize, d: &[f64], cols: &mut [usize]) -> usize {
    let mut hi = lo + 1;
    let mut mind = d[cols[lo]];
    for k in hi..n {
        let j = cols[k];
        if d[j] <= mind {
            if d[j] < mind {
                hi = lo;
                mind = d[j];
            }
            cols[k] = cols[hi];
            cols[hi] = j;
            hi += 1;
        }
    }
    hi
}

/// Scans the todo columns; returns a free column if one is reached.
#[allow(clippy::too_many_arguments)]
fn scan_dense(
    n: usize,
    cost: &DMatrix<f64>,
    plo: &mut usize,
    phi: &mut usize,
    d: &mut [f64],
    cols: &mut [usize],
    pred: &mut [usize],
    y: &[isize],
    v: &[f64],
) -> Option<usize> {
    let mut lo = *plo;
    let mut hi = *phi;

    while lo != hi {
        let j = cols[lo];
        lo += 1;
        let i = y[j] as usize;
        let mind = d[j];
        let h = cost[(i, j)] - v[j] - mind;
        for k in hi..n {
            let j = cols[k];
            let cred_ij = cost[(i, j)] - v[j] - h;
            if cred_ij < d[j] {
                d[j] = cred_ij;
                pred[j] = i;
                if cred_ij == mind {
                    if y[j] < 0 {
                        return Some(j);
                    }
                    cols[k] = cols[hi];
                    cols[hi] = j;
                    hi += 1;
                }
            }
        }
    }
    *plo = lo;
    *phi = hi;
    None
}

/// Single-source shortest path (Dijkstra) from `start_i` to a free column.
fn find_path_dense(
    n: usize,
    cost: &DMatrix<f64>,
    start_i: usize,
    y: &[isize],
    v: &mut [f64],
    pred: &mut [usize],
) -> usize {
    let mut lo = 0;
    let mut hi = 0;
    let mut final_j = None;
    let mut n_ready = 0;
    let mut cols: Vec<usize> = (0..n).collect();
    let mut d: Vec<f64> = (0..n).map(|j| cost[(start_i, j)] - v[j]).collect();
    pred.fill(start_i);

    while final_j.is_none() {
        if lo == hi {
            n_ready = lo;
            hi = find_dense(n, lo, &d, &mut cols);
            for &j in &cols[lo..hi] {
                if y[j] < 0 {
                    final_j = Some(j);
                }
            }
        }
        if final_j.is_none() {
            final_j = scan_dense(
                n, cost, &mut lo, &mut hi, &mut d, &mut cols, pred, y, v,
            );
        }
    }

    let mind = d[cols[lo]];
    for &j in &cols[..n_ready] {
        v[j] += d[j] - mind;
    }
    final_j.unwrap_or_default()
}

/// Augments along shortest paths for every remaining free row.
fn ca_dense(
    n: usize,
    cost: &DMatrix<f64>,
    free_rows: &[usize],
    x: &mut [isize],
    y: &mut [isize],
    v: &mut [f64],
) {
    let mut pred = vec![0; n];

    for &free_row in free_rows {
        let mut i = usize::MAX;
        let mut j = find_path_dense(n, cost, free_row, y, v, &mut pred);
        let mut steps = 0;
        while i != free_row {
            i = pred[j];
            y[j] = i as isize;
            let previous = x[i];
            x[i] = j as isize;
            j = previous as usize;

            steps += 1;
            debug_assert!(steps <= n, "augmenting path longer than {}", n);
        }
    }
}

/// Solves the square assignment problem in place.
///
/// On success `x[i]` holds the column assigned to row `i` and `y[j]` the row
/// assigned to column `j`.
pub(crate) fn lapjv(
    cost: &DMatrix<f64>,
    x: &mut [isize],
    y: &mut [isize],
) -> Result<(), TrackError> {
    let n = cost.nrows();
    if n == 0 {
        return Err(TrackError::Lapjv(
            "cost matrix must not be empty".to_string(),
        ));
    }
    if cost.ncols() != n {
        return Err(TrackError::Lapjv(format!(
            "cost matrix must be square, but got {}x{}",
            n,
            cost.ncols()
        )));
    }
    if n != x.len() || n != y.len() {
        return Err(TrackError::Lapjv(format!(
            "solution buffers must have length {}, but x.len() = {}, y.len() = {}",
            n,
            x.len(),
            y.len()
        )));
    }
    if cost.iter().any(|c| !c.is_finite()) {
        return Err(TrackError::Lapjv(
            "cost matrix contains non-finite values".to_string(),
        ));
    }

    let mut free_rows = vec![0; n];
    let mut v = vec![0.0; n];
    let mut n_free_rows = ccrt_dense(n, cost, &mut free_rows, x, y, &mut v);
    let mut pass = 0;
    while n_free_rows > 0 && pass < 2 {
        n_free_rows =
            carr_dense(n, cost, n_free_rows, &mut free_rows, x, y, &mut v);
        pass += 1;
    }
    if n_free_rows > 0 {
        ca_dense(n, cost, &free_rows[..n_free_rows], x, y, &mut v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn solve(rows: &[&[f64]]) -> (Vec<isize>, Vec<isize>) {
        let n = rows.len();
        let cost = DMatrix::from_row_iterator(
            n,
            n,
            rows.iter().flat_map(|r| r.iter().copied()),
        );
        let mut x = vec![-1; n];
        let mut y = vec![-1; n];
        let res = lapjv(&cost, &mut x, &mut y);
        assert!(res.is_ok(), "expected Ok, got {:?}", res);
        (x, y)
    }

    fn total_cost(cost: &DMatrix<f64>, x: &[isize]) -> f64 {
        x.iter()
            .enumerate()
            .map(|(i, &j)| cost[(i, j as usize)])
            .sum()
    }

    fn brute_force_min(cost: &DMatrix<f64>) -> f64 {
        fn permute(
            cost: &DMatrix<f64>,
            row: usize,
            used: &mut Vec<bool>,
            acc: f64,
            best: &mut f64,
        ) {
            let n = cost.nrows();
            if row == n {
                if acc < *best {
                    *best = acc;
                }
                return;
            }
            for j in 0..n {
                if !used[j] {
                    used[j] = true;
                    permute(cost, row + 1, used, acc + cost[(row, j)], best);
                    used[j] = false;
                }
            }
        }
        let mut best = f64::INFINITY;
        permute(cost, 0, &mut vec![false; cost.nrows()], 0.0, &mut best);
        best
    }

    #[test]
    fn test_lapjv_3x3() {
        let (x, y) = solve(&[
            &[1.0, 2.0, 3.0],
            &[4.0, 5.0, 6.0],
            &[7.0, 8.0, 9.0],
        ]);
        assert_eq!(x, vec![2, 0, 1]);
        assert_eq!(y, vec![1, 2, 0]);
    }

    #[test]
    fn test_lapjv_4x4() {
        let (x, y) = solve(&[
            &[1., 2., 3., 4.],
            &[5., 6., 7., 8.],
            &[9., 10., 11., 12.],
            &[13., 14., 15., 16.],
        ]);
        assert_eq!(x, vec![3, 0, 1, 2]);
        assert_eq!(y, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_lapjv_5x5() {
        let (x, y) = solve(&[
            &[1., 2., 3., 4., 1.],
            &[5., 6., 7., 8., 2.],
            &[9., 10., 11., 12., 3.],
            &[13., 14., 15., 16., 4.],
            &[17., 18., 19., 20., 5.],
        ]);
        assert_eq!(x, vec![0, 2, 1, 3, 4]);
        assert_eq!(y, vec![0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_lapjv_unique_optimum() {
        let (x, y) = solve(&[
            &[0.9, 0.1, 0.8],
            &[0.2, 0.9, 0.9],
            &[0.9, 0.8, 0.3],
        ]);
        assert_eq!(x, vec![1, 0, 2]);
        assert_eq!(y, vec![1, 0, 2]);
    }

    #[test]
    fn test_lapjv_1x1() {
        let (x, y) = solve(&[&[0.5]]);
        assert_eq!(x, vec![0]);
        assert_eq!(y, vec![0]);
    }

    #[test]
    fn test_lapjv_rejects_empty_and_non_square() {
        let mut x = vec![];
        let mut y = vec![];
        assert!(lapjv(&DMatrix::zeros(0, 0), &mut x, &mut y).is_err());

        let mut x = vec![-1; 2];
        let mut y = vec![-1; 3];
        assert!(lapjv(&DMatrix::zeros(2, 3), &mut x, &mut y).is_err());
    }

    #[test]
    fn test_lapjv_rejects_mismatched_buffers() {
        let mut x = vec![-1; 2];
        let mut y = vec![-1; 3];
        let res = lapjv(&DMatrix::zeros(3, 3), &mut x, &mut y);
        assert!(matches!(res, Err(TrackError::Lapjv(_))));
    }

    #[test]
    fn test_quickcheck_lapjv_is_optimal() {
        fn prop(seed: u64) -> bool {
            let mut rng = StdRng::seed_from_u64(seed);
            let n = rng.gen_range(1..=6);
            let cost =
                DMatrix::from_fn(n, n, |_, _| rng.gen_range(0.0..1.0_f64));
            let mut x = vec![-1; n];
            let mut y = vec![-1; n];
            if lapjv(&cost, &mut x, &mut y).is_err() {
                return false;
            }

            let is_permutation = x.iter().enumerate().all(|(i, &j)| {
                j >= 0 && (j as usize) < n && y[j as usize] == i as isize
            });
            is_permutation
                && (total_cost(&cost, &x) - brute_force_min(&cost)).abs() < 1e-9
        }
        quickcheck(prop as fn(u64) -> bool);
    }
}
