use rayon::prelude::*;
use tracing::{debug, warn};

use crate::elastic_net;
use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;

/// Hyperparameters for one SLIM training run.
///
/// A value of this type is an immutable fit request: `learn` never mutates
/// it, and re-fitting with different settings means building a new value,
/// not editing an old one.
#[derive(Debug, Clone)]
pub struct SlimParams {
    /// Overall regularization strength.
    pub alpha: f32,
    /// L1/L2 mix: 0.0 = pure ridge, 1.0 = pure lasso.
    pub l1_ratio: f32,
    /// Constrain coefficients to be non-negative.
    pub positive_only: bool,
    /// Keep at most this many coefficients per item.
    pub top_k: usize,
    /// Relative coefficient-change threshold for convergence.
    pub tol: f32,
    /// Coordinate-descent sweep cap per item.
    pub max_iter: usize,
    /// Worker threads for the per-item fits.
    pub workers: usize,
}

impl Default for SlimParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.1,
            positive_only: true,
            top_k: 100,
            tol: 1e-4,
            max_iter: 100,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl SlimParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(Error::config(format!(
                "l1_ratio must be in [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if self.alpha < 0.0 {
            return Err(Error::config(format!(
                "alpha must be >= 0, got {}",
                self.alpha
            )));
        }
        if self.top_k == 0 {
            return Err(Error::config("top_k must be >= 1"));
        }
        if self.max_iter == 0 {
            return Err(Error::config("max_iter must be >= 1"));
        }
        if self.workers == 0 {
            return Err(Error::config("workers must be >= 1"));
        }
        Ok(())
    }
}

/// Learns a sparse item-item similarity matrix from a user-item interaction
/// matrix by fitting one regularized regression per item.
///
/// For each item j, the target is column j of `interactions` and the
/// features are all other columns; column j itself is excluded at the solver
/// level, so the diagonal of the result is structurally absent and the
/// shared matrix is never written to. The `top_k` largest-magnitude
/// coefficients that satisfy the sign constraint become column j of the
/// result (ties broken by lower row index; fewer survive if fewer exist).
///
/// Item fits are independent and run on a pool of exactly `params.workers`
/// threads. Per-fit outputs are collected by item index before assembly, so
/// the returned matrix is bit-identical for any worker count.
///
/// A fit hitting `max_iter` without converging is not an error; its partial
/// coefficients are used and an aggregate warning is logged after the batch.
pub fn learn(interactions: &SparseMatrix, params: &SlimParams) -> Result<SparseMatrix> {
    params.validate()?;
    let n_users = interactions.n_rows();
    let n_items = interactions.n_cols();
    if n_users == 0 || n_items == 0 {
        return Err(Error::config("interaction matrix must be non-empty"));
    }

    let fit_item = |j: usize| -> (Vec<(u32, f32)>, bool) {
        let (col_rows, _) = interactions.col(j);
        if col_rows.is_empty() {
            // Nobody interacted with this item; nothing to predict.
            return (Vec::new(), true);
        }
        let mut target = vec![0.0f32; n_users];
        interactions.col_dense(j, &mut target);

        let fit = elastic_net::fit(
            interactions,
            Some(j),
            &target,
            params.alpha,
            params.l1_ratio,
            params.positive_only,
            params.tol,
            params.max_iter,
        )
        .unwrap_or_else(|_| unreachable!("params validated before the batch"));

        (sparsify(&fit.coef, params.top_k, params.positive_only), fit.converged)
    };

    let per_item: Vec<(Vec<(u32, f32)>, bool)> = if params.workers == 1 {
        (0..n_items).map(fit_item).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.workers)
            .build()
            .map_err(|e| Error::config(format!("failed to build worker pool: {e}")))?;
        pool.install(|| (0..n_items).into_par_iter().map(fit_item).collect())
    };

    // Canonical merge by item index, independent of completion order.
    let mut entries = Vec::new();
    let mut unconverged = 0usize;
    for (j, (coefs, converged)) in per_item.into_iter().enumerate() {
        if !converged {
            unconverged += 1;
        }
        for (row, value) in coefs {
            entries.push((row, j as u32, value));
        }
    }
    if unconverged > 0 {
        warn!(
            unconverged,
            n_items, "some item fits hit max_iter before reaching tol"
        );
    }
    debug!(n_items, nnz = entries.len(), "similarity matrix assembled");

    SparseMatrix::from_triplets(n_items, n_items, entries)
}

/// Keeps the `top_k` largest-magnitude coefficients that satisfy the sign
/// constraint. When fewer qualify, all of them are kept; zeros never count.
fn sparsify(coef: &[f32], top_k: usize, positive_only: bool) -> Vec<(u32, f32)> {
    let mut kept: Vec<(f32, u32)> = coef
        .iter()
        .enumerate()
        .filter_map(|(i, &v)| {
            let keep = if positive_only { v > 0.0 } else { v != 0.0 };
            keep.then_some((v, i as u32))
        })
        .collect();
    let take = top_k.min(kept.len());
    if take == 0 {
        return Vec::new();
    }
    kept.select_nth_unstable_by(take.saturating_sub(1), |a, b| {
        b.0.abs()
            .partial_cmp(&a.0.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    kept.truncate(take);
    // Ascending row order keeps the triple list canonical.
    kept.sort_unstable_by_key(|&(_, i)| i);
    kept.into_iter().map(|(v, i)| (i, v)).collect()
}
