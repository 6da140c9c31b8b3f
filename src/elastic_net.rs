use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;

/// Outcome of one elastic-net fit.
///
/// `converged == false` is a quality signal, not a failure: the coefficients
/// found so far are still returned and used.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub coef: Vec<f32>,
    pub converged: bool,
    pub iterations: usize,
}

/// Solves one elastic-net-penalized least-squares problem by cyclic
/// coordinate descent:
///
/// ```text
/// min_w  (1/2n)‖y − Xw‖² + α·l1_ratio·‖w‖₁ + α·(1−l1_ratio)/2·‖w‖²
/// ```
///
/// subject to `w ≥ 0` when `positive_only` is set.
///
/// `skip_col` marks one feature column as structurally absent: it is never
/// visited and its coefficient stays exactly zero. This is how the
/// similarity learner excludes an item from predicting itself without
/// touching the shared interaction matrix.
///
/// Columns are visited in ascending index order every sweep, so the result
/// is a pure function of the inputs. Terminates when the largest absolute
/// coefficient change in a sweep drops below `tol` times the largest
/// absolute coefficient, or after `max_iter` sweeps.
pub fn fit(
    features: &SparseMatrix,
    skip_col: Option<usize>,
    target: &[f32],
    alpha: f32,
    l1_ratio: f32,
    positive_only: bool,
    tol: f32,
    max_iter: usize,
) -> Result<FitResult> {
    if !(0.0..=1.0).contains(&l1_ratio) {
        return Err(Error::config(format!(
            "l1_ratio must be in [0, 1], got {l1_ratio}"
        )));
    }
    if alpha < 0.0 {
        return Err(Error::config(format!("alpha must be >= 0, got {alpha}")));
    }
    if target.len() != features.n_rows() {
        return Err(Error::shape(
            "regression target length",
            features.n_rows(),
            target.len(),
        ));
    }

    let n_samples = features.n_rows() as f32;
    let n_features = features.n_cols();
    let l1_penalty = alpha * l1_ratio;
    let l2_penalty = alpha * (1.0 - l1_ratio);

    // Per-column squared norms, computed once; a column with zero norm can
    // never move its coefficient off zero.
    let mut sq_norms = vec![0.0f32; n_features];
    for (k, norm) in sq_norms.iter_mut().enumerate() {
        let (_, vals) = features.col(k);
        *norm = vals.iter().map(|v| v * v).sum();
    }

    let mut coef = vec![0.0f32; n_features];
    // Residual r = y − Xw; with w = 0 this starts as the target itself.
    let mut residual = target.to_vec();

    let mut converged = false;
    let mut iterations = 0;
    for _ in 0..max_iter {
        iterations += 1;
        let mut max_delta = 0.0f32;
        let mut max_coef = 0.0f32;

        for k in 0..n_features {
            if Some(k) == skip_col || sq_norms[k] == 0.0 {
                continue;
            }
            let (rows, vals) = features.col(k);

            let w_old = coef[k];
            let mut dot = 0.0f32;
            for (&r, &v) in rows.iter().zip(vals) {
                dot += v * residual[r as usize];
            }
            // Partial residual correlation for coordinate k.
            let z = dot / n_samples + w_old * (sq_norms[k] / n_samples);
            let denom = sq_norms[k] / n_samples + l2_penalty;

            let w_new = if positive_only {
                (z - l1_penalty).max(0.0) / denom
            } else {
                z.signum() * (z.abs() - l1_penalty).max(0.0) / denom
            };

            if w_new != w_old {
                let delta = w_new - w_old;
                for (&r, &v) in rows.iter().zip(vals) {
                    residual[r as usize] -= delta * v;
                }
                coef[k] = w_new;
                max_delta = max_delta.max(delta.abs());
            }
            max_coef = max_coef.max(w_new.abs());
        }

        if max_coef == 0.0 || max_delta <= tol * max_coef {
            converged = true;
            break;
        }
    }

    Ok(FitResult {
        coef,
        converged,
        iterations,
    })
}
