use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;

/// One contribution to a matrix-level merge.
///
/// Unless `prenormalized`, the matrix is divided by its largest absolute
/// entry before weighting, so heterogeneous learners contribute on a
/// comparable scale whatever sign constraint they were fitted under.
/// Weights are taken as-is: callers tuning weight products externally get
/// exactly what they supplied, never a silent renormalization to sum one.
#[derive(Debug, Clone, Copy)]
pub struct MergeSource<'a> {
    pub matrix: &'a SparseMatrix,
    pub weight: f32,
    pub prenormalized: bool,
}

/// Weighted linear combination of similarity matrices:
/// entry (i, j) = Σ_k weight_k · M_k(i, j) / max|M_k|.
///
/// All sources must share one shape. `top_k` optionally re-sparsifies the
/// merged matrix to that many entries per column (the usual step when the
/// merged matrix feeds a ranker that was tuned for a fixed similarity
/// width).
pub fn merge_matrices(sources: &[MergeSource], top_k: Option<usize>) -> Result<SparseMatrix> {
    let first = sources
        .first()
        .ok_or_else(|| Error::config("matrix merge needs at least one source"))?;
    let (n_rows, n_cols) = (first.matrix.n_rows(), first.matrix.n_cols());
    for s in sources {
        if s.weight < 0.0 {
            return Err(Error::config(format!(
                "merge weights must be non-negative, got {}",
                s.weight
            )));
        }
        if s.matrix.n_rows() != n_rows {
            return Err(Error::shape("merge source rows", n_rows, s.matrix.n_rows()));
        }
        if s.matrix.n_cols() != n_cols {
            return Err(Error::shape("merge source cols", n_cols, s.matrix.n_cols()));
        }
    }

    let mut entries = Vec::new();
    for s in sources {
        let scale = if s.prenormalized {
            s.weight
        } else {
            match s.matrix.max_abs_value() {
                max if max > 0.0 => s.weight / max,
                // A matrix with no entries has nothing to contribute.
                _ => 0.0,
            }
        };
        if scale == 0.0 {
            continue;
        }
        entries.extend(
            s.matrix
                .iter_triplets()
                .map(|(r, c, v)| (r, c, v * scale)),
        );
    }

    // Overlapping entries are summed during canonical assembly.
    let merged = SparseMatrix::from_triplets(n_rows, n_cols, entries)?;
    Ok(match top_k {
        Some(k) => merged.prune_top_k(k),
        None => merged,
    })
}

/// Weighted combination of per-user score vectors from independent
/// recommenders.
///
/// Each source is min-max scaled to [0, 1] over the candidate set before
/// weighting, so rankers of different score families mix sensibly. A
/// constant source (including the all-zero vector of a cold-start user
/// unseen by one base learner) contributes nothing rather than erroring.
pub fn merge_scores(sources: &[&[f32]], weights: &[f32]) -> Result<Vec<f32>> {
    if sources.is_empty() {
        return Err(Error::config("score merge needs at least one source"));
    }
    if sources.len() != weights.len() {
        return Err(Error::shape(
            "merge weights per source",
            sources.len(),
            weights.len(),
        ));
    }
    if let Some(&w) = weights.iter().find(|&&w| w < 0.0) {
        return Err(Error::config(format!(
            "merge weights must be non-negative, got {w}"
        )));
    }
    let n = sources[0].len();
    for s in sources {
        if s.len() != n {
            return Err(Error::shape("merge source length", n, s.len()));
        }
    }

    let mut out = vec![0.0f32; n];
    for (&source, &weight) in sources.iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        let min = source.iter().copied().fold(f32::INFINITY, f32::min);
        let max = source.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !(max > min) {
            continue;
        }
        let inv_range = 1.0 / (max - min);
        for (o, &v) in out.iter_mut().zip(source) {
            *o += weight * (v - min) * inv_range;
        }
    }
    Ok(out)
}
