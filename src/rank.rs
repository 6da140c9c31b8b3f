use ahash::AHashSet;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;

/// An ordered recommendation list: (item id, score) pairs, strictly
/// descending by score, ties broken by ascending item id.
pub type RankedList = Vec<(u32, f32)>;

/// Raw per-item scores for one user: score[i] = Σ_j u_j · W[j, i] over the
/// user's non-zero interactions.
///
/// Pure function of its inputs; the evaluation harness may call it (and
/// [`rank`]) as often as it likes with no state carried between calls.
pub fn scores(
    user_items: &[u32],
    user_values: &[f32],
    similarity: &SparseMatrix,
) -> Result<Vec<f32>> {
    if user_items.len() != user_values.len() {
        return Err(Error::shape(
            "user profile values",
            user_items.len(),
            user_values.len(),
        ));
    }
    let n_items = similarity.n_rows();
    let mut out = vec![0.0f32; similarity.n_cols()];
    for (&j, &weight) in user_items.iter().zip(user_values) {
        if j as usize >= n_items {
            return Err(Error::shape("user profile item id", n_items, j as usize));
        }
        let (cols, vals) = similarity.row(j as usize);
        for (&i, &sim) in cols.iter().zip(vals) {
            out[i as usize] += weight * sim;
        }
    }
    Ok(out)
}

/// Top-`n` recommendations for one user profile against a similarity
/// matrix.
///
/// Items with non-positive scores are not candidates, so a user with no
/// interactions gets an empty list rather than an error. With
/// `exclude_seen`, the profile's own items are removed after scoring.
pub fn rank(
    user_items: &[u32],
    user_values: &[f32],
    similarity: &SparseMatrix,
    exclude_seen: bool,
    n: usize,
) -> Result<RankedList> {
    let scores = scores(user_items, user_values, similarity)?;
    let exclude: &[u32] = if exclude_seen { user_items } else { &[] };
    Ok(rank_scores(&scores, exclude, n))
}

/// Same selection rule as [`rank`], applied to a precomputed score vector
/// (e.g. the output of a score-level hybrid merge).
pub fn rank_scores(scores: &[f32], exclude: &[u32], n: usize) -> RankedList {
    let excluded: AHashSet<u32> = exclude.iter().copied().collect();
    let mut scored: Vec<(f32, u32)> = scores
        .iter()
        .enumerate()
        .filter_map(|(i, &score)| {
            let i = i as u32;
            (score > 0.0 && !excluded.contains(&i)).then_some((score, i))
        })
        .collect();

    let take = n.min(scored.len());
    if take == 0 {
        return vec![];
    }
    // Partial selection first, full sort only on the survivors.
    scored.select_nth_unstable_by(take.saturating_sub(1), |a, b| cmp_desc(a, b));
    scored.truncate(take);
    scored.sort_unstable_by(cmp_desc);
    scored.into_iter().map(|(s, i)| (i, s)).collect()
}

fn cmp_desc(a: &(f32, u32), b: &(f32, u32)) -> std::cmp::Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then(a.1.cmp(&b.1))
}

/// Batch variant: top-`n` recommendations for every user of an interaction
/// matrix, ranked in parallel, output indexed by user id.
pub fn rank_all(
    interactions: &SparseMatrix,
    similarity: &SparseMatrix,
    exclude_seen: bool,
    n: usize,
) -> Result<Vec<RankedList>> {
    if interactions.n_cols() != similarity.n_rows() {
        return Err(Error::shape(
            "similarity rows vs interaction items",
            interactions.n_cols(),
            similarity.n_rows(),
        ));
    }
    (0..interactions.n_rows())
        .into_par_iter()
        .map(|u| {
            let (items, values) = interactions.row(u);
            rank(items, values, similarity, exclude_seen, n)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 similarity:
    ///   row 0 -> {1: 0.5, 2: 0.5}
    ///   row 1 -> {0: 0.8}
    ///   row 2 -> {}
    fn similarity() -> SparseMatrix {
        SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 1, 0.5), (0, 2, 0.5), (1, 0, 0.8)],
        )
        .unwrap()
    }

    #[test]
    fn scores_accumulate_over_profile() {
        let s = scores(&[0, 1], &[1.0, 2.0], &similarity()).unwrap();
        assert_eq!(s, vec![1.6, 0.5, 0.5]);
    }

    #[test]
    fn descending_order_with_ascending_id_ties() {
        let ranked = rank(&[0], &[1.0], &similarity(), false, 10).unwrap();
        // Items 1 and 2 tie at 0.5; lower id first.
        assert_eq!(ranked, vec![(1, 0.5), (2, 0.5)]);
    }

    #[test]
    fn exclude_seen_removes_profile_items() {
        let ranked = rank(&[0, 1], &[1.0, 2.0], &similarity(), true, 10).unwrap();
        assert_eq!(ranked, vec![(2, 0.5)]);
    }

    #[test]
    fn empty_profile_gives_empty_list() {
        let ranked = rank(&[], &[], &similarity(), true, 5).unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn n_caps_the_list() {
        let ranked = rank(&[0, 1], &[1.0, 2.0], &similarity(), false, 1).unwrap();
        assert_eq!(ranked, vec![(0, 1.6)]);
    }

    #[test]
    fn out_of_range_profile_item_is_rejected() {
        assert!(rank(&[7], &[1.0], &similarity(), false, 5).is_err());
        assert!(rank(&[0, 1], &[1.0], &similarity(), false, 5).is_err());
    }

    #[test]
    fn rank_scores_drops_non_positive_and_excluded() {
        let ranked = rank_scores(&[0.0, 3.0, -1.0, 2.0], &[1], 10);
        assert_eq!(ranked, vec![(3, 2.0)]);
    }

    #[test]
    fn rank_all_matches_per_user_rank() {
        let interactions = SparseMatrix::from_triplets(
            2,
            3,
            vec![(0, 0, 1.0), (1, 0, 1.0), (1, 1, 2.0)],
        )
        .unwrap();
        let sim = similarity();
        let batch = rank_all(&interactions, &sim, true, 5).unwrap();
        assert_eq!(batch.len(), 2);
        for (u, expected) in batch.iter().enumerate() {
            let (items, values) = interactions.row(u);
            assert_eq!(*expected, rank(items, values, &sim, true, 5).unwrap());
        }
    }

    #[test]
    fn rank_all_checks_shapes() {
        let interactions =
            SparseMatrix::from_triplets(1, 5, vec![(0, 4, 1.0)]).unwrap();
        assert!(rank_all(&interactions, &similarity(), true, 5).is_err());
    }
}
