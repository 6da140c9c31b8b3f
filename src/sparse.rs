use crate::error::{Error, Result};

/// Immutable-shape sparse f32 matrix with dual-indexed storage.
///
/// Both a CSR and a CSC view are materialized from one canonical entry list
/// at construction, so row slices and column slices are both O(1) to obtain
/// and O(nnz of that row/column) to scan. The shape and the entry set are
/// fixed after construction; all downstream code treats the matrix as
/// read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    // CSR view
    row_ptr: Vec<usize>,
    col_indices: Vec<u32>,
    row_data: Vec<f32>,
    // CSC view
    col_ptr: Vec<usize>,
    row_indices: Vec<u32>,
    col_data: Vec<f32>,
}

impl SparseMatrix {
    /// Builds a matrix from (row, col, value) triples.
    ///
    /// Triples may arrive in any order; duplicates are summed. The entry
    /// list is canonicalized (row-major sort) before indexing, so the
    /// result is identical regardless of input order. Zero-valued triples
    /// are dropped.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        mut entries: Vec<(u32, u32, f32)>,
    ) -> Result<Self> {
        for &(r, c, _) in &entries {
            if r as usize >= n_rows {
                return Err(Error::shape("triplet row index", n_rows, r as usize));
            }
            if c as usize >= n_cols {
                return Err(Error::shape("triplet col index", n_cols, c as usize));
            }
        }
        entries.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut row_ptr = vec![0usize; n_rows + 1];
        let mut col_indices = Vec::with_capacity(entries.len());
        let mut row_data = Vec::with_capacity(entries.len());
        let mut i = 0;
        while i < entries.len() {
            let (r, c, mut v) = entries[i];
            i += 1;
            while i < entries.len() && entries[i].0 == r && entries[i].1 == c {
                v += entries[i].2;
                i += 1;
            }
            if v != 0.0 {
                col_indices.push(c);
                row_data.push(v);
                row_ptr[r as usize + 1] += 1;
            }
        }
        for r in 0..n_rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Ok(Self::from_csr_parts(
            n_rows,
            n_cols,
            row_ptr,
            col_indices,
            row_data,
        ))
    }

    /// Builds a matrix from already-assembled CSR arrays.
    ///
    /// Column indices within a row must be strictly ascending (the usual
    /// canonical CSR form); the CSC view is derived here.
    pub fn from_csr(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<u32>,
        row_data: Vec<f32>,
    ) -> Result<Self> {
        if row_ptr.len() != n_rows + 1 {
            return Err(Error::shape("csr indptr length", n_rows + 1, row_ptr.len()));
        }
        if row_ptr[0] != 0 || *row_ptr.last().unwrap_or(&0) != col_indices.len() {
            return Err(Error::shape(
                "csr indptr bounds",
                col_indices.len(),
                *row_ptr.last().unwrap_or(&0),
            ));
        }
        if col_indices.len() != row_data.len() {
            return Err(Error::shape(
                "csr data length",
                col_indices.len(),
                row_data.len(),
            ));
        }
        for w in row_ptr.windows(2) {
            if w[1] < w[0] {
                return Err(Error::config("csr indptr must be non-decreasing"));
            }
        }
        for r in 0..n_rows {
            let row = &col_indices[row_ptr[r]..row_ptr[r + 1]];
            for w in row.windows(2) {
                if w[1] <= w[0] {
                    return Err(Error::config("csr column indices must be strictly ascending"));
                }
            }
            if let Some(&last) = row.last() {
                if last as usize >= n_cols {
                    return Err(Error::shape("csr col index", n_cols, last as usize));
                }
            }
        }
        // Drop explicit zeros so the entry set (and equality) never depends
        // on the construction path; from_triplets does the same.
        if row_data.contains(&0.0) {
            let mut new_ptr = vec![0usize; n_rows + 1];
            let mut new_cols = Vec::with_capacity(col_indices.len());
            let mut new_data = Vec::with_capacity(row_data.len());
            for r in 0..n_rows {
                for idx in row_ptr[r]..row_ptr[r + 1] {
                    if row_data[idx] != 0.0 {
                        new_cols.push(col_indices[idx]);
                        new_data.push(row_data[idx]);
                    }
                }
                new_ptr[r + 1] = new_cols.len();
            }
            return Ok(Self::from_csr_parts(n_rows, n_cols, new_ptr, new_cols, new_data));
        }
        Ok(Self::from_csr_parts(
            n_rows,
            n_cols,
            row_ptr,
            col_indices,
            row_data,
        ))
    }

    fn from_csr_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<u32>,
        row_data: Vec<f32>,
    ) -> Self {
        let nnz = col_indices.len();
        // Counting-sort transpose; iterating rows in ascending order leaves
        // each column's row indices ascending as well.
        let mut counts = vec![0usize; n_cols];
        for &c in &col_indices {
            counts[c as usize] += 1;
        }
        let mut col_ptr = vec![0usize; n_cols + 1];
        for c in 0..n_cols {
            col_ptr[c + 1] = col_ptr[c] + counts[c];
        }
        let mut row_indices = vec![0u32; nnz];
        let mut col_data = vec![0.0f32; nnz];
        let mut pos = col_ptr[..n_cols].to_vec();
        for r in 0..n_rows {
            for idx in row_ptr[r]..row_ptr[r + 1] {
                let c = col_indices[idx] as usize;
                row_indices[pos[c]] = r as u32;
                col_data[pos[c]] = row_data[idx];
                pos[c] += 1;
            }
        }
        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_indices,
            row_data,
            col_ptr,
            row_indices,
            col_data,
        }
    }

    /// Stacks a side feature matrix (rows = features, columns = items)
    /// under a user-item interaction matrix, yielding a single matrix the
    /// similarity learner can train on: each feature acts as one extra
    /// pseudo-user row, its entries scaled by `feature_weight`.
    ///
    /// Both inputs must agree on item count; a disagreement is a
    /// [`Error::ShapeMismatch`]. This is how feature-augmented variants of
    /// the learner consume item metadata without a separate training path.
    pub fn combine_features(
        interactions: &SparseMatrix,
        features: &SparseMatrix,
        feature_weight: f32,
    ) -> Result<SparseMatrix> {
        if features.n_cols() != interactions.n_cols() {
            return Err(Error::shape(
                "side feature item count",
                interactions.n_cols(),
                features.n_cols(),
            ));
        }
        if feature_weight < 0.0 {
            return Err(Error::config(format!(
                "feature_weight must be >= 0, got {feature_weight}"
            )));
        }
        let n_users = interactions.n_rows();
        let mut entries: Vec<(u32, u32, f32)> = interactions.iter_triplets().collect();
        entries.extend(
            features
                .iter_triplets()
                .map(|(r, c, v)| (r + n_users as u32, c, v * feature_weight)),
        );
        SparseMatrix::from_triplets(
            n_users + features.n_rows(),
            interactions.n_cols(),
            entries,
        )
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn nnz(&self) -> usize {
        self.col_indices.len()
    }

    /// Column indices and values of row `r`, ascending by column.
    pub fn row(&self, r: usize) -> (&[u32], &[f32]) {
        let (s, e) = (self.row_ptr[r], self.row_ptr[r + 1]);
        (&self.col_indices[s..e], &self.row_data[s..e])
    }

    /// Row indices and values of column `c`, ascending by row.
    pub fn col(&self, c: usize) -> (&[u32], &[f32]) {
        let (s, e) = (self.col_ptr[c], self.col_ptr[c + 1]);
        (&self.row_indices[s..e], &self.col_data[s..e])
    }

    /// Scatters column `c` into a dense buffer of length `n_rows`.
    pub fn col_dense(&self, c: usize, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.n_rows);
        out.fill(0.0);
        let (rows, vals) = self.col(c);
        for (&r, &v) in rows.iter().zip(vals) {
            out[r as usize] = v;
        }
    }

    /// Largest absolute entry value, or 0.0 for an empty matrix.
    pub fn max_abs_value(&self) -> f32 {
        self.row_data.iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    /// All entries as (row, col, value), row-major order.
    pub fn iter_triplets(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        (0..self.n_rows).flat_map(move |r| {
            let (cols, vals) = self.row(r);
            cols.iter()
                .zip(vals)
                .map(move |(&c, &v)| (r as u32, c, v))
        })
    }

    /// Keeps the `k` largest entries of each column (descending by value,
    /// ties broken by lower row index); diagonal entries are dropped.
    ///
    /// Used to re-sparsify a merged similarity matrix to a target width.
    pub fn prune_top_k(&self, k: usize) -> SparseMatrix {
        let mut entries: Vec<(u32, u32, f32)> = Vec::new();
        for c in 0..self.n_cols {
            let (rows, vals) = self.col(c);
            let mut col_entries: Vec<(f32, u32)> = rows
                .iter()
                .zip(vals)
                .filter(|&(&r, _)| r as usize != c)
                .map(|(&r, &v)| (v, r))
                .collect();
            let take = k.min(col_entries.len());
            if take == 0 {
                continue;
            }
            col_entries.select_nth_unstable_by(take.saturating_sub(1), |a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            col_entries.truncate(take);
            for (v, r) in col_entries {
                entries.push((r, c as u32, v));
            }
        }
        // Shapes and indices were already validated on self.
        SparseMatrix::from_triplets(self.n_rows, self.n_cols, entries)
            .unwrap_or_else(|_| unreachable!("pruning preserves valid indices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        // [[1, 0, 2],
        //  [0, 3, 0],
        //  [4, 0, 5]]
        SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0), (2, 0, 4.0), (2, 2, 5.0)],
        )
        .unwrap()
    }

    #[test]
    fn dual_views_agree() {
        let m = sample();
        assert_eq!(m.nnz(), 5);
        assert_eq!(m.row(0), (&[0u32, 2][..], &[1.0f32, 2.0][..]));
        assert_eq!(m.row(1), (&[1u32][..], &[3.0f32][..]));
        assert_eq!(m.col(0), (&[0u32, 2][..], &[1.0f32, 4.0][..]));
        assert_eq!(m.col(2), (&[0u32, 2][..], &[2.0f32, 5.0][..]));
    }

    #[test]
    fn triplet_order_is_irrelevant() {
        let shuffled = SparseMatrix::from_triplets(
            3,
            3,
            vec![(2, 2, 5.0), (1, 1, 3.0), (0, 2, 2.0), (2, 0, 4.0), (0, 0, 1.0)],
        )
        .unwrap();
        assert_eq!(shuffled, sample());
    }

    #[test]
    fn duplicates_are_summed_and_zeros_dropped() {
        let m = SparseMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, 0.0)],
        )
        .unwrap();
        assert_eq!(m.nnz(), 1);
        assert_eq!(m.row(0), (&[0u32][..], &[3.0f32][..]));
    }

    #[test]
    fn out_of_range_triplet_is_rejected() {
        assert!(SparseMatrix::from_triplets(2, 2, vec![(2, 0, 1.0)]).is_err());
        assert!(SparseMatrix::from_triplets(2, 2, vec![(0, 5, 1.0)]).is_err());
    }

    #[test]
    fn col_dense_scatters() {
        let m = sample();
        let mut buf = vec![9.0f32; 3];
        m.col_dense(0, &mut buf);
        assert_eq!(buf, vec![1.0, 0.0, 4.0]);
    }

    #[test]
    fn prune_keeps_top_entries_and_drops_diagonal() {
        let m = SparseMatrix::from_triplets(
            3,
            3,
            vec![
                (0, 0, 9.0), // diagonal, must vanish
                (1, 0, 2.0),
                (2, 0, 3.0),
                (0, 1, 1.0),
                (2, 1, 1.0), // tie with (0,1): lower row wins
            ],
        )
        .unwrap();
        let pruned = m.prune_top_k(1);
        assert_eq!(pruned.col(0), (&[2u32][..], &[3.0f32][..]));
        assert_eq!(pruned.col(1), (&[0u32][..], &[1.0f32][..]));
    }

    #[test]
    fn from_csr_drops_explicit_zeros() {
        let explicit = SparseMatrix::from_csr(
            2,
            2,
            vec![0, 2, 3],
            vec![0, 1, 1],
            vec![1.0, 0.0, 2.0],
        )
        .unwrap();
        let implicit =
            SparseMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 0.0), (1, 1, 2.0)])
                .unwrap();
        assert_eq!(explicit.nnz(), 2);
        assert_eq!(explicit, implicit);
    }

    #[test]
    fn max_abs_value_considers_negative_entries() {
        let m = SparseMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (1, 1, -3.0)]).unwrap();
        assert_eq!(m.max_abs_value(), 3.0);
    }

    #[test]
    fn combine_features_stacks_scaled_pseudo_users() {
        let interactions =
            SparseMatrix::from_triplets(2, 3, vec![(0, 0, 1.0), (1, 2, 1.0)]).unwrap();
        let features =
            SparseMatrix::from_triplets(2, 3, vec![(0, 0, 1.0), (0, 1, 1.0), (1, 2, 1.0)])
                .unwrap();
        let combined = SparseMatrix::combine_features(&interactions, &features, 0.5).unwrap();
        assert_eq!(combined.n_rows(), 4);
        assert_eq!(combined.n_cols(), 3);
        // Interaction rows unchanged, feature rows appended and scaled.
        assert_eq!(combined.row(0), interactions.row(0));
        assert_eq!(combined.row(2), (&[0u32, 1][..], &[0.5f32, 0.5][..]));
        assert_eq!(combined.row(3), (&[2u32][..], &[0.5f32][..]));
    }

    #[test]
    fn combine_features_rejects_item_count_mismatch() {
        let interactions =
            SparseMatrix::from_triplets(2, 3, vec![(0, 0, 1.0)]).unwrap();
        let features = SparseMatrix::from_triplets(2, 4, vec![(0, 3, 1.0)]).unwrap();
        let err = SparseMatrix::combine_features(&interactions, &features, 1.0).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 3, found: 4, .. }));
        assert!(
            SparseMatrix::combine_features(&interactions, &interactions, -1.0).is_err()
        );
    }

    #[test]
    fn from_csr_validates() {
        assert!(SparseMatrix::from_csr(2, 2, vec![0, 1, 2], vec![0, 1], vec![1.0, 2.0]).is_ok());
        // descending columns within a row
        assert!(SparseMatrix::from_csr(1, 3, vec![0, 2], vec![2, 0], vec![1.0, 2.0]).is_err());
        // indptr length off by one
        assert!(SparseMatrix::from_csr(2, 2, vec![0, 2], vec![0, 1], vec![1.0, 2.0]).is_err());
    }
}
