//! Sparse linear (SLIM) item-similarity learning and hybrid merging for
//! top-N recommendation.
//!
//! The crate fits one elastic-net-regularized, optionally non-negative
//! linear model per item over a sparse user-item interaction matrix, in
//! parallel, and sparsifies the coefficients into an item-item similarity
//! matrix. Several such matrices (or several recommenders' score vectors)
//! can be linearly merged, and any similarity matrix or score vector can be
//! turned into a deterministic top-N ranking per user.
//!
//! ```
//! use slimrec::{learn, rank, SlimParams, SparseMatrix};
//!
//! // 3 users x 4 items.
//! let interactions = SparseMatrix::from_triplets(3, 4, vec![
//!     (0, 0, 1.0), (0, 1, 1.0),
//!     (1, 0, 1.0), (1, 1, 1.0), (1, 2, 1.0),
//!     (2, 2, 1.0), (2, 3, 1.0),
//! ]).unwrap();
//!
//! let params = SlimParams { alpha: 1e-4, top_k: 2, workers: 1, ..Default::default() };
//! let similarity = learn(&interactions, &params).unwrap();
//!
//! let (items, values) = interactions.row(0);
//! let recommended = rank(items, values, &similarity, true, 10).unwrap();
//! assert!(recommended.iter().all(|&(item, _)| item != 0 && item != 1));
//! ```

mod elastic_net;
mod error;
mod hybrid;
mod rank;
mod slim;
mod sparse;

pub use elastic_net::{fit, FitResult};
pub use error::{Error, Result};
pub use hybrid::{merge_matrices, merge_scores, MergeSource};
pub use rank::{rank, rank_all, rank_scores, scores, RankedList};
pub use slim::{learn, SlimParams};
pub use sparse::SparseMatrix;
