//! In-memory flat vector index.
//!
//! The index stores raw embedding vectors and answers k-nearest-neighbor queries by brute-force
//! squared Euclidean distance. No normalization is applied internally; callers wanting cosine
//! semantics must normalize vectors before insertion. The index is rebuilt wholesale on each
//! ingestion, so there is no delete or incremental update surface.

use thiserror::Error;

/// Errors raised by the flat index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A vector's dimensionality did not match the index.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed at index construction.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
}

/// A single nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the matched vector in insertion order.
    pub position: usize,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

/// Brute-force nearest-neighbor index over fixed-dimension `f32` vectors.
///
/// Positions are assigned in insertion order, so `search` results can be mapped back onto the
/// chunk sequence the vectors were built from.
#[derive(Debug, Default)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index with a fixed vector dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Append vectors to the index, validating their dimensionality.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), IndexError> {
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Return the `k` nearest stored vectors, ordered by ascending distance.
    ///
    /// Distance ties are broken by ascending position so results are deterministic. Searching an
    /// empty index (or with `k == 0`) yields an empty result rather than an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();
        neighbors.sort_unstable_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    /// Number of vectors currently stored.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Dimension fixed at construction.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right.iter())
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_orders_by_ascending_distance() {
        let mut index = FlatIndex::new(2);
        index
            .add(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![1.0, 0.0]])
            .expect("vectors accepted");

        let neighbors = index.search(&[0.0, 0.0], 3).expect("search succeeds");
        let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert!((neighbors[0].distance - 0.0).abs() < f32::EPSILON);
        assert!((neighbors[1].distance - 1.0).abs() < f32::EPSILON);
        assert!((neighbors[2].distance - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn search_truncates_to_k() {
        let mut index = FlatIndex::new(1);
        index
            .add(vec![vec![1.0], vec![2.0], vec![3.0]])
            .expect("vectors accepted");

        let neighbors = index.search(&[0.0], 2).expect("search succeeds");
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].position, 0);
        assert_eq!(neighbors[1].position, 1);
    }

    #[test]
    fn search_on_empty_index_returns_nothing() {
        let index = FlatIndex::new(4);
        let neighbors = index.search(&[0.0; 4], 5).expect("search succeeds");
        assert!(neighbors.is_empty());
    }

    #[test]
    fn distance_ties_break_by_position() {
        let mut index = FlatIndex::new(1);
        index
            .add(vec![vec![1.0], vec![-1.0], vec![1.0]])
            .expect("vectors accepted");

        let neighbors = index.search(&[0.0], 3).expect("search succeeds");
        let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn add_rejects_mismatched_dimension() {
        let mut index = FlatIndex::new(3);
        let error = index.add(vec![vec![0.0, 1.0]]).unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn search_rejects_mismatched_query() {
        let mut index = FlatIndex::new(2);
        index.add(vec![vec![0.0, 0.0]]).expect("vector accepted");
        let error = index.search(&[0.0], 1).unwrap_err();
        assert!(matches!(error, IndexError::DimensionMismatch { .. }));
    }
}
