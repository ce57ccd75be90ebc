//! Flat inner-product vector index
//!
//! Vectors are stored row-major in insertion order; a vector's position is
//! the join key into the metadata list. Exact search scores every vector.
//! An instant-distance HNSW graph can be built over the same vectors for
//! approximate search.

use instant_distance::{Builder, HnswMap, Point, Search};

use crate::error::{Result, RetrievalError};

/// Seed for HNSW construction so approximate results are reproducible
const HNSW_SEED: u64 = 0x5173_c4a7;
const HNSW_EF_CONSTRUCTION: usize = 100;
const HNSW_MIN_EF_SEARCH: usize = 100;

/// A search hit: position in the index and its inner-product score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub score: f32,
}

/// Exact inner-product index over fixed-dimension vectors
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Rebuild an index from a row-major buffer
    ///
    /// Fails when the buffer is not a whole number of rows.
    pub fn from_raw(dimension: usize, vectors: Vec<f32>) -> std::result::Result<Self, String> {
        if dimension == 0 && !vectors.is_empty() {
            return Err("zero dimension with non-empty vector data".to_string());
        }
        if dimension > 0 && vectors.len() % dimension != 0 {
            return Err(format!(
                "{} floats is not a multiple of dimension {}",
                vectors.len(),
                dimension
            ));
        }
        Ok(Self { dimension, vectors })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors, preserving their order
    ///
    /// Either every vector is appended or, on a dimension mismatch, none is.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.vectors.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.vectors.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Iterate vectors in position order
    pub fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.vectors.chunks_exact(self.dimension.max(1))
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.vectors
    }

    /// Exact top-k by inner product
    ///
    /// Results are ordered by score descending; equal scores keep position
    /// order. Asking for more neighbors than stored returns all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }

        let mut hits: Vec<Neighbor> = self
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                score: dot(query, vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Approximate top-k using an HNSW graph over the stored vectors
    ///
    /// Vectors are expected to be unit length; distance is `1 - dot`. The
    /// graph is built per call since the index itself is rebuilt in full.
    pub fn search_hnsw(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_query(query)?;
        if k == 0 || self.is_empty() {
            return Ok(vec![]);
        }

        let points: Vec<HnswPoint> = self.iter().map(|v| HnswPoint(v.to_vec())).collect();
        let positions: Vec<usize> = (0..points.len()).collect();

        let hnsw: HnswMap<HnswPoint, usize> = Builder::default()
            .seed(HNSW_SEED)
            .ef_construction(HNSW_EF_CONSTRUCTION)
            .ef_search(k.max(HNSW_MIN_EF_SEARCH))
            .build(points, positions);

        let query_point = HnswPoint(query.to_vec());
        let mut search = Search::default();

        Ok(hnsw
            .search(&query_point, &mut search)
            .take(k)
            .map(|item| Neighbor {
                position: *item.value,
                score: 1.0 - item.distance,
            })
            .collect())
    }

    fn check_query(&self, query: &[f32]) -> Result<()> {
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        Ok(())
    }
}

/// HNSW point wrapper for approximate search
#[derive(Clone)]
struct HnswPoint(Vec<f32>);

impl Point for HnswPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Cosine distance on unit vectors (HNSW finds minimum)
        (1.0 - dot(&self.0, &other.0)).max(0.0)
    }
}

/// Inner product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean norm
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `v` to unit Euclidean length in place
///
/// Returns `false` and leaves `v` untouched when its norm is zero or not
/// finite; such vectors are degenerate and cannot be ranked. Build and query
/// vectors must both go through this function.
pub fn normalize_l2(v: &mut [f32]) -> bool {
    let norm = v
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt();

    if !(norm.is_finite() && norm > 0.0) {
        return false;
    }

    for x in v.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(v: &[f32]) -> Vec<f32> {
        let mut v = v.to_vec();
        assert!(normalize_l2(&mut v));
        v
    }

    fn sample_index() -> FlatIndex {
        let mut index = FlatIndex::new(3);
        index
            .add(&[
                unit(&[1.0, 0.0, 0.0]),
                unit(&[0.0, 1.0, 0.0]),
                unit(&[1.0, 1.0, 0.0]),
            ])
            .unwrap();
        index
    }

    #[test]
    fn test_normalize_produces_unit_norm() {
        let mut v = vec![3.0, 4.0, 12.0];
        assert!(normalize_l2(&mut v));
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_normalize_rejects_zero_vector() {
        let mut v = vec![0.0; 4];
        assert!(!normalize_l2(&mut v));
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn test_normalize_rejects_non_finite() {
        let mut v = vec![f32::NAN, 1.0];
        assert!(!normalize_l2(&mut v));
        let mut v = vec![f32::INFINITY, 1.0];
        assert!(!normalize_l2(&mut v));
    }

    #[test]
    fn test_add_preserves_order() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert_eq!(index.iter().nth(1).unwrap(), &[0.0, 1.0, 0.0]);
        assert!(index.iter().nth(3).is_none());
    }

    #[test]
    fn test_add_rejects_wrong_dimension_atomically() {
        let mut index = FlatIndex::new(3);
        let err = index
            .add(&[vec![1.0, 0.0, 0.0], vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = sample_index();
        let hits = index.search(&unit(&[1.0, 0.2, 0.0]), 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 2, 1]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_search_clamps_k() {
        let index = sample_index();
        assert_eq!(index.search(&unit(&[1.0, 0.0, 0.0]), 1000).unwrap().len(), 3);
        assert!(index.search(&unit(&[1.0, 0.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_ties_keep_position_order() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]])
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 2);
    }

    #[test]
    fn test_search_wrong_query_dimension() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(RetrievalError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_search_empty_index() {
        let index = FlatIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
        assert!(index.search_hnsw(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_hnsw_finds_exact_match_first() {
        let index = sample_index();
        let hits = index.search_hnsw(&unit(&[0.0, 1.0, 0.0]), 2).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].position, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_raw_validates_length() {
        assert!(FlatIndex::from_raw(3, vec![0.0; 6]).is_ok());
        assert!(FlatIndex::from_raw(3, vec![0.0; 7]).is_err());
        assert!(FlatIndex::from_raw(0, vec![1.0]).is_err());
        assert_eq!(FlatIndex::from_raw(0, vec![]).unwrap().len(), 0);
    }
}
