use std::cmp::Ordering;
use std::collections::HashMap;

use crate::api::ArtworkEmbedding;

use super::cosine::{dot, from_parts, magnitude};
use super::error::IndexError;

/// One artwork embedding as accepted by [`VectorIndex::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub artwork_id: String,
    pub vector: Vec<f32>,
    /// Declared length of `vector`; must match it.
    pub dimension: usize,
}

impl EmbeddingRecord {
    pub fn new(artwork_id: impl Into<String>, vector: Vec<f32>) -> Self {
        let dimension = vector.len();
        Self {
            artwork_id: artwork_id.into(),
            vector,
            dimension,
        }
    }
}

impl From<ArtworkEmbedding> for EmbeddingRecord {
    fn from(e: ArtworkEmbedding) -> Self {
        Self::new(e.id, e.embedding)
    }
}

/// A single ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArtwork {
    pub artwork_id: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

struct Entry {
    artwork_id: String,
    vector: Vec<f32>,
    magnitude: f64,
}

/// Immutable brute-force cosine index over artwork embeddings.
///
/// Built once from a full record set; a refresh builds a new index rather
/// than mutating this one (see [`SharedIndex`](super::SharedIndex)).
/// An index built from no records is valid: it has no dimension and every
/// query on it returns an empty list.
pub struct VectorIndex {
    dimension: Option<usize>,
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
}

impl VectorIndex {
    /// The empty index.
    pub fn empty() -> Self {
        Self {
            dimension: None,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Build an index, validating that every record shares one dimension.
    ///
    /// Mismatched records are rejected, never padded or truncated.
    pub fn build(records: Vec<EmbeddingRecord>) -> Result<Self, IndexError> {
        let mut dimension = None;
        let mut entries = Vec::with_capacity(records.len());
        let mut positions = HashMap::with_capacity(records.len());

        for record in records {
            if record.vector.len() != record.dimension {
                return Err(IndexError::DimensionMismatch {
                    got: record.vector.len(),
                    want: record.dimension,
                });
            }
            let want = *dimension.get_or_insert(record.dimension);
            if record.dimension != want {
                return Err(IndexError::DimensionMismatch {
                    got: record.dimension,
                    want,
                });
            }
            if record.vector.iter().any(|x| !x.is_finite()) {
                return Err(IndexError::NonFinite(record.artwork_id));
            }
            if positions.contains_key(&record.artwork_id) {
                return Err(IndexError::DuplicateId(record.artwork_id));
            }

            positions.insert(record.artwork_id.clone(), entries.len());
            entries.push(Entry {
                magnitude: magnitude(&record.vector),
                artwork_id: record.artwork_id,
                vector: record.vector,
            });
        }

        Ok(Self {
            dimension,
            entries,
            positions,
        })
    }

    /// Build from the remote embedding feed.
    pub fn from_feed(feed: Vec<ArtworkEmbedding>) -> Result<Self, IndexError> {
        Self::build(feed.into_iter().map(EmbeddingRecord::from).collect())
    }

    /// Return the `k` artworks most similar to `vector`.
    ///
    /// Results are sorted by descending score, ties by ascending artwork id.
    /// The result length is `min(k, len())`.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredArtwork>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        let Some(want) = self.dimension else {
            return Ok(Vec::new());
        };
        if vector.len() != want {
            return Err(IndexError::DimensionMismatch {
                got: vector.len(),
                want,
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::NonFinite("query".into()));
        }

        let query_magnitude = magnitude(vector);
        let mut scored: Vec<(f32, usize)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let score = from_parts(dot(vector, &e.vector), query_magnitude, e.magnitude);
                (score, i)
            })
            .collect();

        let order = |a: &(f32, usize), b: &(f32, usize)| -> Ordering {
            b.0.total_cmp(&a.0).then_with(|| {
                self.entries[a.1]
                    .artwork_id
                    .cmp(&self.entries[b.1].artwork_id)
            })
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, order);
            scored.truncate(k);
        }
        scored.sort_unstable_by(order);

        Ok(scored
            .into_iter()
            .map(|(score, i)| ScoredArtwork {
                artwork_id: self.entries[i].artwork_id.clone(),
                score,
            })
            .collect())
    }

    /// Stored embedding of `artwork_id`, if present.
    pub fn embedding(&self, artwork_id: &str) -> Option<&[f32]> {
        self.positions
            .get(artwork_id)
            .map(|&i| self.entries[i].vector.as_slice())
    }

    /// Shared vector length, `None` for the empty index.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimension", &self.dimension)
            .field("len", &self.entries.len())
            .finish()
    }
}
