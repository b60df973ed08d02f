//! Artwork similarity search.
//!
//! ```text
//! GET /artwork-embeddings ──▶ VectorIndex::from_feed ──▶ SharedIndex::replace
//!                                                            │
//!                       query / similar_to ◀── Arc snapshot ─┘
//! ```
//!
//! [`VectorIndex`] is an immutable brute-force cosine index; [`SharedIndex`]
//! hands out snapshots and swaps whole indexes on refresh.

pub mod cosine;
pub mod error;
pub mod shared;
pub mod vector;

pub use cosine::cosine_similarity;
pub use error::IndexError;
pub use shared::SharedIndex;
pub use vector::{EmbeddingRecord, ScoredArtwork, VectorIndex};
