//! Wire models returned by the remote store.

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of an artwork (image) in the remote store.
pub type ArtworkId = i64;

/// Identifier assigned by the remote store to a persisted recording.
pub type RemoteAudioId = i64;

/// One entry of the `/artwork-embeddings` feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtworkEmbedding {
    /// Artwork identifier; the feed may send it as a string or a number.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Precomputed feature vector.
    pub embedding: Vec<f32>,
}

/// Metadata of one recording attached to an artwork.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioElement {
    pub id: RemoteAudioId,
    pub filename: String,
    pub image_id: ArtworkId,
    pub user_id: i64,
    pub created_at: String,
}

/// Artwork metadata shown next to its recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDetails {
    pub id: ArtworkId,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub artist: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}
