//! Core `RemoteStore` trait and `HttpStore` implementation.
//!
//! `HttpStore` talks to the artwork REST API.  All connection details come
//! from [`ApiConfig`] / [`UploadConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};

use crate::config::{ApiConfig, UploadConfig};

use super::error::ApiError;
use super::models::{ArtworkEmbedding, ArtworkId, AudioElement, ImageDetails, RemoteAudioId};

// ---------------------------------------------------------------------------
// RemoteStore trait
// ---------------------------------------------------------------------------

/// Async interface to the remote artwork / audio store.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn RemoteStore>`).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Bulk-load every artwork embedding.
    async fn fetch_embeddings(&self) -> Result<Vec<ArtworkEmbedding>, ApiError>;

    /// List recordings attached to an artwork.
    async fn list_audios(&self, artwork_id: ArtworkId) -> Result<Vec<AudioElement>, ApiError>;

    /// Fetch artwork metadata.
    async fn fetch_artwork(&self, artwork_id: ArtworkId) -> Result<ImageDetails, ApiError>;

    /// Fetch the raw bytes of a persisted recording.
    async fn fetch_audio(&self, audio_id: RemoteAudioId) -> Result<Bytes, ApiError>;

    /// Persist an encoded recording and return the id the store assigned.
    async fn upload_audio(
        &self,
        artwork_id: ArtworkId,
        audio: Bytes,
        content_type: &str,
    ) -> Result<RemoteAudioId, ApiError>;
}

// ---------------------------------------------------------------------------
// HttpStore
// ---------------------------------------------------------------------------

/// [`RemoteStore`] backed by the artwork REST API.
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    upload_path: String,
    token: Option<String>,
}

impl HttpStore {
    /// Build an `HttpStore` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `api.timeout_secs`.  A default client is used if the builder fails.
    pub fn from_config(api: &ApiConfig, upload: &UploadConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(api.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            upload_path: upload.path.clone(),
            token: api.token.clone().filter(|t| !t.is_empty()),
        }
    }

    /// Direct URL of a recording's byte stream.
    pub fn audio_url(&self, audio_id: RemoteAudioId) -> String {
        self.url(&format!("/audio/{audio_id}"))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, self.url(path));
        match self.token.as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send `req` and turn non-success statuses into [`ApiError`]s.
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if !status.is_client_error() {
            ApiError::check_status(status, what, "")?;
            return Ok(response);
        }
        // Only client errors carry a useful message; don't wait on 5xx bodies.
        let body = response.text().await.unwrap_or_default();
        ApiError::check_status(status, what, &body)?;
        Err(ApiError::Client {
            status: status.as_u16(),
            message: body,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
    ) -> Result<T, ApiError> {
        let req = self
            .request(reqwest::Method::GET, path)
            .header(reqwest::header::ACCEPT, "application/json");
        let response = self.send(req, what).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn fetch_embeddings(&self) -> Result<Vec<ArtworkEmbedding>, ApiError> {
        let feed: Vec<ArtworkEmbedding> =
            self.get_json("/artwork-embeddings", "artwork embeddings").await?;
        log::debug!("api: fetched {} artwork embeddings", feed.len());
        Ok(feed)
    }

    async fn list_audios(&self, artwork_id: ArtworkId) -> Result<Vec<AudioElement>, ApiError> {
        self.get_json(
            &format!("/image/{artwork_id}/audios"),
            &format!("artwork {artwork_id}"),
        )
        .await
    }

    async fn fetch_artwork(&self, artwork_id: ArtworkId) -> Result<ImageDetails, ApiError> {
        self.get_json(
            &format!("/images/{artwork_id}"),
            &format!("artwork {artwork_id}"),
        )
        .await
    }

    async fn fetch_audio(&self, audio_id: RemoteAudioId) -> Result<Bytes, ApiError> {
        let req = self
            .request(reqwest::Method::GET, &format!("/audio/{audio_id}"))
            .header(reqwest::header::ACCEPT, "audio/*");
        let response = self.send(req, &format!("audio {audio_id}")).await?;
        Ok(response.bytes().await?)
    }

    async fn upload_audio(
        &self,
        artwork_id: ArtworkId,
        audio: Bytes,
        content_type: &str,
    ) -> Result<RemoteAudioId, ApiError> {
        let part = Part::bytes(audio.to_vec())
            .file_name(upload_file_name(content_type))
            .mime_str(content_type)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let form = Form::new()
            .text("image_id", artwork_id.to_string())
            .part("file", part);

        let req = self
            .request(reqwest::Method::POST, &self.upload_path)
            .multipart(form);
        let response = self.send(req, &format!("artwork {artwork_id}")).await?;
        let text = response.text().await?;
        parse_upload_response(&text)
    }
}

/// File name declared for an uploaded recording of the given MIME type.
fn upload_file_name(content_type: &str) -> &'static str {
    match content_type {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "recording.wav",
        "audio/webm" => "recording.webm",
        "audio/ogg" => "recording.ogg",
        _ => "recording.bin",
    }
}

/// Extract the assigned id from an upload response.
///
/// The store answers either with a bare number or with an object carrying
/// an `id` field.
fn parse_upload_response(body: &str) -> Result<RemoteAudioId, ApiError> {
    let value: serde_json::Value = serde_json::from_str(body.trim())?;
    value
        .as_i64()
        .or_else(|| value.get("id").and_then(serde_json::Value::as_i64))
        .ok_or_else(|| ApiError::Parse(format!("no audio id in upload response: {body}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(base_url: &str, token: Option<&str>) -> HttpStore {
        let api = ApiConfig {
            base_url: base_url.into(),
            token: token.map(|t| t.to_string()),
            timeout_secs: 5,
        };
        HttpStore::from_config(&api, &UploadConfig::default())
    }

    #[test]
    fn urls_are_joined_without_double_slash() {
        let store = make_store("http://localhost:8000/", None);
        assert_eq!(store.url("/images/3"), "http://localhost:8000/images/3");
        assert_eq!(store.url("token"), "http://localhost:8000/token");
        assert_eq!(store.audio_url(12), "http://localhost:8000/audio/12");
    }

    #[test]
    fn empty_token_is_ignored() {
        let store = make_store("http://localhost:8000", Some(""));
        assert!(store.token.is_none());
        let store = make_store("http://localhost:8000", Some("abc"));
        assert_eq!(store.token.as_deref(), Some("abc"));
    }

    #[test]
    fn upload_response_bare_number() {
        assert_eq!(parse_upload_response("17\n").unwrap(), 17);
    }

    #[test]
    fn upload_response_object() {
        assert_eq!(
            parse_upload_response(r#"{"id": 23, "filename": "x.wav"}"#).unwrap(),
            23
        );
    }

    #[test]
    fn upload_response_without_id_is_parse_error() {
        let err = parse_upload_response(r#"{"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert!(matches!(
            parse_upload_response("not json").unwrap_err(),
            ApiError::Parse(_)
        ));
    }

    #[test]
    fn file_name_follows_content_type() {
        assert_eq!(upload_file_name("audio/wav"), "recording.wav");
        assert_eq!(upload_file_name("application/octet-stream"), "recording.bin");
    }

    #[test]
    fn store_is_object_safe() {
        let store: Box<dyn RemoteStore> = Box::new(make_store("http://localhost:8000", None));
        drop(store);
    }
}
