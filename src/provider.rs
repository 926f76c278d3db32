use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{Config, DEFAULT_YOUTUBE_API_BASE, DEFAULT_YOUTUBE_MAX_RESULTS};
use crate::data_models::VideoResult;
use crate::error::SearchError;

/// Anything that can turn a settled query into an ordered list of videos.
#[async_trait]
pub trait VideoLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<VideoResult>, SearchError>;
}

/// Client for the YouTube Data API v3 `search` endpoint.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>) -> YouTubeClient {
        YouTubeClient {
            http: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_YOUTUBE_API_BASE.to_string(),
            max_results: DEFAULT_YOUTUBE_MAX_RESULTS,
        }
    }

    pub fn from_config(config: &Config) -> YouTubeClient {
        YouTubeClient::new(config.youtube_api_key.clone())
            .with_base_url(config.youtube_api_base.clone())
            .with_max_results(config.youtube_max_results)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> YouTubeClient {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> YouTubeClient {
        self.max_results = max_results;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl VideoLookup for YouTubeClient {
    async fn lookup(&self, query: &str) -> Result<Vec<VideoResult>, SearchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(SearchError::MissingCredentials)?;

        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        let max_results = self.max_results.to_string();
        let res = self
            .http
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max_results.as_str()),
                ("q", query),
                ("key", key),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            // Google wraps failures as {"error": {"code": .., "message": ..}}
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            log::warn!("youtube search for {query:?} failed with {status}: {message}");
            return Err(SearchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchListResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::UnexpectedResponse(e.to_string()))?;

        let results: Vec<VideoResult> = parsed
            .items
            .into_iter()
            .filter_map(SearchItem::into_video)
            .collect();
        log::debug!("youtube search for {query:?} returned {} videos", results.len());
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Snippet {
    title: String,
    description: String,
    channel_title: String,
    published_at: Option<String>,
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl SearchItem {
    /// Channel and playlist hits carry no `videoId` and are skipped.
    fn into_video(self) -> Option<VideoResult> {
        let video_id = self.id.video_id?;
        let snippet = self.snippet;
        let thumbnail_url = snippet
            .thumbnails
            .high
            .or(snippet.thumbnails.medium)
            .or(snippet.thumbnails.default)
            .map(|t| t.url);
        Some(VideoResult {
            video_id,
            title: snippet.title,
            description: snippet.description,
            channel_title: snippet.channel_title,
            thumbnail_url,
            published_at: snippet.published_at,
        })
    }
}
