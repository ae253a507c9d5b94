use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::FetchError;
use crate::flickr;
use crate::models::{PhotoRecord, SearchQuery};

/// The two network operations the controller needs.
/// Implemented by [`FlickrClient`] and by scripted fakes in tests.
#[async_trait]
pub trait PhotoService: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PhotoRecord>, FetchError>;

    async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError>;
}

pub struct FlickrClient {
    client: Client,
    settings: Settings,
}

impl FlickrClient {
    /// No request timeout is configured; an in-flight search only ends when it
    /// completes or its owner cancels it.
    pub fn new(settings: Settings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self { client, settings })
    }

    /// Downloads raw bytes, failing on any non-2xx status
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl PhotoService for FlickrClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PhotoRecord>, FetchError> {
        let url = flickr::search_url(&self.settings, query)?;
        debug!(tags = query.as_str(), "querying {}", url.path());

        let body = self.fetch_bytes(url.as_str()).await?;
        let photos = flickr::parse_photos(&body)?;

        info!(tags = query.as_str(), count = photos.len(), "search finished");
        Ok(photos)
    }

    async fn fetch_image(&self, url: &str) -> Result<DynamicImage, FetchError> {
        debug!(url, "fetching image");
        let bytes = self.fetch_bytes(url).await?;
        decode_image(bytes).await
    }
}

/// Decodes on the blocking pool so large JPEGs never stall the event loop
pub async fn decode_image(bytes: Vec<u8>) -> Result<DynamicImage, FetchError> {
    let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
    Ok(image)
}
