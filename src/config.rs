use anyhow::{anyhow, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest/";
pub const DEFAULT_PER_PAGE: u32 = 500;
/// Flickr rejects larger pages for photos.search
pub const MAX_PER_PAGE: u32 = 500;

/// Runtime settings for talking to Flickr
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub endpoint: String,
    pub per_page: u32,
    pub user_agent: String,
}

impl Settings {
    /// Validates raw values coming from the command line or environment
    pub fn new(api_key: Option<String>, endpoint: String, per_page: u32) -> Result<Self> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow!("No Flickr API key. Set FLICKR_API_KEY or pass --api-key."))?;

        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(anyhow!("per-page must be between 1 and {}, got {}", MAX_PER_PAGE, per_page));
        }

        url::Url::parse(&endpoint)
            .map_err(|e| anyhow!("Invalid endpoint {}: {}", endpoint, e))?;

        Ok(Self {
            api_key,
            endpoint,
            per_page,
            user_agent: default_user_agent(),
        })
    }

    /// Settings pointing at an arbitrary endpoint, used by tests and local stubs
    pub fn with_endpoint(api_key: &str, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            per_page: DEFAULT_PER_PAGE,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("flickrview/{}", env!("CARGO_PKG_VERSION"))
}
