use std::time::Duration;

use attohttpc::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use attohttpc::RequestBuilder;
use serde::{Deserialize, Serialize};

use crate::codec::EncodedImage;
use crate::config::Config;
use crate::error::{Result, WallgenError};

const BROWSER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";
const ORIGIN: &str = "https://www.craiyon.com";

/// Source of generated images for a prompt.
pub trait ImageService {
    fn generate(&self, prompt: &str) -> Result<Vec<EncodedImage>>;
}

#[derive(Debug, Serialize)]
struct DrawRequest<'a> {
    prompt: &'a str,
    token: Option<&'a str>,
    version: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct DrawResponse {
    pub images: Vec<String>,
}

/// Blocking client for the Craiyon draw API.
#[derive(Debug, Clone)]
pub struct CraiyonClient {
    api_url: String,
    image_url: String,
    version: String,
    timeout: Duration,
}

impl CraiyonClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_url: config.api_url.clone(),
            image_url: config.image_url.trim_end_matches('/').to_string(),
            version: config.api_version.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn with_defaults<B>(&self, builder: RequestBuilder<B>) -> RequestBuilder<B> {
        builder
            .header("pragma", "no-cache")
            .header("cache-control", "no-cache")
            .header("origin", ORIGIN)
            .header(USER_AGENT, BROWSER_AGENT)
            .timeout(self.timeout)
    }

    /// Asks the service to draw `prompt` and returns the relative image paths.
    pub fn draw(&self, prompt: &str) -> Result<Vec<String>> {
        let payload = serde_json::to_string(&DrawRequest {
            prompt,
            token: None,
            version: &self.version,
        })
        .map_err(|e| WallgenError::Config(format!("cannot encode request: {}", e)))?;

        let response = self
            .with_defaults(attohttpc::post(&self.api_url))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .text(payload)
            .send()?;

        let status = response.status().as_u16();
        let body = response.text()?;
        if status != 200 {
            return Err(WallgenError::RemoteService { status, body });
        }

        let parsed: DrawResponse =
            serde_json::from_str(&body).map_err(|e| WallgenError::RemoteService {
                status,
                body: format!("unexpected response ({}): {}", e, body),
            })?;
        Ok(parsed.images)
    }

    /// Downloads one generated image and wraps it in the transport encoding.
    pub fn fetch_image(&self, path: &str) -> Result<EncodedImage> {
        let url = format!("{}/{}", self.image_url, path.trim_start_matches('/'));
        log::debug!("Fetching {}", url);

        let response = self
            .with_defaults(attohttpc::get(&url))
            .header(ACCEPT, "*/*")
            .send()?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text()?;
            return Err(WallgenError::RemoteService { status, body });
        }

        let bytes = response.bytes()?;
        Ok(EncodedImage::from_raw(&bytes))
    }
}

impl ImageService for CraiyonClient {
    fn generate(&self, prompt: &str) -> Result<Vec<EncodedImage>> {
        let paths = self.draw(prompt)?;
        log::info!("Service returned {} images", paths.len());
        paths.iter().map(|path| self.fetch_image(path)).collect()
    }
}
