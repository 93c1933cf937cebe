#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Serialize;

use crate::segment::WirePattern;
use crate::speaker::SpeakerTracks;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the device's HTTP endpoints. Every failure is logged and
/// reported as "no data" or "not saved"; nothing is retried.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn load_morse_message(&self) -> Option<String> {
        self.try_load_morse_message()
            .await
            .map_err(|err| log_warn!("Could not load Morse message: {err:?}"))
            .ok()
    }

    pub async fn save_morse_message(&self, text: &str) -> bool {
        match self.try_save_morse_message(text).await {
            Ok(()) => {
                log_debug!("Morse message saved ({} chars)", text.chars().count());
                true
            }
            Err(err) => {
                log_warn!("Could not save Morse message: {err:?}");
                false
            }
        }
    }

    /// `None` when the device has no pattern or sends one that does not decode.
    pub async fn load_pattern(&self) -> Option<WirePattern> {
        self.try_load_pattern()
            .await
            .map_err(|err| log_warn!("Could not load pattern: {err:?}"))
            .ok()
    }

    pub async fn save_pattern(&self, pattern: &WirePattern) -> bool {
        match self.post_json("/pattern", pattern).await {
            Ok(()) => {
                log_debug!("Pattern saved: {} changes", pattern.pattern_changes.len());
                true
            }
            Err(err) => {
                log_warn!("Could not save pattern: {err:?}");
                false
            }
        }
    }

    /// Posts `{"tracks": [[...], [...], [...], [...]]}`, the shape
    /// `SpeakerTracks` serializes to.
    pub async fn save_speaker_tracks(&self, tracks: &SpeakerTracks) -> bool {
        match self.post_json("/saveSpeakerData", tracks).await {
            Ok(()) => true,
            Err(err) => {
                log_warn!("Could not save speaker tracks: {err:?}");
                false
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn try_load_morse_message(&self) -> Result<String> {
        let response = self.client.get(self.url("/morseMessage")).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("gateway returned {}", response.status()));
        }
        Ok(response.text().await?)
    }

    async fn try_save_morse_message(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/morseMessage"))
            .header(CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("gateway returned {}", response.status()));
        }
        Ok(())
    }

    async fn try_load_pattern(&self) -> Result<WirePattern> {
        let response = self.client.get(self.url("/pattern")).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("gateway returned {}", response.status()));
        }
        let pattern: WirePattern = response
            .json()
            .await
            .context("Malformed pattern payload")?;
        if pattern.durations().is_none() {
            return Err(anyhow!(
                "pattern changes are not increasing: {:?}",
                pattern.pattern_changes
            ));
        }
        Ok(pattern)
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("gateway returned {} for {}", response.status(), path));
        }
        Ok(())
    }
}
