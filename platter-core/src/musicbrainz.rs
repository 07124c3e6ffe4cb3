//! Best-effort MusicBrainz metadata lookup.
//!
//! One request per second, no retry, no merging: a failed lookup just means
//! no extra metadata. The rate limiter is owned by the client instance rather
//! than hidden in module state, so two clients never share timing through a
//! global.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://musicbrainz.org";
const USER_AGENT: &str = "platter/0.1 +https://github.com/platter-fm/platter";

/// Spaces calls at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the next request is allowed, then claim the slot.
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;
        if let Some(last) = *last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_request = Some(Instant::now());
    }
}

#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("MusicBrainz API error: {0}")]
    Api(String),
}

/// A release found by the search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MbRelease {
    pub release_id: String,
    pub title: String,
    pub artist: String,
    pub date: Option<String>,
    pub country: Option<String>,
}

pub struct MusicBrainzClient {
    http: reqwest::Client,
    limiter: RateLimiter,
    base_url: String,
}

impl Default for MusicBrainzClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicBrainzClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            limiter: RateLimiter::new(Duration::from_secs(1)),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Search releases by artist and title. Best effort: callers treat a
    /// failure as "no metadata", never as fatal.
    pub async fn search_release(
        &self,
        artist: &str,
        title: &str,
    ) -> Result<Vec<MbRelease>, MusicBrainzError> {
        let query = format!("release:\"{}\" AND artist:\"{}\"", title, artist);
        debug!("MusicBrainz search: {}", query);

        self.limiter.wait().await;

        let url = format!("{}/ws/2/release", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "5")])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| MusicBrainzError::Api(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MusicBrainzError::Api(format!(
                "MusicBrainz API returned status {}",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MusicBrainzError::Api(format!("Failed to parse JSON: {e}")))?;
        Ok(parse_release_search(&json))
    }
}

fn parse_release_search(json: &serde_json::Value) -> Vec<MbRelease> {
    let mut releases = Vec::new();
    if let Some(array) = json.get("releases").and_then(|r| r.as_array()) {
        for release in array {
            let (Some(id), Some(title)) = (
                release.get("id").and_then(|v| v.as_str()),
                release.get("title").and_then(|v| v.as_str()),
            ) else {
                continue;
            };
            let artist = release
                .get("artist-credit")
                .and_then(|ac| ac.as_array())
                .and_then(|credits| credits.first())
                .and_then(|credit| credit.get("name"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown Artist")
                .to_string();
            let date = release
                .get("date")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string());
            let country = release
                .get("country")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            releases.push(MbRelease {
                release_id: id.to_string(),
                title: title.to_string(),
                artist,
                date,
                country,
            });
        }
    }
    releases
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        let start = tokio::time::Instant::now();

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_does_not_wait_after_idle_period() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        limiter.wait().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let start = tokio::time::Instant::now();
        limiter.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn parse_release_search_extracts_fields() {
        let json = serde_json::json!({
            "releases": [
                {
                    "id": "11111111-2222-3333-4444-555555555555",
                    "title": "Future Days",
                    "date": "1973-08",
                    "country": "DE",
                    "artist-credit": [{"name": "Can"}]
                },
                {
                    "id": "66666666-7777-8888-9999-000000000000",
                    "title": "Untitled",
                    "date": "",
                    "artist-credit": []
                },
                {"title": "No id, skipped"}
            ]
        });

        let releases = parse_release_search(&json);
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].artist, "Can");
        assert_eq!(releases[0].date.as_deref(), Some("1973-08"));
        assert_eq!(releases[1].artist, "Unknown Artist");
        assert_eq!(releases[1].date, None);
        assert_eq!(releases[1].country, None);
    }

    #[test]
    fn parse_release_search_handles_missing_array() {
        assert!(parse_release_search(&serde_json::json!({})).is_empty());
    }
}
