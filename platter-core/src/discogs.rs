//! Discogs API client: OAuth 1.0a three-legged handshake, identity lookup,
//! and paginated collection retrieval with a bounded retry policy.

use std::collections::HashMap;

use platter_common::{
    display_artist, ArtistCredit, BasicInformation, Identifier, Release, SortField, SortOrder,
    Track, Tracklist,
};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::oauth1::{self, TokenPair};
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://api.discogs.com";
const AUTHORIZE_URL: &str = "https://www.discogs.com/oauth/authorize";
const USER_AGENT: &str = "platter/0.1 +https://github.com/platter-fm/platter";

/// Total attempts (first try included) for a collection page fetch.
const MAX_FETCH_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum DiscogsError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("API rate limit exceeded")]
    RateLimit,
    #[error("Discogs API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DiscogsError {
    /// Auth failures are final; rate limits, server errors and connectivity
    /// failures share the retry budget.
    fn is_retryable(&self) -> bool {
        match self {
            DiscogsError::Auth(_) => false,
            DiscogsError::RateLimit => true,
            DiscogsError::Api { status, .. } => *status >= 500,
            DiscogsError::Request(_) => true,
            DiscogsError::Serialization(_) => false,
        }
    }
}

/// Result of the request-token leg. `authorize_url` is where the user's
/// browser goes to grant access.
#[derive(Debug, Clone)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
    pub authorize_url: String,
}

/// Result of the access-token exchange.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub secret: String,
}

impl From<AccessToken> for TokenPair {
    fn from(access: AccessToken) -> Self {
        TokenPair::new(access.token, access.secret)
    }
}

/// The authenticated user, from `oauth/identity`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Identity {
    pub id: u64,
    pub username: String,
    pub resource_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub items: u32,
}

/// One page of the user's collection, already mapped to the domain model.
#[derive(Debug, Clone)]
pub struct CollectionPage {
    pub releases: Vec<Release>,
    pub pagination: Pagination,
}

/// Full release detail, fetched lazily when a release is queued.
#[derive(Debug, Clone)]
pub struct ReleaseDetail {
    pub id: u64,
    pub title: String,
    pub year: Option<u32>,
    pub artist: String,
    pub tracklist: Tracklist,
    pub identifiers: Vec<Identifier>,
}

// -- Response types (wire shapes, private to the client) --

#[derive(Deserialize)]
struct CollectionResponse {
    pagination: Pagination,
    releases: Vec<CollectionRelease>,
}

#[derive(Deserialize)]
struct CollectionRelease {
    id: u64,
    instance_id: u64,
    date_added: Option<String>,
    basic_information: BasicInformationResponse,
}

#[derive(Deserialize)]
struct BasicInformationResponse {
    title: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    formats: Vec<FormatResponse>,
    #[serde(default)]
    artists: Vec<ArtistResponse>,
    #[serde(default)]
    thumb: Option<String>,
}

#[derive(Deserialize)]
struct FormatResponse {
    name: String,
}

#[derive(Deserialize)]
struct ArtistResponse {
    name: String,
    #[serde(default)]
    anv: String,
    #[serde(default)]
    join: String,
}

#[derive(Deserialize)]
struct ReleaseDetailResponse {
    id: u64,
    title: String,
    #[serde(default)]
    year: u32,
    #[serde(default)]
    artists: Vec<ArtistResponse>,
    #[serde(default)]
    tracklist: Vec<TrackResponse>,
    #[serde(default)]
    identifiers: Vec<IdentifierResponse>,
}

#[derive(Deserialize)]
struct TrackResponse {
    #[serde(default)]
    position: String,
    /// Discogs really does call this field "type_".
    #[serde(default)]
    type_: String,
    title: String,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    artists: Vec<ArtistResponse>,
    #[serde(default)]
    sub_tracks: Vec<TrackResponse>,
}

#[derive(Deserialize)]
struct IdentifierResponse {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Clone)]
pub struct DiscogsClient {
    http: reqwest::Client,
    consumer: TokenPair,
    base_url: String,
}

impl DiscogsClient {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            consumer: TokenPair::new(consumer_key, consumer_secret),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// First leg of the handshake: obtain a request token and the URL the
    /// user must visit to authorize it.
    pub async fn get_request_token(
        &self,
        callback_url: &str,
    ) -> Result<RequestToken, DiscogsError> {
        let url = format!("{}/oauth/request_token", self.base_url);
        let params = oauth1::oauth_params(
            &self.consumer,
            None,
            "POST",
            &url,
            &[("oauth_callback", callback_url)],
            &[],
        );
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, oauth1::authorization_header(&params))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DiscogsError::Auth(format!(
                "request token rejected (status {status}): {}",
                body.trim()
            )));
        }

        let (token, secret) = parse_token_response(&body)?;
        let authorize_url = format!("{AUTHORIZE_URL}?oauth_token={token}");
        Ok(RequestToken {
            token,
            secret,
            authorize_url,
        })
    }

    /// Final leg: exchange the authorized request token + verifier for an
    /// access token.
    pub async fn get_access_token(
        &self,
        request_token: &str,
        request_token_secret: &str,
        verifier: &str,
    ) -> Result<AccessToken, DiscogsError> {
        let url = format!("{}/oauth/access_token", self.base_url);
        let request = TokenPair::new(request_token, request_token_secret);
        let params = oauth1::oauth_params(
            &self.consumer,
            Some(&request),
            "POST",
            &url,
            &[("oauth_verifier", verifier)],
            &[],
        );
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, oauth1::authorization_header(&params))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DiscogsError::Auth(format!(
                "access token rejected (status {status}): {}",
                body.trim()
            )));
        }

        let (token, secret) = parse_token_response(&body)?;
        Ok(AccessToken { token, secret })
    }

    /// Who the access token belongs to. A 401 here means the token is no
    /// longer valid and the caller should re-run the handshake.
    pub async fn get_identity(&self, access: &TokenPair) -> Result<Identity, DiscogsError> {
        let url = format!("{}/oauth/identity", self.base_url);
        let response = self.signed_get(&url, access, &[]).await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscogsError::Auth(api_message(&body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscogsError::Api {
                status: status.as_u16(),
                message: api_message(&body),
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch one page of the user's collection folder.
    ///
    /// Applies the bounded retry policy: up to [`MAX_FETCH_ATTEMPTS`]
    /// attempts total, 401 failing immediately, 429/5xx/network errors
    /// retried with backoff and surfaced typed after the last attempt.
    pub async fn fetch_collection_page(
        &self,
        username: &str,
        access: &TokenPair,
        page: u32,
        sort: SortField,
        order: SortOrder,
        per_page: u32,
    ) -> Result<CollectionPage, DiscogsError> {
        retry_with_backoff(
            MAX_FETCH_ATTEMPTS,
            "discogs collection page",
            DiscogsError::is_retryable,
            || self.fetch_collection_page_once(username, access, page, sort, order, per_page),
        )
        .await
    }

    async fn fetch_collection_page_once(
        &self,
        username: &str,
        access: &TokenPair,
        page: u32,
        sort: SortField,
        order: SortOrder,
        per_page: u32,
    ) -> Result<CollectionPage, DiscogsError> {
        let url = format!(
            "{}/users/{}/collection/folders/0/releases",
            self.base_url, username
        );
        let page_param = page.to_string();
        let per_page_param = per_page.to_string();
        let query = [
            ("page", page_param.as_str()),
            ("per_page", per_page_param.as_str()),
            ("sort", sort.as_query_value()),
            ("sort_order", order.as_query_value()),
        ];
        debug!("fetching collection page {} for {}", page, username);

        let response = self.signed_get(&url, access, &query).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let body = response.text().await?;
        parse_collection_page(&body)
    }

    /// Fetch full detail (tracklist, identifiers) for one release. No retry
    /// wrapper: the queue surfaces the failure on the item and the user
    /// re-queues.
    pub async fn fetch_release(
        &self,
        release_id: u64,
        access: &TokenPair,
    ) -> Result<ReleaseDetail, DiscogsError> {
        let url = format!("{}/releases/{}", self.base_url, release_id);
        let response = self.signed_get(&url, access, &[]).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        let body = response.text().await?;
        parse_release_detail(&body)
    }

    async fn signed_get(
        &self,
        url: &str,
        access: &TokenPair,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, reqwest::Error> {
        let params =
            oauth1::oauth_params(&self.consumer, Some(access), "GET", url, &[], query);
        self.http
            .get(url)
            .query(query)
            .header(reqwest::header::AUTHORIZATION, oauth1::authorization_header(&params))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
    }
}

/// Parse the form-encoded token response from the handshake endpoints.
fn parse_token_response(body: &str) -> Result<(String, String), DiscogsError> {
    let fields: HashMap<String, String> = serde_urlencoded::from_str(body)
        .map_err(|e| DiscogsError::Auth(format!("malformed token response: {e}")))?;
    match (fields.get("oauth_token"), fields.get("oauth_token_secret")) {
        (Some(token), Some(secret)) => Ok((token.clone(), secret.clone())),
        _ => Err(DiscogsError::Auth(
            "token response missing oauth token fields".to_string(),
        )),
    }
}

fn classify_failure(status: u16, body: &str) -> DiscogsError {
    match status {
        401 => DiscogsError::Auth(api_message(body)),
        429 => DiscogsError::RateLimit,
        _ => DiscogsError::Api {
            status,
            message: api_message(body),
        },
    }
}

/// Pull the human-readable message out of a Discogs error body, falling back
/// to the raw text.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn parse_collection_page(body: &str) -> Result<CollectionPage, DiscogsError> {
    let parsed: CollectionResponse = serde_json::from_str(body)?;
    Ok(CollectionPage {
        pagination: parsed.pagination,
        releases: parsed.releases.into_iter().map(map_release).collect(),
    })
}

fn parse_release_detail(body: &str) -> Result<ReleaseDetail, DiscogsError> {
    let parsed: ReleaseDetailResponse = serde_json::from_str(body)?;
    let artists = map_artists(parsed.artists);
    Ok(ReleaseDetail {
        id: parsed.id,
        title: parsed.title,
        year: (parsed.year > 0).then_some(parsed.year),
        artist: display_artist(&artists),
        tracklist: map_tracklist(parsed.tracklist),
        identifiers: parsed
            .identifiers
            .into_iter()
            .map(|i| Identifier {
                kind: i.kind,
                value: i.value,
            })
            .collect(),
    })
}

fn map_release(entry: CollectionRelease) -> Release {
    let artists = map_artists(entry.basic_information.artists);
    Release {
        id: entry.id,
        instance_id: entry.instance_id,
        date_added: entry.date_added,
        basic: BasicInformation {
            title: entry.basic_information.title,
            year: (entry.basic_information.year > 0).then_some(entry.basic_information.year),
            formats: entry
                .basic_information
                .formats
                .into_iter()
                .map(|f| f.name)
                .collect(),
            artist: display_artist(&artists),
            artists,
            thumb: entry.basic_information.thumb,
        },
        tracklist: None,
        identifiers: Vec::new(),
    }
}

fn map_artists(artists: Vec<ArtistResponse>) -> Vec<ArtistCredit> {
    artists
        .into_iter()
        .map(|a| ArtistCredit {
            name: a.name,
            anv: a.anv,
            join: a.join,
        })
        .collect()
}

/// Split the raw tracklist into main tracks and bonus entries.
///
/// Headings are dropped; index/medley entries keep their parts as subtracks;
/// unnumbered plain entries (empty position, no parts) are bonus content.
fn map_tracklist(entries: Vec<TrackResponse>) -> Tracklist {
    let mut tracks = Vec::new();
    let mut features = Vec::new();
    for entry in entries {
        if entry.type_ == "heading" {
            continue;
        }
        let track = map_track(entry);
        if track.position.is_empty() && track.sub_tracks.is_empty() {
            features.push(track);
        } else {
            tracks.push(track);
        }
    }
    Tracklist { tracks, features }
}

fn map_track(entry: TrackResponse) -> Track {
    Track {
        position: entry.position,
        title: entry.title,
        duration: entry.duration.filter(|d| !d.is_empty()),
        artists: map_artists(entry.artists),
        sub_tracks: entry.sub_tracks.into_iter().map(map_track).collect(),
    }
}
