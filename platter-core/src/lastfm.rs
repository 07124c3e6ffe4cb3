//! Last.fm API client: session authentication and batch scrobble submission.
//!
//! All calls go to the single REST endpoint with an MD5 `api_sig` computed
//! over the sorted parameter set. The HTTP transport can report success while
//! the payload carries an application-level `error` field, so every response
//! body is checked before it is trusted.

use platter_common::ScrobbleTrack;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::signature::md5_hex;

const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// The scrobble endpoint accepts at most this many tracks per request.
pub const MAX_SCROBBLES_PER_REQUEST: usize = 50;

#[derive(Error, Debug)]
pub enum LastfmError {
    #[error("Last.fm API error (code {code}): {message}")]
    Api { code: u32, message: String },
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response format")]
    Parse,
}

/// An authenticated user session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub name: String,
    pub key: String,
}

/// Provider-reported outcome of a scrobble submission.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrobbleSummary {
    pub accepted: u32,
    pub ignored: u32,
}

/// Compute the `api_sig` for a parameter set: keys sorted alphabetically,
/// `key + value` concatenated for everything except `format` and `callback`,
/// shared secret appended, MD5-hexed. The exclusion list is part of the
/// provider's protocol and must match exactly.
pub fn create_signature(params: &[(String, String)], secret: &str) -> String {
    let mut sorted: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "format" && k != "callback")
        .collect();
    sorted.sort();
    let mut base = String::new();
    for (key, value) in sorted {
        base.push_str(key);
        base.push_str(value);
    }
    base.push_str(secret);
    md5_hex(&base)
}

// -- Response envelopes --

#[derive(Deserialize)]
struct SessionResponse {
    session: Option<SessionInner>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SessionInner {
    name: String,
    key: String,
}

#[derive(Deserialize)]
struct ScrobbleResponse {
    scrobbles: Option<ScrobblesInner>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ScrobblesInner {
    #[serde(rename = "@attr")]
    attr: ScrobbleAttr,
}

#[derive(Deserialize)]
struct ScrobbleAttr {
    accepted: u32,
    ignored: u32,
}

#[derive(Deserialize)]
struct StatusResponse {
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct LastfmClient {
    http: reqwest::Client,
    api_key: String,
    shared_secret: String,
    base_url: String,
}

impl LastfmClient {
    pub fn new(api_key: impl Into<String>, shared_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            shared_secret: shared_secret.into(),
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Exchange a browser auth token for a session key.
    pub async fn get_session(&self, auth_token: &str) -> Result<Session, LastfmError> {
        let params = self.signed_params(vec![
            ("api_key".to_string(), self.api_key.clone()),
            ("method".to_string(), "auth.getsession".to_string()),
            ("token".to_string(), auth_token.to_string()),
        ]);
        let response = self.http.get(&self.base_url).query(&params).send().await?;
        let parsed: SessionResponse = response.json().await?;

        if let Some(code) = parsed.error {
            return Err(LastfmError::Api {
                code,
                message: parsed.message.unwrap_or_default(),
            });
        }
        let session = parsed.session.ok_or(LastfmError::Parse)?;
        Ok(Session {
            name: session.name,
            key: session.key,
        })
    }

    /// Submit a batch of listening events.
    ///
    /// No internal retry: the caller decides whether a failed batch is worth
    /// resubmitting.
    pub async fn scrobble_tracks(
        &self,
        tracks: &[ScrobbleTrack],
        session_key: &str,
    ) -> Result<ScrobbleSummary, LastfmError> {
        if tracks.is_empty() {
            return Ok(ScrobbleSummary::default());
        }
        let params = self.signed_params(scrobble_params(tracks, &self.api_key, session_key));
        info!("submitting {} scrobble(s)", tracks.len());

        let response = self.http.post(&self.base_url).form(&params).send().await?;
        let parsed: ScrobbleResponse = response.json().await?;

        if let Some(code) = parsed.error {
            return Err(LastfmError::Api {
                code,
                message: parsed.message.unwrap_or_default(),
            });
        }
        let scrobbles = parsed.scrobbles.ok_or(LastfmError::Parse)?;
        Ok(ScrobbleSummary {
            accepted: scrobbles.attr.accepted,
            ignored: scrobbles.attr.ignored,
        })
    }

    /// Best-effort "now playing" update before a batch submit.
    pub async fn update_now_playing(
        &self,
        track: &ScrobbleTrack,
        session_key: &str,
    ) -> Result<(), LastfmError> {
        let mut params = vec![
            ("method".to_string(), "track.updateNowPlaying".to_string()),
            ("api_key".to_string(), self.api_key.clone()),
            ("sk".to_string(), session_key.to_string()),
            ("artist".to_string(), track.artist.clone()),
            ("track".to_string(), track.track.clone()),
        ];
        if let Some(album) = &track.album {
            if !album.is_empty() {
                params.push(("album".to_string(), album.clone()));
            }
        }
        let params = self.signed_params(params);

        let response = self.http.post(&self.base_url).form(&params).send().await?;
        let parsed: StatusResponse = response.json().await?;
        if let Some(code) = parsed.error {
            return Err(LastfmError::Api {
                code,
                message: parsed.message.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Sign the parameter set and append `api_sig` + `format=json`. `format`
    /// is excluded from the signature by the protocol.
    fn signed_params(&self, mut params: Vec<(String, String)>) -> Vec<(String, String)> {
        let sig = create_signature(&params, &self.shared_secret);
        params.push(("api_sig".to_string(), sig));
        params.push(("format".to_string(), "json".to_string()));
        params
    }
}

/// Encode a batch as indexed form parameters. Tracks without an album get no
/// `album[i]` parameter at all; an empty value would overwrite correct album
/// metadata on the provider side.
fn scrobble_params(
    tracks: &[ScrobbleTrack],
    api_key: &str,
    session_key: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("method".to_string(), "track.scrobble".to_string()),
        ("api_key".to_string(), api_key.to_string()),
        ("sk".to_string(), session_key.to_string()),
    ];
    for (i, track) in tracks.iter().enumerate() {
        params.push((format!("artist[{i}]"), track.artist.clone()));
        params.push((format!("track[{i}]"), track.track.clone()));
        params.push((format!("timestamp[{i}]"), track.timestamp.to_string()));
        if let Some(album) = &track.album {
            if !album.is_empty() {
                params.push((format!("album[{i}]"), album.clone()));
            }
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, title: &str, album: Option<&str>, timestamp: i64) -> ScrobbleTrack {
        ScrobbleTrack {
            artist: artist.to_string(),
            track: title.to_string(),
            album: album.map(|s| s.to_string()),
            timestamp,
        }
    }

    #[test]
    fn signature_sorts_keys_and_appends_secret() {
        let params = vec![
            ("token".to_string(), "TOKEN".to_string()),
            ("method".to_string(), "auth.getsession".to_string()),
            ("api_key".to_string(), "API_KEY".to_string()),
        ];
        let sig = create_signature(&params, "SECRET");
        assert_eq!(
            sig,
            md5_hex("api_keyAPI_KEYmethodauth.getsessiontokenTOKENSECRET")
        );
    }

    #[test]
    fn signature_excludes_format_and_callback() {
        let base = vec![
            ("api_key".to_string(), "K".to_string()),
            ("method".to_string(), "track.scrobble".to_string()),
        ];
        let mut with_extras = base.clone();
        with_extras.push(("format".to_string(), "json".to_string()));
        with_extras.push(("callback".to_string(), "cb123".to_string()));

        assert_eq!(
            create_signature(&base, "SECRET"),
            create_signature(&with_extras, "SECRET")
        );
    }

    #[test]
    fn scrobble_params_index_every_track() {
        let tracks = vec![
            track("A", "One", Some("Album"), 100),
            track("B", "Two", Some("Album"), 200),
            track("C", "Three", None, 300),
        ];
        let params = scrobble_params(&tracks, "KEY", "SK");
        let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();

        assert!(keys.contains(&"artist[0]"));
        assert!(keys.contains(&"track[0]"));
        assert!(keys.contains(&"album[0]"));
        assert!(keys.contains(&"timestamp[0]"));
        assert!(keys.contains(&"artist[2]"));
        // The albumless track gets no album parameter at all.
        assert!(!keys.contains(&"album[2]"));
    }

    #[test]
    fn scrobble_params_skip_empty_albums() {
        let tracks = vec![track("A", "One", Some(""), 100)];
        let params = scrobble_params(&tracks, "KEY", "SK");
        assert!(params.iter().all(|(k, _)| k != "album[0]"));
    }

    #[test]
    fn session_response_parses() {
        let body = r#"{"session": {"name": "testuser", "key": "session_key_123", "subscriber": 0}}"#;
        let parsed: SessionResponse = serde_json::from_str(body).unwrap();
        let session = parsed.session.unwrap();
        assert_eq!(session.name, "testuser");
        assert_eq!(session.key, "session_key_123");
    }

    #[test]
    fn error_body_is_application_failure() {
        let body = r#"{"error": 4, "message": "Invalid authentication token supplied"}"#;
        let parsed: SessionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error, Some(4));
        assert!(parsed.session.is_none());
    }

    #[test]
    fn scrobble_response_parses_summary() {
        let body = r#"{
            "scrobbles": {
                "@attr": {"accepted": 2, "ignored": 1},
                "scrobble": [{}, {}, {}]
            }
        }"#;
        let parsed: ScrobbleResponse = serde_json::from_str(body).unwrap();
        let attr = parsed.scrobbles.unwrap().attr;
        assert_eq!(attr.accepted, 2);
        assert_eq!(attr.ignored, 1);
    }
}
