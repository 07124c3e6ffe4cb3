//! OAuth 1.0a request signing (HMAC-SHA1) for the Discogs API.
//!
//! Every authenticated request gets a fresh nonce and timestamp, a signature
//! base string assembled from the sorted parameter set, and an HMAC-SHA1
//! signature keyed on the consumer and token secrets. Signature construction
//! is a pure function of its inputs; only [`oauth_params`] touches the clock
//! and the RNG.

use crate::signature::{hmac_sha1_base64, percent_encode};

/// A key/secret pair: the registered consumer credentials, or a request or
/// access token obtained during the handshake.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub key: String,
    pub secret: String,
}

impl TokenPair {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }
}

/// Generate a random 16-character alphanumeric nonce.
///
/// OAuth 1.0a requires a unique nonce per request; reuse within a session is
/// a protocol violation the provider may reject.
pub fn generate_nonce() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..16)
        .map(|_| {
            let idx = rng.random_range(0..36u8);
            if idx < 10 {
                (b'0' + idx) as char
            } else {
                (b'a' + idx - 10) as char
            }
        })
        .collect()
}

/// Build the signed `oauth_*` parameter set for one request.
///
/// `extra_oauth` carries handshake-specific protocol parameters
/// (`oauth_callback`, `oauth_verifier`); `query` carries the request's own
/// query/body parameters, which participate in the signature but are sent
/// with the request rather than in the OAuth header.
pub fn oauth_params(
    consumer: &TokenPair,
    token: Option<&TokenPair>,
    method: &str,
    url: &str,
    extra_oauth: &[(&str, &str)],
    query: &[(&str, &str)],
) -> Vec<(String, String)> {
    let nonce = generate_nonce();
    let timestamp = chrono::Utc::now().timestamp();
    oauth_params_at(consumer, token, method, url, extra_oauth, query, &nonce, timestamp)
}

/// Deterministic core of [`oauth_params`]: nonce and timestamp supplied by
/// the caller.
fn oauth_params_at(
    consumer: &TokenPair,
    token: Option<&TokenPair>,
    method: &str,
    url: &str,
    extra_oauth: &[(&str, &str)],
    query: &[(&str, &str)],
    nonce: &str,
    timestamp: i64,
) -> Vec<(String, String)> {
    let mut oauth: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer.key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];
    if let Some(token) = token {
        oauth.push(("oauth_token".to_string(), token.key.clone()));
    }
    for (k, v) in extra_oauth {
        oauth.push((k.to_string(), v.to_string()));
    }

    let mut all = oauth.clone();
    for (k, v) in query {
        all.push((k.to_string(), v.to_string()));
    }

    let base = signature_base_string(method, url, &all);
    let key = signing_key(&consumer.secret, token.map(|t| t.secret.as_str()));
    oauth.push(("oauth_signature".to_string(), hmac_sha1_base64(&base, &key)));
    oauth
}

/// `METHOD&enc(url)&enc(sortedParamString)` per RFC 5849 §3.4.1.
///
/// Parameters are individually percent-encoded, then sorted by encoded key
/// (ties broken by value), joined `k=v` with `&`, and the whole string is
/// encoded once more.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    pairs.sort();
    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(url),
        percent_encode(&param_string)
    )
}

/// `enc(consumerSecret)&enc(tokenSecret)`; the token secret is empty during
/// the request-token leg.
pub fn signing_key(consumer_secret: &str, token_secret: Option<&str>) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or(""))
    )
}

/// Format signed parameters as an `Authorization: OAuth ...` header value.
pub fn authorization_header(params: &[(String, String)]) -> String {
    let fields = params
        .iter()
        .map(|(k, v)| format!(r#"{}="{}""#, k, percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}
