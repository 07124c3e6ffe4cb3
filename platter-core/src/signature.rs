//! Cryptographic building blocks for request signing.
//!
//! Both API clients are built on these three functions: OAuth 1.0a signs with
//! HMAC-SHA1 over percent-encoded base strings, Last.fm signs with MD5 over a
//! concatenated parameter string. All three are pure and total: identical
//! inputs always produce identical outputs, and no input is an error.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Base64-encoded HMAC-SHA1 of `message` under `key`.
pub fn hmac_sha1_base64(message: &str, key: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Lowercase hex MD5 digest of `input`.
pub fn md5_hex(input: &str) -> String {
    use md5::Digest;
    let hash = md5::Md5::digest(input.as_bytes());
    hex::encode(hash)
}

/// RFC 3986 percent-encoding: everything outside the unreserved set
/// (`A-Za-z0-9-_.~`) is escaped, including `!`, `'`, `(`, `)` and `*`.
/// OAuth 1.0a signature base strings require exactly this encoding.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha1_known_vector() {
        // Wikipedia's HMAC-SHA1 reference vector.
        assert_eq!(
            hmac_sha1_base64("The quick brown fox jumps over the lazy dog", "key"),
            "3nybhbi3iqa8ino29wqQcBydtNk="
        );
    }

    #[test]
    fn hmac_sha1_empty_inputs_are_valid() {
        let sig = hmac_sha1_base64("", "");
        assert_eq!(sig.len(), 28);
        assert!(sig.ends_with('='));
    }

    #[test]
    fn hmac_sha1_is_deterministic() {
        let a = hmac_sha1_base64("message", "secret");
        let b = hmac_sha1_base64("message", "secret");
        assert_eq!(a, b);
    }

    #[test]
    fn md5_known_vectors() {
        // RFC 1321 test suite.
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn md5_is_lowercase_hex_32_chars() {
        let digest = md5_hex("anything at all");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn percent_encode_escapes_oauth_reserved_extras() {
        let encoded = percent_encode("!'()*");
        assert_eq!(encoded, "%21%27%28%29%2A");
        for c in ['!', '\'', '(', ')', '*'] {
            assert!(!encoded.contains(c));
        }
    }

    #[test]
    fn percent_encode_leaves_unreserved_alone() {
        let unreserved = "AZaz09-_.~";
        assert_eq!(percent_encode(unreserved), unreserved);
    }

    #[test]
    fn percent_encode_space_and_utf8() {
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("ü"), "%C3%BC");
    }
}
