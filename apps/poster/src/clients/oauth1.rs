//! OAuth 1.0a request signing (HMAC-SHA1) for the X API.
//!
//! Only the query and form parameters of a request take part in the signature.
//! The v2 post endpoint takes a JSON body, so its signature covers the oauth_*
//! parameters alone.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use super::x_api::TransportError;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// The four user-context secrets. None of them expire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth1Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl OAuth1Credentials {
    /// `Authorization` header value for one request, with a fresh nonce and timestamp.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
    ) -> Result<String, TransportError> {
        let nonce = Uuid::new_v4().simple().to_string();
        self.authorization_header_with(method, url, &[], &nonce, Utc::now().timestamp())
    }

    /// Header value for a fixed nonce and timestamp. `request_params` are the
    /// query or form parameters the request also sends.
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        request_params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String, TransportError> {
        let timestamp = timestamp.to_string();
        let mut oauth_params: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.access_token.as_str()),
            ("oauth_version", OAUTH_VERSION),
        ];

        let mut signed_params = oauth_params.clone();
        signed_params.extend_from_slice(request_params);
        let base = signature_base_string(method, url, &signed_params);
        let signature = sign(&base, &self.consumer_secret, &self.access_token_secret)?;

        oauth_params.push(("oauth_signature", signature.as_str()));
        oauth_params.sort();
        let fields = oauth_params
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}=\"{}\"",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }
}

/// `METHOD&url&params`, each part percent-encoded, params sorted by encoded key then value.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(value).into_owned(),
            )
        })
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        urlencoding::encode(url),
        urlencoding::encode(&param_string)
    )
}

/// Base64 HMAC-SHA1 of `base_string` keyed by `consumer_secret&token_secret`.
pub fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: &str,
) -> Result<String, TransportError> {
    let key = format!(
        "{}&{}",
        urlencoding::encode(consumer_secret),
        urlencoding::encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| TransportError::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Worked example from the platform's "creating a signature" guide.
    const NONCE: &str = "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg";
    const TIMESTAMP: i64 = 1318622958;
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";
    const EXPECTED_SIGNATURE: &str = "hCtSmYh+iHYCEqBWrE7C7hYmtUk=";

    fn credentials() -> OAuth1Credentials {
        OAuth1Credentials {
            consumer_key: "xvz1evFS4wEEPTGEFPHBog".to_string(),
            consumer_secret: "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw".to_string(),
            access_token: "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb".to_string(),
            access_token_secret: "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE".to_string(),
        }
    }

    fn example_params() -> Vec<(&'static str, &'static str)> {
        vec![
            ("status", STATUS),
            ("include_entities", "true"),
            ("oauth_consumer_key", "xvz1evFS4wEEPTGEFPHBog"),
            ("oauth_nonce", NONCE),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1318622958"),
            ("oauth_token", "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb"),
            ("oauth_version", "1.0"),
        ]
    }

    #[test]
    fn test_signature_base_string_matches_reference() {
        let expected = concat!(
            "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&",
            "include_entities%3Dtrue%26",
            "oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26",
            "oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26",
            "oauth_signature_method%3DHMAC-SHA1%26",
            "oauth_timestamp%3D1318622958%26",
            "oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26",
            "oauth_version%3D1.0%26",
            "status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520",
            "a%2520signed%2520OAuth%2520request%2521"
        );
        assert_eq!(signature_base_string("post", URL, &example_params()), expected);
    }

    #[test]
    fn test_sign_matches_reference() {
        let creds = credentials();
        let base = signature_base_string("POST", URL, &example_params());
        let signature = sign(&base, &creds.consumer_secret, &creds.access_token_secret).unwrap();
        assert_eq!(signature, EXPECTED_SIGNATURE);
    }

    #[test]
    fn test_authorization_header_matches_reference() {
        let header = credentials()
            .authorization_header_with(
                "POST",
                URL,
                &[("status", STATUS), ("include_entities", "true")],
                NONCE,
                TIMESTAMP,
            )
            .unwrap();

        let expected = concat!(
            "OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", ",
            "oauth_nonce=\"kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg\", ",
            "oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\", ",
            "oauth_signature_method=\"HMAC-SHA1\", ",
            "oauth_timestamp=\"1318622958\", ",
            "oauth_token=\"370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb\", ",
            "oauth_version=\"1.0\""
        );
        assert_eq!(header, expected);
    }

    #[test]
    fn test_fresh_headers_use_new_nonces() {
        let creds = credentials();
        let first = creds.authorization_header("POST", URL).unwrap();
        let second = creds.authorization_header("POST", URL).unwrap();
        assert!(first.starts_with("OAuth oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(!first.contains("status"));
        assert_ne!(first, second);
    }
}
