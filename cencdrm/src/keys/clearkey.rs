//! W3C clearkey license exchange.
//!
//! Request: `{"kids": ["<base64url kid>", ...], "type": "temporary"}`.
//! Response: `{"keys": [{"kid": "...", "k": "..."}, ...]}` with base64url
//! values throughout (`-`/`_` alphabet, no `=` padding).

use crate::{
    DrmError, Result,
    keys::{ContentKey, KeyId, KeyPair, KeyResolver},
};
use base64::Engine;
use reqwest::{blocking::Client, header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

pub fn base64url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Decode a base64url value. Tolerates `=` padding some servers emit.
pub fn base64url_decode(text: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| DrmError::ServerResponseInvalid(format!("bad base64url value: {e}")))
}

#[derive(Serialize)]
struct LicenseRequest {
    kids: Vec<String>,
    #[serde(rename = "type")]
    request_type: &'static str,
}

#[derive(Deserialize)]
struct LicenseResponse {
    keys: Vec<LicenseKey>,
}

#[derive(Deserialize)]
struct LicenseKey {
    kid: String,
    k: String,
}

/// Parse a clearkey license response body into (key ID, key) pairs.
pub fn parse_license_response(body: &str) -> Result<Vec<(KeyId, ContentKey)>> {
    let response: LicenseResponse = serde_json::from_str(body)
        .map_err(|e| DrmError::ServerResponseInvalid(format!("bad license JSON: {e}")))?;

    let mut keys = Vec::with_capacity(response.keys.len());

    for entry in response.keys {
        let kid = KeyId::from_slice(&base64url_decode(&entry.kid)?)
            .map_err(|e| DrmError::ServerResponseInvalid(e.to_string()))?;
        let key = ContentKey::from_slice(&base64url_decode(&entry.k)?)
            .map_err(|e| DrmError::ServerResponseInvalid(e.to_string()))?;
        keys.push((kid, key));
    }

    Ok(keys)
}

/// Fetches keys from a clearkey license server.
///
/// The license-acquisition URL usually arrives mid-stream, from the
/// `Laurl` protection element, so it lives behind a mutex and resolution
/// before it is known fails.
pub struct ClearKeyResolver {
    url: Mutex<Option<String>>,
    client: Client,
}

impl ClearKeyResolver {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: Mutex::new(None),
            client: Client::builder()
                .build()
                .map_err(|e| DrmError::ServerConnectionFailure(e.to_string()))?,
        })
    }

    pub fn set_license_url(&self, url: &str) {
        let mut slot = self.url.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(url.to_owned());
    }

    pub(crate) fn license_url(&self) -> Option<String> {
        self.url.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl KeyResolver for ClearKeyResolver {
    fn resolve(&self, pair: &KeyPair) -> Result<Vec<(KeyId, ContentKey)>> {
        let url = self.license_url().ok_or_else(|| {
            DrmError::ServerConnectionFailure("no license acquisition URL configured".to_owned())
        })?;

        let request = LicenseRequest {
            kids: vec![base64url_encode(pair.key_id.as_bytes())],
            request_type: "temporary",
        };
        let body = serde_json::to_vec(&request)
            .map_err(|e| DrmError::ServerResponseInvalid(e.to_string()))?;

        log::debug!("requesting key for {} from {url}", pair.key_id);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| DrmError::ServerConnectionFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DrmError::ServerResponseInvalid(format!(
                "license server returned {status}"
            )));
        }

        let body = response
            .text()
            .map_err(|e| DrmError::ServerConnectionFailure(e.to_string()))?;
        parse_license_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_round_trip() {
        for len in 0..=64usize {
            let data: Vec<u8> = (0..len as u8).collect();
            let encoded = base64url_encode(&data);
            assert!(!encoded.contains('='), "padding in {encoded:?}");
            assert!(!encoded.contains('+') && !encoded.contains('/'));
            assert_eq!(base64url_decode(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn test_base64url_decode_tolerates_padding() {
        assert_eq!(base64url_decode("_v8=").unwrap(), vec![0xfe, 0xff]);
        assert_eq!(base64url_decode("_v8").unwrap(), vec![0xfe, 0xff]);
        assert!(base64url_decode("+/8").is_err());
    }

    #[test]
    fn test_request_serialization() {
        let request = LicenseRequest {
            kids: vec![base64url_encode(&[0x10; 16])],
            request_type: "temporary",
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"kids":["EBAQEBAQEBAQEBAQEBAQEA"],"type":"temporary"}"#
        );
    }

    #[test]
    fn test_parse_license_response() {
        let body = format!(
            r#"{{"keys":[{{"kid":"{}","k":"{}"}},{{"kid":"{}","k":"{}"}}],"type":"temporary"}}"#,
            base64url_encode(&[0x01; 16]),
            base64url_encode(&[0xaa; 16]),
            base64url_encode(&[0x02; 16]),
            base64url_encode(&[0xbb; 16]),
        );
        let keys = parse_license_response(&body).unwrap();
        assert_eq!(
            keys,
            vec![
                (KeyId::from([0x01; 16]), ContentKey::from([0xaa; 16])),
                (KeyId::from([0x02; 16]), ContentKey::from([0xbb; 16])),
            ]
        );
    }

    #[test]
    fn test_parse_license_response_errors() {
        assert!(matches!(
            parse_license_response("not json"),
            Err(DrmError::ServerResponseInvalid(_))
        ));
        // 8-byte key is not a usable AES-128 key.
        let short = format!(
            r#"{{"keys":[{{"kid":"{}","k":"{}"}}]}}"#,
            base64url_encode(&[0x01; 16]),
            base64url_encode(&[0xaa; 8]),
        );
        assert!(matches!(
            parse_license_response(&short),
            Err(DrmError::ServerResponseInvalid(_))
        ));
    }

    #[test]
    fn test_resolver_without_url() {
        let resolver = ClearKeyResolver::new().unwrap();
        let pair = KeyPair {
            key_id: KeyId::from([0x01; 16]),
            key: None,
            content_id: String::new(),
        };
        assert!(matches!(
            resolver.resolve(&pair),
            Err(DrmError::ServerConnectionFailure(_))
        ));
    }
}
