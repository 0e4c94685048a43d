use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::errors::DataError;

/// Something that can turn a URL into a response body.
///
/// Implementations must report non-2xx responses as `DataError::Network`
/// with the status filled in. Retries and timeouts are the implementation's
/// business; the pipeline never retries.
pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, DataError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch_text(&self, url: &str) -> Result<String, DataError> {
        (**self).fetch_text(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch_text(&self, url: &str) -> Result<String, DataError> {
        (**self).fetch_text(url)
    }
}

/// Blocking HTTP fetcher backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, DataError> {
        info!("[covid:fetch] GET {}", url);
        let response = ureq::get(url).call().map_err(|err| match err {
            ureq::Error::StatusCode(code) => DataError::Network {
                url: url.to_string(),
                status: Some(code),
                reason: format!("HTTP error! status: {code}"),
            },
            other => DataError::Network {
                url: url.to_string(),
                status: None,
                reason: other.to_string(),
            },
        })?;

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|err| DataError::Network {
                url: url.to_string(),
                status: None,
                reason: format!("failed reading response body: {err}"),
            })?;
        debug!("[covid:fetch] {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Fetch `url` and decode its JSON body into `T`.
pub fn fetch_json<T, F>(fetcher: &F, url: &str) -> Result<T, DataError>
where
    T: DeserializeOwned,
    F: Fetcher + ?Sized,
{
    let body = fetcher.fetch_text(url)?;
    serde_json::from_str(&body).map_err(|err| DataError::Decode {
        url: url.to_string(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    struct Canned(&'static str);

    impl Fetcher for Canned {
        fn fetch_text(&self, _url: &str) -> Result<String, DataError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        cases: i64,
    }

    #[test]
    fn decodes_json_bodies() {
        let payload: Payload = fetch_json(&Canned(r#"{"cases": 12}"#), "http://x/all").unwrap();
        assert_eq!(payload.cases, 12);
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = fetch_json::<Payload, _>(&Canned("<html>"), "http://x/all").unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
    }
}
