use std::sync::Arc;
use std::time::Duration;

use sheetmail_types::{Result, SheetMailError};

use crate::CredentialProvider;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated HTTP access shared by the Google adapters.
#[derive(Clone)]
pub(crate) struct GoogleHttp {
    service: &'static str,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl GoogleHttp {
    pub(crate) fn new(service: &'static str, credentials: Arc<dyn CredentialProvider>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            service,
            client,
            credentials,
        }
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Attach the bearer token, send, and map non-success statuses.
    pub(crate) async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.credentials.access_token().await?;
        let resp = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(service = self.service, status = status.as_u16(), "Request rejected");
        Err(map_error(self.service, status, &body))
    }

    pub(crate) async fn json(&self, request: reqwest::RequestBuilder) -> Result<serde_json::Value> {
        let resp = self.send(request).await?;
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_str(&body).map_err(|e| SheetMailError::ProviderError {
            service: self.service.into(),
            status: 200,
            message: format!("Failed to parse response JSON: {e}"),
        })
    }

    pub(crate) async fn bytes(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>> {
        let resp = self.send(request).await?;
        let bytes = resp.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }

    fn transport_error(&self, e: reqwest::Error) -> SheetMailError {
        SheetMailError::ProviderError {
            service: self.service.into(),
            status: 0,
            message: e.to_string(),
        }
    }
}

/// Build `base` + path segments, percent-encoding each segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| SheetMailError::Other(format!("Invalid base URL '{base}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| SheetMailError::Other(format!("Base URL '{base}' cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

pub(crate) fn map_error(service: &str, status: reqwest::StatusCode, body: &str) -> SheetMailError {
    match status.as_u16() {
        401 | 403 => SheetMailError::AuthError {
            service: service.into(),
        },
        404 => SheetMailError::NotFound {
            resource: extract_error_message(body),
        },
        other => SheetMailError::ProviderError {
            service: service.into(),
            status: other,
            message: extract_error_message(body),
        },
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn unauthorized_and_forbidden_map_to_auth() {
        assert!(map_error("sheets", StatusCode::UNAUTHORIZED, "").is_auth());
        assert!(map_error("sheets", StatusCode::FORBIDDEN, "").is_auth());
    }

    #[test]
    fn not_found_carries_google_message() {
        let body = r#"{"error":{"code":404,"message":"File not found: abc."}}"#;
        match map_error("drive", StatusCode::NOT_FOUND, body) {
            SheetMailError::NotFound { resource } => assert_eq!(resource, "File not found: abc."),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_status_is_provider_error_with_raw_body() {
        match map_error("gmail", StatusCode::BAD_GATEWAY, "upstream down") {
            SheetMailError::ProviderError {
                service,
                status,
                message,
            } => {
                assert_eq!(service, "gmail");
                assert_eq!(status, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn endpoint_encodes_segments() {
        let url = endpoint(
            "https://sheets.googleapis.com/v4/",
            &["spreadsheets", "abc", "values", "Folha 1"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Folha%201"
        );
    }

    #[test]
    fn endpoint_rejects_garbage_base() {
        assert!(endpoint("not a url", &["x"]).is_err());
    }
}
