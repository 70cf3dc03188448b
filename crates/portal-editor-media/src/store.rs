//! Image storage collaborator.
//!
//! The storage service takes the image bytes plus two classification tags and
//! answers with a JSON object carrying the public URL. Which field holds the
//! URL depends on the server partition; see [`extract_image_url`].

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use portal_common::{ImageDomainType, ImageServerType, UploadConfig};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use thiserror::Error;

/// One upload.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    pub data: Bytes,
    pub filename: String,
    pub mime: String,
    pub domain: ImageDomainType,
    pub server: ImageServerType,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UploadError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}")]
    Status { status: u16, body: String },

    #[error("response has none of the fields {fields:?}")]
    MissingUrl { fields: &'static [&'static str] },

    #[error("invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Accepts image bytes and returns the public URL of the stored image.
pub trait ImageStore: Send + Sync + 'static {
    fn upload(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
}

/// Pull the image URL out of a storage response.
///
/// Every field the partition may use is checked, preferred field first. A
/// `data` envelope around the fields is accepted too. Empty strings do not
/// count.
pub fn extract_image_url(body: &Value, server: ImageServerType) -> Option<String> {
    let candidates = [Some(body), body.get("data")];
    candidates.into_iter().flatten().find_map(|object| {
        server.url_fields().iter().find_map(|field| {
            object
                .get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
    })
}

/// [`ImageStore`] over HTTP multipart.
#[derive(Clone, Debug)]
pub struct HttpImageStore {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpImageStore {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: UploadRequest) -> Result<String, UploadError> {
        let part = Part::bytes(request.data.to_vec())
            .file_name(request.filename)
            .mime_str(&request.mime)?;
        let form = Form::new()
            .part("file", part)
            .text("domainType", request.domain.as_str())
            .text("serverType", request.server.as_str());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let json: Value = serde_json::from_str(&body)?;
        extract_image_url(&json, request.server).ok_or(UploadError::MissingUrl {
            fields: request.server.url_fields(),
        })
    }
}

impl ImageStore for HttpImageStore {
    fn upload(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<String, UploadError>> + Send {
        self.send(request)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_prefers_partition_field() {
        let body = json!({ "url": "https://a/u.png", "imgSrc": "https://a/i.png" });
        assert_eq!(
            extract_image_url(&body, ImageServerType::Admin).as_deref(),
            Some("https://a/u.png")
        );
        assert_eq!(
            extract_image_url(&body, ImageServerType::User).as_deref(),
            Some("https://a/i.png")
        );
    }

    #[test]
    fn test_extract_accepts_either_field() {
        let body = json!({ "imgSrc": "https://a/i.png" });
        assert_eq!(
            extract_image_url(&body, ImageServerType::Admin).as_deref(),
            Some("https://a/i.png")
        );
        let body = json!({ "data": { "url": " https://a/u.png " } });
        assert_eq!(
            extract_image_url(&body, ImageServerType::User).as_deref(),
            Some("https://a/u.png")
        );
    }

    #[test]
    fn test_extract_missing_or_empty() {
        assert_eq!(extract_image_url(&json!({ "url": "" }), ImageServerType::Admin), None);
        assert_eq!(extract_image_url(&json!({ "id": 3 }), ImageServerType::User), None);
        assert_eq!(extract_image_url(&json!("https://a"), ImageServerType::User), None);
    }
}
