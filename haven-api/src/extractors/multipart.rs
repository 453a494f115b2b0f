//! Multipart extractor for records that carry images.
//!
//! The form has three kinds of parts:
//! - `payload`: the record fields as JSON
//! - `images`: zero or more files to attach
//! - `deletedImages`: URLs to detach, either one JSON array or repeated
//!   text parts

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, Multipart, Request},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use haven_core::ObjectStoreError;

use crate::config::ApiConfig;
use crate::constants::MAX_FILES_PER_REQUEST;
use crate::error::{ApiError, ApiResult};
use crate::services::PendingUpload;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A decoded record form.
#[derive(Debug)]
pub struct RecordForm<T> {
    pub payload: Option<T>,
    pub uploads: Vec<PendingUpload>,
    pub deleted_images: Vec<String>,
}

impl<T> RecordForm<T> {
    /// The record fields, required on create.
    pub fn require_payload(&mut self) -> ApiResult<T> {
        self.payload
            .take()
            .ok_or_else(|| ApiError::missing_field("payload"))
    }
}

impl<T: Default> RecordForm<T> {
    /// The record fields, or an empty partial update.
    pub fn payload_or_default(&mut self) -> T {
        self.payload.take().unwrap_or_default()
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for RecordForm<T>
where
    S: Send + Sync,
    ApiConfig: FromRef<S>,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let limit = ApiConfig::from_ref(state).max_upload_bytes;
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_input(rejection.body_text()))?;

        let mut form = RecordForm {
            payload: None,
            uploads: Vec::new(),
            deleted_images: Vec::new(),
        };

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "payload" => {
                    let text = field.text().await?;
                    form.payload = Some(serde_json::from_str(&text)?);
                }
                "images" => {
                    if form.uploads.len() >= MAX_FILES_PER_REQUEST {
                        return Err(ApiError::payload_too_large(format!(
                            "At most {} files per request",
                            MAX_FILES_PER_REQUEST
                        )));
                    }
                    let file_name = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or(DEFAULT_CONTENT_TYPE)
                        .to_string();
                    let bytes = field.bytes().await?;
                    if bytes.len() > limit {
                        return Err(ObjectStoreError::PayloadTooLarge {
                            name: file_name,
                            size: bytes.len(),
                            limit,
                        }
                        .into());
                    }
                    form.uploads.push(PendingUpload {
                        name: file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                "deletedImages" => {
                    let text = field.text().await?;
                    form.deleted_images.extend(parse_deleted_images(&text)?);
                }
                other => debug!(field = other, "Ignoring multipart field"),
            }
        }

        Ok(form)
    }
}

/// `deletedImages` as a JSON array, or a single bare URL.
fn parse_deleted_images(text: &str) -> ApiResult<Vec<String>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let urls: Vec<String> = serde_json::from_str(trimmed)?;
        return Ok(urls.into_iter().filter(|u| !u.trim().is_empty()).collect());
    }
    Ok(vec![trimmed.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deleted_images_json_array() {
        let urls = parse_deleted_images(r#"["https://s/b/1.png", ""]"#).expect("urls");
        assert_eq!(urls, vec!["https://s/b/1.png".to_string()]);
    }

    #[test]
    fn test_deleted_images_single_url() {
        let urls = parse_deleted_images(" https://s/b/2.png ").expect("urls");
        assert_eq!(urls, vec!["https://s/b/2.png".to_string()]);
        assert!(parse_deleted_images("").expect("empty").is_empty());
    }

    #[test]
    fn test_deleted_images_malformed_array() {
        assert!(parse_deleted_images("[not json").is_err());
    }
}
