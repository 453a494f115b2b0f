//! S3-compatible object store over HTTP.
//!
//! Requests are signed with AWS Signature Version 4 and use path-style
//! addressing. Uploaded objects get the `public-read` canned ACL so the
//! returned URL can be served directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::time::Duration;

use haven_core::ObjectStoreError;

use crate::object_store::{endpoint_host, object_key, ObjectStore, StorageUrl};

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Connection settings for an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub timeout: Duration,
}

pub struct S3ObjectStore {
    client: Client,
    settings: S3Settings,
    host: String,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("endpoint", &self.settings.endpoint)
            .field("bucket", &self.settings.bucket)
            .field("region", &self.settings.region)
            .finish()
    }
}

impl S3ObjectStore {
    pub fn new(mut settings: S3Settings) -> Result<Self, ObjectStoreError> {
        settings.endpoint = settings.endpoint.trim_end_matches('/').to_string();
        let host = endpoint_host(&settings.endpoint)?;
        if settings.bucket.is_empty() {
            return Err(ObjectStoreError::NotConfigured {
                reason: "bucket name is empty".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ObjectStoreError::NotConfigured {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            settings,
            host,
        })
    }

    /// Host expected in public object URLs.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn host_header(&self) -> String {
        match reqwest::Url::parse(&self.settings.endpoint)
            .ok()
            .and_then(|u| u.port())
        {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    fn object_path(bucket: &str, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect();
        format!("/{}/{}", urlencoding::encode(bucket), encoded.join("/"))
    }

    fn signed_headers(
        &self,
        method: &str,
        path: &str,
        content_type: Option<&str>,
        acl: Option<&str>,
        payload_hash: &str,
        now: DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), self.host_header()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date),
        ];
        if let Some(ct) = content_type {
            headers.push(("content-type".to_string(), ct.to_string()));
        }
        if let Some(acl) = acl {
            headers.push(("x-amz-acl".to_string(), acl.to_string()));
        }
        headers.sort();

        let authorization = sign_v4(
            &SigningRequest {
                method,
                path,
                headers: &headers,
                payload_hash,
            },
            &self.settings.access_key_id,
            &self.settings.secret_access_key,
            &self.settings.region,
            now,
        );
        headers.push(("authorization".to_string(), authorization));
        headers.retain(|(name, _)| name != "host");
        headers
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        name: &str,
    ) -> Result<String, ObjectStoreError> {
        let key = object_key(Utc::now().timestamp_millis(), name);
        let path = Self::object_path(&self.settings.bucket, &key);
        let payload_hash = hex::encode(Sha256::digest(&bytes));
        let headers = self.signed_headers(
            "PUT",
            &path,
            Some(content_type),
            Some("public-read"),
            &payload_hash,
            Utc::now(),
        );

        let url = format!("{}{}", self.settings.endpoint, path);
        let mut request = self.client.put(&url).body(bytes);
        for (header, value) in headers {
            request = request.header(header, value);
        }

        let upload_error = |reason: String| ObjectStoreError::Upload {
            name: name.to_string(),
            reason,
        };
        let response = request
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("{}: {}", status, body)));
        }

        tracing::debug!(key = %key, "Uploaded object");
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<(), ObjectStoreError> {
        let target = StorageUrl::parse(url, &self.host)?;
        let path = Self::object_path(&target.bucket, &target.key);
        let payload_hash = hex::encode(Sha256::digest(b""));
        let headers = self.signed_headers("DELETE", &path, None, None, &payload_hash, Utc::now());

        let mut request = self
            .client
            .delete(format!("{}{}", self.settings.endpoint, path));
        for (header, value) in headers {
            request = request.header(header, value);
        }

        let delete_error = |reason: String| ObjectStoreError::Delete {
            url: url.to_string(),
            reason,
        };
        let response = request
            .send()
            .await
            .map_err(|e| delete_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(delete_error(response.status().to_string()));
        }

        tracing::debug!(bucket = %target.bucket, key = %target.key, "Deleted object");
        Ok(())
    }
}

// ============================================================================
// SIGNATURE V4
// ============================================================================

struct SigningRequest<'a> {
    method: &'a str,
    path: &'a str,
    /// Lowercase names, sorted.
    headers: &'a [(String, String)],
    payload_hash: &'a str,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn canonical_request(req: &SigningRequest<'_>) -> String {
    let canonical_headers: String = req
        .headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    let signed_headers = signed_header_names(req.headers);
    format!(
        "{}\n{}\n\n{}\n{}\n{}",
        req.method, req.path, canonical_headers, signed_headers, req.payload_hash
    )
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

fn sign_v4(
    req: &SigningRequest<'_>,
    access_key_id: &str,
    secret: &str,
    region: &str,
    now: DateTime<Utc>,
) -> String {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", date, region, SERVICE);

    let hashed_request = hex::encode(Sha256::digest(canonical_request(req).as_bytes()));
    let string_to_sign = format!("{}\n{}\n{}\n{}", ALGORITHM, amz_date, scope, hashed_request);
    let signing_key = derive_signing_key(secret, &date, region, SERVICE);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM,
        access_key_id,
        scope,
        signed_header_names(req.headers),
        signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn settings() -> S3Settings {
        S3Settings {
            endpoint: "https://storage.yandexcloud.net/".to_string(),
            region: "ru-central1".to_string(),
            bucket: "haven".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_signing_key_matches_reference_derivation() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_canonical_request_layout() {
        let headers = vec![
            ("host".to_string(), "storage.test".to_string()),
            ("x-amz-date".to_string(), "20240101T000000Z".to_string()),
        ];
        let req = SigningRequest {
            method: "DELETE",
            path: "/haven/a.png",
            headers: &headers,
            payload_hash: "abc",
        };
        assert_eq!(
            canonical_request(&req),
            "DELETE\n/haven/a.png\n\nhost:storage.test\nx-amz-date:20240101T000000Z\n\nhost;x-amz-date\nabc"
        );
    }

    #[test]
    fn test_authorization_header_scope() {
        let store = S3ObjectStore::new(settings()).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let headers = store.signed_headers(
            "PUT",
            "/haven/1_a.png",
            Some("image/png"),
            Some("public-read"),
            "hash",
            now,
        );
        let auth = headers
            .iter()
            .find(|(n, _)| n == "authorization")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240301/ru-central1/s3/aws4_request"
        ));
        assert!(auth.contains(
            "SignedHeaders=content-type;host;x-amz-acl;x-amz-content-sha256;x-amz-date"
        ));
        assert!(headers.iter().all(|(n, _)| n != "host"));
    }

    #[test]
    fn test_object_path_encodes_segments() {
        assert_eq!(
            S3ObjectStore::object_path("haven", "dir/my cat.png"),
            "/haven/dir/my%20cat.png"
        );
    }

    #[test]
    fn test_rejects_empty_bucket() {
        let mut s = settings();
        s.bucket.clear();
        assert!(S3ObjectStore::new(s).is_err());
    }
}
