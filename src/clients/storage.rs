use std::time::Duration;

use async_trait::async_trait;

use crate::clients::{ClientError, ObjectStorage};

/// Blob store reached over HTTP PUT; objects become publicly readable
/// under the configured base URL.
pub struct HttpBlobStorage {
    http: reqwest::Client,
    upload_base: String,
    public_base: String,
}

impl HttpBlobStorage {
    pub fn new(upload_base: String, public_base: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            upload_base,
            public_base,
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpBlobStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, ClientError> {
        let url = format!("{}/{}", self.upload_base.trim_end_matches('/'), path);
        let response = self
            .http
            .put(&url)
            .header("Content-Type", "image/png")
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UnexpectedResponse(format!(
                "blob store returned {status}"
            )));
        }
        Ok(format!(
            "{}/{}",
            self.public_base.trim_end_matches('/'),
            path
        ))
    }
}
