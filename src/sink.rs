//! Destinations for a stamped document

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{header::CONTENT_TYPE, Url};
use serde::Serialize;

use crate::error::StampError;

/// Where the stamped document ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Delivery {
    Inline {
        #[serde(rename = "pdfBase64")]
        pdf_base64: String,
    },
    Uploaded {
        url: String,
    },
}

pub trait DocumentSink: Send + Sync {
    /// Hand off the serialized document under `name`
    fn deliver<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<Delivery, StampError>>;
}

/// Returns the document base64-encoded in the response body
pub struct InlineSink;

impl DocumentSink for InlineSink {
    fn deliver<'a>(
        &'a self,
        _name: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<Delivery, StampError>> {
        async move {
            Ok(Delivery::Inline {
                pdf_base64: BASE64.encode(&bytes),
            })
        }
        .boxed()
    }
}

/// PUTs the document to an object storage endpoint
pub struct UploadSink {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl UploadSink {
    pub fn new(client: reqwest::Client, endpoint: Url, token: Option<String>) -> Self {
        UploadSink {
            client,
            endpoint,
            token,
        }
    }

    /// URL the object named `name` is stored at
    pub fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), name)
    }

    async fn upload(&self, name: &str, bytes: Vec<u8>) -> Result<Delivery, StampError> {
        let url = self.object_url(name);

        let mut request = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "application/pdf")
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StampError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StampError::UploadFailed(format!(
                "storage responded with status {}",
                response.status().as_u16()
            )));
        }

        Ok(Delivery::Uploaded { url })
    }
}

impl DocumentSink for UploadSink {
    fn deliver<'a>(
        &'a self,
        name: &'a str,
        bytes: Vec<u8>,
    ) -> BoxFuture<'a, Result<Delivery, StampError>> {
        self.upload(name, bytes).boxed()
    }
}

/// Object name for a stamped copy of the document at `source`
pub fn object_name(source: &str, timestamp_millis: u128) -> String {
    let stem = Url::parse(source)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|file| file.trim_end_matches(".pdf").to_string())
        .unwrap_or_default();

    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        format!("stamped-{}.pdf", timestamp_millis)
    } else {
        format!("stamped-{}-{}.pdf", timestamp_millis, stem)
    }
}
