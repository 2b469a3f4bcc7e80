use reqwest::Url;
use std::time::Duration;
use tracing::debug;

use crate::error::StampError;

/// Download the PDF at `url`, rejecting anything that isn't one.
pub async fn fetch_pdf(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, StampError> {
    let parsed = Url::parse(url)
        .map_err(|e| StampError::InvalidRequest(format!("`pdfUrl` is not a valid URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(StampError::InvalidRequest(format!(
            "`pdfUrl` must be an http(s) URL, got scheme '{}'",
            parsed.scheme()
        )));
    }

    debug!("Fetching PDF from {}", parsed);

    let response = client
        .get(parsed)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                StampError::FetchFailed(format!(
                    "Timed out fetching PDF after {}s",
                    timeout.as_secs()
                ))
            } else {
                StampError::FetchFailed(format!("Could not fetch PDF: {}", e))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(StampError::FetchFailed(format!(
            "Could not fetch PDF (status {})",
            status.as_u16()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StampError::FetchFailed(format!("Could not read PDF body: {}", e)))?;

    if !bytes.starts_with(b"%PDF") {
        return Err(StampError::InvalidPdf(
            "downloaded content is not a PDF".to_string(),
        ));
    }

    Ok(bytes.to_vec())
}
