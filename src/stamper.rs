use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::StampError;
use crate::fetch::fetch_pdf;
use crate::observe::{NoopObserver, Observer, StampObserver};
use crate::page_range::{parse_page_expression, validate_page_set, PageSelectionError, PageSet};
use crate::pdf::stamp::{StampOptions, TextStamp};
use crate::pdf::PdfDocument;
use crate::sink::{object_name, Delivery, DocumentSink, InlineSink};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampRequest {
    pub pdf_url: Option<String>,
    pub text: Option<String>,
    /// Kept loose so a non-string value is reported as a page error
    pub pages: Option<Value>,
    pub font_size: Option<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StampResponse {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub pages_stamped: Vec<u32>,
    pub page_count: u32,
}

/// A stamped, serialized document
#[derive(Debug)]
pub struct StampedDocument {
    pub bytes: Vec<u8>,
    pub page_count: u32,
    pub pages: PageSet,
}

pub struct Stamper {
    client: reqwest::Client,
    sink: Arc<dyn DocumentSink>,
    observer: Observer,
    options: StampOptions,
    fetch_timeout: Duration,
}

impl Stamper {
    pub fn new(sink: Arc<dyn DocumentSink>, options: StampOptions) -> Self {
        Stamper {
            client: reqwest::Client::new(),
            sink,
            observer: Arc::new(NoopObserver),
            options,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Handle one stamp request end to end
    pub async fn stamp(&self, request: StampRequest) -> Result<StampResponse, StampError> {
        let result = self.run(request).await;
        if let Err(e) = &result {
            self.observer.on_failed(e);
        }
        result
    }

    async fn run(&self, request: StampRequest) -> Result<StampResponse, StampError> {
        let url = request
            .pdf_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                StampError::InvalidRequest("`pdfUrl` is missing from the payload".to_string())
            })?
            .to_string();

        let expr = match &request.pages {
            Some(Value::String(expr)) if !expr.trim().is_empty() => expr,
            _ => return Err(PageSelectionError::InvalidInput.into()),
        };

        let text = required_text(request.text.as_deref())?.to_string();
        let pages = parse_page_expression(expr)?;

        let mut options = self.options.clone();
        if let Some(size) = request.font_size {
            if !(size.is_finite() && size > 0.0) {
                return Err(StampError::InvalidRequest(
                    "`fontSize` must be a positive number".to_string(),
                ));
            }
            options.font_size = size;
        }

        self.observer.on_request(&url, &pages);

        let source = fetch_pdf(&self.client, &url, self.fetch_timeout).await?;
        self.observer.on_fetched(&url, source.len());

        let observer = self.observer.clone();
        let stamped = tokio::task::spawn_blocking(move || {
            stamp_document(&source, &text, pages, &options, observer.as_ref())
        })
        .await
        .map_err(|e| StampError::Internal(e.into()))??;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let name = object_name(&url, millis);
        let size = stamped.bytes.len();

        let delivery = self.sink.deliver(&name, stamped.bytes).await?;
        self.observer.on_delivered(&delivery, size);

        Ok(StampResponse {
            delivery,
            pages_stamped: stamped.pages.to_vec(),
            page_count: stamped.page_count,
        })
    }
}

impl Stamper {
    /// Stamp an in-memory document with this stamper's options.
    ///
    /// Same checks as [`Stamper::stamp`] minus the source URL, fetch and
    /// delivery.
    pub fn stamp_bytes(
        &self,
        source: &[u8],
        text: &str,
        pages: &str,
    ) -> Result<StampedDocument, StampError> {
        let result = self.stamp_local(source, text, pages);
        if let Err(e) = &result {
            self.observer.on_failed(e);
        }
        result
    }

    fn stamp_local(
        &self,
        source: &[u8],
        text: &str,
        pages: &str,
    ) -> Result<StampedDocument, StampError> {
        if pages.trim().is_empty() {
            return Err(PageSelectionError::InvalidInput.into());
        }
        let text = required_text(Some(text))?;
        let pages = parse_page_expression(pages)?;

        stamp_document(source, text, pages, &self.options, self.observer.as_ref())
    }
}

impl Default for Stamper {
    fn default() -> Self {
        Stamper::new(Arc::new(InlineSink), StampOptions::default())
    }
}

fn required_text(text: Option<&str>) -> Result<&str, StampError> {
    text.filter(|text| !text.is_empty()).ok_or_else(|| {
        StampError::InvalidRequest("`text` is missing from the payload".to_string())
    })
}

/// Load `source`, check `pages` against it, stamp them and serialize.
///
/// Nothing is stamped unless every page exists.
pub fn stamp_document(
    source: &[u8],
    text: &str,
    pages: PageSet,
    options: &StampOptions,
    observer: &dyn StampObserver,
) -> Result<StampedDocument, StampError> {
    if pages.is_empty() {
        return Err(PageSelectionError::InvalidInput.into());
    }

    let mut doc =
        PdfDocument::from_bytes(source).map_err(|e| StampError::InvalidPdf(format!("{:#}", e)))?;
    let page_ids = doc.page_ids();
    let page_count = page_ids.len() as u32;

    validate_page_set(&pages, page_count)?;

    let stamp = TextStamp::prepare(&mut doc.doc, text, options);
    for page in pages.iter() {
        let page_id = *page_ids
            .get(&page)
            .ok_or_else(|| anyhow::anyhow!("Page {} has no page object", page))?;
        stamp.apply(&mut doc.doc, page_id)?;
        observer.on_page_stamped(page, page_count);
    }

    let bytes = doc.to_bytes()?;

    Ok(StampedDocument {
        bytes,
        page_count,
        pages,
    })
}
