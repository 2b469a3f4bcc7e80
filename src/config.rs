//! Service configuration, resolved once at startup from CLI flags and the
//! environment.

use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::{ServeArgs, SinkKind};
use crate::pdf::stamp::StampOptions;
use crate::sink::{DocumentSink, InlineSink, UploadSink};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Inline,
    Upload { endpoint: Url, token: Option<String> },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub sink: SinkConfig,
    pub fetch_timeout: Duration,
    pub max_body_bytes: usize,
    pub stamp: StampOptions,
}

impl Config {
    pub fn from_args(args: &ServeArgs) -> Result<Self> {
        let bind: SocketAddr = args
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", args.bind))?;

        let sink = match args.sink {
            SinkKind::Inline => SinkConfig::Inline,
            SinkKind::Upload => {
                let Some(endpoint) = &args.upload_endpoint else {
                    bail!("The upload sink requires --upload-endpoint (PDFSTAMP_UPLOAD_ENDPOINT)");
                };
                let endpoint = Url::parse(endpoint)
                    .with_context(|| format!("Invalid upload endpoint: {}", endpoint))?;
                if !matches!(endpoint.scheme(), "http" | "https") {
                    bail!("Upload endpoint must be http(s): {}", endpoint);
                }
                SinkConfig::Upload {
                    endpoint,
                    token: args.upload_token.clone().filter(|t| !t.is_empty()),
                }
            }
        };

        if args.fetch_timeout == 0 {
            bail!("Fetch timeout must be at least one second");
        }

        let stamp = args.style.options();
        if !(stamp.font_size.is_finite() && stamp.font_size > 0.0) {
            bail!("Font size must be a positive number");
        }

        Ok(Config {
            bind,
            sink,
            fetch_timeout: Duration::from_secs(args.fetch_timeout),
            max_body_bytes: args.max_body_bytes,
            stamp,
        })
    }

    pub fn build_sink(&self, client: &reqwest::Client) -> Arc<dyn DocumentSink> {
        match &self.sink {
            SinkConfig::Inline => Arc::new(InlineSink),
            SinkConfig::Upload { endpoint, token } => Arc::new(UploadSink::new(
                client.clone(),
                endpoint.clone(),
                token.clone(),
            )),
        }
    }
}
