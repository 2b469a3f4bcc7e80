use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};

use std::sync::Arc;

use crate::page_range::{parse_page_expression, validate_page_set};
use crate::pdf::stamp::{Placement, StampOptions};
use crate::sink::InlineSink;
use crate::stamper::Stamper;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfStampRequest {
    #[schemars(description = "Path to the source PDF file")]
    pub path: String,
    #[schemars(description = "Text to draw on each selected page")]
    pub text: String,
    #[schemars(description = "Pages to stamp (e.g., '2-5,8,10-12')")]
    pub pages: String,
    #[schemars(description = "Output file path")]
    pub output: String,
    #[schemars(description = "Font size in points (default: 12)")]
    #[serde(default)]
    pub font_size: Option<f32>,
    #[schemars(description = "Place the stamp near the top edge instead of the bottom (default: false)")]
    #[serde(default)]
    pub top: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfPagesRequest {
    #[schemars(description = "Page expression (e.g., '2-5,8,10-12')")]
    pub pages: String,
    #[schemars(description = "Optional document page count to validate against")]
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct StampServer {
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl StampServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }
}

impl Default for StampServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_router]
impl StampServer {
    #[tool(description = "Stamp a line of text onto selected pages of a PDF and save the result to a new file")]
    fn pdf_stamp(&self, Parameters(req): Parameters<PdfStampRequest>) -> String {
        let source = match std::fs::read(&req.path) {
            Ok(b) => b,
            Err(e) => return format!("Error: Failed to read {}: {}", req.path, e),
        };

        let mut options = StampOptions::default();
        if let Some(size) = req.font_size {
            if !(size.is_finite() && size > 0.0) {
                return "Error: font_size must be a positive number".to_string();
            }
            options.font_size = size;
        }
        if req.top {
            options.placement = Placement::Top { offset: 50.0 };
        }

        let stamper = Stamper::new(Arc::new(InlineSink), options);
        let stamped = match stamper.stamp_bytes(&source, &req.text, &req.pages) {
            Ok(s) => s,
            Err(e) => return format!("Error: {}", e),
        };

        if let Err(e) = std::fs::write(&req.output, &stamped.bytes) {
            return format!("Error: Failed to write {}: {}", req.output, e);
        }

        let result = StampResult {
            output_path: req.output,
            pages_stamped: stamped.pages.to_vec(),
            page_count: stamped.page_count,
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }

    #[tool(description = "Expand a page expression like '2-5,8' into the sorted list of pages it selects, optionally checking it against a page count")]
    fn pdf_pages(&self, Parameters(req): Parameters<PdfPagesRequest>) -> String {
        let pages = match parse_page_expression(&req.pages) {
            Ok(p) => p,
            Err(e) => return format!("Error: {}", e),
        };

        if let Some(total) = req.total_pages {
            if let Err(e) = validate_page_set(&pages, total) {
                return format!("Error: {}", e);
            }
        }

        let result = PagesResult {
            pages: pages.to_vec(),
        };
        serde_json::to_string_pretty(&result).unwrap_or_else(|e| format!("Error: {}", e))
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StampResult {
    pub output_path: String,
    pub pages_stamped: Vec<u32>,
    pub page_count: u32,
}

#[derive(Debug, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PagesResult {
    pub pages: Vec<u32>,
}

impl ServerHandler for StampServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF stamping tools. Use pdf_pages to check what a page expression selects, \
                 and pdf_stamp to draw text onto those pages of a PDF and save a copy."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server() -> Result<()> {
    let server = StampServer::new();

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
