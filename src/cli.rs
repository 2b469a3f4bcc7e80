use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::pdf::stamp::{Placement, StampOptions};

#[derive(Parser)]
#[command(name = "pdfstamp")]
#[command(about = "Stamp text onto selected pages of a PDF, over HTTP or locally")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP stamping service
    Serve(ServeArgs),

    /// Run as MCP server over stdio
    Mcp,

    /// Stamp a local PDF
    Stamp {
        /// PDF file to stamp
        path: PathBuf,

        /// Text to draw on each page
        text: String,

        /// Pages to stamp (e.g., "2-5,8,10-12")
        pages: String,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        style: StampArgs,
    },

    /// Parse a page expression and print the selected pages
    Pages {
        /// Page expression (e.g., "2-5,8,10-12")
        expression: String,

        /// Check the pages against a document with this many pages
        #[arg(short, long)]
        total: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlacementKind {
    /// Baseline a fixed distance above the bottom edge
    Bottom,
    /// Baseline a fixed distance below the top edge
    Top,
}

#[derive(Debug, Clone, Args)]
pub struct StampArgs {
    /// Where the stamp sits vertically
    #[arg(long, value_enum, default_value = "bottom", env = "PDFSTAMP_PLACEMENT")]
    pub placement: PlacementKind,

    /// Distance in points from the chosen edge
    #[arg(long, env = "PDFSTAMP_MARGIN")]
    pub margin: Option<f32>,

    /// Distance in points from the left edge
    #[arg(long, default_value = "20", env = "PDFSTAMP_X")]
    pub x: f32,

    /// Font size in points
    #[arg(long, default_value = "12", env = "PDFSTAMP_FONT_SIZE")]
    pub font_size: f32,
}

impl StampArgs {
    pub fn options(&self) -> StampOptions {
        let placement = match self.placement {
            PlacementKind::Bottom => Placement::Bottom {
                y: self.margin.unwrap_or(20.0),
            },
            PlacementKind::Top => Placement::Top {
                offset: self.margin.unwrap_or(50.0),
            },
        };
        StampOptions {
            x: self.x,
            font_size: self.font_size,
            placement,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Return the PDF base64-encoded in the response
    Inline,
    /// Upload the PDF and return its URL
    Upload,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8888", env = "PDFSTAMP_BIND")]
    pub bind: String,

    /// What to do with the stamped PDF
    #[arg(long, value_enum, default_value = "inline", env = "PDFSTAMP_SINK")]
    pub sink: SinkKind,

    /// Storage endpoint stamped PDFs are PUT under (upload sink)
    #[arg(long, env = "PDFSTAMP_UPLOAD_ENDPOINT")]
    pub upload_endpoint: Option<String>,

    /// Bearer token for the storage endpoint
    #[arg(long, env = "PDFSTAMP_UPLOAD_TOKEN", hide_env_values = true)]
    pub upload_token: Option<String>,

    /// Seconds to wait for the source PDF
    #[arg(long, default_value = "30", env = "PDFSTAMP_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    /// Maximum accepted request body size in bytes
    #[arg(long, default_value = "1048576", env = "PDFSTAMP_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    #[command(flatten)]
    pub style: StampArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_stamp_defaults() {
        let cli = parse(&["pdfstamp", "stamp", "in.pdf", "PAID", "1-3", "-o", "out.pdf"]);
        let Commands::Stamp { style, pages, .. } = cli.command else {
            panic!("expected stamp command");
        };
        assert_eq!(pages, "1-3");
        assert_eq!(style.options(), StampOptions::default());
    }

    #[test]
    fn test_top_placement() {
        let cli = parse(&[
            "pdfstamp", "stamp", "in.pdf", "PAID", "1", "-o", "out.pdf", "--placement", "top",
        ]);
        let Commands::Stamp { style, .. } = cli.command else {
            panic!("expected stamp command");
        };
        assert_eq!(style.options().placement, Placement::Top { offset: 50.0 });
    }

    #[test]
    fn test_serve_flags() {
        let cli = parse(&[
            "pdfstamp",
            "serve",
            "--sink",
            "upload",
            "--upload-endpoint",
            "https://storage.example.com/bucket",
            "--margin",
            "36",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.sink, SinkKind::Upload);
        assert_eq!(args.style.options().placement, Placement::Bottom { y: 36.0 });
    }
}
