use anyhow::{Context, Result};
use lopdf::{Document, ObjectId};
use std::collections::BTreeMap;

pub struct PdfDocument {
    pub doc: Document,
}

impl PdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).context("Failed to parse PDF")?;
        Ok(PdfDocument { doc })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Object IDs of every page, keyed by 1-indexed page number
    pub fn page_ids(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    /// Serialize to an in-memory buffer
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .context("Failed to serialize PDF")?;
        Ok(out)
    }
}
