pub mod document;
pub mod stamp;

pub use document::PdfDocument;
