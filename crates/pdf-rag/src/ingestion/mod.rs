//! Text extraction and chunking

mod chunker;
mod extractor;

pub use chunker::{token_windows, Chunker, HfTokenCodec, TokenCodec};
pub use extractor::{is_pdf_filename, normalize_whitespace, PdfTextExtractor, TextExtractor};
