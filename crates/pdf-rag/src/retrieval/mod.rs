//! Vector index and query-time retrieval

mod index;
mod search;

pub use index::{FlatIndex, SearchHit};
pub use search::{RetrievedChunk, Retriever};
