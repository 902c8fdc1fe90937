//! Token-window text chunking

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use tokenizers::Tokenizer;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Subword encoder/decoder used to measure and cut chunks
pub trait TokenCodec: Send + Sync {
    /// Encode text to token ids, without special tokens
    fn encode(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode a contiguous run of token ids back to text
    fn decode(&self, tokens: &[u32]) -> Result<String>;
}

/// Codec backed by a HuggingFace `tokenizer.json`
pub struct HfTokenCodec {
    tokenizer: Tokenizer,
}

impl HfTokenCodec {
    /// Load a tokenizer file, with truncation and padding disabled
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut tokenizer = Tokenizer::from_file(path).map_err(|e| {
            Error::Config(format!("Failed to load tokenizer {}: {}", path.display(), e))
        })?;
        tokenizer
            .with_truncation(None)
            .map_err(|e| Error::Config(format!("Failed to disable truncation: {}", e)))?;
        tokenizer.with_padding(None);

        Ok(Self { tokenizer })
    }
}

impl TokenCodec for HfTokenCodec {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| Error::extraction(format!("Tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(tokens, false)
            .map_err(|e| Error::extraction(format!("Detokenization failed: {}", e)))
    }
}

/// Splits text into overlapping windows of at most `max_tokens` tokens
#[derive(Clone)]
pub struct Chunker {
    codec: Arc<dyn TokenCodec>,
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Chunker {
    /// Create a chunker; fails if the window stride would not be positive
    pub fn new(codec: Arc<dyn TokenCodec>, max_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        check_window(max_tokens, overlap_tokens)?;
        Ok(Self {
            codec,
            max_tokens,
            overlap_tokens,
        })
    }

    /// Create a chunker from the chunking section of the config
    pub fn from_config(codec: Arc<dyn TokenCodec>, config: &ChunkingConfig) -> Result<Self> {
        Self::new(codec, config.max_tokens, config.overlap_tokens)
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Chunk text into ordered passages. Empty input yields no chunks.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        let tokens = self.codec.encode(text)?;
        token_windows(tokens.len(), self.max_tokens, self.overlap_tokens)?
            .into_iter()
            .map(|window| self.codec.decode(&tokens[window]))
            .collect()
    }
}

fn check_window(max_tokens: usize, overlap_tokens: usize) -> Result<()> {
    if max_tokens == 0 {
        return Err(Error::Config("max_tokens must be positive".to_string()));
    }
    if overlap_tokens >= max_tokens {
        return Err(Error::Config(format!(
            "overlap_tokens ({}) must be smaller than max_tokens ({})",
            overlap_tokens, max_tokens
        )));
    }
    Ok(())
}

/// Token ranges of the sliding windows over a sequence of `len` tokens.
///
/// Windows start every `max_tokens - overlap_tokens` tokens and stop as soon as
/// one reaches the end, so only the final window can be shorter than
/// `max_tokens`. A sequence no longer than the overlap is a single window.
pub fn token_windows(len: usize, max_tokens: usize, overlap_tokens: usize) -> Result<Vec<Range<usize>>> {
    check_window(max_tokens, overlap_tokens)?;

    let stride = max_tokens - overlap_tokens;
    let mut windows = Vec::new();
    let mut start = 0usize;

    while start < len {
        let end = (start + max_tokens).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Treats whitespace-separated integers as token ids
    struct NumericCodec;

    impl TokenCodec for NumericCodec {
        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            text.split_whitespace()
                .map(|t| t.parse().map_err(|_| Error::extraction(t.to_string())))
                .collect()
        }

        fn decode(&self, tokens: &[u32]) -> Result<String> {
            Ok(tokens.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" "))
        }
    }

    fn expected_count(len: usize, max: usize, overlap: usize) -> usize {
        if len == 0 {
            0
        } else if len <= overlap {
            1
        } else {
            (len - overlap).div_ceil(max - overlap)
        }
    }

    #[test]
    fn test_window_properties() {
        for max in 1..12 {
            for overlap in 0..max {
                for len in 0..60 {
                    let windows = token_windows(len, max, overlap).unwrap();

                    assert_eq!(windows.len(), expected_count(len, max, overlap), "len={len} max={max} overlap={overlap}");
                    for w in &windows {
                        assert!(w.len() <= max);
                        assert!(!w.is_empty());
                    }
                    for pair in windows.windows(2) {
                        assert_eq!(pair[0].len(), max);
                        assert_eq!(pair[0].end - pair[1].start, overlap);
                    }
                    if let (Some(first), Some(last)) = (windows.first(), windows.last()) {
                        assert_eq!(first.start, 0);
                        assert_eq!(last.end, len);
                    }
                }
            }
        }
    }

    #[test]
    fn test_invalid_overlap_is_config_error() {
        assert!(matches!(token_windows(10, 5, 5), Err(Error::Config(_))));
        assert!(matches!(token_windows(10, 5, 9), Err(Error::Config(_))));
        assert!(matches!(token_windows(10, 0, 0), Err(Error::Config(_))));
        assert!(Chunker::new(Arc::new(NumericCodec), 80, 80).is_err());
    }

    #[test]
    fn test_default_sizes() {
        // 1000 tokens at 500/80: windows start at 0, 420, 840
        let windows = token_windows(1000, 500, 80).unwrap();
        assert_eq!(windows, vec![0..500, 420..920, 840..1000]);
    }

    #[test]
    fn test_chunk_text() {
        let chunker = Chunker::new(Arc::new(NumericCodec), 4, 1).unwrap();
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");

        let chunks = chunker.chunk(&text).unwrap();
        assert_eq!(chunks, vec!["0 1 2 3", "3 4 5 6", "6 7 8 9"]);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunker = Chunker::new(Arc::new(NumericCodec), 500, 80).unwrap();
        assert_eq!(chunker.chunk("1 2 3").unwrap(), vec!["1 2 3"]);
        assert!(chunker.chunk("   ").unwrap().is_empty());
    }
}
