// dffkit-parsers/src/traits.rs
//! Core traits defining the parser interface.
//!
//! This module establishes a unified parsing interface that enables:
//! - Consistent error handling with byte offsets and chunk names
//! - Reader, in-memory and memory-mapped file input
//! - Progress reporting for large files

use std::io::{Read, Seek};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during parsing operations
///
/// Every variant here is fatal: once the byte stream is out of step with
/// the format it can no longer be trusted.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated data in {chunk} at offset {offset:#x}: requested {requested} bytes, {available} available")]
    Truncated {
        chunk: String,
        offset: u64,
        requested: usize,
        available: usize,
    },

    #[error("Malformed {chunk} chunk at offset {offset:#x}: {message}")]
    Malformed {
        chunk: String,
        offset: u64,
        message: String,
    },

    #[error("Unterminated string in {chunk} at offset {offset:#x}")]
    InvalidString { chunk: String, offset: u64 },

    #[error("Missing required {chunk} chunk in {context}")]
    MissingChunk { chunk: String, context: String },

    #[error("Unknown chunk type 0x{chunk_type:08X} at offset {offset:#x}")]
    UnknownChunkType { chunk_type: u32, offset: u64 },

    #[error("Nested error in {context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Byte offset that triggered the error, if known
    pub fn offset(&self) -> Option<u64> {
        match self {
            ParseError::Truncated { offset, .. }
            | ParseError::Malformed { offset, .. }
            | ParseError::InvalidString { offset, .. }
            | ParseError::UnknownChunkType { offset, .. } => Some(*offset),
            ParseError::Nested { source, .. } => source.offset(),
            ParseError::Io(_) | ParseError::MissingChunk { .. } => None,
        }
    }

    /// Name of the chunk being decoded when the error occurred
    pub fn chunk(&self) -> Option<String> {
        match self {
            ParseError::Truncated { chunk, .. }
            | ParseError::Malformed { chunk, .. }
            | ParseError::InvalidString { chunk, .. }
            | ParseError::MissingChunk { chunk, .. } => Some(chunk.clone()),
            ParseError::UnknownChunkType { chunk_type, .. } => Some(format!("0x{chunk_type:08X}")),
            ParseError::Nested { source, .. } => source.chunk(),
            ParseError::Io(_) => None,
        }
    }
}

impl From<ParseError> for dffkit_core::Error {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io(e) => dffkit_core::Error::Io(e),
            other => dffkit_core::Error::Parse {
                offset: other.offset(),
                chunk: other.chunk(),
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Progress callback for long-running parse operations
pub type ProgressCallback = Box<dyn Fn(ParseProgress) + Send + Sync>;

/// Progress information during parsing
#[derive(Debug, Clone)]
pub struct ParseProgress {
    /// Current phase of parsing
    pub phase: ParsePhase,
    /// Bytes processed so far
    pub bytes_processed: u64,
    /// Total bytes to process (if known)
    pub total_bytes: Option<u64>,
    /// Current item being processed (e.g., chunk name)
    pub current_item: Option<String>,
    /// Items processed so far
    pub items_processed: u64,
    /// Total items (if known)
    pub total_items: Option<u64>,
}

impl ParseProgress {
    /// Calculate percentage complete (0.0 - 1.0)
    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                self.bytes_processed as f32 / total as f32
            }
        })
    }
}

/// Phases of the parsing process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePhase {
    /// Reading the top-level chunk headers
    ReadingHeader,
    /// Parsing individual records
    ParsingRecords,
    /// Checking cross references between parsed records
    LinkingReferences,
    /// Parsing complete
    Complete,
}

/// Configuration options for parsing
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Log cross-reference problems (atomics pointing at missing frames or
    /// geometries) as warnings while parsing
    pub strict_validation: bool,
    /// Whether to skip unknown chunk types instead of erroring
    pub skip_unknown_chunks: bool,
    /// Whether to use memory mapping for large files
    pub use_memory_mapping: bool,
    /// Minimum file size to enable memory mapping
    pub memory_mapping_threshold: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict_validation: false,
            skip_unknown_chunks: true,
            use_memory_mapping: true,
            memory_mapping_threshold: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Core trait for all file format parsers
pub trait Parser: Send + Sync {
    /// The parsed output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["dff"])
    fn extensions(&self) -> &[&str];

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Parse from a reader with default options
    fn parse<R: Read + Seek>(&self, reader: R) -> ParseResult<Self::Output> {
        self.parse_with_options(reader, &ParseOptions::default(), None)
    }

    /// Parse from a reader with custom options and optional progress callback
    fn parse_with_options<R: Read + Seek>(
        &self,
        reader: R,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output>;

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        self.parse_file_with_options(path, &ParseOptions::default(), None)
    }

    /// Parse from a file path with options
    fn parse_file_with_options(
        &self,
        path: &Path,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;

        // Use memory mapping for large files if enabled
        if options.use_memory_mapping {
            let metadata = file.metadata()?;
            if metadata.len() >= options.memory_mapping_threshold {
                return self.parse_memory_mapped(path, options, progress);
            }
        }

        let reader = std::io::BufReader::new(file);
        self.parse_with_options(reader, options, progress)
    }

    /// Parse using memory-mapped I/O (for large files)
    fn parse_memory_mapped(
        &self,
        path: &Path,
        options: &ParseOptions,
        progress: Option<ProgressCallback>,
    ) -> ParseResult<Self::Output> {
        // Default implementation falls back to standard I/O
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        self.parse_with_options(reader, options, progress)
    }

    /// Whether `path` carries one of this parser's extensions
    fn can_parse(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy();
            self.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext))
        })
    }
}

/// Trait for parsers that produce hierarchical/tree structures
pub trait HierarchicalParser: Parser {
    /// Node type in the hierarchy
    type Node: Send;

    /// Get the root node(s) of the parsed structure
    fn roots<'a>(&self, parsed: &'a Self::Output) -> Vec<&'a Self::Node>;

    /// Get children of a node
    fn children<'a>(&self, parsed: &'a Self::Output, node: &Self::Node) -> Vec<&'a Self::Node>;

    /// Check if a node is a leaf (no children)
    fn is_leaf(&self, parsed: &Self::Output, node: &Self::Node) -> bool {
        self.children(parsed, node).is_empty()
    }
}

/// Trait for converting parsed data to human-readable formats
pub trait HumanReadable {
    /// Convert to a human-readable string representation
    fn to_readable_string(&self) -> String;

    /// Convert to formatted JSON
    fn to_json(&self) -> serde_json::Value;

    /// Convert to formatted YAML (optional, returns JSON by default)
    fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.to_json()).unwrap_or_else(|_| self.to_readable_string())
    }
}
