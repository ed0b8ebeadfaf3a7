//! Collaborator seams for one channel: paged data source, converter, key extractor

use async_trait::async_trait;

use crate::error::Result;

/// One row read from a data source, keyed by column name
pub type EntityRow = serde_json::Map<String, serde_json::Value>;

/// A publishable object produced by a [`Converter`]
pub type DataObject = serde_json::Value;

/// Offset/limit coordinates of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index
    pub index: u64,
    /// Maximum rows per page
    pub size: usize,
}

impl PageRequest {
    /// Create a page request
    pub fn new(index: u64, size: usize) -> Self {
        Self { index, size }
    }

    /// Number of rows preceding this page
    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.size as u64)
    }
}

/// One page of rows plus what the source knows about the rest of the channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Rows of this page, at most `size` of them
    pub rows: Vec<EntityRow>,
    /// Whether a page follows this one
    pub has_next: bool,
    /// Total number of pages in the channel (0 when the channel is empty)
    pub total_pages: u64,
}

impl Page {
    /// A page of an empty channel
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a page from its rows and the channel's total row count
    pub fn from_total(rows: Vec<EntityRow>, request: PageRequest, total_rows: u64) -> Self {
        let size = request.size.max(1) as u64;
        let total_pages = total_rows.div_ceil(size);
        Self {
            rows,
            has_next: request.index + 1 < total_pages,
            total_pages,
        }
    }
}

/// Paged read access to a channel's dataset
///
/// Implementations must return a stable ordering across pages for the duration of
/// a run; a row that moves between pages mid-run may be published twice or not at all.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one page
    async fn find_page(&self, request: PageRequest) -> Result<Page>;

    /// Human-readable name for logs
    fn name(&self) -> &str {
        "page-source"
    }
}

/// Turns a page of rows into publishable objects
///
/// Conversion is pure: the same rows always produce the same objects. A converter
/// may drop rows, so a non-empty page can produce an empty batch.
pub trait Converter: Send + Sync {
    /// Convert a page of rows
    fn convert(&self, rows: Vec<EntityRow>) -> Result<Vec<DataObject>>;
}

/// Derives the sink key of a publishable object
pub trait KeyExtractor: Send + Sync {
    /// Key under which `object` is written
    fn extract_key(&self, object: &DataObject) -> Result<String>;
}
