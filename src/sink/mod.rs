//! Sink side: where published batches are written.
//!
//! The engine hands every non-empty page to a [`SinkUploader`] together with the
//! channel's [`SinkDescriptor`], its key extractor and the run's
//! [`PublishContext`]. The context's `is_final_page_of_channel` flag tells the
//! uploader that no further page of the channel will follow in this run, which is
//! the cue to swap the staged data in.

mod key_value;

pub use key_value::KeyValueSink;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channels::{DataObject, KeyExtractor};
use crate::engine::PublishContext;
use crate::error::Result;

/// Sink-side address of a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkDescriptor {
    /// Collection (keyspace) the channel's objects are written to
    pub collection: String,
}

impl SinkDescriptor {
    /// Descriptor for `collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

/// What an upload did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Objects written (or staged)
    pub written: usize,
    /// Whether the staged channel data replaced the published data
    pub swapped: bool,
}

/// Writes batches of objects to a sink
#[async_trait]
pub trait SinkUploader: Send + Sync {
    /// Write `objects` under the keys produced by `key_extractor`
    ///
    /// With `upsert` set, an object replaces any existing one under the same key.
    async fn upload(
        &self,
        sink: &SinkDescriptor,
        objects: Vec<DataObject>,
        key_extractor: &dyn KeyExtractor,
        upsert: bool,
        context: &PublishContext,
    ) -> Result<UploadReport>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;
}
