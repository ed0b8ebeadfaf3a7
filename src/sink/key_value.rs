//! In-memory keyed sink with per-run staging and atomic swap

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{SinkDescriptor, SinkUploader, UploadReport};
use crate::channels::{DataObject, KeyExtractor};
use crate::engine::PublishContext;
use crate::error::Result;
use crate::types::RunId;

/// Keyed store that readers see change one whole channel at a time
///
/// Uploads of a run accumulate in a staging area per collection. The upload that
/// carries the final-page flag replaces the published collection with the staged
/// one and bumps its generation, so readers never observe a half-published
/// channel. Staging left behind by another run is discarded when a new run starts
/// writing the collection.
///
/// Pages redelivered after their run already swapped the collection are merged
/// into the published objects instead of starting a new staging area, so a
/// repeated final page cannot shrink the collection to that single page.
#[derive(Debug, Default)]
pub struct KeyValueSink {
    collections: RwLock<HashMap<String, Collection>>,
}

#[derive(Debug, Default)]
struct Collection {
    published: BTreeMap<String, DataObject>,
    generation: u64,
    staging: Option<Staging>,
    /// Run whose staging was swapped in last
    swapped_by: Option<RunId>,
}

#[derive(Debug)]
struct Staging {
    run_id: RunId,
    entries: BTreeMap<String, DataObject>,
}

impl KeyValueSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Published object under `key`
    pub async fn get(&self, collection: &str, key: &str) -> Option<DataObject> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|c| c.published.get(key).cloned())
    }

    /// Every published object of `collection`, ordered by key
    pub async fn snapshot(&self, collection: &str) -> BTreeMap<String, DataObject> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.published.clone())
            .unwrap_or_default()
    }

    /// Number of swaps `collection` has seen
    pub async fn generation(&self, collection: &str) -> u64 {
        let collections = self.collections.read().await;
        collections.get(collection).map_or(0, |c| c.generation)
    }

    /// Objects staged for `collection` but not yet published
    pub async fn staged_len(&self, collection: &str) -> usize {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .and_then(|c| c.staging.as_ref())
            .map_or(0, |s| s.entries.len())
    }
}

#[async_trait]
impl SinkUploader for KeyValueSink {
    async fn upload(
        &self,
        sink: &SinkDescriptor,
        objects: Vec<DataObject>,
        key_extractor: &dyn KeyExtractor,
        upsert: bool,
        context: &PublishContext,
    ) -> Result<UploadReport> {
        // Key everything first so a bad object leaves the staging area untouched
        let keyed = objects
            .into_iter()
            .map(|object| Ok((key_extractor.extract_key(&object)?, object)))
            .collect::<Result<Vec<_>>>()?;
        let written = keyed.len();

        let mut collections = self.collections.write().await;
        let collection = collections.entry(sink.collection.clone()).or_default();

        let stale = collection
            .staging
            .as_ref()
            .is_some_and(|s| s.run_id != context.run_id);
        if stale {
            tracing::warn!(
                collection = %sink.collection,
                run_id = %context.run_id,
                "Discarding staged data of an earlier run"
            );
            collection.staging = None;
        }

        if collection.staging.is_none() && collection.swapped_by == Some(context.run_id) {
            tracing::debug!(
                collection = %sink.collection,
                run_id = %context.run_id,
                objects = written,
                "Run already swapped this collection, merging redelivered page"
            );
            merge(&mut collection.published, keyed, upsert);
            return Ok(UploadReport {
                written,
                swapped: false,
            });
        }

        let staging = collection.staging.get_or_insert_with(|| Staging {
            run_id: context.run_id,
            entries: BTreeMap::new(),
        });
        merge(&mut staging.entries, keyed, upsert);

        let swapped = context.is_final_page_of_channel;
        if swapped && let Some(staged) = collection.staging.take() {
            collection.published = staged.entries;
            collection.generation += 1;
            collection.swapped_by = Some(staged.run_id);
            tracing::debug!(
                collection = %sink.collection,
                generation = collection.generation,
                objects = collection.published.len(),
                "Swapped in published collection"
            );
        }

        Ok(UploadReport { written, swapped })
    }

    fn name(&self) -> &'static str {
        "key-value"
    }
}

fn merge(entries: &mut BTreeMap<String, DataObject>, keyed: Vec<(String, DataObject)>, upsert: bool) {
    for (key, object) in keyed {
        if upsert {
            entries.insert(key, object);
        } else {
            entries.entry(key).or_insert(object);
        }
    }
}
