//! Recording fakes for engine and orchestrator tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;

use super::{ActiveRuns, PublishContext, PublishEngine, PublishOrchestrator, PublishState, Transition};
use crate::channels::{
    ChannelBinding, ChannelRegistry, Converter, DataObject, EntityRow, FieldKeyExtractor,
    IdentityConverter, KeyExtractor, Page, PageRequest, PageSource,
};
use crate::error::{Error, Result};
use crate::queue::WorkQueue;
use crate::sink::{SinkDescriptor, SinkUploader, UploadReport};
use crate::tracker::{MemoryTracker, ProgressTracker};
use crate::types::{Event, Priority, ProcessInfo, RunId};

/// A call observed by [`RecordingTracker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackerCall {
    Create,
    Start,
    SetTotal(u64),
    SetCurrent(u64),
    Finish,
    SetError(String),
    Cancel,
}

/// [`MemoryTracker`] that records every mutating call
#[derive(Default)]
pub(crate) struct RecordingTracker {
    inner: MemoryTracker,
    calls: Mutex<Vec<TrackerCall>>,
}

impl RecordingTracker {
    pub(crate) fn calls(&self) -> Vec<TrackerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, matches: impl Fn(&TrackerCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub(crate) async fn get_entry(&self, id: RunId) -> ProcessInfo {
        self.inner.get(id).await.unwrap().expect("tracker entry exists")
    }

    fn record(&self, call: TrackerCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProgressTracker for RecordingTracker {
    async fn create(&self, parent: Option<RunId>) -> Result<ProcessInfo> {
        self.record(TrackerCall::Create);
        self.inner.create(parent).await
    }

    async fn start(&self, id: RunId) -> Result<ProcessInfo> {
        self.record(TrackerCall::Start);
        self.inner.start(id).await
    }

    async fn get(&self, id: RunId) -> Result<Option<ProcessInfo>> {
        self.inner.get(id).await
    }

    async fn set_total(&self, id: RunId, total: u64) -> Result<()> {
        self.record(TrackerCall::SetTotal(total));
        self.inner.set_total(id, total).await
    }

    async fn set_current(&self, id: RunId, current: u64) -> Result<()> {
        self.record(TrackerCall::SetCurrent(current));
        self.inner.set_current(id, current).await
    }

    async fn finish(&self, id: RunId) -> Result<()> {
        self.record(TrackerCall::Finish);
        self.inner.finish(id).await
    }

    async fn set_error(&self, id: RunId, message: &str) -> Result<()> {
        self.record(TrackerCall::SetError(message.to_string()));
        self.inner.set_error(id, message).await
    }

    async fn cancel(&self, id: RunId) -> Result<()> {
        self.record(TrackerCall::Cancel);
        self.inner.cancel(id).await
    }

    async fn list(&self) -> Result<Vec<ProcessInfo>> {
        self.inner.list().await
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// FIFO queue that only records pushes; tests pop explicitly
#[derive(Default)]
pub(crate) struct RecordingQueue {
    pushed: Mutex<Vec<(Priority, PublishState)>>,
    pending: Mutex<std::collections::VecDeque<PublishState>>,
    fail: AtomicBool,
}

impl RecordingQueue {
    pub(crate) fn pushed(&self) -> Vec<(Priority, PublishState)> {
        self.pushed.lock().unwrap().clone()
    }

    pub(crate) fn pop(&self) -> Option<PublishState> {
        self.pending.lock().unwrap().pop_front()
    }

    pub(crate) fn fail_pushes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn push(&self, priority: Priority, state: PublishState) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Other("queue unavailable".into()));
        }
        self.pushed.lock().unwrap().push((priority, state.clone()));
        self.pending.lock().unwrap().push_back(state);
        Ok(())
    }
}

/// Page source over a fixed row set
pub(crate) struct VecSource {
    rows: Vec<EntityRow>,
    fetches: AtomicUsize,
    fail_on_page: Option<u64>,
}

impl VecSource {
    pub(crate) fn with_ids(ids: impl IntoIterator<Item = i64>) -> Self {
        let rows = ids
            .into_iter()
            .map(|id| {
                let mut row = EntityRow::new();
                row.insert("id".into(), json!(id));
                row.insert("name".into(), json!(format!("item-{id}")));
                row
            })
            .collect();
        Self {
            rows,
            fetches: AtomicUsize::new(0),
            fail_on_page: None,
        }
    }

    pub(crate) fn failing_on(mut self, page: u64) -> Self {
        self.fail_on_page = Some(page);
        self
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for VecSource {
    async fn find_page(&self, request: PageRequest) -> Result<Page> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_page == Some(request.index) {
            return Err(Error::Other("connection reset".into()));
        }

        let start = (request.offset() as usize).min(self.rows.len());
        let end = (start + request.size).min(self.rows.len());
        let rows = self.rows[start..end].to_vec();
        Ok(Page::from_total(rows, request, self.rows.len() as u64))
    }
}

/// Shared-ownership wrapper so tests can inspect a source after binding it
pub(crate) struct SharedSource(pub(crate) Arc<VecSource>);

#[async_trait]
impl PageSource for SharedSource {
    async fn find_page(&self, request: PageRequest) -> Result<Page> {
        self.0.find_page(request).await
    }
}

/// Converter that rejects every page
pub(crate) struct FailingConverter;

impl Converter for FailingConverter {
    fn convert(&self, rows: Vec<EntityRow>) -> Result<Vec<DataObject>> {
        Err(Error::Other(format!("unsupported row layout ({} rows)", rows.len())))
    }
}

/// One upload observed by [`RecordingUploader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UploadCall {
    pub(crate) collection: String,
    pub(crate) keys: Vec<String>,
    pub(crate) upsert: bool,
    pub(crate) final_page: bool,
    pub(crate) run_id: RunId,
}

/// Uploader that records calls and can be told to fail
#[derive(Default)]
pub(crate) struct RecordingUploader {
    calls: Mutex<Vec<UploadCall>>,
    fail_on_call: Mutex<Option<usize>>,
}

impl RecordingUploader {
    pub(crate) fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Fail the `n`-th upload (zero-based)
    pub(crate) fn fail_on_call(&self, n: usize) {
        *self.fail_on_call.lock().unwrap() = Some(n);
    }
}

#[async_trait]
impl SinkUploader for RecordingUploader {
    async fn upload(
        &self,
        sink: &SinkDescriptor,
        objects: Vec<DataObject>,
        key_extractor: &dyn KeyExtractor,
        upsert: bool,
        context: &PublishContext,
    ) -> Result<UploadReport> {
        let keys = objects
            .iter()
            .map(|o| key_extractor.extract_key(o))
            .collect::<Result<Vec<_>>>()?;

        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push(UploadCall {
            collection: sink.collection.clone(),
            keys,
            upsert,
            final_page: context.is_final_page_of_channel,
            run_id: context.run_id,
        });

        if *self.fail_on_call.lock().unwrap() == Some(index) {
            return Err(Error::Other("sink rejected batch".into()));
        }

        Ok(UploadReport {
            written: objects.len(),
            swapped: context.is_final_page_of_channel,
        })
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Complete binding over a fixed row set
pub(crate) fn binding(name: &str, source: Arc<VecSource>) -> ChannelBinding {
    ChannelBinding::new(name)
        .with_source(SharedSource(source))
        .with_converter(IdentityConverter)
        .with_key_extractor(FieldKeyExtractor::new("id"))
        .with_sink(SinkDescriptor::new(format!("{name}-cache")))
}

/// Engine, orchestrator and fakes wired together
pub(crate) struct Harness {
    pub(crate) tracker: Arc<RecordingTracker>,
    pub(crate) queue: Arc<RecordingQueue>,
    pub(crate) uploader: Arc<RecordingUploader>,
    pub(crate) engine: PublishEngine,
    pub(crate) orchestrator: PublishOrchestrator,
    pub(crate) events: broadcast::Receiver<Event>,
}

impl Harness {
    pub(crate) fn new(registry: ChannelRegistry, batch_size: usize) -> Self {
        let catalog = Arc::new(registry);
        let tracker = Arc::new(RecordingTracker::default());
        let queue = Arc::new(RecordingQueue::default());
        let uploader = Arc::new(RecordingUploader::default());
        let active_runs = ActiveRuns::new();
        let (event_tx, events) = broadcast::channel(1000);

        let engine = PublishEngine::new(
            catalog.clone(),
            tracker.clone(),
            queue.clone(),
            uploader.clone(),
            event_tx.clone(),
        )
        .with_active_runs(active_runs.clone());

        let orchestrator =
            PublishOrchestrator::new(catalog, tracker.clone(), queue.clone(), event_tx, batch_size)
                .with_active_runs(active_runs);

        Self {
            tracker,
            queue,
            uploader,
            engine,
            orchestrator,
            events,
        }
    }

    /// Deliver queued continuations until the queue is empty
    pub(crate) async fn drain(&self) -> Vec<Result<Transition>> {
        let mut outcomes = Vec::new();
        while let Some(state) = self.queue.pop() {
            outcomes.push(self.engine.handle_continuation(state).await);
        }
        outcomes
    }

    /// Deliver the next queued continuation, if any
    pub(crate) async fn drain_one(&self) -> Option<Result<Transition>> {
        let state = self.queue.pop()?;
        Some(self.engine.handle_continuation(state).await)
    }

    pub(crate) fn take_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
