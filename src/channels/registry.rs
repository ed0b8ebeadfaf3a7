//! Channel bindings and the catalog that resolves channel names

use std::sync::Arc;

use super::traits::{Converter, KeyExtractor, PageSource};
use crate::error::{ChannelError, Error, Result};
use crate::sink::SinkDescriptor;

/// Everything needed to publish one channel
///
/// Pieces are optional so that an incomplete binding can be registered and listed;
/// the gap is reported as a [`ChannelError`] only when a run reaches the channel.
#[derive(Clone)]
pub struct ChannelBinding {
    /// Channel name, unique within a catalog
    pub name: String,
    /// Paged data source
    pub source: Option<Arc<dyn PageSource>>,
    /// Row to object conversion
    pub converter: Option<Arc<dyn Converter>>,
    /// Object to sink key
    pub key_extractor: Option<Arc<dyn KeyExtractor>>,
    /// Where the channel's objects are written
    pub sink: Option<SinkDescriptor>,
}

impl ChannelBinding {
    /// A binding with nothing attached yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            converter: None,
            key_extractor: None,
            sink: None,
        }
    }

    /// Attach the data source
    pub fn with_source(mut self, source: impl PageSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Attach the converter
    pub fn with_converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Attach the key extractor
    pub fn with_key_extractor(mut self, key_extractor: impl KeyExtractor + 'static) -> Self {
        self.key_extractor = Some(Arc::new(key_extractor));
        self
    }

    /// Attach the sink descriptor
    pub fn with_sink(mut self, sink: SinkDescriptor) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Check that every piece is bound, in the order data source, converter,
    /// key extractor, sink descriptor
    pub fn resolve(&self) -> std::result::Result<ResolvedChannel, ChannelError> {
        let missing = |piece| ChannelError::MissingBinding {
            channel: self.name.clone(),
            piece,
        };

        let source = self.source.clone().ok_or_else(|| missing("data source"))?;
        let converter = self.converter.clone().ok_or_else(|| missing("converter"))?;
        let key_extractor = self
            .key_extractor
            .clone()
            .ok_or_else(|| missing("key extractor"))?;
        let sink = self.sink.clone().ok_or_else(|| ChannelError::MissingSink {
            channel: self.name.clone(),
        })?;

        Ok(ResolvedChannel {
            source,
            converter,
            key_extractor,
            sink,
        })
    }
}

impl std::fmt::Debug for ChannelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("name", &self.name)
            .field("source", &self.source.as_ref().map(|s| s.name().to_string()))
            .field("converter", &self.converter.is_some())
            .field("key_extractor", &self.key_extractor.is_some())
            .field("sink", &self.sink)
            .finish()
    }
}

/// A fully bound channel
#[derive(Clone)]
pub struct ResolvedChannel {
    /// Paged data source
    pub source: Arc<dyn PageSource>,
    /// Row to object conversion
    pub converter: Arc<dyn Converter>,
    /// Object to sink key
    pub key_extractor: Arc<dyn KeyExtractor>,
    /// Where the channel's objects are written
    pub sink: SinkDescriptor,
}

/// Lookup of channel bindings by name
pub trait ChannelCatalog: Send + Sync {
    /// Binding registered under `name`
    fn get(&self, name: &str) -> Option<ChannelBinding>;

    /// Every binding, in registration order
    fn list_all(&self) -> Vec<ChannelBinding>;

    /// Every channel name, in registration order
    fn names(&self) -> Vec<String> {
        self.list_all().into_iter().map(|b| b.name).collect()
    }

    /// Whether `name` is registered
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Ordered, programmatically built [`ChannelCatalog`]
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    channels: Vec<ChannelBinding>,
}

impl ChannelRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding; names must be unique and non-blank
    pub fn register(&mut self, binding: ChannelBinding) -> Result<()> {
        if binding.name.trim().is_empty() {
            return Err(Error::Config {
                message: "channel name must not be blank".into(),
                key: Some("channels".into()),
            });
        }

        if self.channels.iter().any(|c| c.name == binding.name) {
            return Err(Error::Config {
                message: format!("channel '{}' is registered twice", binding.name),
                key: Some("channels".into()),
            });
        }

        tracing::debug!(channel = %binding.name, "Registered publish channel");
        self.channels.push(binding);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, binding: ChannelBinding) -> Result<Self> {
        self.register(binding)?;
        Ok(self)
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is registered
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl ChannelCatalog for ChannelRegistry {
    fn get(&self, name: &str) -> Option<ChannelBinding> {
        self.channels.iter().find(|c| c.name == name).cloned()
    }

    fn list_all(&self) -> Vec<ChannelBinding> {
        self.channels.clone()
    }
}
