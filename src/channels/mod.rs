//! Channels: named datasets and the collaborators that publish them.
//!
//! A channel binds a paged [`PageSource`], a [`Converter`], a [`KeyExtractor`] and a
//! [`SinkDescriptor`](crate::sink::SinkDescriptor) under one name. Bindings are
//! registered programmatically in a [`ChannelRegistry`] and looked up through the
//! [`ChannelCatalog`] trait.
//!
//! # Example
//!
//! ```no_run
//! use snapshot_publisher::channels::{
//!     ChannelBinding, ChannelRegistry, FieldKeyExtractor, IdentityConverter, SqliteTableSource,
//! };
//! use snapshot_publisher::sink::SinkDescriptor;
//!
//! # async fn example(pool: sqlx::SqlitePool) -> snapshot_publisher::Result<()> {
//! let registry = ChannelRegistry::new().with(
//!     ChannelBinding::new("currencies")
//!         .with_source(SqliteTableSource::new(pool, "currencies", "code")?)
//!         .with_converter(IdentityConverter)
//!         .with_key_extractor(FieldKeyExtractor::new("code"))
//!         .with_sink(SinkDescriptor::new("ref:currencies")),
//! )?;
//! # Ok(())
//! # }
//! ```

mod convert;
mod registry;
mod sqlite_source;
mod traits;

pub use convert::{FieldKeyExtractor, FieldProjection, FnConverter, IdentityConverter};
pub use registry::{ChannelBinding, ChannelCatalog, ChannelRegistry, ResolvedChannel};
pub use sqlite_source::SqliteTableSource;
pub use traits::{Converter, DataObject, EntityRow, KeyExtractor, Page, PageRequest, PageSource};

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
