mod cancellation;

use std::sync::Arc;

use super::test_helpers::*;
use crate::channels::ChannelRegistry;

/// Registry with one channel per `(name, row ids)` pair
pub(super) fn registry(channels: &[(&str, Arc<VecSource>)]) -> ChannelRegistry {
    let mut registry = ChannelRegistry::new();
    for (name, source) in channels {
        registry.register(binding(name, source.clone())).unwrap();
    }
    registry
}
