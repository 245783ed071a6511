//! In-memory dataset source.

use super::{DataError, DataSource, FetchFuture};
use futures_util::future::{self, FutureExt};
use geojson::FeatureCollection;
use std::cell::Cell;
use std::collections::HashMap;

/// Datasets held in memory, keyed by index.
///
/// Fetches resolve immediately. The number of fetches issued is counted so
/// callers can tell whether a request reached the source.
#[derive(Debug, Default)]
pub struct MemorySource {
    datasets: HashMap<String, FeatureCollection>,
    fetch_count: Cell<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: impl Into<String>, data: FeatureCollection) {
        self.datasets.insert(index.into(), data);
    }

    pub fn with(mut self, index: impl Into<String>, data: FeatureCollection) -> Self {
        self.insert(index, data);
        self
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.get()
    }
}

impl DataSource for MemorySource {
    fn fetch(&self, index: &str) -> FetchFuture {
        self.fetch_count.set(self.fetch_count.get() + 1);
        let result = self
            .datasets
            .get(index)
            .cloned()
            .ok_or_else(|| DataError::NotFound(index.to_string()));
        future::ready(result).boxed_local()
    }
}
