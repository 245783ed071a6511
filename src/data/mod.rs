//! Sources of geographic datasets for map layers.
//!
//! A layer's data is looked up by its dataset index and delivered as a
//! GeoJSON feature collection. Fetches are futures so that browser requests
//! and in-memory lookups share one interface; the layer manager polls them
//! on the UI thread.
//!
//! - `MemorySource`: datasets held in memory (tests, bundled samples)
//! - `RemoteSource`: `<base>/mapData/<index>.geojson` over HTTP on the web,
//!   or from the filesystem on native builds
//! - `sample`: generated demo datasets

mod memory;
mod remote;
pub mod sample;

pub use memory::MemorySource;
pub use remote::RemoteSource;

use futures_util::future::LocalBoxFuture;
use geojson::{FeatureCollection, GeoJson};
use std::fmt;

/// Errors that can occur while fetching a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    /// No dataset exists for the index.
    NotFound(String),
    /// The request or read failed.
    RequestFailed(String),
    /// The payload was not a usable GeoJSON document.
    ParseFailed(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::NotFound(index) => write!(f, "Dataset not found: {}", index),
            DataError::RequestFailed(msg) => write!(f, "Request failed: {}", msg),
            DataError::ParseFailed(msg) => write!(f, "Failed to parse GeoJSON: {}", msg),
        }
    }
}

impl std::error::Error for DataError {}

/// Result of a dataset fetch.
pub type FetchFuture = LocalBoxFuture<'static, Result<FeatureCollection, DataError>>;

/// Provider of layer datasets keyed by index.
///
/// Not `Send`: on the web, fetches are JS promises bound to the UI thread.
pub trait DataSource {
    fn fetch(&self, index: &str) -> FetchFuture;
}

impl<T: DataSource + ?Sized> DataSource for Box<T> {
    fn fetch(&self, index: &str) -> FetchFuture {
        (**self).fetch(index)
    }
}

/// Parses a GeoJSON document into a feature collection.
///
/// A single feature or bare geometry is wrapped in a collection.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollection, DataError> {
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| DataError::ParseFailed(e.to_string()))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(geometry) => FeatureCollection {
            bbox: None,
            features: vec![geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    };

    Ok(collection)
}
