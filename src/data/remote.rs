//! Dataset source backed by `<base>/mapData/<index>.geojson`.
//!
//! On WASM targets the document is requested with the browser's fetch API.
//! On native targets `base` is a directory and the file is read from disk.

use super::{parse_feature_collection, DataError, DataSource, FetchFuture};
use futures_util::future::FutureExt;

/// Remote GeoJSON datasets under a base URL or directory.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
}

impl RemoteSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Location of the dataset for `index`.
    pub fn dataset_url(&self, index: &str) -> String {
        format!(
            "{}/mapData/{}.geojson",
            self.base_url.trim_end_matches('/'),
            index
        )
    }
}

impl DataSource for RemoteSource {
    fn fetch(&self, index: &str) -> FetchFuture {
        let url = self.dataset_url(index);
        let index = index.to_string();
        async move {
            log::info!("Fetching dataset {} from {}", index, url);
            let text = fetch_text(&url, &index).await?;
            parse_feature_collection(&text)
        }
        .boxed_local()
    }
}

#[cfg(target_arch = "wasm32")]
async fn fetch_text(url: &str, index: &str) -> Result<String, DataError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window =
        web_sys::window().ok_or_else(|| DataError::RequestFailed("No window".to_string()))?;

    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| DataError::RequestFailed(format!("{:?}", e)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| DataError::RequestFailed("Response was not a Response".to_string()))?;

    if response.status() == 404 {
        return Err(DataError::NotFound(index.to_string()));
    }
    if !response.ok() {
        return Err(DataError::RequestFailed(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let text_promise = response
        .text()
        .map_err(|e| DataError::RequestFailed(format!("{:?}", e)))?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|e| DataError::RequestFailed(format!("{:?}", e)))?;

    text.as_string()
        .ok_or_else(|| DataError::ParseFailed("Response body was not text".to_string()))
}

#[cfg(not(target_arch = "wasm32"))]
async fn fetch_text(url: &str, index: &str) -> Result<String, DataError> {
    match std::fs::read_to_string(url) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(DataError::NotFound(index.to_string()))
        }
        Err(e) => Err(DataError::RequestFailed(format!("{}: {}", url, e))),
    }
}
