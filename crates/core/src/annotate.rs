//! Provenance extraction for index results.

use crate::domain::search::{SearchResultItem, SearchResultSet};

/// Attribute key the index uses for a document's origin.
pub const SOURCE_URI_ATTRIBUTE: &str = "_source_uri";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultAnnotator {
    sentinel_key: String,
}

impl Default for ResultAnnotator {
    fn default() -> Self {
        Self::new(SOURCE_URI_ATTRIBUTE)
    }
}

impl ResultAnnotator {
    pub fn new(sentinel_key: impl Into<String>) -> Self {
        Self { sentinel_key: sentinel_key.into() }
    }

    /// Returns a copy of `results` where every item carrying the sentinel
    /// attribute with a non-empty string value has `source_uri` set.
    ///
    /// Item order and count are preserved and the input is left untouched.
    pub fn annotate(&self, results: &SearchResultSet) -> SearchResultSet {
        let mut annotated = results.clone();
        for item in &mut annotated.result_items {
            if let Some(source_uri) = self.source_uri(item) {
                tracing::debug!(
                    event_name = "pipeline.annotate.source_uri",
                    source_uri = %source_uri,
                    "extracted result provenance"
                );
                item.source_uri = Some(source_uri);
            }
        }
        annotated
    }

    fn source_uri(&self, item: &SearchResultItem) -> Option<String> {
        // Later duplicates win.
        item.attributes()
            .iter()
            .rev()
            .find(|attribute| attribute.key == self.sentinel_key)
            .and_then(|attribute| attribute.value.string_value.as_deref())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }
}
