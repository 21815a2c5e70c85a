use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of the index service `Query` call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchQuery {
    pub index_id: String,
    pub query_text: String,
    pub page_number: u32,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn first_page(
        index_id: impl Into<String>,
        query_text: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            index_id: index_id.into(),
            query_text: query_text.into(),
            page_number: 1,
            page_size,
        }
    }
}

/// One page of index results. Fields this workspace does not interpret
/// (`QueryId`, `TotalNumberOfResults`, facets, ...) are kept in `metadata`
/// so the prompt context sees the response as the service returned it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResultSet {
    #[serde(default)]
    pub result_items: Vec<SearchResultItem>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl SearchResultSet {
    pub fn len(&self) -> usize {
        self.result_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result_items.is_empty()
    }

    pub fn source_uris(&self) -> impl Iterator<Item = &str> {
        self.result_items.iter().filter_map(|item| item.source_uri.as_deref())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchResultItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_attributes: Option<Vec<DocumentAttribute>>,
    /// Provenance copied out of the attribute list by the annotator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl SearchResultItem {
    pub fn attributes(&self) -> &[DocumentAttribute] {
        self.document_attributes.as_deref().unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttribute {
    pub key: String,
    #[serde(default)]
    pub value: DocumentAttributeValue,
}

impl DocumentAttribute {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: DocumentAttributeValue {
                string_value: Some(value.into()),
                other: Map::new(),
            },
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentAttributeValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
    /// `LongValue`, `DateValue`, `StringListValue` and anything newer.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SearchQuery, SearchResultSet};

    #[test]
    fn query_serializes_with_service_field_names() {
        let query = SearchQuery::first_page("idx-1", "What is your return policy?", 5);
        let value = serde_json::to_value(&query).expect("query serializes");

        assert_eq!(
            value,
            json!({
                "IndexId": "idx-1",
                "QueryText": "What is your return policy?",
                "PageNumber": 1,
                "PageSize": 5
            })
        );
    }

    #[test]
    fn result_set_keeps_uninterpreted_fields() {
        let raw = json!({
            "QueryId": "q-1",
            "TotalNumberOfResults": 1,
            "ResultItems": [{
                "Id": "r-1",
                "Type": "DOCUMENT",
                "DocumentAttributes": [
                    {"Key": "_source_uri", "Value": {"StringValue": "https://example.com/returns"}},
                    {"Key": "_view_count", "Value": {"LongValue": 12}}
                ]
            }]
        });

        let parsed: SearchResultSet = serde_json::from_value(raw.clone()).expect("parses");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.metadata.get("QueryId"), Some(&json!("q-1")));

        let item = &parsed.result_items[0];
        assert_eq!(item.metadata.get("Type"), Some(&json!("DOCUMENT")));
        assert_eq!(item.attributes().len(), 2);
        assert_eq!(item.attributes()[1].value.other.get("LongValue"), Some(&json!(12)));
        assert_eq!(item.source_uri, None);

        let round_tripped = serde_json::to_value(&parsed).expect("serializes");
        assert_eq!(round_tripped, raw);
    }

    #[test]
    fn missing_result_items_is_an_empty_page() {
        let parsed: SearchResultSet =
            serde_json::from_value(json!({"QueryId": "q-2"})).expect("parses");
        assert!(parsed.is_empty());
    }
}
