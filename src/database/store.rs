use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use thiserror::Error;

/// A stored document. Opaque to this layer beyond its top-level fields.
pub type Document = Map<String, Value>;

/// Lazy, finite, non-restartable sequence of query results
pub type DocumentStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of a single-document lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Document),
    NotFound,
}

/// Conjunction of equality predicates on top-level fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.predicates
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for containment queries
    pub fn to_document(&self) -> Document {
        self.predicates.iter().cloned().collect()
    }
}

/// Top-level fields to keep in each result; empty keeps whole documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn apply(&self, mut doc: Document) -> Document {
        if self.is_all() {
            return doc;
        }
        let mut projected = Map::new();
        for field in &self.fields {
            if let Some(value) = doc.remove(field) {
                projected.insert(field.clone(), value);
            }
        }
        projected
    }
}

/// Read access to named collections of JSON documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document in `collection` matching `filter`
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Lookup, StoreError>;

    /// Every document in `collection` matching `filter`, in store scan order
    fn find_all<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Filter,
        projection: &'a Projection,
    ) -> DocumentStream<'a>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn filter_requires_every_predicate() {
        let filter = Filter::new().eq("workflow_id", "wf1").eq("is_active", true);
        assert!(filter.matches(&doc(json!({"workflow_id": "wf1", "is_active": true, "x": 1}))));
        assert!(!filter.matches(&doc(json!({"workflow_id": "wf1", "is_active": false}))));
        assert!(!filter.matches(&doc(json!({"workflow_id": "wf1"}))));
        assert_eq!(filter.to_document(), doc(json!({"workflow_id": "wf1", "is_active": true})));
    }

    #[test]
    fn boolean_predicates_do_not_match_strings() {
        let filter = Filter::new().eq("is_public", true);
        assert!(!filter.matches(&doc(json!({"is_public": "true"}))));
    }

    #[test]
    fn projection_keeps_only_requested_fields() {
        let source = doc(json!({"mqid": "a", "workflow_id": "wf1", "secret": 1}));
        let projected = Projection::new(["workflow_id", "mqid", "absent"]).apply(source.clone());
        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("mqid"));
        assert!(!projected.contains_key("secret"));
        assert_eq!(Projection::all().apply(source.clone()), source);
    }
}
