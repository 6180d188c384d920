use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;

use super::store::{Document, DocumentStore, DocumentStream, Filter, Lookup, Projection, StoreError};

/// In-process document store. Collections scan in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, collection: &str, doc: Document) {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().push(doc);
    }

    pub async fn insert_many(&self, collection: &str, docs: impl IntoIterator<Item = Document>) {
        let mut collections = self.collections.write().await;
        collections.entry(collection.to_string()).or_default().extend(docs);
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, Vec::len)
    }

    async fn matching(&self, collection: &str, filter: &Filter) -> Vec<Document> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Lookup, StoreError> {
        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned();

        Ok(found.map_or(Lookup::NotFound, Lookup::Found))
    }

    fn find_all<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Filter,
        projection: &'a Projection,
    ) -> DocumentStream<'a> {
        // Snapshot under the read lock, then release it before yielding
        stream::once(self.matching(collection, filter))
            .flat_map(stream::iter)
            .map(move |doc| Ok(projection.apply(doc)))
            .boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
