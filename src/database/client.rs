use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::store::{DocumentStore, DocumentStream, Filter, Lookup, Projection, StoreError};

/// Collection holding every mqprofile document
pub const MQPROFILE_COLLECTION: &str = "mqprofiles";

/// Field that uniquely identifies an mqprofile
pub const MQPROFILE_KEY: &str = "mqid";

/// Typed view of the fields this service filters on. Everything else rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqProfile {
    pub mqid: String,
    pub workflow_id: String,
    pub is_public: bool,
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Store accessor bound to the mqprofile collection
#[derive(Clone)]
pub struct MqProfileClient {
    store: Arc<dyn DocumentStore>,
}

impl MqProfileClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Lookup, StoreError> {
        self.store.find_one(MQPROFILE_COLLECTION, filter).await
    }

    pub fn find_all<'a>(&'a self, filter: &'a Filter, projection: &'a Projection) -> DocumentStream<'a> {
        self.store.find_all(MQPROFILE_COLLECTION, filter, projection)
    }
}
