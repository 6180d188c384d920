#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use futures::stream::{self, StreamExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use mqs_api::auth::{Claims, TokenVerifier};
use mqs_api::config::AppConfig;
use mqs_api::database::{
    Document, DocumentStore, DocumentStream, Filter, Lookup, MemoryDocumentStore, Projection, StoreError,
    MQPROFILE_COLLECTION,
};
use mqs_api::schema::RequestSchema;
use mqs_api::AppState;

pub const SECRET: &str = "integration-test-secret";

/// Memory store that records how many queries reached it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    queries: AtomicUsize,
}

impl CountingStore {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Lookup, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(collection, filter).await
    }

    fn find_all<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Filter,
        projection: &'a Projection,
    ) -> DocumentStream<'a> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all(collection, filter, projection)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

/// Store whose queries always fail. `find_all` yields one document before its error.
#[derive(Default)]
pub struct FailingStore {
    queries: AtomicUsize,
}

impl FailingStore {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find_one(&self, _collection: &str, _filter: &Filter) -> Result<Lookup, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    fn find_all<'a>(
        &'a self,
        _collection: &'a str,
        _filter: &'a Filter,
        _projection: &'a Projection,
    ) -> DocumentStream<'a> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        stream::iter(vec![
            Ok(mqprofile("abc123", "wf1", true, true)),
            Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut)),
        ])
        .boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}

pub struct TestApp<S = CountingStore> {
    pub router: Router,
    pub store: Arc<S>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not JSON")
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = SECRET.to_string();
    config
}

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

pub fn mqprofile(mqid: &str, workflow_id: &str, is_public: bool, is_active: bool) -> Document {
    doc(json!({
        "mqid": mqid,
        "workflow_id": workflow_id,
        "is_public": is_public,
        "is_active": is_active,
        "queue_name": format!("{}-queue", mqid),
        "nqueues": 2
    }))
}

/// Router over a counting in-memory store seeded with `docs`
pub async fn spawn_app(docs: Vec<Document>) -> Result<TestApp> {
    let store = Arc::new(CountingStore::default());
    store.inner.insert_many(MQPROFILE_COLLECTION, docs).await;
    spawn_app_over(store)
}

/// Router over a store whose every query fails
pub fn spawn_failing_app() -> Result<TestApp<FailingStore>> {
    spawn_app_over(Arc::new(FailingStore::default()))
}

fn spawn_app_over<S: DocumentStore + 'static>(store: Arc<S>) -> Result<TestApp<S>> {
    let config = test_config();
    let tokens = TokenVerifier::from_config(&config.security)?;
    let schema = RequestSchema::bundled()?;
    let state = AppState::new(store.clone(), tokens, schema, &config.api.route_version_prefix);
    let router = mqs_api::app(state, &config)?;

    Ok(TestApp { router, store })
}

pub fn token_with(secret: &str, roles: &[&str], exp_offset: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "svc-integration".to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        exp: now + exp_offset,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("failed to sign test token")
}

pub fn token(roles: &[&str]) -> String {
    token_with(SECRET, roles, 300)
}

impl<S> TestApp<S> {
    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> Result<TestResponse> {
        self.send(Method::GET, uri, bearer).await
    }

    pub async fn send(&self, method: Method, uri: &str, bearer: Option<&str>) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty())?;

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?.to_vec();

        Ok(TestResponse { status, body })
    }
}
