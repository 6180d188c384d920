use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use tracing::info;

use super::store::{Document, DocumentStore, DocumentStream, Filter, Lookup, Projection, StoreError};
use crate::config::DatabaseConfig;

/// Prepared statements for one registered collection
#[derive(Debug)]
struct CollectionSql {
    find_one: String,
    find_all: String,
}

impl CollectionSql {
    fn new(table: &str) -> Self {
        let table = quote_identifier(table);
        Self {
            find_one: format!("SELECT doc FROM {} WHERE doc @> $1 LIMIT 1", table),
            find_all: format!("SELECT doc FROM {} WHERE doc @> $1", table),
        }
    }
}

/// Document store backed by Postgres, one JSONB table per collection.
///
/// Equality filters become JSONB containment (`doc @> $1`), which the GIN
/// index created by [`PgDocumentStore::ensure_collection`] can serve.
pub struct PgDocumentStore {
    pool: PgPool,
    collections: HashMap<String, CollectionSql>,
}

impl PgDocumentStore {
    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected document store pool");
        Ok(Self::with_pool(pool))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            collections: HashMap::new(),
        }
    }

    /// Create the backing table for `collection` if needed, with `key_field` unique
    pub async fn ensure_collection(&mut self, collection: &str, key_field: &str) -> Result<(), StoreError> {
        if !is_valid_identifier(collection) {
            return Err(StoreError::InvalidCollectionName(collection.to_string()));
        }
        if !is_valid_identifier(key_field) {
            return Err(StoreError::InvalidCollectionName(key_field.to_string()));
        }

        let table = quote_identifier(collection);
        let ddl = [
            format!("CREATE TABLE IF NOT EXISTS {} (doc JSONB NOT NULL)", table),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc->>'{}'))",
                quote_identifier(&format!("{}_{}_key", collection, key_field)),
                table,
                key_field
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (doc jsonb_path_ops)",
                quote_identifier(&format!("{}_doc_idx", collection)),
                table
            ),
        ];
        for statement in &ddl {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        self.collections.insert(collection.to_string(), CollectionSql::new(collection));
        info!("Registered collection: {}", collection);
        Ok(())
    }

    fn sql(&self, collection: &str) -> Result<&CollectionSql, StoreError> {
        self.collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Lookup, StoreError> {
        let sql = self.sql(collection)?;
        let row: Option<Json<Document>> = sqlx::query_scalar(&sql.find_one)
            .bind(Json(filter.to_document()))
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(Json(doc)) => Lookup::Found(doc),
            None => Lookup::NotFound,
        })
    }

    fn find_all<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Filter,
        projection: &'a Projection,
    ) -> DocumentStream<'a> {
        let sql = match self.sql(collection) {
            Ok(sql) => sql,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        sqlx::query_scalar::<_, Json<Document>>(&sql.find_all)
            .bind(Json(filter.to_document()))
            .fetch(&self.pool)
            .map(move |row| {
                row.map(|Json(doc)| projection.apply(doc))
                    .map_err(StoreError::from)
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Collection and key names are restricted to [a-zA-Z0-9_], starting with a letter
fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
