pub mod client;
pub mod memory;
pub mod postgres;
pub mod seed;
pub mod store;

pub use client::{MqProfile, MqProfileClient, MQPROFILE_COLLECTION, MQPROFILE_KEY};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{Document, DocumentStore, DocumentStream, Filter, Lookup, Projection, StoreError};
