pub mod blobs;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use blobs::{BlobStore, BlobStoreError, FsBlobStore, InMemoryBlobStore};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoSeedDataset, SeedResult, SeededRequest, VerificationResult};
